//! Backend-agnostic GPU resource abstraction.
//!
//! This module is the resource layer of the engine: typed wrappers around
//! backend-resident GPU objects ([`Buffer`], [`Texture`], [`Shader`],
//! [`Model`], [`RenderTarget`]), the [`RenderSystem`] context object that
//! creates and tracks them, and the [`Renderer`] façade that executes draw
//! operations against the currently bound render target.
//!
//! All wrappers are lightweight handles: the actual GPU objects live inside
//! the active [`backend::GraphicsBackend`] in generational arenas, so a
//! handle that outlives its resource is detected as a stale key rather than
//! touching freed state.
//!
//! The same handle types work against both backends — the explicit
//! command-buffer backend ([`backend::wgpu::WgpuBackend`]) and the
//! immediate-mode backend ([`backend::gl::GlBackend`]).

pub mod backend;
pub mod buffer;
pub mod model;
pub mod renderer;
pub mod shader;
pub mod system;
pub mod target;
pub mod texture;

pub use buffer::{AttributeDescription, AttributeType, Buffer, BufferKind, BufferLayout, DataType};
pub use model::Model;
pub use renderer::{
    Bindings, ModelPass, PipelineBinding, Renderer, TargetBinding, TargetRef, TextureBinding,
    UniformBinding,
};
pub use shader::{BindSet, Shader, ShaderKind};
pub use system::{BackendRequest, RenderSystem, RenderSystemDescriptor};
pub use target::{Attachment, RenderTarget};
pub use texture::{FilterMode, SamplerState, Texture, TextureFormat, WrapMode};

use crate::errors::{HeliosError, Result};

/// Immutable 2D size descriptor used for textures, render targets, and
/// viewports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extents2D {
    pub width: u32,
    pub height: u32,
}

impl Extents2D {
    /// Creates a size descriptor. Both dimensions must be non-zero.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(HeliosError::ResourceCreation {
                what: "extents",
                detail: format!("dimensions must be non-zero, got {width}x{height}"),
            });
        }
        Ok(Self { width, height })
    }

    /// Total number of texels covered by this extent.
    #[inline]
    #[must_use]
    pub fn texel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for Extents2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Identifies which concrete graphics backend is driving the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Explicit command-buffer backend (wgpu).
    Wgpu,
    /// Immediate-mode rasterization backend (OpenGL via glow).
    Gl,
}

impl BackendKind {
    /// Stable lowercase name, usable in logs and diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Wgpu => "wgpu",
            BackendKind::Gl => "gl",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Vendor/device/driver strings reported by the active adapter.
#[derive(Debug, Clone, Default)]
pub struct AdapterInfo {
    pub vendor: String,
    pub device: String,
    pub driver: String,
}

impl std::fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} / {}", self.vendor, self.device, self.driver)
    }
}
