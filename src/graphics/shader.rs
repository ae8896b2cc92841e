//! Shader programs and precomputed bind sets.
//!
//! A [`Shader`] is immutable once linked: it holds a backend-resident
//! program handle created from opaque source text. The engine never parses
//! shader source beyond the backend-reported compile/link status.
//!
//! A [`BindSet`] is the backend-specific grouping of resource bindings
//! (uniform buffers, textures, samplers) attached to a draw call. Effects
//! precompute their bind set and rebuild it whenever an input or output
//! texture reference changes.

use crate::graphics::backend::{BindSetKey, ShaderKey};

/// Kind of program a shader handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Vertex + fragment program driving rasterization.
    Render,
    /// Single-stage compute program.
    Compute,
}

/// Handle to a linked, backend-resident shader program.
///
/// Destroying a shader releases the GPU-side stage objects but not the
/// uniform buffers or textures it referenced.
#[derive(Debug, Clone)]
pub struct Shader {
    pub(crate) key: ShaderKey,
    kind: ShaderKind,
}

impl Shader {
    pub(crate) fn new(key: ShaderKey, kind: ShaderKind) -> Self {
        Self { key, kind }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ShaderKind {
        self.kind
    }
}

/// Handle to a precomputed binding group for one shader.
///
/// On the explicit backend this maps to a recorded `wgpu::BindGroup`; on
/// the immediate backend it is a replayable list of state-setting calls.
/// Either way, a bind set referencing a destroyed or swapped texture is a
/// correctness bug — the owner must rebuild it before the next draw that
/// reads it.
#[derive(Debug, Clone)]
pub struct BindSet {
    pub(crate) key: BindSetKey,
}

impl BindSet {
    pub(crate) fn new(key: BindSetKey) -> Self {
        Self { key }
    }
}
