//! The graphics-device abstraction implemented once per concrete backend.
//!
//! [`GraphicsBackend`] is the single seam between the backend-agnostic
//! resource layer and a concrete device API. Two implementations exist with
//! deliberately different programming models:
//!
//! - [`wgpu::WgpuBackend`] — explicit command-buffer model: every pass is
//!   recorded into a command encoder and submitted to a device queue;
//!   per-draw bindings are snapshotted into bind groups at record time.
//! - [`gl::GlBackend`] — immediate-mode model: state-setting calls execute
//!   directly against an OpenGL context (framebuffer binds, texture units,
//!   uniform-block binding points) and draws rasterize immediately.
//!
//! Resources live in generational arenas ([`slotmap`]) inside each backend.
//! The typed keys defined here are generation-stamped handles: a key whose
//! slot has been freed no longer resolves, and every backend entry point
//! maps that to
//! [`HeliosError::UseAfterFree`](crate::errors::HeliosError::UseAfterFree).
//!
//! # Binding model
//!
//! Draw operations name resources by explicit texture unit and uniform slot
//! plus a shader-visible name. The immediate backend wires bindings by name
//! (uniform location / uniform block index); the explicit backend wires them
//! by number under a fixed convention shared with the WGSL sources:
//! uniform slot `s` maps to `@binding(s)`, texture unit `u` maps to
//! `@binding(8 + 2u)` with its sampler at `@binding(8 + 2u + 1)`, all in
//! `@group(0)`.

pub mod gl;
pub mod wgpu;

use crate::errors::Result;
use crate::graphics::buffer::{BufferKind, BufferLayout};
use crate::graphics::texture::{SamplerState, TextureFormat};
use crate::graphics::{AdapterInfo, BackendKind, Extents2D};

slotmap::new_key_type! {
    /// Generation-stamped handle to a backend buffer.
    pub struct BufferKey;
    /// Generation-stamped handle to a backend texture.
    pub struct TextureKey;
    /// Generation-stamped handle to a linked shader program.
    pub struct ShaderKey;
    /// Generation-stamped handle to a model (vertex/index binding recipe).
    pub struct ModelKey;
    /// Generation-stamped handle to a framebuffer-like render target.
    pub struct TargetKey;
    /// Generation-stamped handle to a precomputed bind set.
    pub struct BindSetKey;
}

/// Texture unit slots available to one draw.
pub const MAX_TEXTURE_UNITS: u32 = 8;
/// Uniform buffer slots available to one draw. Also the first texture
/// binding index in the explicit backend's numeric convention.
pub const MAX_UNIFORM_SLOTS: u32 = 8;

/// Creation parameters for a 2D texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor<'a> {
    pub size: Extents2D,
    pub format: TextureFormat,
    pub sampling: SamplerState,
    pub label: Option<&'a str>,
}

/// Creation parameters for an indexed model.
#[derive(Debug, Clone, Copy)]
pub struct ModelDescriptor<'a> {
    pub vertex_buffers: &'a [BufferKey],
    pub layouts: &'a [BufferLayout],
    pub index_buffer: BufferKey,
    pub vertex_count: u32,
}

/// One attachment entry of a render-target descriptor.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentDesc<'a> {
    pub label: &'a str,
    pub texture: TextureKey,
    pub format: TextureFormat,
}

/// Creation parameters for a render target. Color attachments receive slot
/// indices in the order given here.
#[derive(Debug, Clone, Copy)]
pub struct RenderTargetDescriptor<'a> {
    pub label: &'a str,
    pub size: Extents2D,
    pub color: &'a [AttachmentDesc<'a>],
    pub depth: Option<AttachmentDesc<'a>>,
}

/// Which target a pass renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSlot {
    /// The default presentable surface.
    Surface,
    /// An offscreen render target.
    Offscreen(TargetKey),
}

/// Parameters of a `switch_render_target` call, with attachment labels
/// already resolved to slot indices.
#[derive(Debug, Clone, Copy)]
pub struct TargetBindingDesc<'a> {
    pub target: TargetSlot,
    /// Clear all enabled color attachments to this value on bind.
    /// `None` loads the existing contents.
    pub clear_color: Option<[f32; 4]>,
    /// Clear the depth attachment to this value on bind. `None` loads.
    pub clear_depth: Option<f32>,
    pub enable_depth_test: bool,
    /// Subset of the target's color attachment indices to enable as draw
    /// outputs, in the given order. `None` enables all attachments in
    /// declaration order.
    pub output_attachments: Option<&'a [u32]>,
}

/// A texture bound at an explicit unit, with its shader-visible name and an
/// optional sampler override accompanying the bind.
#[derive(Debug, Clone, Copy)]
pub struct TextureBindingDesc {
    pub unit: u32,
    pub texture: TextureKey,
    pub name: &'static str,
    pub sampling: Option<SamplerState>,
}

/// A uniform buffer bound at an explicit slot, with its block name.
#[derive(Debug, Clone, Copy)]
pub struct UniformBindingDesc {
    pub slot: u32,
    pub buffer: BufferKey,
    pub name: &'static str,
}

/// Resource bindings for one draw: either inline lists resolved at draw
/// time, or a precomputed bind set.
#[derive(Debug, Clone, Copy)]
pub enum BindingListDesc<'a> {
    Inline {
        textures: &'a [TextureBindingDesc],
        uniforms: &'a [UniformBindingDesc],
    },
    Set(BindSetKey),
}

/// Shader plus bindings for one draw.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDesc<'a> {
    pub shader: ShaderKey,
    pub bindings: BindingListDesc<'a>,
}

/// The device seam. One implementation per concrete graphics API.
///
/// All operations are synchronous from the caller's perspective; whether
/// the GPU work executes immediately or is batched into command buffers is
/// the implementation's business. Ordering of calls within a frame is the
/// correctness contract — see the concurrency notes on each backend.
pub trait GraphicsBackend {
    fn kind(&self) -> BackendKind;
    fn adapter_info(&self) -> AdapterInfo;
    /// Color attachments supported per render target. At least 4 on any
    /// backend this engine accepts.
    fn max_color_attachments(&self) -> u32;

    // ---- Buffers -------------------------------------------------------
    fn create_buffer(&mut self, kind: BufferKind, size: u64) -> Result<BufferKey>;
    fn destroy_buffer(&mut self, key: BufferKey) -> Result<()>;
    /// Overwrites `data.len()` bytes at `offset`. The destination must
    /// already be large enough; buffers are never grown.
    fn write_buffer(&mut self, key: BufferKey, offset: u64, data: &[u8]) -> Result<()>;

    // ---- Textures ------------------------------------------------------
    fn create_texture(
        &mut self,
        desc: &TextureDescriptor<'_>,
        data: Option<&[u8]>,
    ) -> Result<TextureKey>;
    fn destroy_texture(&mut self, key: TextureKey) -> Result<()>;
    /// Full-image replace. The payload length has been validated upstream.
    fn write_texture(&mut self, key: TextureKey, data: &[u8]) -> Result<()>;
    fn set_sampling(&mut self, key: TextureKey, sampling: &SamplerState) -> Result<()>;
    /// Reads the full texture contents back to the CPU, blocking until
    /// the GPU work producing them has completed. A diagnostic and test
    /// surface, not a per-frame operation.
    fn read_texture(&mut self, key: TextureKey) -> Result<Vec<u8>>;

    // ---- Shaders -------------------------------------------------------
    fn create_render_shader(&mut self, vertex_src: &str, fragment_src: &str) -> Result<ShaderKey>;
    fn create_compute_shader(&mut self, src: &str) -> Result<ShaderKey>;
    fn destroy_shader(&mut self, key: ShaderKey) -> Result<()>;

    // ---- Models --------------------------------------------------------
    fn create_model(&mut self, desc: &ModelDescriptor<'_>) -> Result<ModelKey>;
    fn destroy_model(&mut self, key: ModelKey) -> Result<()>;

    // ---- Render targets ------------------------------------------------
    /// Builds the framebuffer-like object and validates attachment
    /// completeness; an unbindable attachment set fails construction.
    fn create_render_target(&mut self, desc: &RenderTargetDescriptor<'_>) -> Result<TargetKey>;
    fn destroy_render_target(&mut self, key: TargetKey) -> Result<()>;

    // ---- Bind sets -----------------------------------------------------
    fn create_bind_set(
        &mut self,
        shader: ShaderKey,
        textures: &[TextureBindingDesc],
        uniforms: &[UniformBindingDesc],
    ) -> Result<BindSetKey>;
    fn destroy_bind_set(&mut self, key: BindSetKey) -> Result<()>;

    // ---- Frame lifecycle ----------------------------------------------
    /// Acquires the presentable surface image for this frame.
    fn begin_frame(&mut self) -> Result<()>;
    /// Submits or flushes outstanding work and presents the surface image.
    fn end_frame(&mut self) -> Result<()>;

    // ---- Pass execution ------------------------------------------------
    fn bind_target(&mut self, binding: &TargetBindingDesc<'_>) -> Result<()>;
    /// Clears the currently bound target's enabled color attachments (and
    /// depth, if requested).
    fn clear(&mut self, color: [f32; 4], depth: Option<f32>) -> Result<()>;
    /// Non-indexed draw of `vertex_count` vertices with no vertex buffers
    /// (vertex data synthesized in the shader).
    fn draw_vertices(
        &mut self,
        pipeline: &PipelineDesc<'_>,
        vertex_count: u32,
        first_vertex: u32,
    ) -> Result<()>;
    /// Indexed draw of a model's `vertex_count` indices.
    fn draw_model(&mut self, pipeline: &PipelineDesc<'_>, model: ModelKey) -> Result<()>;
}
