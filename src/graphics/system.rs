//! The render system: backend selection and resource factory dispatch.
//!
//! [`RenderSystem`] is an explicit context object passed by `&mut` into
//! every component that creates resources or executes passes — there is no
//! process-wide singleton, which keeps multiple isolated systems possible
//! (one per test, for instance).
//!
//! Backend selection happens once at construction with a probe-and-fallback
//! policy: if the requested backend's capability probe fails, the fallback
//! request is attempted; if both fail, construction fails with
//! [`BackendUnavailable`](crate::errors::HeliosError::BackendUnavailable).
//! Callers never observe which backend is active except through
//! [`backend_name`](RenderSystem::backend_name) and
//! [`renderer_info`](RenderSystem::renderer_info).

use crate::errors::{HeliosError, Result};
use crate::graphics::backend::{
    AttachmentDesc, GraphicsBackend, ModelDescriptor, RenderTargetDescriptor, TextureDescriptor,
    gl::GlBackend, wgpu::WgpuBackend,
};
use crate::graphics::buffer::{Buffer, BufferKind, BufferLayout};
use crate::graphics::model::Model;
use crate::graphics::renderer::{Renderer, TextureBinding, UniformBinding};
use crate::graphics::shader::{BindSet, Shader, ShaderKind};
use crate::graphics::target::{Attachment, RenderTarget};
use crate::graphics::texture::{SamplerState, Texture, TextureFormat};
use crate::graphics::{BackendKind, Extents2D};

/// A request for one concrete backend, carrying whatever device access
/// that backend needs from the embedding application.
pub enum BackendRequest {
    /// Explicit command-buffer backend over a window surface.
    Wgpu {
        /// Window the surface is created from.
        window: Box<dyn wgpu::WindowHandle>,
        vsync: bool,
    },
    /// Explicit command-buffer backend with an offscreen surface stand-in.
    /// Used by tests and parity harnesses.
    WgpuHeadless,
    /// Immediate-mode backend over a loaded, current OpenGL context.
    Gl {
        /// The context, loaded and made current by the application.
        context: glow::Context,
    },
}

impl BackendRequest {
    fn kind(&self) -> BackendKind {
        match self {
            BackendRequest::Wgpu { .. } | BackendRequest::WgpuHeadless => BackendKind::Wgpu,
            BackendRequest::Gl { .. } => BackendKind::Gl,
        }
    }

    fn build(self, resolution: Extents2D) -> Result<Box<dyn GraphicsBackend>> {
        match self {
            BackendRequest::Wgpu { window, vsync } => {
                if !WgpuBackend::probe() {
                    return Err(HeliosError::BackendUnavailable {
                        requested: "wgpu",
                        detail: "no compatible adapter".to_owned(),
                    });
                }
                Ok(Box::new(WgpuBackend::new(window, resolution, vsync)?))
            }
            BackendRequest::WgpuHeadless => {
                if !WgpuBackend::probe() {
                    return Err(HeliosError::BackendUnavailable {
                        requested: "wgpu",
                        detail: "no compatible adapter".to_owned(),
                    });
                }
                Ok(Box::new(WgpuBackend::headless(resolution)?))
            }
            BackendRequest::Gl { context } => Ok(Box::new(GlBackend::new(context, resolution)?)),
        }
    }
}

/// Construction parameters for a [`RenderSystem`].
pub struct RenderSystemDescriptor {
    /// The backend to try first.
    pub backend: BackendRequest,
    /// Attempted when the first request fails its probe or construction.
    pub fallback: Option<BackendRequest>,
    /// Size of the presentable surface (and default viewport).
    pub resolution: Extents2D,
}

/// Live-resource accounting for teardown diagnostics.
#[derive(Debug, Default, Clone, Copy)]
struct ResourceLedger {
    buffers: u32,
    textures: u32,
    shaders: u32,
    models: u32,
    targets: u32,
    bind_sets: u32,
}

/// Owns the active backend and routes every resource-creation call to it.
pub struct RenderSystem {
    backend: Box<dyn GraphicsBackend>,
    resolution: Extents2D,
    ledger: ResourceLedger,
}

impl RenderSystem {
    /// Selects and constructs a backend per the descriptor's
    /// probe-and-fallback policy.
    pub fn new(desc: RenderSystemDescriptor) -> Result<Self> {
        let resolution = desc.resolution;
        let requested = desc.backend.kind();

        let backend = match desc.backend.build(resolution) {
            Ok(backend) => backend,
            Err(primary_error) => match desc.fallback {
                Some(fallback) => {
                    log::warn!(
                        "backend '{requested}' unavailable ({primary_error}), trying '{}'",
                        fallback.kind()
                    );
                    fallback.build(resolution)?
                }
                None => return Err(primary_error),
            },
        };

        log::info!("render system: using '{}'", backend.kind());

        Ok(Self { backend, resolution, ledger: ResourceLedger::default() })
    }

    // ---- queries --------------------------------------------------------

    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Stable name of the active backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.kind().name()
    }

    /// Vendor/device/driver diagnostic string.
    #[must_use]
    pub fn renderer_info(&self) -> String {
        format!("{}: {}", self.backend.kind(), self.backend.adapter_info())
    }

    #[must_use]
    pub fn resolution(&self) -> Extents2D {
        self.resolution
    }

    /// Live-resource counts, for teardown and leak diagnostics.
    #[must_use]
    pub fn resource_report(&self) -> String {
        let ledger = &self.ledger;
        format!(
            "buffers: {}, textures: {}, shaders: {}, models: {}, targets: {}, bind sets: {}",
            ledger.buffers,
            ledger.textures,
            ledger.shaders,
            ledger.models,
            ledger.targets,
            ledger.bind_sets
        )
    }

    /// The pass-execution façade.
    pub fn renderer(&mut self) -> Renderer<'_> {
        Renderer { backend: &mut *self.backend }
    }

    // ---- frame lifecycle -----------------------------------------------

    pub fn begin_frame(&mut self) -> Result<()> {
        self.backend.begin_frame()
    }

    pub fn end_frame(&mut self) -> Result<()> {
        self.backend.end_frame()
    }

    // ---- buffers --------------------------------------------------------

    pub fn create_buffer(&mut self, kind: BufferKind, size: u64) -> Result<Buffer> {
        if size == 0 {
            return Err(HeliosError::ResourceCreation {
                what: "buffer",
                detail: "size must be non-zero".to_owned(),
            });
        }
        let key = self.backend.create_buffer(kind, size)?;
        self.ledger.buffers += 1;
        log::debug!("created {} buffer ({size} bytes)", kind.name());
        Ok(Buffer::new(key, kind, size))
    }

    pub fn create_vertex_buffer(&mut self, size: u64) -> Result<Buffer> {
        self.create_buffer(BufferKind::Vertex, size)
    }

    pub fn create_index_buffer(&mut self, size: u64) -> Result<Buffer> {
        self.create_buffer(BufferKind::Index, size)
    }

    pub fn create_uniform_buffer(&mut self, size: u64) -> Result<Buffer> {
        self.create_buffer(BufferKind::Uniform, size)
    }

    /// Overwrites `data.len()` bytes at `offset`. The caller must have
    /// sized the buffer correctly up front; buffers never grow.
    pub fn write_buffer(&mut self, buffer: &Buffer, offset: u64, data: &[u8]) -> Result<()> {
        self.backend.write_buffer(buffer.key, offset, data)
    }

    pub fn destroy_buffer(&mut self, buffer: Buffer) -> Result<()> {
        self.backend.destroy_buffer(buffer.key)?;
        self.ledger.buffers -= 1;
        Ok(())
    }

    // ---- textures -------------------------------------------------------

    /// Creates a 2D texture, optionally uploading an initial payload whose
    /// length must match `size` and `format` exactly.
    pub fn create_texture(
        &mut self,
        size: Extents2D,
        data: Option<&[u8]>,
        format: TextureFormat,
    ) -> Result<Texture> {
        self.create_texture_with(size, data, format, SamplerState::default(), None)
    }

    /// Full-control texture creation with sampler state and debug label.
    pub fn create_texture_with(
        &mut self,
        size: Extents2D,
        data: Option<&[u8]>,
        format: TextureFormat,
        sampling: SamplerState,
        label: Option<&str>,
    ) -> Result<Texture> {
        if let Some(data) = data {
            Texture::validate_data_size(size, format, data.len())?;
        }
        let key = self
            .backend
            .create_texture(&TextureDescriptor { size, format, sampling, label }, data)?;
        self.ledger.textures += 1;
        log::debug!(
            "created {} texture {size}{}",
            format.name(),
            label.map(|l| format!(" '{l}'")).unwrap_or_default()
        );
        Ok(Texture::new(key, size, format))
    }

    /// Full image replace. The payload length must match the texture's
    /// size and format exactly.
    pub fn set_texture_data(&mut self, texture: &Texture, data: &[u8]) -> Result<()> {
        Texture::validate_data_size(texture.size(), texture.format(), data.len())?;
        self.backend.write_texture(texture.key, data)
    }

    /// Updates a texture's wrap and filter state.
    pub fn set_sampling(&mut self, texture: &Texture, sampling: SamplerState) -> Result<()> {
        self.backend.set_sampling(texture.key, &sampling)
    }

    /// Reads a texture's full contents back to the CPU. Blocks until the
    /// GPU work producing them has completed; a diagnostic and test
    /// surface, not a per-frame operation.
    pub fn read_texture(&mut self, texture: &Texture) -> Result<Vec<u8>> {
        self.backend.read_texture(texture.key)
    }

    pub fn destroy_texture(&mut self, texture: Texture) -> Result<()> {
        self.backend.destroy_texture(texture.key)?;
        self.ledger.textures -= 1;
        Ok(())
    }

    // ---- shaders --------------------------------------------------------

    /// Compiles and links a vertex+fragment program from opaque source
    /// text in the active backend's dialect.
    pub fn create_render_shader(&mut self, vertex_src: &str, fragment_src: &str) -> Result<Shader> {
        let key = self.backend.create_render_shader(vertex_src, fragment_src)?;
        self.ledger.shaders += 1;
        Ok(Shader::new(key, ShaderKind::Render))
    }

    /// Compiles and links a single-stage compute program.
    pub fn create_compute_shader(&mut self, src: &str) -> Result<Shader> {
        let key = self.backend.create_compute_shader(src)?;
        self.ledger.shaders += 1;
        Ok(Shader::new(key, ShaderKind::Compute))
    }

    pub fn destroy_shader(&mut self, shader: Shader) -> Result<()> {
        self.backend.destroy_shader(shader.key)?;
        self.ledger.shaders -= 1;
        Ok(())
    }

    // ---- models ---------------------------------------------------------

    /// Builds a drawable model. `vertex_buffers` and `layouts` must have
    /// the same length (1:1 pairing); `vertex_count` is the number of
    /// indices drawn.
    pub fn create_model(
        &mut self,
        vertex_buffers: Vec<Buffer>,
        layouts: Vec<BufferLayout>,
        index_buffer: Buffer,
        vertex_count: u32,
    ) -> Result<Model> {
        Model::validate_pairing(vertex_buffers.len(), layouts.len())?;
        for buffer in &vertex_buffers {
            if buffer.kind() != BufferKind::Vertex {
                return Err(HeliosError::ResourceCreation {
                    what: "model",
                    detail: format!("'{}' buffer used as a vertex buffer", buffer.kind().name()),
                });
            }
        }
        if index_buffer.kind() != BufferKind::Index {
            return Err(HeliosError::ResourceCreation {
                what: "model",
                detail: format!(
                    "'{}' buffer used as the index buffer",
                    index_buffer.kind().name()
                ),
            });
        }

        let keys: Vec<_> = vertex_buffers.iter().map(|b| b.key).collect();
        let key = self.backend.create_model(&ModelDescriptor {
            vertex_buffers: &keys,
            layouts: &layouts,
            index_buffer: index_buffer.key,
            vertex_count,
        })?;
        self.ledger.models += 1;
        Ok(Model::new(key, vertex_buffers, layouts, index_buffer, vertex_count))
    }

    pub fn destroy_model(&mut self, model: Model) -> Result<()> {
        self.backend.destroy_model(model.key)?;
        self.ledger.models -= 1;
        Ok(())
    }

    // ---- render targets -------------------------------------------------

    /// Builds a render target over existing textures. Color attachments
    /// get ascending slot indices in the given order; completeness is
    /// validated by the backend before the target becomes usable.
    pub fn create_render_target(
        &mut self,
        label: &str,
        size: Extents2D,
        color: &[(&str, &Texture)],
        depth: Option<(&str, &Texture)>,
    ) -> Result<RenderTarget> {
        let color_descs: Vec<AttachmentDesc<'_>> = color
            .iter()
            .map(|(name, texture)| AttachmentDesc {
                label: name,
                texture: texture.key,
                format: texture.format(),
            })
            .collect();
        let depth_desc = depth.map(|(name, texture)| AttachmentDesc {
            label: name,
            texture: texture.key,
            format: texture.format(),
        });

        let key = self.backend.create_render_target(&RenderTargetDescriptor {
            label,
            size,
            color: &color_descs,
            depth: depth_desc,
        })?;
        self.ledger.targets += 1;
        log::debug!(
            "created render target '{label}' {size} ({} color, depth: {})",
            color.len(),
            depth.is_some()
        );

        let color_attachments = color
            .iter()
            .enumerate()
            .map(|(index, (name, texture))| Attachment {
                label: (*name).to_owned(),
                index: index as u32,
                texture: (*texture).clone(),
                format: texture.format(),
            })
            .collect();
        let depth_attachment = depth.map(|(name, texture)| Attachment {
            label: name.to_owned(),
            index: color.len() as u32,
            texture: texture.clone(),
            format: texture.format(),
        });

        Ok(RenderTarget::new(key, size, color_attachments, depth_attachment))
    }

    pub fn destroy_render_target(&mut self, target: RenderTarget) -> Result<()> {
        self.backend.destroy_render_target(target.key)?;
        self.ledger.targets -= 1;
        Ok(())
    }

    // ---- bind sets ------------------------------------------------------

    /// Precomputes a bind set for a shader and fixed resource lists. The
    /// owner must rebuild the set whenever any referenced texture is
    /// swapped or destroyed.
    pub fn create_bind_set(
        &mut self,
        shader: &Shader,
        textures: &[TextureBinding<'_>],
        uniforms: &[UniformBinding<'_>],
    ) -> Result<BindSet> {
        let texture_descs: Vec<_> = textures
            .iter()
            .map(|t| crate::graphics::backend::TextureBindingDesc {
                unit: t.unit,
                texture: t.texture.key,
                name: t.name,
                sampling: t.sampling,
            })
            .collect();
        let uniform_descs: Vec<_> = uniforms
            .iter()
            .map(|u| crate::graphics::backend::UniformBindingDesc {
                slot: u.slot,
                buffer: u.buffer.key,
                name: u.name,
            })
            .collect();

        let key = self.backend.create_bind_set(shader.key, &texture_descs, &uniform_descs)?;
        self.ledger.bind_sets += 1;
        Ok(BindSet::new(key))
    }

    pub fn destroy_bind_set(&mut self, bind_set: BindSet) -> Result<()> {
        self.backend.destroy_bind_set(bind_set.key)?;
        self.ledger.bind_sets -= 1;
        Ok(())
    }
}

impl Drop for RenderSystem {
    fn drop(&mut self) {
        log::debug!("render system teardown; live resources: {}", self.resource_report());
    }
}
