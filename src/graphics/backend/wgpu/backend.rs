//! `GraphicsBackend` implementation for the explicit command-buffer model.
//!
//! Each pass operation records a fresh command encoder and submits it
//! immediately; draws against the same target use `LoadOp::Load` so the
//! accumulated attachment contents survive across the per-object passes of
//! the geometry stage. Clears are standalone passes with `LoadOp::Clear`,
//! mirroring how the pipeline treats clearing as an explicit step rather
//! than a side effect of drawing.

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::errors::{HeliosError, Result};
use crate::graphics::backend::{
    AttachmentDesc, BindSetKey, BindingListDesc, BufferKey, GraphicsBackend, ModelDescriptor,
    ModelKey, PipelineDesc, RenderTargetDescriptor, ShaderKey, TargetBindingDesc, TargetKey,
    TargetSlot, TextureBindingDesc, TextureDescriptor, TextureKey, UniformBindingDesc,
};
use crate::graphics::buffer::{BufferKind, BufferLayout};
use crate::graphics::texture::{SamplerState, TextureFormat};
use crate::graphics::{AdapterInfo, BackendKind, Extents2D};

use super::context::WgpuContext;
use super::convert;
use super::pipeline::{
    BindGroupKey, BindingSignature, PipelineCache, PipelineKey, hash_vertex_layouts,
    sampler_binding_index, texture_binding_index,
};

struct GpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: Extents2D,
    format: TextureFormat,
    sampling: SamplerState,
}

struct GpuShader {
    module: wgpu::ShaderModule,
}

struct GpuModel {
    vertex_buffers: SmallVec<[BufferKey; 2]>,
    layouts: Vec<BufferLayout>,
    index_buffer: BufferKey,
    index_count: u32,
    layout_hash: u64,
}

struct GpuTarget {
    color: SmallVec<[(TextureKey, wgpu::TextureFormat); 8]>,
    depth: Option<TextureKey>,
}

struct GpuBindSet {
    signature: BindingSignature,
    bind_group: wgpu::BindGroup,
}

/// Presentable-surface configuration: a real window surface, or an
/// offscreen stand-in used by headless/test configurations.
enum SurfaceState {
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        depth_view: wgpu::TextureView,
        current: Option<wgpu::SurfaceTexture>,
    },
    Headless {
        view: wgpu::TextureView,
        format: wgpu::TextureFormat,
        depth_view: wgpu::TextureView,
    },
}

/// The target selection left behind by the last `bind_target` call.
/// Persists across frames; surface views are re-resolved per draw because
/// the presentable image changes every frame.
struct BoundState {
    target: TargetSlot,
    enable_depth_test: bool,
    outputs: Option<SmallVec<[u32; 8]>>,
}

/// Views and formats a draw actually renders into.
struct ResolvedTarget {
    color_views: SmallVec<[wgpu::TextureView; 8]>,
    color_formats: SmallVec<[wgpu::TextureFormat; 8]>,
    depth_view: Option<wgpu::TextureView>,
    depth_format: Option<wgpu::TextureFormat>,
}

/// Explicit command-buffer backend over wgpu.
pub struct WgpuBackend {
    ctx: WgpuContext,
    surface: SurfaceState,
    cache: PipelineCache,

    buffers: SlotMap<BufferKey, GpuBuffer>,
    textures: SlotMap<TextureKey, GpuTexture>,
    shaders: SlotMap<ShaderKey, GpuShader>,
    models: SlotMap<ModelKey, GpuModel>,
    targets: SlotMap<TargetKey, GpuTarget>,
    bind_sets: SlotMap<BindSetKey, GpuBindSet>,

    bound: Option<BoundState>,
}

impl WgpuBackend {
    /// Capability probe: true when a compatible adapter exists.
    #[must_use]
    pub fn probe() -> bool {
        WgpuContext::probe()
    }

    /// Creates the backend against a window surface.
    pub fn new<W>(window: W, size: Extents2D, vsync: bool) -> Result<Self>
    where
        W: raw_window_handle::HasWindowHandle
            + raw_window_handle::HasDisplayHandle
            + Send
            + Sync
            + 'static,
    {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window).map_err(|e| {
            HeliosError::BackendUnavailable {
                requested: "wgpu",
                detail: format!("surface creation failed: {e}"),
            }
        })?;

        let ctx = WgpuContext::new(&instance, Some(&surface))?;

        let mut config = surface
            .get_default_config(ctx.adapter(), size.width, size.height)
            .ok_or_else(|| HeliosError::BackendUnavailable {
                requested: "wgpu",
                detail: "surface not supported by adapter".to_owned(),
            })?;
        config.present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        surface.configure(&ctx.device, &config);

        let depth_view = Self::create_surface_depth(&ctx.device, size);

        Ok(Self {
            ctx,
            surface: SurfaceState::Window { surface, config, depth_view, current: None },
            cache: PipelineCache::new(),
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            models: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            bind_sets: SlotMap::with_key(),
            bound: None,
        })
    }

    /// Creates the backend with an offscreen texture standing in for the
    /// presentable surface. Used by tests and pixel-parity harnesses.
    pub fn headless(size: Extents2D) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let ctx = WgpuContext::new(&instance, None)?;

        let format = wgpu::TextureFormat::Rgba8Unorm;
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Headless Surface"),
            size: wgpu::Extent3d { width: size.width, height: size.height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = Self::create_surface_depth(&ctx.device, size);

        Ok(Self {
            ctx,
            surface: SurfaceState::Headless { view, format, depth_view },
            cache: PipelineCache::new(),
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            models: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            bind_sets: SlotMap::with_key(),
            bound: None,
        })
    }

    fn create_surface_depth(device: &wgpu::Device, size: Extents2D) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Surface Depth"),
            size: wgpu::Extent3d { width: size.width, height: size.height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    // ---- lookup helpers -------------------------------------------------

    fn buffer(&self, key: BufferKey) -> Result<&GpuBuffer> {
        self.buffers.get(key).ok_or(HeliosError::UseAfterFree { resource: "buffer" })
    }

    fn texture(&self, key: TextureKey) -> Result<&GpuTexture> {
        self.textures.get(key).ok_or(HeliosError::UseAfterFree { resource: "texture" })
    }

    fn shader(&self, key: ShaderKey) -> Result<&GpuShader> {
        self.shaders.get(key).ok_or(HeliosError::UseAfterFree { resource: "shader" })
    }

    fn model(&self, key: ModelKey) -> Result<&GpuModel> {
        self.models.get(key).ok_or(HeliosError::UseAfterFree { resource: "model" })
    }

    fn target(&self, key: TargetKey) -> Result<&GpuTarget> {
        self.targets.get(key).ok_or(HeliosError::UseAfterFree { resource: "render target" })
    }

    // ---- surface / target resolution -----------------------------------

    fn acquire_surface(&mut self) -> Result<()> {
        if let SurfaceState::Window { surface, current, .. } = &mut self.surface {
            if current.is_none() {
                let frame = surface.get_current_texture().map_err(|e| {
                    HeliosError::ResourceCreation {
                        what: "surface frame",
                        detail: e.to_string(),
                    }
                })?;
                *current = Some(frame);
            }
        }
        Ok(())
    }

    fn resolve_bound(&mut self) -> Result<ResolvedTarget> {
        let (target, enable_depth, outputs) = match &self.bound {
            Some(bound) => (bound.target, bound.enable_depth_test, bound.outputs.clone()),
            None => return Err(HeliosError::NoTargetBound),
        };

        match target {
            TargetSlot::Surface => {
                self.acquire_surface()?;
                let (view, format, depth_view) = match &self.surface {
                    SurfaceState::Window { config, depth_view, current, .. } => {
                        let frame = current.as_ref().expect("surface frame acquired above");
                        (
                            frame.texture.create_view(&wgpu::TextureViewDescriptor::default()),
                            config.format,
                            depth_view.clone(),
                        )
                    }
                    SurfaceState::Headless { view, format, depth_view } => {
                        (view.clone(), *format, depth_view.clone())
                    }
                };
                Ok(ResolvedTarget {
                    color_views: smallvec::smallvec![view],
                    color_formats: smallvec::smallvec![format],
                    depth_view: enable_depth.then_some(depth_view),
                    depth_format: enable_depth.then_some(wgpu::TextureFormat::Depth32Float),
                })
            }
            TargetSlot::Offscreen(key) => {
                let target = self.target(key)?;

                let indices: SmallVec<[u32; 8]> = match &outputs {
                    Some(subset) => subset.clone(),
                    None => (0..target.color.len() as u32).collect(),
                };

                let mut color_views = SmallVec::new();
                let mut color_formats = SmallVec::new();
                for &index in &indices {
                    let (tex_key, format) =
                        *target.color.get(index as usize).ok_or_else(|| {
                            HeliosError::UnknownAttachment { label: format!("#{index}") }
                        })?;
                    let texture = self
                        .textures
                        .get(tex_key)
                        .ok_or(HeliosError::UseAfterFree { resource: "texture" })?;
                    color_views.push(texture.view.clone());
                    color_formats.push(format);
                }

                let mut depth_view = None;
                let mut depth_format = None;
                if enable_depth {
                    if let Some(depth_key) = target.depth {
                        let texture = self
                            .textures
                            .get(depth_key)
                            .ok_or(HeliosError::UseAfterFree { resource: "texture" })?;
                        depth_view = Some(texture.view.clone());
                        depth_format = Some(convert::texture_format(texture.format));
                    }
                }

                Ok(ResolvedTarget {
                    color_views,
                    color_formats,
                    depth_view,
                    depth_format,
                })
            }
        }
    }

    /// Records and submits one clear pass over the resolved target.
    fn submit_clear(
        &mut self,
        resolved: &ResolvedTarget,
        color: Option<[f32; 4]>,
        depth: Option<f32>,
    ) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Helios Clear") });

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = resolved
            .color_views
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match color {
                            Some(value) => wgpu::LoadOp::Clear(convert::clear_color(value)),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth_stencil_attachment =
            resolved.depth_view.as_ref().map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: match depth {
                        Some(value) => wgpu::LoadOp::Clear(value),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            });

        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Helios Clear Pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            ..Default::default()
        });
        drop(pass);

        self.ctx.queue.submit([encoder.finish()]);
    }

    // ---- binding resolution ---------------------------------------------

    /// Builds the binding signature of a draw, ordered by slot then unit.
    fn signature_for(
        &self,
        textures: &[TextureBindingDesc],
        uniforms: &[UniformBindingDesc],
    ) -> Result<BindingSignature> {
        let mut uniform_slots: SmallVec<[u32; 4]> = uniforms.iter().map(|u| u.slot).collect();
        uniform_slots.sort_unstable();

        let mut texture_units: SmallVec<[(u32, bool); 8]> = SmallVec::new();
        for binding in textures {
            let texture = self.texture(binding.texture)?;
            texture_units.push((binding.unit, texture.format.is_filterable()));
        }
        texture_units.sort_unstable_by_key(|&(unit, _)| unit);

        Ok(BindingSignature { uniform_slots, texture_units })
    }

    fn bind_group_key(
        &self,
        signature: &BindingSignature,
        textures: &[TextureBindingDesc],
        uniforms: &[UniformBindingDesc],
    ) -> BindGroupKey {
        use slotmap::Key;
        use std::hash::{Hash, Hasher};

        let mut resources: SmallVec<[u64; 16]> = SmallVec::new();
        for uniform in uniforms {
            resources.push(uniform.buffer.data().as_ffi());
        }
        for binding in textures {
            resources.push(binding.texture.data().as_ffi());
            let mut hasher = rustc_hash::FxHasher::default();
            binding.sampling.hash(&mut hasher);
            resources.push(hasher.finish());
        }
        BindGroupKey { signature: signature.clone(), resources }
    }

    /// Creates (or fetches from cache) the bind group for inline bindings.
    fn inline_bind_group(
        &mut self,
        signature: &BindingSignature,
        textures: &[TextureBindingDesc],
        uniforms: &[UniformBindingDesc],
    ) -> Result<wgpu::BindGroup> {
        let key = self.bind_group_key(signature, textures, uniforms);
        if let Some(cached) = self.cache.cached_bind_group(&key) {
            return Ok(cached);
        }

        let layout = self.cache.bind_group_layout(&self.ctx.device, signature);

        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = Vec::new();
        for uniform in uniforms {
            let buffer = self.buffers.get(uniform.buffer).ok_or(HeliosError::UseAfterFree {
                resource: "buffer",
            })?;
            entries.push(wgpu::BindGroupEntry {
                binding: uniform.slot,
                resource: buffer.buffer.as_entire_binding(),
            });
        }

        let mut samplers: Vec<(u32, wgpu::Sampler)> = Vec::new();
        for binding in textures {
            let texture = self.textures.get(binding.texture).ok_or(HeliosError::UseAfterFree {
                resource: "texture",
            })?;
            let state = binding.sampling.unwrap_or(texture.sampling);
            let sampler =
                self.cache.sampler(&self.ctx.device, &state, texture.format.is_filterable());
            samplers.push((binding.unit, sampler));
        }
        for binding in textures {
            let texture = self.textures.get(binding.texture).expect("checked above");
            entries.push(wgpu::BindGroupEntry {
                binding: texture_binding_index(binding.unit),
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
        }
        for (unit, sampler) in &samplers {
            entries.push(wgpu::BindGroupEntry {
                binding: sampler_binding_index(*unit),
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Helios BindGroup"),
            layout: &layout,
            entries: &entries,
        });

        self.cache.insert_bind_group(key, bind_group.clone());
        Ok(bind_group)
    }

    /// Resolves a pipeline desc to (signature, bind group).
    fn resolve_bindings(
        &mut self,
        pipeline: &PipelineDesc<'_>,
    ) -> Result<(BindingSignature, wgpu::BindGroup)> {
        match pipeline.bindings {
            BindingListDesc::Inline { textures, uniforms } => {
                let signature = self.signature_for(textures, uniforms)?;
                let bind_group = self.inline_bind_group(&signature, textures, uniforms)?;
                Ok((signature, bind_group))
            }
            BindingListDesc::Set(key) => {
                let set = self
                    .bind_sets
                    .get(key)
                    .ok_or(HeliosError::UseAfterFree { resource: "bind set" })?;
                Ok((set.signature.clone(), set.bind_group.clone()))
            }
        }
    }

    /// Records and submits one draw pass.
    fn submit_draw(
        &mut self,
        pipeline_desc: &PipelineDesc<'_>,
        model: Option<ModelKey>,
        vertex_range: (u32, u32),
    ) -> Result<()> {
        use slotmap::Key;

        let resolved = self.resolve_bound()?;
        let (signature, bind_group) = self.resolve_bindings(pipeline_desc)?;

        let (vertex_layouts, layout_hash, buffers_and_index): (
            Vec<BufferLayout>,
            u64,
            Option<(SmallVec<[wgpu::Buffer; 2]>, wgpu::Buffer, u32)>,
        ) = match model {
            Some(model_key) => {
                let model = self.model(model_key)?;
                let layouts = model.layouts.clone();
                let hash = model.layout_hash;
                let mut vertex_buffers: SmallVec<[wgpu::Buffer; 2]> = SmallVec::new();
                for &key in &model.vertex_buffers {
                    vertex_buffers.push(self.buffer(key)?.buffer.clone());
                }
                let index = self.buffer(model.index_buffer)?.buffer.clone();
                let count = model.index_count;
                (layouts, hash, Some((vertex_buffers, index, count)))
            }
            None => (Vec::new(), 0, None),
        };

        let key = PipelineKey {
            shader: pipeline_desc.shader.data().as_ffi(),
            signature,
            vertex_layout_hash: layout_hash,
            color_formats: resolved.color_formats.clone(),
            depth_format: resolved.depth_format,
        };

        let module = self.shader(pipeline_desc.shader)?.module.clone();
        let pipeline =
            self.cache.get_or_create_pipeline(&self.ctx.device, &key, &module, &vertex_layouts);

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Helios Draw") });

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = resolved
            .color_views
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth_stencil_attachment =
            resolved.depth_view.as_ref().map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Helios Draw Pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                ..Default::default()
            });

            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);

            match &buffers_and_index {
                Some((vertex_buffers, index_buffer, index_count)) => {
                    for (slot, buffer) in vertex_buffers.iter().enumerate() {
                        pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                    }
                    pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..*index_count, 0, 0..1);
                }
                None => {
                    let (count, first) = vertex_range;
                    pass.draw(first..first + count, 0..1);
                }
            }
        }

        self.ctx.queue.submit([encoder.finish()]);
        Ok(())
    }
}

impl GraphicsBackend for WgpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Wgpu
    }

    fn adapter_info(&self) -> AdapterInfo {
        self.ctx.adapter_info()
    }

    fn max_color_attachments(&self) -> u32 {
        self.ctx.max_color_attachments()
    }

    // ---- Buffers -------------------------------------------------------

    fn create_buffer(&mut self, kind: BufferKind, size: u64) -> Result<BufferKey> {
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(kind.name()),
            size,
            usage: convert::buffer_usage(kind),
            mapped_at_creation: false,
        });
        Ok(self.buffers.insert(GpuBuffer { buffer, size }))
    }

    fn destroy_buffer(&mut self, key: BufferKey) -> Result<()> {
        self.buffers
            .remove(key)
            .map(|_| ())
            .ok_or(HeliosError::UseAfterFree { resource: "buffer" })
    }

    fn write_buffer(&mut self, key: BufferKey, offset: u64, data: &[u8]) -> Result<()> {
        let buffer = self.buffer(key)?;
        if offset + data.len() as u64 > buffer.size {
            return Err(HeliosError::ResourceCreation {
                what: "buffer write",
                detail: format!(
                    "write of {} bytes at offset {offset} exceeds buffer size {}",
                    data.len(),
                    buffer.size
                ),
            });
        }
        self.ctx.queue.write_buffer(&buffer.buffer, offset, data);
        Ok(())
    }

    // ---- Textures ------------------------------------------------------

    fn create_texture(
        &mut self,
        desc: &TextureDescriptor<'_>,
        data: Option<&[u8]>,
    ) -> Result<TextureKey> {
        let format = convert::texture_format(desc.format);
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC;
        if desc.format != TextureFormat::Depth {
            usage |= wgpu::TextureUsages::COPY_DST;
        }

        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: desc.label,
            size: wgpu::Extent3d {
                width: desc.size.width,
                height: desc.size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let key = self.textures.insert(GpuTexture {
            texture,
            view,
            size: desc.size,
            format: desc.format,
            sampling: desc.sampling,
        });

        if let Some(data) = data {
            self.write_texture(key, data)?;
        }
        Ok(key)
    }

    fn destroy_texture(&mut self, key: TextureKey) -> Result<()> {
        self.textures
            .remove(key)
            .map(|_| ())
            .ok_or(HeliosError::UseAfterFree { resource: "texture" })
    }

    fn write_texture(&mut self, key: TextureKey, data: &[u8]) -> Result<()> {
        let texture = self.texture(key)?;
        let bytes_per_row = texture.size.width * texture.format.bytes_per_texel();
        self.ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(texture.size.height),
            },
            wgpu::Extent3d {
                width: texture.size.width,
                height: texture.size.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn set_sampling(&mut self, key: TextureKey, sampling: &SamplerState) -> Result<()> {
        let texture = self
            .textures
            .get_mut(key)
            .ok_or(HeliosError::UseAfterFree { resource: "texture" })?;
        texture.sampling = *sampling;
        Ok(())
    }

    fn read_texture(&mut self, key: TextureKey) -> Result<Vec<u8>> {
        let texture = self.texture(key)?;
        let width = texture.size.width;
        let height = texture.size.height;
        let unpadded_bytes_per_row = width * texture.format.bytes_per_texel();
        let padded_bytes_per_row = unpadded_bytes_per_row
            .div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Helios Readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.ctx.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor { label: Some("Helios Readback") },
        );
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.ctx.queue.submit([encoder.finish()]);

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.ctx.device.poll(wgpu::PollType::Wait).map_err(|e| {
            HeliosError::ResourceCreation { what: "texture readback", detail: e.to_string() }
        })?;
        receiver
            .recv()
            .map_err(|e| HeliosError::ResourceCreation {
                what: "texture readback",
                detail: e.to_string(),
            })?
            .map_err(|e| HeliosError::ResourceCreation {
                what: "texture readback",
                detail: e.to_string(),
            })?;

        let mapped = slice.get_mapped_range();
        let mut data = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            data.extend_from_slice(&mapped[start..start + unpadded_bytes_per_row as usize]);
        }
        drop(mapped);
        staging.unmap();

        Ok(data)
    }

    // ---- Shaders -------------------------------------------------------

    fn create_render_shader(&mut self, vertex_src: &str, fragment_src: &str) -> Result<ShaderKey> {
        // One module holds both entry points; the vertex source carries the
        // shared interface structs.
        let source = format!("{vertex_src}\n{fragment_src}");

        self.ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Helios Render Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(self.ctx.device.pop_error_scope()) {
            return Err(HeliosError::ShaderCompile {
                stage: "render",
                log: error.to_string(),
            });
        }

        Ok(self.shaders.insert(GpuShader { module }))
    }

    fn create_compute_shader(&mut self, src: &str) -> Result<ShaderKey> {
        self.ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Helios Compute Shader"),
            source: wgpu::ShaderSource::Wgsl(src.into()),
        });
        if let Some(error) = pollster::block_on(self.ctx.device.pop_error_scope()) {
            return Err(HeliosError::ShaderCompile {
                stage: "compute",
                log: error.to_string(),
            });
        }
        Ok(self.shaders.insert(GpuShader { module }))
    }

    fn destroy_shader(&mut self, key: ShaderKey) -> Result<()> {
        self.shaders
            .remove(key)
            .map(|_| ())
            .ok_or(HeliosError::UseAfterFree { resource: "shader" })
    }

    // ---- Models --------------------------------------------------------

    fn create_model(&mut self, desc: &ModelDescriptor<'_>) -> Result<ModelKey> {
        for &key in desc.vertex_buffers {
            self.buffer(key)?;
        }
        self.buffer(desc.index_buffer)?;

        Ok(self.models.insert(GpuModel {
            vertex_buffers: desc.vertex_buffers.iter().copied().collect(),
            layouts: desc.layouts.to_vec(),
            index_buffer: desc.index_buffer,
            index_count: desc.vertex_count,
            layout_hash: hash_vertex_layouts(desc.layouts),
        }))
    }

    fn destroy_model(&mut self, key: ModelKey) -> Result<()> {
        self.models
            .remove(key)
            .map(|_| ())
            .ok_or(HeliosError::UseAfterFree { resource: "model" })
    }

    // ---- Render targets ------------------------------------------------

    fn create_render_target(&mut self, desc: &RenderTargetDescriptor<'_>) -> Result<TargetKey> {
        if desc.color.len() as u32 > self.max_color_attachments() {
            return Err(HeliosError::ResourceCreation {
                what: "render target",
                detail: format!(
                    "{} color attachments exceed the device limit of {}",
                    desc.color.len(),
                    self.max_color_attachments()
                ),
            });
        }

        let check = |attachment: &AttachmentDesc<'_>| -> Result<()> {
            let texture = self.texture(attachment.texture)?;
            if texture.size != desc.size {
                return Err(HeliosError::FramebufferIncomplete {
                    label: desc.label.to_owned(),
                    status: 0,
                });
            }
            Ok(())
        };
        for attachment in desc.color {
            check(attachment)?;
        }
        if let Some(depth) = &desc.depth {
            check(depth)?;
        }

        let color = desc
            .color
            .iter()
            .map(|a| (a.texture, convert::texture_format(a.format)))
            .collect();
        Ok(self.targets.insert(GpuTarget { color, depth: desc.depth.map(|d| d.texture) }))
    }

    fn destroy_render_target(&mut self, key: TargetKey) -> Result<()> {
        self.targets
            .remove(key)
            .map(|_| ())
            .ok_or(HeliosError::UseAfterFree { resource: "render target" })
    }

    // ---- Bind sets -----------------------------------------------------

    fn create_bind_set(
        &mut self,
        _shader: ShaderKey,
        textures: &[TextureBindingDesc],
        uniforms: &[UniformBindingDesc],
    ) -> Result<BindSetKey> {
        let signature = self.signature_for(textures, uniforms)?;
        let bind_group = self.inline_bind_group(&signature, textures, uniforms)?;
        Ok(self.bind_sets.insert(GpuBindSet { signature, bind_group }))
    }

    fn destroy_bind_set(&mut self, key: BindSetKey) -> Result<()> {
        self.bind_sets
            .remove(key)
            .map(|_| ())
            .ok_or(HeliosError::UseAfterFree { resource: "bind set" })
    }

    // ---- Frame lifecycle ----------------------------------------------

    fn begin_frame(&mut self) -> Result<()> {
        self.acquire_surface()
    }

    fn end_frame(&mut self) -> Result<()> {
        if let SurfaceState::Window { current, .. } = &mut self.surface {
            if let Some(frame) = current.take() {
                frame.present();
            }
        }
        Ok(())
    }

    // ---- Pass execution ------------------------------------------------

    fn bind_target(&mut self, binding: &TargetBindingDesc<'_>) -> Result<()> {
        self.bound = Some(BoundState {
            target: binding.target,
            enable_depth_test: binding.enable_depth_test,
            outputs: binding.output_attachments.map(|labels| labels.iter().copied().collect()),
        });

        if binding.clear_color.is_some() || binding.clear_depth.is_some() {
            let resolved = self.resolve_bound()?;
            self.submit_clear(&resolved, binding.clear_color, binding.clear_depth);
        }
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4], depth: Option<f32>) -> Result<()> {
        let resolved = self.resolve_bound()?;
        self.submit_clear(&resolved, Some(color), depth);
        Ok(())
    }

    fn draw_vertices(
        &mut self,
        pipeline: &PipelineDesc<'_>,
        vertex_count: u32,
        first_vertex: u32,
    ) -> Result<()> {
        self.submit_draw(pipeline, None, (vertex_count, first_vertex))
    }

    fn draw_model(&mut self, pipeline: &PipelineDesc<'_>, model: ModelKey) -> Result<()> {
        self.submit_draw(pipeline, Some(model), (0, 0))
    }
}
