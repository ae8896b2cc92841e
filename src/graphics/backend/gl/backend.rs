//! `GraphicsBackend` implementation for the immediate-mode model.
//!
//! Resource handles map to GL objects (buffers, textures, programs, VAOs,
//! FBOs). Draws re-apply the bound-target state, wire bindings by shader
//! name (uniform locations for samplers, uniform block indices for
//! buffers), and rasterize immediately.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use glow::HasContext;

use crate::errors::{HeliosError, Result};
use crate::graphics::backend::{
    BindSetKey, BindingListDesc, BufferKey, GraphicsBackend, ModelDescriptor, ModelKey,
    PipelineDesc, RenderTargetDescriptor, ShaderKey, TargetBindingDesc, TargetKey, TargetSlot,
    TextureBindingDesc, TextureDescriptor, TextureKey, UniformBindingDesc,
};
use crate::graphics::buffer::{BufferKind, DataType};
use crate::graphics::texture::{SamplerState, TextureFormat};
use crate::graphics::{AdapterInfo, BackendKind, Extents2D};

use super::convert;

struct GlBuffer {
    buffer: glow::Buffer,
    target: u32,
    size: u64,
}

struct GlTexture {
    texture: glow::Texture,
    size: Extents2D,
    format: TextureFormat,
}

struct GlShader {
    program: glow::Program,
}

struct GlModel {
    vao: glow::VertexArray,
    index_count: u32,
}

struct GlTarget {
    fbo: glow::Framebuffer,
    size: Extents2D,
    color_count: u32,
}

/// Replayable binding list; the immediate backend's notion of a
/// precomputed bind set.
struct GlBindSet {
    textures: Vec<TextureBindingDesc>,
    uniforms: Vec<UniformBindingDesc>,
}

struct BoundState {
    target: TargetSlot,
    enable_depth_test: bool,
    outputs: Option<SmallVec<[u32; 8]>>,
}

/// Immediate-mode backend over an application-provided OpenGL context.
pub struct GlBackend {
    gl: glow::Context,
    info: AdapterInfo,
    max_color_attachments: u32,
    surface_size: Extents2D,
    /// Empty VAO kept bound for attribute-less draws; a core profile
    /// context rejects draws with no VAO bound.
    fullscreen_vao: glow::VertexArray,

    buffers: SlotMap<BufferKey, GlBuffer>,
    textures: SlotMap<TextureKey, GlTexture>,
    shaders: SlotMap<ShaderKey, GlShader>,
    models: SlotMap<ModelKey, GlModel>,
    targets: SlotMap<TargetKey, GlTarget>,
    bind_sets: SlotMap<BindSetKey, GlBindSet>,
    samplers: FxHashMap<(SamplerState, bool), glow::Sampler>,

    bound: Option<BoundState>,
}

impl GlBackend {
    /// Capability probe: the engine needs desktop GL 3.3 (or ES 3.0) for
    /// multiple render targets, VAOs, and uniform buffer objects.
    #[must_use]
    pub fn probe(gl: &glow::Context) -> bool {
        let version = gl.version();
        if version.is_embedded {
            version.major >= 3
        } else {
            version.major > 3 || (version.major == 3 && version.minor >= 3)
        }
    }

    /// Wraps a loaded, current OpenGL context. `surface_size` is the size
    /// of the default framebuffer the application will present.
    pub fn new(gl: glow::Context, surface_size: Extents2D) -> Result<Self> {
        if !Self::probe(&gl) {
            let version = gl.version();
            return Err(HeliosError::BackendUnavailable {
                requested: "gl",
                detail: format!(
                    "OpenGL {}.{} (embedded: {}) is below the required version",
                    version.major, version.minor, version.is_embedded
                ),
            });
        }

        let (info, max_color_attachments) = unsafe {
            let info = AdapterInfo {
                vendor: gl.get_parameter_string(glow::VENDOR),
                device: gl.get_parameter_string(glow::RENDERER),
                driver: gl.get_parameter_string(glow::VERSION),
            };
            let max = gl.get_parameter_i32(glow::MAX_COLOR_ATTACHMENTS).max(0) as u32;
            (info, max)
        };

        let fullscreen_vao = unsafe {
            gl.create_vertex_array().map_err(|e| {
                HeliosError::ResourceCreation { what: "vertex array", detail: e }
            })?
        };

        log::info!("gl adapter: {info}");

        Ok(Self {
            gl,
            info,
            max_color_attachments,
            surface_size,
            fullscreen_vao,
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            models: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            bind_sets: SlotMap::with_key(),
            samplers: FxHashMap::default(),
            bound: None,
        })
    }

    // ---- lookup helpers -------------------------------------------------

    fn buffer(&self, key: BufferKey) -> Result<&GlBuffer> {
        self.buffers.get(key).ok_or(HeliosError::UseAfterFree { resource: "buffer" })
    }

    fn texture(&self, key: TextureKey) -> Result<&GlTexture> {
        self.textures.get(key).ok_or(HeliosError::UseAfterFree { resource: "texture" })
    }

    fn shader(&self, key: ShaderKey) -> Result<&GlShader> {
        self.shaders.get(key).ok_or(HeliosError::UseAfterFree { resource: "shader" })
    }

    fn model(&self, key: ModelKey) -> Result<&GlModel> {
        self.models.get(key).ok_or(HeliosError::UseAfterFree { resource: "model" })
    }

    fn target(&self, key: TargetKey) -> Result<&GlTarget> {
        self.targets.get(key).ok_or(HeliosError::UseAfterFree { resource: "render target" })
    }

    fn compile_stage(&self, stage: u32, stage_name: &'static str, source: &str) -> Result<glow::Shader> {
        unsafe {
            let shader = self.gl.create_shader(stage).map_err(|e| {
                HeliosError::ResourceCreation { what: "shader stage", detail: e }
            })?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(HeliosError::ShaderCompile { stage: stage_name, log });
            }
            Ok(shader)
        }
    }

    fn link_program(&self, stages: &[glow::Shader]) -> Result<glow::Program> {
        unsafe {
            let program = self.gl.create_program().map_err(|e| {
                HeliosError::ResourceCreation { what: "shader program", detail: e }
            })?;
            for &stage in stages {
                self.gl.attach_shader(program, stage);
            }
            self.gl.link_program(program);

            // Stage objects are no longer needed once the program is
            // linked, regardless of the outcome.
            for &stage in stages {
                self.gl.detach_shader(program, stage);
                self.gl.delete_shader(stage);
            }

            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(HeliosError::ShaderLink { log });
            }
            Ok(program)
        }
    }

    fn sampler_for(&mut self, state: SamplerState, filterable: bool) -> Result<glow::Sampler> {
        if let Some(&sampler) = self.samplers.get(&(state, filterable)) {
            return Ok(sampler);
        }
        let sampler = unsafe {
            let sampler = self.gl.create_sampler().map_err(|e| {
                HeliosError::ResourceCreation { what: "sampler", detail: e }
            })?;
            self.gl.sampler_parameter_i32(
                sampler,
                glow::TEXTURE_MIN_FILTER,
                convert::filter_mode(state.min_filter, filterable),
            );
            self.gl.sampler_parameter_i32(
                sampler,
                glow::TEXTURE_MAG_FILTER,
                convert::filter_mode(state.mag_filter, filterable),
            );
            self.gl
                .sampler_parameter_i32(sampler, glow::TEXTURE_WRAP_S, convert::wrap_mode(state.wrap_x));
            self.gl
                .sampler_parameter_i32(sampler, glow::TEXTURE_WRAP_T, convert::wrap_mode(state.wrap_y));
            sampler
        };
        self.samplers.insert((state, filterable), sampler);
        Ok(sampler)
    }

    /// Re-applies the bound-target state: framebuffer, draw buffers,
    /// viewport, depth test.
    fn apply_bound(&self) -> Result<()> {
        let Some(bound) = &self.bound else {
            return Err(HeliosError::NoTargetBound);
        };

        unsafe {
            match bound.target {
                TargetSlot::Surface => {
                    self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                    self.gl.draw_buffers(&[glow::BACK]);
                    self.gl.viewport(
                        0,
                        0,
                        self.surface_size.width as i32,
                        self.surface_size.height as i32,
                    );
                }
                TargetSlot::Offscreen(key) => {
                    let target = self.target(key)?;
                    self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.fbo));

                    let draw_buffers: SmallVec<[u32; 8]> = match &bound.outputs {
                        Some(subset) => {
                            subset.iter().map(|&i| glow::COLOR_ATTACHMENT0 + i).collect()
                        }
                        None => (0..target.color_count)
                            .map(|i| glow::COLOR_ATTACHMENT0 + i)
                            .collect(),
                    };
                    self.gl.draw_buffers(&draw_buffers);
                    self.gl
                        .viewport(0, 0, target.size.width as i32, target.size.height as i32);
                }
            }

            if bound.enable_depth_test {
                self.gl.enable(glow::DEPTH_TEST);
                self.gl.depth_func(glow::LESS);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
        Ok(())
    }

    fn clear_bound(&self, color: Option<[f32; 4]>, depth: Option<f32>) {
        unsafe {
            let mut mask = 0;
            if let Some([r, g, b, a]) = color {
                self.gl.clear_color(r, g, b, a);
                mask |= glow::COLOR_BUFFER_BIT;
            }
            if let Some(value) = depth {
                self.gl.clear_depth_f64(f64::from(value));
                mask |= glow::DEPTH_BUFFER_BIT;
            }
            if mask != 0 {
                self.gl.clear(mask);
            }
        }
    }

    /// Wires a binding list into the current program by shader name.
    fn apply_bindings(
        &mut self,
        program: glow::Program,
        textures: &[TextureBindingDesc],
        uniforms: &[UniformBindingDesc],
    ) -> Result<()> {
        for uniform in uniforms {
            let buffer = self.buffer(uniform.buffer)?.buffer;
            unsafe {
                if let Some(index) = self.gl.get_uniform_block_index(program, uniform.name) {
                    self.gl.uniform_block_binding(program, index, uniform.slot);
                }
                self.gl.bind_buffer_base(glow::UNIFORM_BUFFER, uniform.slot, Some(buffer));
            }
        }

        for binding in textures {
            let (texture, filterable) = {
                let record = self.texture(binding.texture)?;
                (record.texture, record.format.is_filterable())
            };
            let sampler = match binding.sampling {
                Some(state) => Some(self.sampler_for(state, filterable)?),
                None => None,
            };
            unsafe {
                self.gl.active_texture(glow::TEXTURE0 + binding.unit);
                self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                self.gl.bind_sampler(binding.unit, sampler);
                let location = self.gl.get_uniform_location(program, binding.name);
                self.gl.uniform_1_i32(location.as_ref(), binding.unit as i32);
            }
        }
        Ok(())
    }

    fn prepare_draw(&mut self, pipeline: &PipelineDesc<'_>) -> Result<()> {
        self.apply_bound()?;
        let program = self.shader(pipeline.shader)?.program;
        unsafe {
            self.gl.use_program(Some(program));
        }
        match pipeline.bindings {
            BindingListDesc::Inline { textures, uniforms } => {
                self.apply_bindings(program, textures, uniforms)
            }
            BindingListDesc::Set(key) => {
                let (textures, uniforms) = {
                    let set = self
                        .bind_sets
                        .get(key)
                        .ok_or(HeliosError::UseAfterFree { resource: "bind set" })?;
                    (set.textures.clone(), set.uniforms.clone())
                };
                self.apply_bindings(program, &textures, &uniforms)
            }
        }
    }
}

impl GraphicsBackend for GlBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gl
    }

    fn adapter_info(&self) -> AdapterInfo {
        self.info.clone()
    }

    fn max_color_attachments(&self) -> u32 {
        self.max_color_attachments
    }

    // ---- Buffers -------------------------------------------------------

    fn create_buffer(&mut self, kind: BufferKind, size: u64) -> Result<BufferKey> {
        let target = convert::buffer_target(kind);
        let buffer = unsafe {
            let buffer = self.gl.create_buffer().map_err(|e| {
                HeliosError::ResourceCreation { what: "buffer", detail: e }
            })?;
            self.gl.bind_buffer(target, Some(buffer));
            self.gl.buffer_data_size(target, size as i32, convert::buffer_usage(kind));
            self.gl.bind_buffer(target, None);
            buffer
        };
        Ok(self.buffers.insert(GlBuffer { buffer, target, size }))
    }

    fn destroy_buffer(&mut self, key: BufferKey) -> Result<()> {
        let record =
            self.buffers.remove(key).ok_or(HeliosError::UseAfterFree { resource: "buffer" })?;
        unsafe {
            self.gl.delete_buffer(record.buffer);
        }
        Ok(())
    }

    fn write_buffer(&mut self, key: BufferKey, offset: u64, data: &[u8]) -> Result<()> {
        let record = self.buffer(key)?;
        if offset + data.len() as u64 > record.size {
            return Err(HeliosError::ResourceCreation {
                what: "buffer write",
                detail: format!(
                    "write of {} bytes at offset {offset} exceeds buffer size {}",
                    data.len(),
                    record.size
                ),
            });
        }
        unsafe {
            self.gl.bind_buffer(record.target, Some(record.buffer));
            self.gl.buffer_sub_data_u8_slice(record.target, offset as i32, data);
            self.gl.bind_buffer(record.target, None);
        }
        Ok(())
    }

    // ---- Textures ------------------------------------------------------

    fn create_texture(
        &mut self,
        desc: &TextureDescriptor<'_>,
        data: Option<&[u8]>,
    ) -> Result<TextureKey> {
        let (internal, format, ty) = convert::texture_format(desc.format);
        let filterable = desc.format.is_filterable();

        let texture = unsafe {
            let texture = self.gl.create_texture().map_err(|e| {
                HeliosError::ResourceCreation { what: "texture", detail: e }
            })?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                desc.size.width as i32,
                desc.size.height as i32,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(data),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                convert::filter_mode(desc.sampling.min_filter, filterable),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                convert::filter_mode(desc.sampling.mag_filter, filterable),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                convert::wrap_mode(desc.sampling.wrap_x),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                convert::wrap_mode(desc.sampling.wrap_y),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            texture
        };

        Ok(self.textures.insert(GlTexture { texture, size: desc.size, format: desc.format }))
    }

    fn destroy_texture(&mut self, key: TextureKey) -> Result<()> {
        let record =
            self.textures.remove(key).ok_or(HeliosError::UseAfterFree { resource: "texture" })?;
        unsafe {
            self.gl.delete_texture(record.texture);
        }
        Ok(())
    }

    fn write_texture(&mut self, key: TextureKey, data: &[u8]) -> Result<()> {
        let record = self.texture(key)?;
        let (_, format, ty) = convert::texture_format(record.format);
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(record.texture));
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                record.size.width as i32,
                record.size.height as i32,
                format,
                ty,
                glow::PixelUnpackData::Slice(Some(data)),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
        Ok(())
    }

    fn set_sampling(&mut self, key: TextureKey, sampling: &SamplerState) -> Result<()> {
        let record = self.texture(key)?;
        let filterable = record.format.is_filterable();
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(record.texture));
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                convert::filter_mode(sampling.min_filter, filterable),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                convert::filter_mode(sampling.mag_filter, filterable),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                convert::wrap_mode(sampling.wrap_x),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                convert::wrap_mode(sampling.wrap_y),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
        Ok(())
    }

    fn read_texture(&mut self, key: TextureKey) -> Result<Vec<u8>> {
        let record = self.texture(key)?;
        let (_, format, ty) = convert::texture_format(record.format);
        let byte_count = record.size.texel_count() as usize
            * record.format.bytes_per_texel() as usize;
        let mut data = vec![0_u8; byte_count];

        let attachment = if record.format == TextureFormat::Depth {
            glow::DEPTH_ATTACHMENT
        } else {
            glow::COLOR_ATTACHMENT0
        };

        // A throwaway framebuffer; the sticky bound-target state is
        // re-applied by the next draw.
        unsafe {
            let fbo = self.gl.create_framebuffer().map_err(|e| {
                HeliosError::ResourceCreation { what: "texture readback", detail: e }
            })?;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment,
                glow::TEXTURE_2D,
                Some(record.texture),
                0,
            );
            self.gl.read_pixels(
                0,
                0,
                record.size.width as i32,
                record.size.height as i32,
                format,
                ty,
                glow::PixelPackData::Slice(Some(&mut data)),
            );
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.gl.delete_framebuffer(fbo);
        }

        Ok(data)
    }

    // ---- Shaders -------------------------------------------------------

    fn create_render_shader(&mut self, vertex_src: &str, fragment_src: &str) -> Result<ShaderKey> {
        let vertex = self.compile_stage(glow::VERTEX_SHADER, "vertex", vertex_src)?;
        let fragment = match self.compile_stage(glow::FRAGMENT_SHADER, "fragment", fragment_src) {
            Ok(fragment) => fragment,
            Err(e) => {
                unsafe { self.gl.delete_shader(vertex) };
                return Err(e);
            }
        };
        let program = self.link_program(&[vertex, fragment])?;
        Ok(self.shaders.insert(GlShader { program }))
    }

    fn create_compute_shader(&mut self, src: &str) -> Result<ShaderKey> {
        let compute = self.compile_stage(glow::COMPUTE_SHADER, "compute", src)?;
        let program = self.link_program(&[compute])?;
        Ok(self.shaders.insert(GlShader { program }))
    }

    fn destroy_shader(&mut self, key: ShaderKey) -> Result<()> {
        let record =
            self.shaders.remove(key).ok_or(HeliosError::UseAfterFree { resource: "shader" })?;
        unsafe {
            self.gl.delete_program(record.program);
        }
        Ok(())
    }

    // ---- Models --------------------------------------------------------

    fn create_model(&mut self, desc: &ModelDescriptor<'_>) -> Result<ModelKey> {
        let index_buffer = self.buffer(desc.index_buffer)?.buffer;

        let vao = unsafe {
            let vao = self.gl.create_vertex_array().map_err(|e| {
                HeliosError::ResourceCreation { what: "vertex array", detail: e }
            })?;
            self.gl.bind_vertex_array(Some(vao));

            for (buffer_key, layout) in desc.vertex_buffers.iter().zip(desc.layouts) {
                let buffer = self.buffer(*buffer_key)?.buffer;
                self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));

                for attr in layout.attributes() {
                    self.gl.enable_vertex_attrib_array(attr.location);
                    match attr.ty.data_type {
                        DataType::Float32 => self.gl.vertex_attrib_pointer_f32(
                            attr.location,
                            attr.ty.components as i32,
                            glow::FLOAT,
                            false,
                            layout.stride() as i32,
                            attr.offset as i32,
                        ),
                        DataType::Sint32 => self.gl.vertex_attrib_pointer_i32(
                            attr.location,
                            attr.ty.components as i32,
                            glow::INT,
                            layout.stride() as i32,
                            attr.offset as i32,
                        ),
                        DataType::Uint32 => self.gl.vertex_attrib_pointer_i32(
                            attr.location,
                            attr.ty.components as i32,
                            glow::UNSIGNED_INT,
                            layout.stride() as i32,
                            attr.offset as i32,
                        ),
                    }
                }
            }

            // Recorded into the VAO so draws only rebind the VAO.
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));

            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
            vao
        };

        Ok(self.models.insert(GlModel { vao, index_count: desc.vertex_count }))
    }

    fn destroy_model(&mut self, key: ModelKey) -> Result<()> {
        let record =
            self.models.remove(key).ok_or(HeliosError::UseAfterFree { resource: "model" })?;
        unsafe {
            self.gl.delete_vertex_array(record.vao);
        }
        Ok(())
    }

    // ---- Render targets ------------------------------------------------

    fn create_render_target(&mut self, desc: &RenderTargetDescriptor<'_>) -> Result<TargetKey> {
        if desc.color.len() as u32 > self.max_color_attachments {
            return Err(HeliosError::ResourceCreation {
                what: "render target",
                detail: format!(
                    "{} color attachments exceed the device limit of {}",
                    desc.color.len(),
                    self.max_color_attachments
                ),
            });
        }

        let fbo = unsafe {
            let fbo = self.gl.create_framebuffer().map_err(|e| {
                HeliosError::ResourceCreation { what: "framebuffer", detail: e }
            })?;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));

            for (index, attachment) in desc.color.iter().enumerate() {
                let texture = self.texture(attachment.texture)?.texture;
                self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0 + index as u32,
                    glow::TEXTURE_2D,
                    Some(texture),
                    0,
                );
            }
            if let Some(depth) = &desc.depth {
                let texture = self.texture(depth.texture)?.texture;
                self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    glow::TEXTURE_2D,
                    Some(texture),
                    0,
                );
            }

            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            if status != glow::FRAMEBUFFER_COMPLETE {
                self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                self.gl.delete_framebuffer(fbo);
                return Err(HeliosError::FramebufferIncomplete {
                    label: desc.label.to_owned(),
                    status,
                });
            }
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            fbo
        };

        Ok(self.targets.insert(GlTarget {
            fbo,
            size: desc.size,
            color_count: desc.color.len() as u32,
        }))
    }

    fn destroy_render_target(&mut self, key: TargetKey) -> Result<()> {
        let record =
            self.targets.remove(key).ok_or(HeliosError::UseAfterFree { resource: "render target" })?;
        unsafe {
            self.gl.delete_framebuffer(record.fbo);
        }
        Ok(())
    }

    // ---- Bind sets -----------------------------------------------------

    fn create_bind_set(
        &mut self,
        _shader: ShaderKey,
        textures: &[TextureBindingDesc],
        uniforms: &[UniformBindingDesc],
    ) -> Result<BindSetKey> {
        // Validate the referenced resources now so a stale reference fails
        // at build time, not at first replay.
        for binding in textures {
            self.texture(binding.texture)?;
        }
        for uniform in uniforms {
            self.buffer(uniform.buffer)?;
        }
        Ok(self.bind_sets.insert(GlBindSet {
            textures: textures.to_vec(),
            uniforms: uniforms.to_vec(),
        }))
    }

    fn destroy_bind_set(&mut self, key: BindSetKey) -> Result<()> {
        self.bind_sets
            .remove(key)
            .map(|_| ())
            .ok_or(HeliosError::UseAfterFree { resource: "bind set" })
    }

    // ---- Frame lifecycle ----------------------------------------------

    fn begin_frame(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        // The application swaps buffers; flushing here bounds the frame.
        unsafe {
            self.gl.flush();
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
        self.apply_bound()?;
        self.clear_bound(binding.clear_color, binding.clear_depth);
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4], depth: Option<f32>) -> Result<()> {
        self.apply_bound()?;
        self.clear_bound(Some(color), depth);
        Ok(())
    }

    fn draw_vertices(
        &mut self,
        pipeline: &PipelineDesc<'_>,
        vertex_count: u32,
        first_vertex: u32,
    ) -> Result<()> {
        self.prepare_draw(pipeline)?;
        unsafe {
            self.gl.bind_vertex_array(Some(self.fullscreen_vao));
            self.gl.draw_arrays(glow::TRIANGLES, first_vertex as i32, vertex_count as i32);
            self.gl.bind_vertex_array(None);
        }
        Ok(())
    }

    fn draw_model(&mut self, pipeline: &PipelineDesc<'_>, model: ModelKey) -> Result<()> {
        self.prepare_draw(pipeline)?;
        let record = self.model(model)?;
        unsafe {
            self.gl.bind_vertex_array(Some(record.vao));
            self.gl.draw_elements(
                glow::TRIANGLES,
                record.index_count as i32,
                glow::UNSIGNED_INT,
                0,
            );
            self.gl.bind_vertex_array(None);
        }
        Ok(())
    }
}
