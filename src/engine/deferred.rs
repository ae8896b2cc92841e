//! The deferred-shading renderer.
//!
//! Owns a G-buffer of fixed-role attachments (albedo, world-position,
//! world-normal, depth) plus a single "result" image, and runs two
//! sub-pipelines per frame:
//!
//! - **lit**: one indexed draw per scene object, rasterizing albedo,
//!   world position, and world normal into the G-buffer with depth
//!   testing accumulating occlusion across objects;
//! - **merge**: one full-screen draw sampling the G-buffer and computing
//!   local lighting into the result image.
//!
//! Per frame the state sequence is Cleared -> GeometryPass(i) for each
//! object -> MergePass. Object order is caller-supplied; the renderer
//! does not sort, the depth test is the only ordering guarantee.
//!
//! The G-buffer is created once at the target resolution; a resolution
//! change requires recreating the renderer.

use glam::Vec3;

use crate::errors::Result;
use crate::graphics::renderer::{
    Bindings, ModelPass, PipelineBinding, TargetBinding, TargetRef, TextureBinding, UniformBinding,
};
use crate::graphics::shader::{BindSet, Shader};
use crate::graphics::system::RenderSystem;
use crate::graphics::target::RenderTarget;
use crate::graphics::texture::{SamplerState, Texture, TextureFormat};
use crate::graphics::{Buffer, Extents2D};
use crate::shaders;

use super::effects::FULLSCREEN_VERTEX_COUNT;
use super::scene::{Camera, CameraBlock, SceneObject};

/// CPU mirror of the merge pass lighting formula, kept in lockstep with
/// the fragment programs. The unit tests drive this against hand-computed
/// references.
///
/// `position` must be non-zero: the formula normalizes the direction to
/// the light at the origin and divides by the scaled squared distance.
#[must_use]
pub fn merge_lighting(
    albedo: Vec3,
    position: Vec3,
    normal: Vec3,
    ambient: f32,
    distance_falloff_scale: f32,
) -> Vec3 {
    let to_light = -position;
    let dist = to_light.length() * distance_falloff_scale;
    let diff = to_light.normalize().dot(normal).max(0.0) / (dist * dist);
    diff * (1.0 - ambient) * albedo
}

/// G-buffer attachment labels.
pub const ALBEDO: &str = "albedo";
pub const POSITION: &str = "position";
pub const NORMAL: &str = "normal";
pub const DEPTH: &str = "depth";
pub const RESULT: &str = "result";

pub struct DeferredRenderer {
    resolution: Extents2D,

    g_buffer: RenderTarget,
    result_target: RenderTarget,
    result_texture: Texture,

    camera_buffer: Buffer,
    camera_block: CameraBlock,

    lit_shader: Shader,
    merge_shader: Shader,
    merge_bind_set: BindSet,
}

impl DeferredRenderer {
    /// Builds the G-buffer, result image, camera block, and both
    /// sub-pipelines at the given resolution.
    pub fn new(
        system: &mut RenderSystem,
        resolution: Extents2D,
        ambient: f32,
        distance_falloff_scale: f32,
    ) -> Result<Self> {
        let albedo = system.create_texture_with(
            resolution,
            None,
            TextureFormat::Color8,
            SamplerState::clamped_linear(),
            Some(ALBEDO),
        )?;
        let position = system.create_texture_with(
            resolution,
            None,
            TextureFormat::ColorF32,
            SamplerState::clamped_nearest(),
            Some(POSITION),
        )?;
        let normal = system.create_texture_with(
            resolution,
            None,
            TextureFormat::ColorF32,
            SamplerState::clamped_nearest(),
            Some(NORMAL),
        )?;
        let depth = system.create_texture_with(
            resolution,
            None,
            TextureFormat::Depth,
            SamplerState::clamped_nearest(),
            Some(DEPTH),
        )?;
        let result_texture = system.create_texture_with(
            resolution,
            None,
            TextureFormat::Color8,
            SamplerState::clamped_linear(),
            Some(RESULT),
        )?;

        let g_buffer = system.create_render_target(
            "g_buffer",
            resolution,
            &[(ALBEDO, &albedo), (POSITION, &position), (NORMAL, &normal)],
            Some((DEPTH, &depth)),
        )?;
        let result_target = system.create_render_target(
            "deferred_result",
            resolution,
            &[(RESULT, &result_texture)],
            None,
        )?;

        let camera_buffer = system.create_uniform_buffer(CameraBlock::SIZE)?;
        let camera_block = CameraBlock::identity();
        system.write_buffer(&camera_buffer, 0, camera_block.as_bytes())?;

        let dialect = shaders::ShaderDialect::for_backend(system.backend_kind());
        let lit = shaders::lit(dialect);
        let lit_shader = system.create_render_shader(&lit.vertex, &lit.fragment)?;
        let merge = shaders::merge(dialect, ambient, distance_falloff_scale);
        let merge_shader = system.create_render_shader(&merge.vertex, &merge.fragment)?;

        // The merge inputs never change, so its bind set is built once.
        let merge_bind_set = system.create_bind_set(
            &merge_shader,
            &[
                TextureBinding {
                    unit: 0,
                    texture: &albedo,
                    name: "u_Albedo",
                    sampling: Some(SamplerState::clamped_linear()),
                },
                TextureBinding {
                    unit: 1,
                    texture: &position,
                    name: "u_Position",
                    sampling: Some(SamplerState::clamped_nearest()),
                },
                TextureBinding {
                    unit: 2,
                    texture: &normal,
                    name: "u_Normal",
                    sampling: Some(SamplerState::clamped_nearest()),
                },
            ],
            &[],
        )?;

        Ok(Self {
            resolution,
            g_buffer,
            result_target,
            result_texture,
            camera_buffer,
            camera_block,
            lit_shader,
            merge_shader,
            merge_bind_set,
        })
    }

    #[must_use]
    pub fn resolution(&self) -> Extents2D {
        self.resolution
    }

    /// A G-buffer attachment texture by role label.
    pub fn texture(&self, label: &str) -> Result<&Texture> {
        self.g_buffer.texture(label)
    }

    /// The externally visible output of the merge pass.
    #[must_use]
    pub fn result(&self) -> &Texture {
        &self.result_texture
    }

    /// Runs the full Cleared -> GeometryPass(i) -> MergePass sequence.
    pub fn process(
        &mut self,
        system: &mut RenderSystem,
        objects: &[SceneObject],
        camera: &Camera,
    ) -> Result<()> {
        self.camera_block.set_camera(camera);

        // Cleared: all G-buffer colors to opaque black, depth to the far
        // value, and the result image to opaque black.
        {
            let mut renderer = system.renderer();
            renderer.switch_render_target(&TargetBinding {
                target: TargetRef::Offscreen(&self.result_target),
                clear_color: Some([0.0, 0.0, 0.0, 1.0]),
                clear_depth: None,
                enable_depth_test: false,
                output_attachments: None,
            })?;
            renderer.switch_render_target(&TargetBinding {
                target: TargetRef::Offscreen(&self.g_buffer),
                clear_color: Some([0.0, 0.0, 0.0, 1.0]),
                clear_depth: Some(1.0),
                enable_depth_test: true,
                output_attachments: None,
            })?;
        }

        // GeometryPass(i): depth accumulates occlusion across objects in
        // caller order. The camera block is rewritten per object; the
        // draw for object i is recorded before the rewrite for i + 1.
        for object in objects {
            self.camera_block.set_model(object.transform);
            system.write_buffer(&self.camera_buffer, 0, self.camera_block.as_bytes())?;

            let pass = ModelPass {
                model: &object.model,
                pipeline: PipelineBinding {
                    shader: &self.lit_shader,
                    bindings: Bindings::Inline {
                        textures: &[TextureBinding {
                            unit: 0,
                            texture: &object.texture,
                            name: "u_Texture",
                            sampling: None,
                        }],
                        uniforms: &[UniformBinding {
                            slot: 0,
                            buffer: &self.camera_buffer,
                            name: "CommonData",
                        }],
                    },
                },
            };
            system.renderer().render_to_target(
                &pass,
                &TargetBinding {
                    target: TargetRef::Offscreen(&self.g_buffer),
                    clear_color: None,
                    clear_depth: None,
                    enable_depth_test: true,
                    output_attachments: None,
                },
            )?;
        }

        // MergePass: one full-screen draw into the result image.
        let mut renderer = system.renderer();
        renderer.switch_render_target(&TargetBinding {
            target: TargetRef::Offscreen(&self.result_target),
            clear_color: None,
            clear_depth: None,
            enable_depth_test: false,
            output_attachments: None,
        })?;
        renderer.render_vertices(
            &PipelineBinding {
                shader: &self.merge_shader,
                bindings: Bindings::Set(&self.merge_bind_set),
            },
            FULLSCREEN_VERTEX_COUNT,
            0,
        )?;

        Ok(())
    }
}
