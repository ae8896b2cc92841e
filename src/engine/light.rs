//! The light-source renderer.
//!
//! Structurally a second geometry stage with no merge pass: emissive
//! objects rasterize into a dedicated color attachment and a constant-one
//! light mask. The pass shares the main G-buffer's depth attachment and
//! loads it instead of clearing, so light geometry is depth-tested
//! against the scene geometry rendered earlier in the frame.
//!
//! Downstream, the blur and merge chain turns these attachments into a
//! bloom contribution.

use crate::errors::Result;
use crate::graphics::renderer::{
    Bindings, ModelPass, PipelineBinding, TargetBinding, TargetRef, TextureBinding, UniformBinding,
};
use crate::graphics::shader::Shader;
use crate::graphics::system::RenderSystem;
use crate::graphics::target::RenderTarget;
use crate::graphics::texture::{SamplerState, Texture, TextureFormat};
use crate::graphics::{Buffer, Extents2D};
use crate::shaders;

use super::scene::{Camera, CameraBlock, SceneObject};

/// Attachment labels of the light-source target.
pub const COLOR: &str = "color";
pub const LIGHT: &str = "light";

pub struct LightSourceRenderer {
    target: RenderTarget,
    color_texture: Texture,
    light_texture: Texture,

    camera_buffer: Buffer,
    camera_block: CameraBlock,

    light_shader: Shader,
}

impl LightSourceRenderer {
    /// Builds the color/mask attachments over the shared depth texture.
    pub fn new(
        system: &mut RenderSystem,
        resolution: Extents2D,
        depth_texture: &Texture,
    ) -> Result<Self> {
        let color_texture = system.create_texture_with(
            resolution,
            None,
            TextureFormat::Color8,
            SamplerState::clamped_linear(),
            Some(COLOR),
        )?;
        let light_texture = system.create_texture_with(
            resolution,
            None,
            TextureFormat::Color8,
            SamplerState::clamped_linear(),
            Some(LIGHT),
        )?;

        let target = system.create_render_target(
            "light_source",
            resolution,
            &[(COLOR, &color_texture), (LIGHT, &light_texture)],
            Some((super::deferred::DEPTH, depth_texture)),
        )?;

        let camera_buffer = system.create_uniform_buffer(CameraBlock::SIZE)?;
        let camera_block = CameraBlock::identity();
        system.write_buffer(&camera_buffer, 0, camera_block.as_bytes())?;

        let dialect = shaders::ShaderDialect::for_backend(system.backend_kind());
        let light = shaders::light(dialect);
        let light_shader = system.create_render_shader(&light.vertex, &light.fragment)?;

        Ok(Self { target, color_texture, light_texture, camera_buffer, camera_block, light_shader })
    }

    /// Emissive color of the light geometry.
    #[must_use]
    pub fn color_texture(&self) -> &Texture {
        &self.color_texture
    }

    /// Constant-one mask where light geometry is visible.
    #[must_use]
    pub fn light_texture(&self) -> &Texture {
        &self.light_texture
    }

    /// Rasterizes the light-emitting objects. Must run after the main
    /// geometry pass of the same frame so the shared depth buffer holds
    /// the scene's occlusion.
    pub fn process(
        &mut self,
        system: &mut RenderSystem,
        objects: &[SceneObject],
        camera: &Camera,
    ) -> Result<()> {
        self.camera_block.set_camera(camera);

        // Colors clear to opaque black; depth is loaded, not cleared.
        system.renderer().switch_render_target(&TargetBinding {
            target: TargetRef::Offscreen(&self.target),
            clear_color: Some([0.0, 0.0, 0.0, 1.0]),
            clear_depth: None,
            enable_depth_test: true,
            output_attachments: None,
        })?;

        for object in objects {
            self.camera_block.set_model(object.transform);
            system.write_buffer(&self.camera_buffer, 0, self.camera_block.as_bytes())?;

            let pass = ModelPass {
                model: &object.model,
                pipeline: PipelineBinding {
                    shader: &self.light_shader,
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
                    target: TargetRef::Offscreen(&self.target),
                    clear_color: None,
                    clear_depth: None,
                    enable_depth_test: true,
                    output_attachments: None,
                },
            )?;
        }

        Ok(())
    }
}
