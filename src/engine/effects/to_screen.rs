//! To-screen: samples the final chain texture into the presentable
//! surface. Always the terminal effect.

use crate::errors::{HeliosError, Result};
use crate::graphics::renderer::{Bindings, PipelineBinding, TargetBinding, TargetRef, TextureBinding};
use crate::graphics::shader::{BindSet, Shader};
use crate::graphics::system::RenderSystem;
use crate::graphics::texture::{SamplerState, Texture};
use crate::shaders;

use super::{FULLSCREEN_VERTEX_COUNT, ScreenSpaceEffect};

pub struct ToScreen {
    input: Texture,
    shader: Shader,
    bind_set: Option<BindSet>,
    dirty: bool,
}

impl ToScreen {
    pub fn new(system: &mut RenderSystem, input: Texture) -> Result<Self> {
        let dialect = shaders::ShaderDialect::for_backend(system.backend_kind());
        let pair = shaders::to_screen(dialect);
        let shader = system.create_render_shader(&pair.vertex, &pair.fragment)?;

        let mut effect = Self { input, shader, bind_set: None, dirty: true };
        effect.rebind(system)?;
        Ok(effect)
    }

    pub fn set_input(&mut self, input: Texture) {
        self.input = input;
        self.dirty = true;
    }
}

impl ScreenSpaceEffect for ToScreen {
    fn name(&self) -> &'static str {
        "to_screen"
    }

    fn rebind(&mut self, system: &mut RenderSystem) -> Result<()> {
        if let Some(old) = self.bind_set.take() {
            system.destroy_bind_set(old)?;
        }
        self.bind_set = Some(system.create_bind_set(
            &self.shader,
            &[TextureBinding {
                unit: 0,
                texture: &self.input,
                name: "u_Texture",
                sampling: Some(SamplerState::clamped_linear()),
            }],
            &[],
        )?);
        self.dirty = false;
        Ok(())
    }

    fn apply(&mut self, system: &mut RenderSystem) -> Result<()> {
        if self.dirty {
            return Err(HeliosError::StaleBindSet { effect: self.name() });
        }
        let Some(bind_set) = &self.bind_set else {
            return Err(HeliosError::StaleBindSet { effect: self.name() });
        };

        let mut renderer = system.renderer();
        renderer.switch_render_target(&TargetBinding {
            target: TargetRef::Surface,
            clear_color: Some([0.0, 0.0, 0.0, 1.0]),
            clear_depth: None,
            enable_depth_test: false,
            output_attachments: None,
        })?;
        renderer.render_vertices(
            &PipelineBinding { shader: &self.shader, bindings: Bindings::Set(bind_set) },
            FULLSCREEN_VERTEX_COUNT,
            0,
        )
    }
}
