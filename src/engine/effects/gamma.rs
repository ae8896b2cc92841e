//! Gamma correction: per-channel `pow(c, 1 / 2.2)`.

use crate::errors::{HeliosError, Result};
use crate::graphics::renderer::{Bindings, PipelineBinding, TargetBinding, TargetRef, TextureBinding};
use crate::graphics::shader::{BindSet, Shader};
use crate::graphics::system::RenderSystem;
use crate::graphics::texture::{SamplerState, Texture};
use crate::shaders;

use super::{FULLSCREEN_VERTEX_COUNT, OutputTargets, ScreenSpaceEffect};

/// Display-gamma exponent denominator.
pub const GAMMA: f32 = 2.2;

/// CPU mirror of the gamma program, used by the unit tests.
#[must_use]
pub fn correct(color: [f32; 3]) -> [f32; 3] {
    color.map(|c| c.powf(1.0 / GAMMA))
}

pub struct GammaCorrection {
    input: Texture,
    output: Texture,
    shader: Shader,
    bind_set: Option<BindSet>,
    targets: OutputTargets,
    dirty: bool,
}

impl GammaCorrection {
    pub fn new(system: &mut RenderSystem, input: Texture, output: Texture) -> Result<Self> {
        let dialect = shaders::ShaderDialect::for_backend(system.backend_kind());
        let pair = shaders::gamma(dialect);
        let shader = system.create_render_shader(&pair.vertex, &pair.fragment)?;

        let mut effect = Self {
            input,
            output,
            shader,
            bind_set: None,
            targets: OutputTargets::new("gamma_correction"),
            dirty: true,
        };
        effect.rebind(system)?;
        Ok(effect)
    }

    pub fn set_input(&mut self, input: Texture) {
        self.input = input;
        self.dirty = true;
    }

    pub fn set_output(&mut self, output: Texture) {
        self.output = output;
        self.dirty = true;
    }

    #[must_use]
    pub fn output(&self) -> &Texture {
        &self.output
    }
}

impl ScreenSpaceEffect for GammaCorrection {
    fn name(&self) -> &'static str {
        "gamma_correction"
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
        self.targets.ensure(system, &self.output)?;
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
        let target = self.targets.get(&self.output, self.name())?;

        let mut renderer = system.renderer();
        renderer.switch_render_target(&TargetBinding {
            target: TargetRef::Offscreen(target),
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
