//! Frame merger: pointwise per-channel combination of two images sampled
//! over the same UV footprint. Inputs of different resolutions (the
//! downscaled bloom contribution against the full-size base) are
//! resampled by the linear filter.

use crate::errors::{HeliosError, Result};
use crate::graphics::renderer::{Bindings, PipelineBinding, TargetBinding, TargetRef, TextureBinding};
use crate::graphics::shader::{BindSet, Shader};
use crate::graphics::system::RenderSystem;
use crate::graphics::texture::{SamplerState, Texture, TextureFormat};
use crate::shaders;

use super::{FULLSCREEN_VERTEX_COUNT, OutputTargets, ScreenSpaceEffect};

/// The per-channel operation applied to the two inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOperation {
    Add,
    Subtract,
}

impl MergeOperation {
    /// Infix operator symbol baked into the fragment program.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            MergeOperation::Add => "+",
            MergeOperation::Subtract => "-",
        }
    }

    /// CPU mirror of the merge, used by the unit tests.
    #[must_use]
    pub fn combine(self, a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        let mut out = [0.0; 3];
        for ((out, a), b) in out.iter_mut().zip(a).zip(b) {
            *out = match self {
                MergeOperation::Add => a + b,
                MergeOperation::Subtract => a - b,
            };
        }
        out
    }
}

pub struct FrameMerger {
    input_a: Texture,
    input_b: Texture,
    output: Texture,
    operation: MergeOperation,
    shader: Shader,
    bind_set: Option<BindSet>,
    targets: OutputTargets,
    dirty: bool,
}

impl FrameMerger {
    /// Builds a merger `output = a <op> b`. Without an explicit output
    /// texture, one is created at `input_a`'s size.
    pub fn new(
        system: &mut RenderSystem,
        input_a: Texture,
        input_b: Texture,
        operation: MergeOperation,
        output: Option<Texture>,
    ) -> Result<Self> {
        let output = match output {
            Some(output) => output,
            None => system.create_texture_with(
                input_a.size(),
                None,
                TextureFormat::Color8,
                SamplerState::clamped_linear(),
                Some("frame_merger"),
            )?,
        };

        let dialect = shaders::ShaderDialect::for_backend(system.backend_kind());
        let pair = shaders::merger(dialect, operation.symbol());
        let shader = system.create_render_shader(&pair.vertex, &pair.fragment)?;

        let mut effect = Self {
            input_a,
            input_b,
            output,
            operation,
            shader,
            bind_set: None,
            targets: OutputTargets::new("frame_merger"),
            dirty: true,
        };
        effect.rebind(system)?;
        Ok(effect)
    }

    pub fn set_input_a(&mut self, input: Texture) {
        self.input_a = input;
        self.dirty = true;
    }

    pub fn set_input_b(&mut self, input: Texture) {
        self.input_b = input;
        self.dirty = true;
    }

    #[must_use]
    pub fn operation(&self) -> MergeOperation {
        self.operation
    }

    #[must_use]
    pub fn output(&self) -> &Texture {
        &self.output
    }
}

impl ScreenSpaceEffect for FrameMerger {
    fn name(&self) -> &'static str {
        "frame_merger"
    }

    fn rebind(&mut self, system: &mut RenderSystem) -> Result<()> {
        if let Some(old) = self.bind_set.take() {
            system.destroy_bind_set(old)?;
        }
        self.bind_set = Some(system.create_bind_set(
            &self.shader,
            &[
                TextureBinding {
                    unit: 0,
                    texture: &self.input_a,
                    name: "u_Texture_A",
                    sampling: Some(SamplerState::clamped_linear()),
                },
                TextureBinding {
                    unit: 1,
                    texture: &self.input_b,
                    name: "u_Texture_B",
                    sampling: Some(SamplerState::clamped_linear()),
                },
            ],
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
