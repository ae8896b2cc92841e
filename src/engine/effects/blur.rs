//! Separable blur with ping-pong iteration.
//!
//! [`Blur`] is one direction (horizontal or vertical) of the separable
//! convolution; [`BlurChain`] owns the horizontal/vertical pair plus a
//! two-element ping-pong texture array and drives N iteration pairs,
//! swapping input/output references between iterations without ever
//! reallocating the textures. Every swap is followed by a `rebind` before
//! the next `apply`.

use crate::errors::{HeliosError, Result};
use crate::graphics::renderer::{Bindings, PipelineBinding, TargetBinding, TargetRef, TextureBinding};
use crate::graphics::shader::{BindSet, Shader};
use crate::graphics::system::RenderSystem;
use crate::graphics::texture::{SamplerState, Texture, TextureFormat};
use crate::graphics::Extents2D;
use crate::shaders;

use super::{FULLSCREEN_VERTEX_COUNT, OutputTargets, ScreenSpaceEffect};

/// Normalized 5-tap symmetric kernel of the convolution. Mirrored taps
/// reuse the same weight, so the full footprint is 9 texels.
pub const KERNEL: [f32; 5] = [0.227_027, 0.194_594_6, 0.121_621_6, 0.054_054, 0.016_216];

/// Convolution axis, baked into the fragment program as a unit UV step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurDirection {
    Horizontal,
    Vertical,
}

impl BlurDirection {
    #[must_use]
    pub fn vector(self) -> (f32, f32) {
        match self {
            BlurDirection::Horizontal => (1.0, 0.0),
            BlurDirection::Vertical => (0.0, 1.0),
        }
    }
}

/// One direction of the separable blur. Edge taps use clamp-to-edge
/// addressing.
pub struct Blur {
    direction: BlurDirection,
    input: Texture,
    output: Texture,
    shader: Shader,
    bind_set: Option<BindSet>,
    targets: OutputTargets,
    dirty: bool,
}

impl Blur {
    pub fn new(
        system: &mut RenderSystem,
        direction: BlurDirection,
        input: Texture,
        output: Texture,
    ) -> Result<Self> {
        let dialect = shaders::ShaderDialect::for_backend(system.backend_kind());
        let resolution = output.size();
        let pair = shaders::blur(
            dialect,
            direction.vector(),
            (resolution.width, resolution.height),
        );
        let shader = system.create_render_shader(&pair.vertex, &pair.fragment)?;

        let mut effect = Self {
            direction,
            input,
            output,
            shader,
            bind_set: None,
            targets: OutputTargets::new("blur"),
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
    pub fn direction(&self) -> BlurDirection {
        self.direction
    }

    #[must_use]
    pub fn input(&self) -> &Texture {
        &self.input
    }

    #[must_use]
    pub fn output(&self) -> &Texture {
        &self.output
    }
}

impl ScreenSpaceEffect for Blur {
    fn name(&self) -> &'static str {
        "blur"
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
        // No effect ever reads and writes the same texture in one apply.
        if self.input.same_resource(&self.output) {
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

/// Drives N horizontal+vertical iteration pairs over a two-element
/// ping-pong texture array.
pub struct BlurChain {
    horizontal: Blur,
    vertical: Blur,
    ping: Texture,
    pong: Texture,
    iterations: u32,
}

impl BlurChain {
    /// Allocates the ping-pong pair at `resolution` and builds both
    /// directions. `iterations` is the number of horizontal+vertical
    /// pairs per run.
    pub fn new(system: &mut RenderSystem, resolution: Extents2D, iterations: u32) -> Result<Self> {
        let ping = system.create_texture_with(
            resolution,
            None,
            TextureFormat::Color8,
            SamplerState::clamped_linear(),
            Some("blur_ping"),
        )?;
        let pong = system.create_texture_with(
            resolution,
            None,
            TextureFormat::Color8,
            SamplerState::clamped_linear(),
            Some("blur_pong"),
        )?;

        // Initial wiring matches the first iteration; `run` rewires and
        // rebinds as it goes.
        let horizontal = Blur::new(
            system,
            BlurDirection::Horizontal,
            pong.clone(),
            ping.clone(),
        )?;
        let vertical = Blur::new(system, BlurDirection::Vertical, ping.clone(), pong.clone())?;

        Ok(Self { horizontal, vertical, ping, pong, iterations })
    }

    /// The texture the final vertical pass writes to.
    #[must_use]
    pub fn output(&self) -> &Texture {
        &self.pong
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Runs the configured iteration pairs over `source` and returns the
    /// blurred result (always the pong texture).
    ///
    /// `source` must not alias either ping-pong texture.
    pub fn run(&mut self, system: &mut RenderSystem, source: &Texture) -> Result<&Texture> {
        if source.same_resource(&self.ping) || source.same_resource(&self.pong) {
            return Err(HeliosError::StaleBindSet { effect: "blur" });
        }

        let mut input = source.clone();
        for _ in 0..self.iterations.max(1) {
            self.horizontal.set_input(input.clone());
            self.horizontal.set_output(self.ping.clone());
            self.horizontal.rebind(system)?;
            self.horizontal.apply(system)?;

            self.vertical.set_input(self.ping.clone());
            self.vertical.set_output(self.pong.clone());
            self.vertical.rebind(system)?;
            self.vertical.apply(system)?;

            input = self.pong.clone();
        }

        Ok(&self.pong)
    }
}
