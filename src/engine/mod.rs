//! The engine driver: owns the render system and pipeline stages and
//! wires the per-frame data flow.
//!
//! ```text
//! objects + camera ─▶ deferred ─▶ (albedo, position, normal, depth, result)
//! light objects    ─▶ light pass ─▶ (color, light mask)       [shares depth]
//! mask/color ─▶ downscale ─▶ blur ping-pong ×N ─▶ bloom
//! result ─▶ atmosphere ─▶ merger(+bloom) ─▶ gamma ─▶ to-screen ─▶ surface
//! ```
//!
//! Execution is single-threaded and frame-stepped: one
//! [`SolarEngine::render`] call per display refresh, no overlap between
//! frames, no mid-frame abort path. A frame that errors stops rather than
//! presenting a partially-initialized image.

pub mod deferred;
pub mod effects;
pub mod light;
pub mod scene;

pub use deferred::DeferredRenderer;
pub use light::LightSourceRenderer;
pub use scene::{Camera, CameraBlock, Scene, SceneObject};

use crate::errors::Result;
use crate::graphics::system::RenderSystem;
use crate::graphics::texture::{SamplerState, Texture, TextureFormat};
use crate::graphics::{BackendKind, Extents2D};
use crate::settings::{BloomSource, EngineSettings};

use effects::{
    Atmosphere, AtmosphereInputs, BlurChain, Downscale, FrameMerger, GammaCorrection,
    MergeOperation, ScreenSpaceEffect, ToScreen,
};

/// The deferred renderer plus the screen-space effect chain, assembled
/// per the engine settings.
pub struct SolarEngine {
    system: RenderSystem,
    settings: EngineSettings,

    deferred: DeferredRenderer,
    light_renderer: Option<LightSourceRenderer>,
    downscale: Option<Downscale>,
    blur: Option<BlurChain>,
    bloom_merger: Option<FrameMerger>,
    atmosphere: Option<Atmosphere>,
    gamma: GammaCorrection,
    to_screen: ToScreen,
}

impl SolarEngine {
    /// Builds every pipeline stage up front; after this, rendering
    /// allocates no GPU resources beyond bind-set rebuilds.
    pub fn new(mut system: RenderSystem, settings: EngineSettings) -> Result<Self> {
        let resolution = settings.resolution;

        let deferred = DeferredRenderer::new(
            &mut system,
            resolution,
            settings.ambient,
            settings.distance_falloff_scale,
        )?;

        let mut chain_output: Texture = deferred.result().clone();

        let atmosphere = if settings.atmosphere.enabled {
            let inputs = AtmosphereInputs {
                color: chain_output.clone(),
                position: deferred.texture(deferred::POSITION)?.clone(),
                depth: deferred.texture(deferred::DEPTH)?.clone(),
            };
            let output = system.create_texture_with(
                resolution,
                None,
                TextureFormat::Color8,
                SamplerState::clamped_linear(),
                Some("atmosphere_output"),
            )?;
            let effect =
                Atmosphere::new(&mut system, inputs, output, settings.atmosphere.constants)?;
            chain_output = effect.output().clone();
            Some(effect)
        } else {
            None
        };

        let (light_renderer, downscale, blur, bloom_merger) = if settings.bloom.enabled {
            let depth = deferred.texture(deferred::DEPTH)?.clone();
            let light_renderer = LightSourceRenderer::new(&mut system, resolution, &depth)?;

            // The blur runs at a reduced resolution when a downscale
            // divisor is configured; the additive merge resamples the
            // result back up by UV.
            let divisor = settings.bloom.downscale.max(1);
            let (downscale, blur_resolution) = if divisor > 1 {
                let source = match settings.bloom.source {
                    BloomSource::LightMask => light_renderer.light_texture().clone(),
                    BloomSource::LightColor => light_renderer.color_texture().clone(),
                };
                let blur_resolution = Extents2D::new(
                    (resolution.width / divisor).max(1),
                    (resolution.height / divisor).max(1),
                )?;
                let output = system.create_texture_with(
                    blur_resolution,
                    None,
                    TextureFormat::Color8,
                    SamplerState::clamped_linear(),
                    Some("bloom_downscale"),
                )?;
                (Some(Downscale::new(&mut system, source, output)?), blur_resolution)
            } else {
                (None, resolution)
            };

            let blur = BlurChain::new(&mut system, blur_resolution, settings.bloom.iterations)?;
            // Additive composite of the blurred light contribution onto
            // the chain output.
            let merger = FrameMerger::new(
                &mut system,
                chain_output.clone(),
                blur.output().clone(),
                MergeOperation::Add,
                None,
            )?;
            chain_output = merger.output().clone();
            (Some(light_renderer), downscale, Some(blur), Some(merger))
        } else {
            (None, None, None, None)
        };

        let gamma_output = system.create_texture_with(
            resolution,
            None,
            TextureFormat::Color8,
            SamplerState::clamped_linear(),
            Some("gamma_output"),
        )?;
        let gamma = GammaCorrection::new(&mut system, chain_output, gamma_output)?;
        let to_screen = ToScreen::new(&mut system, gamma.output().clone())?;

        log::info!(
            "engine ready: {} @ {resolution} (atmosphere: {}, bloom: {})",
            system.renderer_info(),
            settings.atmosphere.enabled,
            settings.bloom.enabled
        );

        Ok(Self {
            system,
            settings,
            deferred,
            light_renderer,
            downscale,
            blur,
            bloom_merger,
            atmosphere,
            gamma,
            to_screen,
        })
    }

    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.system.backend_kind()
    }

    #[must_use]
    pub fn resolution(&self) -> Extents2D {
        self.settings.resolution
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The render system, for scene-side resource creation (models,
    /// textures) between frames.
    pub fn system(&mut self) -> &mut RenderSystem {
        &mut self.system
    }

    /// The deferred renderer's merge output (before post-processing).
    #[must_use]
    pub fn deferred_result(&self) -> &Texture {
        self.deferred.result()
    }

    /// Renders one frame and presents it. Driven externally, once per
    /// display refresh; the next frame must not start until this returns.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()> {
        self.system.begin_frame()?;

        self.deferred.process(&mut self.system, &scene.objects, camera)?;

        if let (Some(light_renderer), Some(blur)) = (&mut self.light_renderer, &mut self.blur) {
            light_renderer.process(&mut self.system, &scene.light_sources, camera)?;
            let source = match &mut self.downscale {
                Some(downscale) => {
                    downscale.apply(&mut self.system)?;
                    downscale.output().clone()
                }
                None => match self.settings.bloom.source {
                    BloomSource::LightMask => light_renderer.light_texture().clone(),
                    BloomSource::LightColor => light_renderer.color_texture().clone(),
                },
            };
            blur.run(&mut self.system, &source)?;
        }

        if let Some(atmosphere) = &mut self.atmosphere {
            atmosphere
                .set_view_projection_inverse(&mut self.system, camera.view_projection_inverse())?;
            atmosphere.apply(&mut self.system)?;
        }

        if let Some(merger) = &mut self.bloom_merger {
            merger.apply(&mut self.system)?;
        }

        self.gamma.apply(&mut self.system)?;
        self.to_screen.apply(&mut self.system)?;

        self.system.end_frame()
    }
}
