//! Engine configuration.
//!
//! Plain data with workable defaults; construct with struct-update syntax:
//!
//! ```rust,ignore
//! use helios::settings::EngineSettings;
//!
//! let settings = EngineSettings {
//!     bloom: BloomSettings { enabled: true, ..Default::default() },
//!     ..Default::default()
//! };
//! ```

use crate::graphics::Extents2D;
use crate::shaders::AtmosphereConstants;

/// Which texture the bloom blur chain consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BloomSource {
    /// The light mask (1.0 where light geometry is visible): a white glow
    /// independent of the emissive surface color.
    #[default]
    LightMask,
    /// The emissive color attachment: a tinted glow.
    LightColor,
}

/// Bloom path configuration (light-source pass + downscale + blur +
/// additive merge).
#[derive(Debug, Clone, Copy)]
pub struct BloomSettings {
    pub enabled: bool,
    /// Number of horizontal+vertical blur iteration pairs.
    pub iterations: u32,
    /// Resolution divisor applied to the blur source before the chain
    /// runs; 1 skips the downscale pass and blurs at full resolution.
    pub downscale: u32,
    pub source: BloomSource,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self { enabled: false, iterations: 4, downscale: 2, source: BloomSource::default() }
    }
}

/// Atmosphere effect configuration.
#[derive(Debug, Clone, Copy)]
pub struct AtmosphereSettings {
    pub enabled: bool,
    /// Scene constants baked into the ray-march program.
    pub constants: AtmosphereConstants,
}

impl Default for AtmosphereSettings {
    fn default() -> Self {
        Self { enabled: true, constants: AtmosphereConstants::default() }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Internal render resolution. The to-screen pass resamples this to
    /// the surface size.
    pub resolution: Extents2D,
    /// Ambient light floor of the merge pass.
    pub ambient: f32,
    /// Scale applied to the light distance before the inverse-square
    /// falloff in the merge pass.
    pub distance_falloff_scale: f32,
    pub atmosphere: AtmosphereSettings,
    pub bloom: BloomSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            resolution: Extents2D { width: 1280, height: 720 },
            ambient: 0.1,
            distance_falloff_scale: 0.005,
            atmosphere: AtmosphereSettings::default(),
            bloom: BloomSettings::default(),
        }
    }
}
