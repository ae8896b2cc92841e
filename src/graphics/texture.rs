//! 2D textures and sampler state.
//!
//! Textures come in four format roles: 8-bit color, sRGB color, 32-bit
//! float color (world positions and normals), and depth. Payload sizes are
//! validated against `width * height * bytes_per_texel` before any data
//! reaches a backend; a mismatch is a fatal input error, not a truncated
//! upload.

use crate::errors::{HeliosError, Result};
use crate::graphics::Extents2D;
use crate::graphics::backend::TextureKey;

/// Format role of a texture. Determines the texel byte width and whether
/// the texture is filterable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA color.
    Color8,
    /// 8-bit RGBA color with sRGB encoding.
    ColorSrgb,
    /// 32-bit float RGBA, used for world-space positions and normals.
    ColorF32,
    /// 32-bit float depth.
    Depth,
}

impl TextureFormat {
    /// Byte width of one texel in this format.
    #[inline]
    #[must_use]
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TextureFormat::Color8 | TextureFormat::ColorSrgb => 4,
            TextureFormat::ColorF32 => 16,
            TextureFormat::Depth => 4,
        }
    }

    /// Whether this format supports linear filtering on both backends.
    ///
    /// 32-bit float and depth formats must be sampled with nearest
    /// filtering and non-filtering samplers.
    #[inline]
    #[must_use]
    pub fn is_filterable(self) -> bool {
        matches!(self, TextureFormat::Color8 | TextureFormat::ColorSrgb)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TextureFormat::Color8 => "color8",
            TextureFormat::ColorSrgb => "color-srgb",
            TextureFormat::ColorF32 => "color-f32",
            TextureFormat::Depth => "depth",
        }
    }
}

/// Texture coordinate addressing outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

/// Minification/magnification filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Linear,
    Nearest,
}

/// Wrap and filter state attached to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerState {
    pub wrap_x: WrapMode,
    pub wrap_y: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl SamplerState {
    /// Linear filtering, clamp-to-edge addressing. The state used by the
    /// screen-space effects so edge taps do not wrap around.
    #[must_use]
    pub fn clamped_linear() -> Self {
        Self {
            wrap_x: WrapMode::ClampToEdge,
            wrap_y: WrapMode::ClampToEdge,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
        }
    }

    /// Nearest filtering, clamp-to-edge addressing, for non-filterable
    /// formats (float32 color, depth).
    #[must_use]
    pub fn clamped_nearest() -> Self {
        Self {
            wrap_x: WrapMode::ClampToEdge,
            wrap_y: WrapMode::ClampToEdge,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
        }
    }
}

/// Handle to a backend-resident 2D texture.
#[derive(Debug, Clone)]
pub struct Texture {
    pub(crate) key: TextureKey,
    size: Extents2D,
    format: TextureFormat,
}

impl Texture {
    pub(crate) fn new(key: TextureKey, size: Extents2D, format: TextureFormat) -> Self {
        Self { key, size, format }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> Extents2D {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Checks that `data_len` matches the exact payload size for a texture
    /// of `size` and `format`.
    ///
    /// A 4x4 `Color8` texture requires exactly 64 bytes; 63 or 65 bytes
    /// must fail.
    pub fn validate_data_size(size: Extents2D, format: TextureFormat, data_len: usize) -> Result<()> {
        let expected = size.texel_count() * u64::from(format.bytes_per_texel());
        if data_len as u64 != expected {
            return Err(HeliosError::ResourceCreation {
                what: "texture data",
                detail: format!(
                    "payload size does not match texture size: {data_len} != {expected} ({size}, {})",
                    format.name()
                ),
            });
        }
        Ok(())
    }

    /// Whether two textures reference the same backend resource.
    ///
    /// This is identity of the underlying GPU object, not content equality;
    /// it is what the ping-pong invariant (input != output) is checked
    /// against.
    #[inline]
    #[must_use]
    pub fn same_resource(&self, other: &Texture) -> bool {
        self.key == other.key
    }
}
