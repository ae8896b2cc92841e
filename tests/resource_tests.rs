//! Resource Layer Tests
//!
//! Tests for:
//! - Extents2D: non-zero dimension invariant, texel counts
//! - AttributeType: component-count bounds, byte sizes
//! - BufferLayout: stride bounds, overlap and duplicate-location rejection
//! - Texture::validate_data_size: exact payload-size matching per format
//! - Model::validate_pairing: one layout per vertex buffer
//! - Error display formatting

use helios::errors::HeliosError;
use helios::graphics::{
    AttributeDescription, AttributeType, BufferLayout, Extents2D, Model, Texture, TextureFormat,
};
use helios::graphics::buffer::DataType;
use helios::graphics::texture::{FilterMode, SamplerState, WrapMode};

// ============================================================================
// Extents2D
// ============================================================================

#[test]
fn extents_accepts_non_zero_dimensions() {
    let size = Extents2D::new(1280, 720).unwrap();
    assert_eq!(size.width, 1280);
    assert_eq!(size.height, 720);
    assert_eq!(size.texel_count(), 1280 * 720);
}

#[test]
fn extents_rejects_zero_width() {
    assert!(Extents2D::new(0, 720).is_err());
}

#[test]
fn extents_rejects_zero_height() {
    assert!(Extents2D::new(1280, 0).is_err());
}

// ============================================================================
// AttributeType
// ============================================================================

#[test]
fn attribute_type_accepts_component_counts_1_through_4() {
    for components in 1..=4 {
        let ty = AttributeType::new(DataType::Float32, components).unwrap();
        assert_eq!(ty.byte_size(), 4 * components);
    }
}

#[test]
fn attribute_type_rejects_zero_components() {
    assert!(AttributeType::new(DataType::Float32, 0).is_err());
}

#[test]
fn attribute_type_rejects_oversized_component_count() {
    assert!(AttributeType::new(DataType::Uint32, 5).is_err());
}

#[test]
fn attribute_type_constants_match_manual_construction() {
    assert_eq!(AttributeType::VEC3, AttributeType::new(DataType::Float32, 3).unwrap());
    assert_eq!(AttributeType::IVEC2, AttributeType::new(DataType::Sint32, 2).unwrap());
    assert_eq!(AttributeType::UVEC4, AttributeType::new(DataType::Uint32, 4).unwrap());
    assert_eq!(AttributeType::VEC3.byte_size(), 12);
}

// ============================================================================
// BufferLayout
// ============================================================================

/// The interleaved position/uv/normal layout the sphere meshes use.
fn standard_layout() -> BufferLayout {
    BufferLayout::new(
        (3 + 2 + 3) * 4,
        vec![
            AttributeDescription::new(0, AttributeType::VEC3, 0),
            AttributeDescription::new(1, AttributeType::VEC2, 12),
            AttributeDescription::new(2, AttributeType::VEC3, 20),
        ],
    )
    .unwrap()
}

#[test]
fn layout_accepts_interleaved_position_uv_normal() {
    let layout = standard_layout();
    assert_eq!(layout.stride(), 32);
    assert_eq!(layout.attributes().len(), 3);
}

#[test]
fn layout_rejects_attribute_past_stride() {
    // vec3 at offset 24 ends at byte 36 in a 32-byte stride.
    let result = BufferLayout::new(
        32,
        vec![AttributeDescription::new(0, AttributeType::VEC3, 24)],
    );
    assert!(result.is_err());
}

#[test]
fn layout_rejects_overlapping_attributes() {
    // vec3 at 0 covers bytes 0..12; vec2 at 8 covers 8..16.
    let result = BufferLayout::new(
        32,
        vec![
            AttributeDescription::new(0, AttributeType::VEC3, 0),
            AttributeDescription::new(1, AttributeType::VEC2, 8),
        ],
    );
    assert!(result.is_err());
}

#[test]
fn layout_rejects_duplicate_locations() {
    let result = BufferLayout::new(
        32,
        vec![
            AttributeDescription::new(0, AttributeType::VEC3, 0),
            AttributeDescription::new(0, AttributeType::VEC2, 12),
        ],
    );
    assert!(result.is_err());
}

#[test]
fn layout_accepts_adjacent_attributes() {
    // vec2 at 12 ends exactly where vec3 at 0 ends + itself begins; no gap
    // and no overlap.
    let result = BufferLayout::new(
        20,
        vec![
            AttributeDescription::new(0, AttributeType::VEC3, 0),
            AttributeDescription::new(1, AttributeType::VEC2, 12),
        ],
    );
    assert!(result.is_ok());
}

// ============================================================================
// Texture payload validation
// ============================================================================

#[test]
fn texture_data_size_accepts_exact_color8_payload() {
    let size = Extents2D::new(4, 4).unwrap();
    assert!(Texture::validate_data_size(size, TextureFormat::Color8, 64).is_ok());
}

#[test]
fn texture_data_size_rejects_one_byte_short() {
    let size = Extents2D::new(4, 4).unwrap();
    assert!(Texture::validate_data_size(size, TextureFormat::Color8, 63).is_err());
}

#[test]
fn texture_data_size_rejects_one_byte_long() {
    let size = Extents2D::new(4, 4).unwrap();
    assert!(Texture::validate_data_size(size, TextureFormat::Color8, 65).is_err());
}

#[test]
fn texture_data_size_scales_with_format() {
    let size = Extents2D::new(4, 4).unwrap();
    // 16 bytes per texel for rgba32float.
    assert!(Texture::validate_data_size(size, TextureFormat::ColorF32, 256).is_ok());
    assert!(Texture::validate_data_size(size, TextureFormat::ColorF32, 64).is_err());
    // 4 bytes per texel for depth32float.
    assert!(Texture::validate_data_size(size, TextureFormat::Depth, 64).is_ok());
    // sRGB has the same texel width as plain color.
    assert!(Texture::validate_data_size(size, TextureFormat::ColorSrgb, 64).is_ok());
}

#[test]
fn float_formats_are_not_filterable() {
    assert!(TextureFormat::Color8.is_filterable());
    assert!(TextureFormat::ColorSrgb.is_filterable());
    assert!(!TextureFormat::ColorF32.is_filterable());
    assert!(!TextureFormat::Depth.is_filterable());
}

#[test]
fn sampler_presets_clamp_to_edge() {
    let linear = SamplerState::clamped_linear();
    assert_eq!(linear.wrap_x, WrapMode::ClampToEdge);
    assert_eq!(linear.wrap_y, WrapMode::ClampToEdge);
    assert_eq!(linear.min_filter, FilterMode::Linear);

    let nearest = SamplerState::clamped_nearest();
    assert_eq!(nearest.mag_filter, FilterMode::Nearest);
}

// ============================================================================
// Model pairing invariant
// ============================================================================

#[test]
fn model_pairing_accepts_matching_counts() {
    assert!(Model::validate_pairing(1, 1).is_ok());
    assert!(Model::validate_pairing(2, 2).is_ok());
}

#[test]
fn model_pairing_rejects_mismatched_counts() {
    // 2 vertex buffers with 1 layout must fail.
    assert!(Model::validate_pairing(2, 1).is_err());
    assert!(Model::validate_pairing(0, 1).is_err());
}

// ============================================================================
// Error formatting
// ============================================================================

#[test]
fn errors_carry_the_offending_value() {
    let error = Texture::validate_data_size(
        Extents2D::new(4, 4).unwrap(),
        TextureFormat::Color8,
        63,
    )
    .unwrap_err();
    let message = error.to_string();
    assert!(message.contains("63"), "message was: {message}");
    assert!(message.contains("64"), "message was: {message}");
}

#[test]
fn programming_errors_format_with_context() {
    let stale = HeliosError::StaleBindSet { effect: "blur" };
    assert!(stale.to_string().contains("blur"));

    let freed = HeliosError::UseAfterFree { resource: "texture" };
    assert!(freed.to_string().contains("texture"));

    assert_eq!(HeliosError::NoTargetBound.to_string(), "no render target bound");
}
