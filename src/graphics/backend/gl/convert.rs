//! Conversions from the backend-agnostic resource vocabulary to GL enums.

use crate::graphics::buffer::BufferKind;
use crate::graphics::texture::{FilterMode, TextureFormat, WrapMode};

/// `(internal_format, format, type)` triple for `tex_image_2d`.
pub fn texture_format(format: TextureFormat) -> (u32, u32, u32) {
    match format {
        TextureFormat::Color8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        TextureFormat::ColorSrgb => (glow::SRGB8_ALPHA8, glow::RGBA, glow::UNSIGNED_BYTE),
        TextureFormat::ColorF32 => (glow::RGBA32F, glow::RGBA, glow::FLOAT),
        TextureFormat::Depth => (glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT),
    }
}

pub fn buffer_target(kind: BufferKind) -> u32 {
    match kind {
        BufferKind::Vertex => glow::ARRAY_BUFFER,
        BufferKind::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferKind::Uniform => glow::UNIFORM_BUFFER,
    }
}

pub fn buffer_usage(kind: BufferKind) -> u32 {
    match kind {
        // Geometry is uploaded once; uniform blocks are rewritten per draw.
        BufferKind::Vertex | BufferKind::Index => glow::STATIC_DRAW,
        BufferKind::Uniform => glow::DYNAMIC_DRAW,
    }
}

pub fn wrap_mode(wrap: WrapMode) -> i32 {
    match wrap {
        WrapMode::Repeat => glow::REPEAT as i32,
        WrapMode::ClampToEdge => glow::CLAMP_TO_EDGE as i32,
    }
}

/// Filter enum, coerced to nearest for non-filterable formats.
pub fn filter_mode(filter: FilterMode, filterable: bool) -> i32 {
    match (filter, filterable) {
        (FilterMode::Linear, true) => glow::LINEAR as i32,
        _ => glow::NEAREST as i32,
    }
}
