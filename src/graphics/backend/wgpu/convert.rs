//! Conversions from the backend-agnostic resource vocabulary to wgpu enums.

use crate::graphics::buffer::{AttributeType, BufferKind, DataType};
use crate::graphics::texture::{FilterMode, SamplerState, TextureFormat, WrapMode};

pub fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Color8 => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::ColorSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::ColorF32 => wgpu::TextureFormat::Rgba32Float,
        TextureFormat::Depth => wgpu::TextureFormat::Depth32Float,
    }
}

pub fn buffer_usage(kind: BufferKind) -> wgpu::BufferUsages {
    let role = match kind {
        BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
        BufferKind::Index => wgpu::BufferUsages::INDEX,
        BufferKind::Uniform => wgpu::BufferUsages::UNIFORM,
    };
    role | wgpu::BufferUsages::COPY_DST
}

pub fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

pub fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Linear => wgpu::FilterMode::Linear,
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
    }
}

/// Sampler descriptor for a sampler state, coerced to nearest filtering
/// when the sampled format is not filterable.
pub fn sampler_descriptor(
    sampling: &SamplerState,
    filterable: bool,
) -> wgpu::SamplerDescriptor<'static> {
    let coerce = |filter: FilterMode| {
        if filterable {
            filter_mode(filter)
        } else {
            wgpu::FilterMode::Nearest
        }
    };
    wgpu::SamplerDescriptor {
        label: Some("Helios Sampler"),
        address_mode_u: address_mode(sampling.wrap_x),
        address_mode_v: address_mode(sampling.wrap_y),
        mag_filter: coerce(sampling.mag_filter),
        min_filter: coerce(sampling.min_filter),
        ..Default::default()
    }
}

pub fn vertex_format(ty: AttributeType) -> wgpu::VertexFormat {
    match (ty.data_type, ty.components) {
        (DataType::Float32, 1) => wgpu::VertexFormat::Float32,
        (DataType::Float32, 2) => wgpu::VertexFormat::Float32x2,
        (DataType::Float32, 3) => wgpu::VertexFormat::Float32x3,
        (DataType::Float32, 4) => wgpu::VertexFormat::Float32x4,
        (DataType::Sint32, 1) => wgpu::VertexFormat::Sint32,
        (DataType::Sint32, 2) => wgpu::VertexFormat::Sint32x2,
        (DataType::Sint32, 3) => wgpu::VertexFormat::Sint32x3,
        (DataType::Sint32, 4) => wgpu::VertexFormat::Sint32x4,
        (DataType::Uint32, 1) => wgpu::VertexFormat::Uint32,
        (DataType::Uint32, 2) => wgpu::VertexFormat::Uint32x2,
        (DataType::Uint32, 3) => wgpu::VertexFormat::Uint32x3,
        // Component counts are validated to 1..=4 at AttributeType
        // construction, so the only remaining case is (Uint32, 4).
        (DataType::Uint32, _) => wgpu::VertexFormat::Uint32x4,
    }
}

pub fn clear_color(color: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color[0]),
        g: f64::from(color[1]),
        b: f64::from(color[2]),
        a: f64::from(color[3]),
    }
}
