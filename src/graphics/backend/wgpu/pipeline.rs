//! Pipeline, bind-group-layout, bind-group, and sampler caches.
//!
//! Render pipelines are created lazily from (shader, vertex layout,
//! attachment formats, depth state) and reused for the process lifetime.
//! Bind groups for inline bindings are cached by the generation-stamped
//! keys of the bound resources, so a ping-pong texture swap naturally maps
//! to a different cache entry while steady-state frames hit the cache.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;

use crate::graphics::backend::MAX_UNIFORM_SLOTS;
use crate::graphics::buffer::BufferLayout;
use crate::graphics::texture::SamplerState;

use super::convert;

/// Shape of bind group 0 for one draw: which uniform slots and texture
/// units are populated, and whether each texture is filterable.
///
/// Binding convention shared with the WGSL sources: uniform slot `s` is
/// `@binding(s)`; texture unit `u` is `@binding(8 + 2u)` with its sampler
/// at `@binding(8 + 2u + 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BindingSignature {
    pub uniform_slots: SmallVec<[u32; 4]>,
    /// `(unit, filterable)` pairs in binding order.
    pub texture_units: SmallVec<[(u32, bool); 8]>,
}

impl BindingSignature {
    pub fn layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        let mut entries = Vec::with_capacity(self.uniform_slots.len() + self.texture_units.len() * 2);

        for &slot in &self.uniform_slots {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        for &(unit, filterable) in &self.texture_units {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: texture_binding_index(unit),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: sampler_binding_index(unit),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(if filterable {
                    wgpu::SamplerBindingType::Filtering
                } else {
                    wgpu::SamplerBindingType::NonFiltering
                }),
                count: None,
            });
        }

        entries
    }
}

/// `@binding` index of the texture bound at `unit`.
#[inline]
pub fn texture_binding_index(unit: u32) -> u32 {
    MAX_UNIFORM_SLOTS + 2 * unit
}

/// `@binding` index of the sampler accompanying the texture at `unit`.
#[inline]
pub fn sampler_binding_index(unit: u32) -> u32 {
    MAX_UNIFORM_SLOTS + 2 * unit + 1
}

/// Full-state key of a render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    /// Raw generation-stamped shader key (slotmap ffi form).
    pub shader: u64,
    pub signature: BindingSignature,
    /// Hash over the model's vertex buffer layouts; 0 for vertex-less draws.
    pub vertex_layout_hash: u64,
    pub color_formats: SmallVec<[wgpu::TextureFormat; 8]>,
    /// Depth attachment format when depth testing is active.
    pub depth_format: Option<wgpu::TextureFormat>,
}

/// Key of a cached inline bind group: layout shape plus the identity of
/// every bound resource (and the sampler state it was bound with).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindGroupKey {
    pub signature: BindingSignature,
    pub resources: SmallVec<[u64; 16]>,
}

pub fn hash_vertex_layouts(layouts: &[BufferLayout]) -> u64 {
    let mut hasher = FxHasher::default();
    layouts.hash(&mut hasher);
    hasher.finish()
}

/// Owned vertex attribute arrays backing a `wgpu::VertexBufferLayout`.
pub struct OwnedVertexLayout {
    pub array_stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl OwnedVertexLayout {
    pub fn from_layout(layout: &BufferLayout) -> Self {
        let attributes = layout
            .attributes()
            .iter()
            .map(|attr| wgpu::VertexAttribute {
                format: convert::vertex_format(attr.ty),
                offset: u64::from(attr.offset),
                shader_location: attr.location,
            })
            .collect();
        Self { array_stride: u64::from(layout.stride()), attributes }
    }

    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

/// Central cache for pipelines, bind group layouts, bind groups, and
/// samplers. All entries live for the process lifetime.
#[derive(Default)]
pub struct PipelineCache {
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
    layouts: FxHashMap<BindingSignature, wgpu::BindGroupLayout>,
    bind_groups: FxHashMap<BindGroupKey, wgpu::BindGroup>,
    samplers: FxHashMap<(SamplerState, bool), wgpu::Sampler>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_group_layout(
        &mut self,
        device: &wgpu::Device,
        signature: &BindingSignature,
    ) -> wgpu::BindGroupLayout {
        if let Some(layout) = self.layouts.get(signature) {
            return layout.clone();
        }
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Helios BindGroupLayout"),
            entries: &signature.layout_entries(),
        });
        self.layouts.insert(signature.clone(), layout.clone());
        layout
    }

    /// Sampler for a sampler state, one instance per distinct state.
    /// Non-filterable bindings get their filters coerced to nearest.
    pub fn sampler(
        &mut self,
        device: &wgpu::Device,
        state: &SamplerState,
        filterable: bool,
    ) -> wgpu::Sampler {
        if let Some(sampler) = self.samplers.get(&(*state, filterable)) {
            return sampler.clone();
        }
        let sampler = device.create_sampler(&convert::sampler_descriptor(state, filterable));
        self.samplers.insert((*state, filterable), sampler.clone());
        sampler
    }

    pub fn cached_bind_group(&self, key: &BindGroupKey) -> Option<wgpu::BindGroup> {
        self.bind_groups.get(key).cloned()
    }

    pub fn insert_bind_group(&mut self, key: BindGroupKey, bind_group: wgpu::BindGroup) {
        self.bind_groups.insert(key, bind_group);
    }

    pub fn get_or_create_pipeline(
        &mut self,
        device: &wgpu::Device,
        key: &PipelineKey,
        module: &wgpu::ShaderModule,
        vertex_layouts: &[BufferLayout],
    ) -> wgpu::RenderPipeline {
        if let Some(pipeline) = self.pipelines.get(key) {
            return pipeline.clone();
        }

        let bind_group_layout = self.bind_group_layout(device, &key.signature);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Helios Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let owned: Vec<OwnedVertexLayout> =
            vertex_layouts.iter().map(OwnedVertexLayout::from_layout).collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> =
            owned.iter().map(OwnedVertexLayout::as_wgpu).collect();

        let targets: Vec<Option<wgpu::ColorTargetState>> = key
            .color_formats
            .iter()
            .map(|&format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let depth_stencil = key.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Helios Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vertex_main"),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fragment_main"),
                targets: &targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!(
            "created render pipeline: {} color target(s), depth {}",
            key.color_formats.len(),
            key.depth_format.is_some()
        );

        self.pipelines.insert(key.clone(), pipeline.clone());
        pipeline
    }
}
