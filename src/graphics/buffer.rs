//! GPU buffers and vertex attribute layouts.
//!
//! A [`Buffer`] is created once with a fixed role and byte size and is
//! mutated only through whole or partial data overwrite; it is never
//! resized. A [`BufferLayout`] describes how vertex attributes are
//! interleaved inside a vertex buffer and is validated at construction so
//! that malformed layouts never reach a backend.

use crate::errors::{HeliosError, Result};
use crate::graphics::backend::BufferKey;

/// Scalar kind of a vertex attribute component. All supported kinds are
/// 32 bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Float32,
    Sint32,
    Uint32,
}

impl DataType {
    /// Byte width of one component.
    #[inline]
    #[must_use]
    pub fn byte_size(self) -> u32 {
        4
    }
}

/// Per-vertex-attribute wire format: scalar kind × component count (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeType {
    pub data_type: DataType,
    pub components: u32,
}

impl AttributeType {
    pub const FLOAT: Self = Self { data_type: DataType::Float32, components: 1 };
    pub const VEC2: Self = Self { data_type: DataType::Float32, components: 2 };
    pub const VEC3: Self = Self { data_type: DataType::Float32, components: 3 };
    pub const VEC4: Self = Self { data_type: DataType::Float32, components: 4 };

    pub const INT: Self = Self { data_type: DataType::Sint32, components: 1 };
    pub const IVEC2: Self = Self { data_type: DataType::Sint32, components: 2 };
    pub const IVEC3: Self = Self { data_type: DataType::Sint32, components: 3 };
    pub const IVEC4: Self = Self { data_type: DataType::Sint32, components: 4 };

    pub const UINT: Self = Self { data_type: DataType::Uint32, components: 1 };
    pub const UVEC2: Self = Self { data_type: DataType::Uint32, components: 2 };
    pub const UVEC3: Self = Self { data_type: DataType::Uint32, components: 3 };
    pub const UVEC4: Self = Self { data_type: DataType::Uint32, components: 4 };

    /// Builds an attribute type, rejecting component counts outside 1..=4.
    pub fn new(data_type: DataType, components: u32) -> Result<Self> {
        if !(1..=4).contains(&components) {
            return Err(HeliosError::ResourceCreation {
                what: "attribute type",
                detail: format!("component count must be 1..=4, got {components}"),
            });
        }
        Ok(Self { data_type, components })
    }

    /// Byte size of one attribute of this type.
    #[inline]
    #[must_use]
    pub fn byte_size(&self) -> u32 {
        self.data_type.byte_size() * self.components
    }
}

/// One attribute inside a [`BufferLayout`]: shader location, wire format,
/// and byte offset from the start of the vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeDescription {
    pub location: u32,
    pub ty: AttributeType,
    pub offset: u32,
}

impl AttributeDescription {
    #[must_use]
    pub fn new(location: u32, ty: AttributeType, offset: u32) -> Self {
        Self { location, ty, offset }
    }
}

/// Stride plus an ordered list of attributes describing one interleaved
/// vertex buffer.
///
/// Invariants enforced at construction:
/// - every attribute ends within the stride (`offset + size <= stride`)
/// - no two attributes overlap
/// - no two attributes share a shader location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferLayout {
    stride: u32,
    attributes: Vec<AttributeDescription>,
}

impl BufferLayout {
    pub fn new(stride: u32, attributes: Vec<AttributeDescription>) -> Result<Self> {
        for attr in &attributes {
            let end = attr.offset + attr.ty.byte_size();
            if end > stride {
                return Err(HeliosError::ResourceCreation {
                    what: "buffer layout",
                    detail: format!(
                        "attribute at location {} ends at byte {end}, past stride {stride}",
                        attr.location
                    ),
                });
            }
        }

        for (i, a) in attributes.iter().enumerate() {
            for b in &attributes[i + 1..] {
                if a.location == b.location {
                    return Err(HeliosError::ResourceCreation {
                        what: "buffer layout",
                        detail: format!("duplicate attribute location {}", a.location),
                    });
                }
                let a_end = a.offset + a.ty.byte_size();
                let b_end = b.offset + b.ty.byte_size();
                if a.offset < b_end && b.offset < a_end {
                    return Err(HeliosError::ResourceCreation {
                        what: "buffer layout",
                        detail: format!(
                            "attributes at locations {} and {} overlap",
                            a.location, b.location
                        ),
                    });
                }
            }
        }

        Ok(Self { stride, attributes })
    }

    #[inline]
    #[must_use]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[AttributeDescription] {
        &self.attributes
    }
}

/// Role a buffer plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

impl BufferKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BufferKind::Vertex => "vertex",
            BufferKind::Index => "index",
            BufferKind::Uniform => "uniform",
        }
    }
}

/// Handle to a backend-resident GPU buffer.
///
/// The handle is generation-stamped: once the buffer is destroyed, any
/// further use of a copy of this handle fails with
/// [`HeliosError::UseAfterFree`] instead of touching freed state.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub(crate) key: BufferKey,
    kind: BufferKind,
    size: u64,
}

impl Buffer {
    pub(crate) fn new(key: BufferKey, kind: BufferKind, size: u64) -> Self {
        Self { key, kind, size }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Fixed byte size chosen at creation.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }
}
