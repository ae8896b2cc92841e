//! Indexed models: vertex buffers, their layouts, and an index buffer.

use crate::errors::{HeliosError, Result};
use crate::graphics::backend::ModelKey;
use crate::graphics::buffer::{Buffer, BufferLayout};

/// Handle to a drawable indexed model.
///
/// A model pairs each vertex buffer with exactly one [`BufferLayout`]
/// (same length, 1:1, enforced at construction by the render system) plus
/// an index buffer and the number of indices to draw.
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) key: ModelKey,
    vertex_buffers: Vec<Buffer>,
    layouts: Vec<BufferLayout>,
    index_buffer: Buffer,
    vertex_count: u32,
}

impl Model {
    /// Checks the construction invariant: every vertex buffer is paired
    /// with exactly one layout.
    pub fn validate_pairing(vertex_buffer_count: usize, layout_count: usize) -> Result<()> {
        if vertex_buffer_count != layout_count {
            return Err(HeliosError::ResourceCreation {
                what: "model",
                detail: format!(
                    "{vertex_buffer_count} vertex buffers paired with {layout_count} layouts"
                ),
            });
        }
        Ok(())
    }

    pub(crate) fn new(
        key: ModelKey,
        vertex_buffers: Vec<Buffer>,
        layouts: Vec<BufferLayout>,
        index_buffer: Buffer,
        vertex_count: u32,
    ) -> Self {
        Self { key, vertex_buffers, layouts, index_buffer, vertex_count }
    }

    #[inline]
    #[must_use]
    pub fn vertex_buffers(&self) -> &[Buffer] {
        &self.vertex_buffers
    }

    #[inline]
    #[must_use]
    pub fn layouts(&self) -> &[BufferLayout] {
        &self.layouts
    }

    #[inline]
    #[must_use]
    pub fn index_buffer(&self) -> &Buffer {
        &self.index_buffer
    }

    /// Number of indices drawn by an indexed draw of this model.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}
