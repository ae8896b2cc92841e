//! Render targets: named color/depth attachments over a framebuffer-like
//! object.
//!
//! A [`RenderTarget`] owns an ordered label -> attachment map. Color
//! attachments get ascending slot indices in declaration order; at most one
//! depth attachment may be present. Attachment completeness is validated by
//! the backend at construction — an attachment set the device cannot bind
//! fails with [`FramebufferIncomplete`](crate::errors::HeliosError::FramebufferIncomplete)
//! instead of producing a half-usable target.

use crate::errors::{HeliosError, Result};
use crate::graphics::Extents2D;
use crate::graphics::backend::TargetKey;
use crate::graphics::texture::{Texture, TextureFormat};

/// One named attachment of a render target.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Label the attachment is addressed by in `output_attachments` subsets.
    pub label: String,
    /// Color slot index (declaration order). Depth attachments keep the
    /// index they would have had as the next color slot, mirroring how the
    /// attachment map is ordered.
    pub index: u32,
    pub texture: Texture,
    pub format: TextureFormat,
}

/// Handle to a backend-resident framebuffer-like object plus its attachment
/// directory.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub(crate) key: TargetKey,
    size: Extents2D,
    color_attachments: Vec<Attachment>,
    depth_attachment: Option<Attachment>,
}

impl RenderTarget {
    pub(crate) fn new(
        key: TargetKey,
        size: Extents2D,
        color_attachments: Vec<Attachment>,
        depth_attachment: Option<Attachment>,
    ) -> Self {
        Self { key, size, color_attachments, depth_attachment }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> Extents2D {
        self.size
    }

    /// Color attachments in declaration order.
    #[inline]
    #[must_use]
    pub fn color_attachments(&self) -> &[Attachment] {
        &self.color_attachments
    }

    #[inline]
    #[must_use]
    pub fn depth_attachment(&self) -> Option<&Attachment> {
        self.depth_attachment.as_ref()
    }

    /// Looks up an attachment (color or depth) by label.
    #[must_use]
    pub fn attachment(&self, label: &str) -> Option<&Attachment> {
        self.color_attachments
            .iter()
            .find(|a| a.label == label)
            .or_else(|| self.depth_attachment.as_ref().filter(|a| a.label == label))
    }

    /// Texture behind a labeled attachment.
    pub fn texture(&self, label: &str) -> Result<&Texture> {
        self.attachment(label)
            .map(|a| &a.texture)
            .ok_or_else(|| HeliosError::UnknownAttachment { label: label.to_owned() })
    }

    /// Resolves a set of color attachment labels to their slot indices,
    /// preserving the caller's ordering.
    pub(crate) fn resolve_output_attachments(&self, labels: &[&str]) -> Result<Vec<u32>> {
        labels
            .iter()
            .map(|label| {
                self.color_attachments
                    .iter()
                    .find(|a| a.label == *label)
                    .map(|a| a.index)
                    .ok_or_else(|| HeliosError::UnknownAttachment { label: (*label).to_owned() })
            })
            .collect()
    }
}
