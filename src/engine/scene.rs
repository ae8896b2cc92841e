//! Scene and camera data handed to the engine each frame, plus the
//! camera uniform block shared by the geometry passes.
//!
//! The orbital simulation producing these lives outside the engine; per
//! frame it supplies one list of regular objects and one list of
//! light-emitting objects, plus the camera matrices.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use crate::graphics::model::Model;
use crate::graphics::texture::Texture;

/// Camera matrices for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub projection: Mat4,
    pub view: Mat4,
}

impl Camera {
    /// Inverse view-projection, used by the atmosphere pass to
    /// reconstruct world-space rays from screen coordinates.
    #[must_use]
    pub fn view_projection_inverse(&self) -> Mat4 {
        (self.projection * self.view).inverse()
    }
}

/// One drawable scene entry.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub model: Model,
    pub transform: Mat4,
    pub texture: Texture,
}

/// Everything the engine renders in one frame.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    /// Light-emitting objects, rendered by the light-source pass when the
    /// bloom path is enabled.
    pub light_sources: Vec<SceneObject>,
}

/// Inverse-transpose of the upper 3x3 of `model`, widened back to a
/// mat4. Transforms normals of non-uniformly scaled geometry correctly.
#[must_use]
pub fn normal_matrix(model: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(model).inverse().transpose())
}

/// The per-object uniform block of the geometry passes: four contiguous
/// column-major mat4s, re-uploaded before each object's draw call.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraBlock {
    projection: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}

impl CameraBlock {
    /// Byte size of the block: 4 x mat4x4<f32>.
    pub const SIZE: u64 = std::mem::size_of::<CameraBlock>() as u64;

    /// All four matrices start as identity.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            normal: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }

    pub fn set_camera(&mut self, camera: &Camera) {
        self.projection = camera.projection.to_cols_array_2d();
        self.view = camera.view.to_cols_array_2d();
    }

    /// Sets the model matrix and recomputes the normal matrix from it.
    pub fn set_model(&mut self, model: Mat4) {
        self.model = model.to_cols_array_2d();
        self.normal = normal_matrix(model).to_cols_array_2d();
    }

    /// The block as bytes for a uniform buffer upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    #[must_use]
    pub fn normal(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.normal)
    }
}

impl Default for CameraBlock {
    fn default() -> Self {
        Self::identity()
    }
}
