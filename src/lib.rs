#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Helios: a backend-agnostic deferred-shading renderer with a
//! composable screen-space effect chain.
//!
//! The engine renders a scene of textured objects (a sun and orbiting
//! bodies) through a G-buffer geometry stage and a full-screen lighting
//! merge, then pipes the result through atmosphere ray-marching, bloom
//! (light pass + separable blur + additive merge), gamma correction, and
//! a final blit to the presentable surface.
//!
//! Everything runs identically against two device backends with
//! different programming models: an explicit command-buffer backend
//! (wgpu) and an immediate-mode backend (OpenGL via glow).

pub mod engine;
pub mod errors;
pub mod graphics;
pub mod settings;
pub mod shaders;

pub use engine::{Camera, DeferredRenderer, LightSourceRenderer, Scene, SceneObject, SolarEngine};
pub use engine::effects::ScreenSpaceEffect;
pub use errors::{HeliosError, Result};
pub use graphics::{
    AttributeDescription, AttributeType, BackendKind, Buffer, BufferKind, BufferLayout, Extents2D,
    Model, RenderSystem, RenderTarget, Shader, Texture, TextureFormat,
};
pub use graphics::system::{BackendRequest, RenderSystemDescriptor};
pub use settings::EngineSettings;
