//! Immediate-mode rasterization backend built on OpenGL via `glow`.
//!
//! State-setting calls execute directly against the context: binding a
//! framebuffer, selecting draw buffers, wiring texture units and uniform
//! block binding points, then issuing the draw. Nothing is batched — the
//! ordering of calls within a frame IS the submission order, which is why
//! a uniform buffer must not be rewritten for object `i + 1` until object
//! `i`'s draw call has been issued.
//!
//! The context is created and made current by the embedding application
//! (windowing is out of scope); the backend receives the loaded
//! [`glow::Context`] plus the default framebuffer size, and presentation
//! is the application's buffer swap after `end_frame` flushes.

mod backend;
mod convert;

pub use backend::GlBackend;
