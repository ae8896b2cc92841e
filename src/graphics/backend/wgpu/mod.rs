//! Explicit command-buffer backend built on `wgpu`.
//!
//! Every pass is recorded into a fresh command encoder and submitted to the
//! device queue; the caller never blocks on GPU completion. Per-draw
//! bindings are snapshotted into bind groups at record time, so rewriting a
//! uniform buffer after a draw has been recorded does not disturb that
//! draw — the hazard to avoid is rewriting after submit but before the next
//! record of a frame whose output is still being observed.
//!
//! Render pipelines and bind groups are cached (keyed by shader, vertex
//! layout, attachment formats, and bound resource generations) so steady-
//! state frames create no new GPU objects.

mod backend;
mod context;
mod convert;
mod pipeline;

pub use backend::WgpuBackend;
pub use context::WgpuContext;
