//! Screen-space effect chain.
//!
//! Each effect is one full-screen two-triangle draw with a dedicated
//! fragment program: 1..N input textures, exactly one output. Effects are
//! stateful only in that they cache their output render target and a
//! precomputed bind set.
//!
//! # Rebind contract
//!
//! Swapping an effect's input or output texture (the blur chain does this
//! every iteration) marks the effect dirty. The pipeline driver must call
//! [`ScreenSpaceEffect::rebind`] before the next
//! [`ScreenSpaceEffect::apply`]; applying while dirty fails with
//! [`StaleBindSet`](crate::errors::HeliosError::StaleBindSet). A stale
//! bind set referencing a swapped texture would read the wrong image —
//! this is a correctness bug, not a performance detail, which is why the
//! rebuild is an explicit step instead of a setter side effect.

mod atmosphere;
mod blur;
mod downscale;
mod gamma;
mod merger;
mod to_screen;

pub use atmosphere::{Atmosphere, AtmosphereInputs, raymarch};
pub use blur::{Blur, BlurChain, BlurDirection, KERNEL};
pub use downscale::Downscale;
pub use gamma::{GammaCorrection, correct as gamma_correct};
pub use merger::{FrameMerger, MergeOperation};
pub use to_screen::ToScreen;

use crate::errors::{HeliosError, Result};
use crate::graphics::system::RenderSystem;
use crate::graphics::target::RenderTarget;
use crate::graphics::texture::Texture;

/// Vertices of the full-screen quad (two triangles).
pub const FULLSCREEN_VERTEX_COUNT: u32 = 6;

/// One node of the effect chain.
pub trait ScreenSpaceEffect {
    /// Stable name used in diagnostics and stale-bind-set errors.
    fn name(&self) -> &'static str;

    /// Rebuilds the bind set (and output target, if the output texture is
    /// new) after an input/output swap.
    fn rebind(&mut self, system: &mut RenderSystem) -> Result<()>;

    /// Runs the effect's full-screen draw. Fails if a swap happened since
    /// the last `rebind`.
    fn apply(&mut self, system: &mut RenderSystem) -> Result<()>;
}

/// Render targets for an effect's output textures, one per distinct
/// texture the effect has ever written to.
///
/// The blur chain alternates between two output textures every iteration;
/// caching the target per texture means the swap costs a bind-set rebuild
/// but never a framebuffer allocation.
pub(crate) struct OutputTargets {
    label: &'static str,
    targets: Vec<(Texture, RenderTarget)>,
}

impl OutputTargets {
    pub(crate) fn new(label: &'static str) -> Self {
        Self { label, targets: Vec::new() }
    }

    /// Ensures a target exists for `output` and returns it.
    pub(crate) fn ensure(
        &mut self,
        system: &mut RenderSystem,
        output: &Texture,
    ) -> Result<&RenderTarget> {
        let position = self.targets.iter().position(|(texture, _)| texture.same_resource(output));
        let index = match position {
            Some(index) => index,
            None => {
                let target = system.create_render_target(
                    self.label,
                    output.size(),
                    &[("output", output)],
                    None,
                )?;
                self.targets.push((output.clone(), target));
                self.targets.len() - 1
            }
        };
        Ok(&self.targets[index].1)
    }

    /// The already-built target for `output`; fails if `ensure` has not
    /// seen this texture (a missed rebind).
    pub(crate) fn get(&self, output: &Texture, effect: &'static str) -> Result<&RenderTarget> {
        self.targets
            .iter()
            .find(|(texture, _)| texture.same_resource(output))
            .map(|(_, target)| target)
            .ok_or(HeliosError::StaleBindSet { effect })
    }
}
