//! Pass execution against the currently bound render target.
//!
//! [`Renderer`] is a short-lived façade borrowed from the
//! [`RenderSystem`](crate::graphics::system::RenderSystem). It translates
//! the public handle types into backend keys, resolves attachment labels
//! to slot indices, and forwards to the active backend.
//!
//! The bound target is sticky: a draw issued without a preceding
//! `switch_render_target` targets whatever was bound last, and the very
//! first draw with nothing bound fails with
//! [`NoTargetBound`](crate::errors::HeliosError::NoTargetBound).

use smallvec::SmallVec;

use crate::errors::{HeliosError, Result};
use crate::graphics::backend::{
    self, BindingListDesc, GraphicsBackend, PipelineDesc, TargetBindingDesc, TargetSlot,
};
use crate::graphics::buffer::Buffer;
use crate::graphics::model::Model;
use crate::graphics::shader::{BindSet, Shader};
use crate::graphics::target::RenderTarget;
use crate::graphics::texture::{SamplerState, Texture};

/// Which render target a pass renders into.
#[derive(Clone, Copy)]
pub enum TargetRef<'a> {
    /// The default presentable surface.
    Surface,
    /// An offscreen render target.
    Offscreen(&'a RenderTarget),
}

/// Parameters of a `switch_render_target` call.
#[derive(Clone, Copy)]
pub struct TargetBinding<'a> {
    pub target: TargetRef<'a>,
    /// Clear the enabled color attachments to this value on bind; `None`
    /// keeps their contents.
    pub clear_color: Option<[f32; 4]>,
    /// Clear the depth attachment to this value on bind; `None` keeps it,
    /// which is how a pass depth-tests against geometry rendered earlier
    /// in the frame.
    pub clear_depth: Option<f32>,
    pub enable_depth_test: bool,
    /// Labels of the color attachments to enable as draw outputs, in
    /// order. `None` enables all of the target's color attachments in
    /// declaration order. The surface target takes no subsetting.
    pub output_attachments: Option<&'a [&'a str]>,
}

impl<'a> TargetBinding<'a> {
    /// Binding for an offscreen target with every attachment enabled and
    /// nothing cleared.
    #[must_use]
    pub fn load(target: &'a RenderTarget) -> Self {
        Self {
            target: TargetRef::Offscreen(target),
            clear_color: None,
            clear_depth: None,
            enable_depth_test: false,
            output_attachments: None,
        }
    }
}

/// A texture bound at an explicit unit. `name` is the sampler uniform the
/// immediate backend wires the unit to; the explicit backend maps the unit
/// through the shared numeric binding convention instead.
#[derive(Clone, Copy)]
pub struct TextureBinding<'a> {
    pub unit: u32,
    pub texture: &'a Texture,
    pub name: &'static str,
    /// Sampler accompanying the bind; `None` uses the texture's own state.
    pub sampling: Option<SamplerState>,
}

/// A uniform buffer bound at an explicit slot. `name` is the uniform block
/// name in the GLSL dialect.
#[derive(Clone, Copy)]
pub struct UniformBinding<'a> {
    pub slot: u32,
    pub buffer: &'a Buffer,
    pub name: &'static str,
}

/// Resource bindings for one draw.
#[derive(Clone, Copy)]
pub enum Bindings<'a> {
    /// Bindings resolved at draw time.
    Inline {
        textures: &'a [TextureBinding<'a>],
        uniforms: &'a [UniformBinding<'a>],
    },
    /// A precomputed bind set.
    Set(&'a BindSet),
}

/// Shader plus bindings for one draw.
#[derive(Clone, Copy)]
pub struct PipelineBinding<'a> {
    pub shader: &'a Shader,
    pub bindings: Bindings<'a>,
}

/// An indexed model draw bundle.
#[derive(Clone, Copy)]
pub struct ModelPass<'a> {
    pub model: &'a Model,
    pub pipeline: PipelineBinding<'a>,
}

/// Borrowing façade executing draw operations against the active backend.
pub struct Renderer<'a> {
    pub(crate) backend: &'a mut dyn GraphicsBackend,
}

impl Renderer<'_> {
    /// Clears the currently bound target's enabled color attachments (and
    /// depth, if requested).
    pub fn clear(&mut self, color: [f32; 4], depth: Option<f32>) -> Result<()> {
        self.backend.clear(color, depth)
    }

    /// Binds a render target as current. With `output_attachments`, only
    /// the named subset of color attachments becomes draw outputs for
    /// subsequent draws, in the given order.
    pub fn switch_render_target(&mut self, binding: &TargetBinding<'_>) -> Result<()> {
        let (slot, outputs) = match binding.target {
            TargetRef::Surface => {
                if binding.output_attachments.is_some() {
                    return Err(HeliosError::ResourceCreation {
                        what: "target binding",
                        detail: "the surface target takes no attachment subset".to_owned(),
                    });
                }
                (TargetSlot::Surface, None)
            }
            TargetRef::Offscreen(target) => {
                let outputs = match binding.output_attachments {
                    Some(labels) => Some(target.resolve_output_attachments(labels)?),
                    None => None,
                };
                (TargetSlot::Offscreen(target.key), outputs)
            }
        };

        self.backend.bind_target(&TargetBindingDesc {
            target: slot,
            clear_color: binding.clear_color,
            clear_depth: binding.clear_depth,
            enable_depth_test: binding.enable_depth_test,
            output_attachments: outputs.as_deref(),
        })
    }

    /// Binds the shader and resources and issues a non-indexed draw.
    pub fn render_vertices(
        &mut self,
        pipeline: &PipelineBinding<'_>,
        vertex_count: u32,
        first_vertex: u32,
    ) -> Result<()> {
        with_pipeline_desc(pipeline, |desc| {
            self.backend.draw_vertices(&desc, vertex_count, first_vertex)
        })
    }

    /// Binds a model's vertex/index buffers plus the shader bundle,
    /// switches to the given target, and issues an indexed draw of the
    /// model's vertex count.
    pub fn render_to_target(
        &mut self,
        pass: &ModelPass<'_>,
        target: &TargetBinding<'_>,
    ) -> Result<()> {
        self.switch_render_target(target)?;
        with_pipeline_desc(&pass.pipeline, |desc| {
            self.backend.draw_model(&desc, pass.model.key)
        })
    }
}

/// Lowers a public pipeline binding to backend keys and hands the borrowed
/// descriptor to `f`.
fn with_pipeline_desc<R>(
    pipeline: &PipelineBinding<'_>,
    f: impl FnOnce(PipelineDesc<'_>) -> R,
) -> R {
    match pipeline.bindings {
        Bindings::Inline { textures, uniforms } => {
            let textures: SmallVec<[backend::TextureBindingDesc; 8]> = textures
                .iter()
                .map(|t| backend::TextureBindingDesc {
                    unit: t.unit,
                    texture: t.texture.key,
                    name: t.name,
                    sampling: t.sampling,
                })
                .collect();
            let uniforms: SmallVec<[backend::UniformBindingDesc; 4]> = uniforms
                .iter()
                .map(|u| backend::UniformBindingDesc {
                    slot: u.slot,
                    buffer: u.buffer.key,
                    name: u.name,
                })
                .collect();
            f(PipelineDesc {
                shader: pipeline.shader.key,
                bindings: BindingListDesc::Inline { textures: &textures, uniforms: &uniforms },
            })
        }
        Bindings::Set(set) => f(PipelineDesc {
            shader: pipeline.shader.key,
            bindings: BindingListDesc::Set(set.key),
        }),
    }
}
