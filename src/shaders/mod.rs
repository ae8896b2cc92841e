//! Shader-source library.
//!
//! Opaque program text per backend dialect for each named pipeline: lit,
//! light, merge, atmosphere, blur, merger, gamma, downscale, to-screen.
//! The engine never parses these beyond the backend-reported compile/link
//! status.
//!
//! Sources with scene- or configuration-dependent constants (merge
//! lighting, atmosphere ray-march, blur direction) are produced by token
//! substitution over a template, the way the original pipelines baked the
//! values in at program-build time rather than uploading them as uniforms.
//!
//! # Binding conventions
//!
//! - WGSL: everything is in `@group(0)`. A uniform buffer at slot `s` is
//!   `@binding(s)`; the texture at unit `u` is `@binding(8 + 2u)` and its
//!   sampler `@binding(8 + 2u + 1)`.
//! - GLSL: sampler uniforms and `std140` uniform blocks are wired by name
//!   at draw time, so the names used in these sources are part of the
//!   contract with the binding lists the pipelines build.

pub mod glsl;
pub mod wgsl;

use crate::graphics::BackendKind;

/// Which source dialect a backend consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderDialect {
    Wgsl,
    Glsl,
}

impl ShaderDialect {
    #[must_use]
    pub fn for_backend(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Wgpu => ShaderDialect::Wgsl,
            BackendKind::Gl => ShaderDialect::Glsl,
        }
    }
}

/// A vertex/fragment source pair ready for `create_render_shader`.
#[derive(Debug, Clone)]
pub struct ShaderPair {
    pub vertex: String,
    pub fragment: String,
}

/// Scene constants of the atmosphere ray-march, baked into the fragment
/// program.
///
/// The canonical set; the step count is tunable within 10..=25. Banding is
/// sensitive to both the step count and the shell thickness, so tests pin
/// these exact defaults.
#[derive(Debug, Clone, Copy)]
pub struct AtmosphereConstants {
    /// World-space planet center.
    pub planet_center: [f32; 3],
    /// Inner (surface) sphere radius.
    pub planet_radius: f32,
    /// Shell thickness; the outer radius is `planet_radius + thickness`.
    pub shell_thickness: f32,
    /// Ray-march step count, 10..=25.
    pub step_count: u32,
    /// Exponential density falloff factor.
    pub density_falloff: f32,
    /// Per-channel scattering wavelengths in nanometers.
    pub wavelengths: [f32; 3],
    /// Global scatter coefficient scale; coefficients are
    /// `(400 / wavelength)^4 * strength`.
    pub scatter_strength: f32,
    /// Near plane used for depth linearization.
    pub z_near: f32,
    /// Far plane used for depth linearization.
    pub z_far: f32,
}

impl Default for AtmosphereConstants {
    fn default() -> Self {
        Self {
            planet_center: [0.0, 0.0, 214.833_904],
            planet_radius: 9.259_292_42e-2,
            shell_thickness: 5.0e-3,
            step_count: 10,
            density_falloff: 1.0,
            wavelengths: [700.0, 530.0, 440.0],
            scatter_strength: 0.0,
            z_near: 0.01,
            z_far: 10_000.0,
        }
    }
}

impl AtmosphereConstants {
    /// Outer shell radius.
    #[inline]
    #[must_use]
    pub fn shell_radius(&self) -> f32 {
        self.planet_radius + self.shell_thickness
    }

    /// Per-channel in-scattering coefficients, `(400 / wavelength)^4 *
    /// strength` (Rayleigh-style wavelength^-4 weighting).
    #[must_use]
    pub fn scatter_coefficients(&self) -> [f32; 3] {
        let mut coefficients = [0.0; 3];
        for (out, wavelength) in coefficients.iter_mut().zip(self.wavelengths) {
            *out = (400.0 / wavelength).powi(4) * self.scatter_strength;
        }
        coefficients
    }
}

/// Replaces `%TOKEN%` markers in a shader template.
fn substitute(template: &str, replacements: &[(&str, String)]) -> String {
    let mut source = template.to_owned();
    for (token, value) in replacements {
        source = source.replace(token, value);
    }
    debug_assert!(!source.contains('%'), "unsubstituted shader template token");
    source
}

/// Formats a float so it always parses as a floating literal in both
/// dialects.
fn float(value: f32) -> String {
    let formatted = format!("{value}");
    if formatted.contains('.') || formatted.contains('e') {
        formatted
    } else {
        format!("{formatted}.0")
    }
}

// ---------------------------------------------------------------------------
// Per-pipeline source selection
// ---------------------------------------------------------------------------

/// Geometry pass of the deferred renderer: rasterizes textured objects
/// into the albedo / world-position / world-normal attachments.
#[must_use]
pub fn lit(dialect: ShaderDialect) -> ShaderPair {
    match dialect {
        ShaderDialect::Wgsl => ShaderPair {
            vertex: wgsl::LIT_VERTEX.to_owned(),
            fragment: wgsl::LIT_FRAGMENT.to_owned(),
        },
        ShaderDialect::Glsl => ShaderPair {
            vertex: glsl::LIT_VERTEX.to_owned(),
            fragment: glsl::LIT_FRAGMENT.to_owned(),
        },
    }
}

/// Geometry pass of the light-source renderer: emissive color plus a
/// constant-one light mask.
#[must_use]
pub fn light(dialect: ShaderDialect) -> ShaderPair {
    match dialect {
        ShaderDialect::Wgsl => ShaderPair {
            vertex: wgsl::LIGHT_VERTEX.to_owned(),
            fragment: wgsl::LIGHT_FRAGMENT.to_owned(),
        },
        ShaderDialect::Glsl => ShaderPair {
            vertex: glsl::LIGHT_VERTEX.to_owned(),
            fragment: glsl::LIGHT_FRAGMENT.to_owned(),
        },
    }
}

/// Full-screen merge pass computing local lighting from the G-buffer.
///
/// `ambient` and `distance_falloff_scale` are baked into the program.
#[must_use]
pub fn merge(dialect: ShaderDialect, ambient: f32, distance_falloff_scale: f32) -> ShaderPair {
    let replacements = [
        ("%AMBIENT%", float(ambient)),
        ("%FALLOFF_SCALE%", float(distance_falloff_scale)),
    ];
    match dialect {
        ShaderDialect::Wgsl => ShaderPair {
            vertex: wgsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: substitute(wgsl::MERGE_FRAGMENT, &replacements),
        },
        ShaderDialect::Glsl => ShaderPair {
            vertex: glsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: substitute(glsl::MERGE_FRAGMENT, &replacements),
        },
    }
}

/// Atmosphere ray-march over the deferred result.
#[must_use]
pub fn atmosphere(dialect: ShaderDialect, constants: &AtmosphereConstants) -> ShaderPair {
    let [cx, cy, cz] = constants.planet_center;
    let step_count = constants.step_count.clamp(10, 25);
    let replacements = [
        ("%PLANET_X%", float(cx)),
        ("%PLANET_Y%", float(cy)),
        ("%PLANET_Z%", float(cz)),
        ("%PLANET_RADIUS%", float(constants.planet_radius)),
        ("%SHELL_THICKNESS%", float(constants.shell_thickness)),
        ("%STEP_COUNT%", float(step_count as f32)),
        ("%DENSITY_FALLOFF%", float(constants.density_falloff)),
        ("%WAVELENGTH_R%", float(constants.wavelengths[0])),
        ("%WAVELENGTH_G%", float(constants.wavelengths[1])),
        ("%WAVELENGTH_B%", float(constants.wavelengths[2])),
        ("%SCATTER_STRENGTH%", float(constants.scatter_strength)),
        ("%Z_NEAR%", float(constants.z_near)),
        ("%Z_FAR%", float(constants.z_far)),
    ];
    match dialect {
        ShaderDialect::Wgsl => ShaderPair {
            vertex: wgsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: substitute(wgsl::ATMOSPHERE_FRAGMENT, &replacements),
        },
        ShaderDialect::Glsl => ShaderPair {
            vertex: glsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: substitute(glsl::ATMOSPHERE_FRAGMENT, &replacements),
        },
    }
}

/// One direction of the separable blur. `direction` is a unit step in UV
/// space; `resolution` converts it to a one-texel step.
#[must_use]
pub fn blur(dialect: ShaderDialect, direction: (f32, f32), resolution: (u32, u32)) -> ShaderPair {
    let replacements = [
        ("%DIR_X%", float(direction.0)),
        ("%DIR_Y%", float(direction.1)),
        ("%WIDTH%", float(resolution.0 as f32)),
        ("%HEIGHT%", float(resolution.1 as f32)),
    ];
    match dialect {
        ShaderDialect::Wgsl => ShaderPair {
            vertex: wgsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: substitute(wgsl::BLUR_FRAGMENT, &replacements),
        },
        ShaderDialect::Glsl => ShaderPair {
            vertex: glsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: substitute(glsl::BLUR_FRAGMENT, &replacements),
        },
    }
}

/// Pointwise merge of two images; `operator` is the per-channel infix
/// operator, `+` or `-`.
#[must_use]
pub fn merger(dialect: ShaderDialect, operator: &str) -> ShaderPair {
    let replacements = [("%OPERATOR%", operator.to_owned())];
    match dialect {
        ShaderDialect::Wgsl => ShaderPair {
            vertex: wgsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: substitute(wgsl::MERGER_FRAGMENT, &replacements),
        },
        ShaderDialect::Glsl => ShaderPair {
            vertex: glsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: substitute(glsl::MERGER_FRAGMENT, &replacements),
        },
    }
}

/// Per-channel `pow(color, 1 / 2.2)`.
#[must_use]
pub fn gamma(dialect: ShaderDialect) -> ShaderPair {
    match dialect {
        ShaderDialect::Wgsl => ShaderPair {
            vertex: wgsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: wgsl::GAMMA_FRAGMENT.to_owned(),
        },
        ShaderDialect::Glsl => ShaderPair {
            vertex: glsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: glsl::GAMMA_FRAGMENT.to_owned(),
        },
    }
}

/// Resamples the input at the output resolution.
#[must_use]
pub fn downscale(dialect: ShaderDialect) -> ShaderPair {
    match dialect {
        ShaderDialect::Wgsl => ShaderPair {
            vertex: wgsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: wgsl::PASSTHROUGH_FRAGMENT.to_owned(),
        },
        ShaderDialect::Glsl => ShaderPair {
            vertex: glsl::FULLSCREEN_VERTEX.to_owned(),
            fragment: glsl::PASSTHROUGH_FRAGMENT.to_owned(),
        },
    }
}

/// Terminal blit into the presentable surface.
#[must_use]
pub fn to_screen(dialect: ShaderDialect) -> ShaderPair {
    // Same sampling program as downscale; the difference is the target.
    downscale(dialect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_always_parses_as_floating_literal() {
        assert_eq!(float(1.0), "1.0");
        assert_eq!(float(0.005), "0.005");
        assert_eq!(float(200.0), "200.0");
        // Shortest round-tripping digits of the f32 value.
        assert_eq!(float(214.833_904), "214.83391");
        assert_eq!(float(5e-8), "0.00000005");
    }

    #[test]
    fn test_substitute_replaces_every_marker() {
        let source = substitute(
            "x = %A% + %B%;",
            &[("%A%", float(1.0)), ("%B%", float(2.5))],
        );
        assert_eq!(source, "x = 1.0 + 2.5;");
    }

    #[test]
    fn test_dialect_follows_backend() {
        assert_eq!(ShaderDialect::for_backend(crate::graphics::BackendKind::Wgpu), ShaderDialect::Wgsl);
        assert_eq!(ShaderDialect::for_backend(crate::graphics::BackendKind::Gl), ShaderDialect::Glsl);
    }

    #[test]
    fn test_every_pipeline_builds_in_both_dialects() {
        let constants = AtmosphereConstants::default();
        for dialect in [ShaderDialect::Wgsl, ShaderDialect::Glsl] {
            let pairs = [
                lit(dialect),
                light(dialect),
                merge(dialect, 0.1, 0.005),
                atmosphere(dialect, &constants),
                blur(dialect, (1.0, 0.0), (1280, 720)),
                merger(dialect, "+"),
                gamma(dialect),
                downscale(dialect),
                to_screen(dialect),
            ];
            for pair in pairs {
                // No leftover template markers in any generated source.
                assert!(!pair.vertex.contains('%'));
                assert!(!pair.fragment.contains('%'));
                assert!(!pair.vertex.is_empty() && !pair.fragment.is_empty());
            }
        }
    }

    #[test]
    fn test_wgsl_sources_carry_both_entry_points() {
        let pair = merge(ShaderDialect::Wgsl, 0.1, 0.005);
        assert!(pair.vertex.contains("fn vertex_main"));
        assert!(pair.fragment.contains("fn fragment_main"));
    }

    #[test]
    fn test_merge_bakes_configured_constants() {
        let pair = merge(ShaderDialect::Glsl, 0.25, 0.125);
        assert!(pair.fragment.contains("0.25"));
        assert!(pair.fragment.contains("0.125"));
    }

    #[test]
    fn test_merger_bakes_the_operator() {
        let add = merger(ShaderDialect::Wgsl, "+");
        assert!(add.fragment.contains("a + b"));
        let subtract = merger(ShaderDialect::Glsl, "-");
        assert!(subtract.fragment.contains("a - b"));
    }

    #[test]
    fn test_atmosphere_clamps_step_count() {
        let constants = AtmosphereConstants { step_count: 100, ..AtmosphereConstants::default() };
        let pair = atmosphere(ShaderDialect::Wgsl, &constants);
        assert!(pair.fragment.contains("STEP_COUNT = 25.0"));
    }

    #[test]
    fn test_shell_radius_is_planet_plus_thickness() {
        let constants = AtmosphereConstants::default();
        let expected = constants.planet_radius + constants.shell_thickness;
        assert!((constants.shell_radius() - expected).abs() < f32::EPSILON);
    }
}
