//! Atmosphere Ray-March Tests
//!
//! Tests for the scalar mirror of the atmosphere fragment program:
//! - sphere_intersection: hit/miss/inside cases and the -1 miss sentinel
//! - linearize_depth: near/far endpoints
//! - density: ground and shell-top values, exponential falloff
//! - optical_depth: zero-length rays, vacuum rays
//! - scatter_light / trace: exact pass-through when the view ray misses
//!   the shell
//! - AtmosphereConstants: the canonical constant set these results were
//!   validated against (banding is sensitive to step count and shell
//!   thickness, so the defaults are pinned here)

use glam::Vec3;

use helios::engine::effects::raymarch::{
    density, linearize_depth, optical_depth, scatter_light, sphere_intersection, trace,
};
use helios::shaders::AtmosphereConstants;

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

// ============================================================================
// Sphere intersection
// ============================================================================

#[test]
fn ray_hits_unit_sphere_head_on() {
    let t = sphere_intersection(
        Vec3::new(0.0, 0.0, -2.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::ZERO,
        1.0,
    );
    assert!(approx(t, 1.0), "got {t}");
}

#[test]
fn ray_pointing_away_returns_miss_sentinel() {
    let t = sphere_intersection(
        Vec3::new(0.0, 0.0, -2.0),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::ZERO,
        1.0,
    );
    assert!(approx(t, -1.0));
}

#[test]
fn ray_missing_laterally_returns_miss_sentinel() {
    let t = sphere_intersection(
        Vec3::new(0.0, 2.0, -2.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::ZERO,
        1.0,
    );
    assert!(approx(t, -1.0));
}

#[test]
fn ray_from_inside_returns_exit_distance() {
    let t = sphere_intersection(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), Vec3::ZERO, 1.0);
    assert!(approx(t, 1.0), "got {t}");
}

#[test]
fn tangent_grazing_ray_reports_the_touch_point() {
    // Grazing the sphere at y = 1: the double root is at the tangent
    // point, 2 units down the ray.
    let t = sphere_intersection(
        Vec3::new(0.0, 1.0, -2.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::ZERO,
        1.0,
    );
    assert!(approx(t, 2.0), "got {t}");
}

// ============================================================================
// Depth linearization
// ============================================================================

#[test]
fn depth_endpoints_map_to_near_and_far() {
    let constants = AtmosphereConstants::default();
    assert!(approx(linearize_depth(&constants, 0.0), constants.z_near));
    assert!(approx(linearize_depth(&constants, 1.0), constants.z_far));
}

#[test]
fn depth_linearization_is_monotonic() {
    let constants = AtmosphereConstants::default();
    let mut previous = 0.0;
    for step in 0..=10 {
        let linear = linearize_depth(&constants, step as f32 / 10.0);
        assert!(linear > previous);
        previous = linear;
    }
}

// ============================================================================
// Density profile
// ============================================================================

#[test]
fn density_is_one_at_ground_level() {
    let constants = AtmosphereConstants::default();
    let ground = Vec3::from(constants.planet_center)
        + Vec3::new(constants.planet_radius, 0.0, 0.0);
    assert!(approx(density(&constants, ground), 1.0));
}

#[test]
fn density_vanishes_at_the_shell_top() {
    let constants = AtmosphereConstants::default();
    let top = Vec3::from(constants.planet_center)
        + Vec3::new(constants.shell_radius(), 0.0, 0.0);
    assert!(approx(density(&constants, top), 0.0));
}

#[test]
fn density_decreases_with_height_inside_the_shell() {
    let constants = AtmosphereConstants::default();
    let center = Vec3::from(constants.planet_center);
    let low = center + Vec3::new(constants.planet_radius + 0.2 * constants.shell_thickness, 0.0, 0.0);
    let high = center + Vec3::new(constants.planet_radius + 0.8 * constants.shell_thickness, 0.0, 0.0);
    assert!(density(&constants, low) > density(&constants, high));
}

// ============================================================================
// Optical depth
// ============================================================================

#[test]
fn optical_depth_of_zero_length_ray_is_zero() {
    let constants = AtmosphereConstants::default();
    let origin = Vec3::from(constants.planet_center)
        + Vec3::new(constants.planet_radius, 0.0, 0.0);
    assert!(approx(optical_depth(&constants, origin, Vec3::X, 0.0), 0.0));
}

#[test]
fn optical_depth_grows_with_path_length() {
    let constants = AtmosphereConstants::default();
    let origin = Vec3::from(constants.planet_center)
        + Vec3::new(constants.planet_radius, 0.0, 0.0);
    let short = optical_depth(&constants, origin, Vec3::X, 0.2 * constants.shell_thickness);
    let long = optical_depth(&constants, origin, Vec3::X, 0.8 * constants.shell_thickness);
    assert!(long > short);
    assert!(short > 0.0);
}

// ============================================================================
// Pass-through boundary
// ============================================================================

#[test]
fn trace_passes_base_color_through_when_the_ray_misses_the_shell() {
    // Camera at the origin looking directly away from the planet: the
    // intersection returns the negative sentinel and the base color must
    // come back exactly, not merely approximately.
    let constants = AtmosphereConstants::default();
    let base_color = Vec3::new(0.25, 0.5, 0.75);

    let ro = Vec3::ZERO;
    let rd = Vec3::new(0.0, 0.0, -1.0);
    assert!(
        sphere_intersection(ro, rd, Vec3::from(constants.planet_center), constants.shell_radius())
            < 0.0
    );

    let result = trace(&constants, ro, rd, base_color, Vec3::ZERO, 1.0);
    assert_eq!(result, base_color);
}

#[test]
fn trace_passes_through_when_geometry_occludes_the_shell() {
    // The ray would hit the shell, but the depth buffer says the surface
    // is closer than the entry point.
    let constants = AtmosphereConstants::default();
    let base_color = Vec3::splat(0.5);

    let ro = Vec3::ZERO;
    let rd = Vec3::new(0.0, 0.0, 1.0);
    let result = trace(&constants, ro, rd, base_color, Vec3::ZERO, 0.0);
    assert_eq!(result, base_color);
}

#[test]
fn trace_attenuates_when_the_ray_enters_the_shell() {
    // With a non-zero scatter strength, a ray through the shell must not
    // come back bit-identical to the base color.
    let constants = AtmosphereConstants {
        scatter_strength: 1.0,
        ..AtmosphereConstants::default()
    };
    let base_color = Vec3::splat(0.5);

    let ro = Vec3::ZERO;
    let rd = Vec3::new(0.0, 0.0, 1.0);
    assert!(
        sphere_intersection(ro, rd, Vec3::from(constants.planet_center), constants.shell_radius())
            > 0.0
    );

    let result = trace(&constants, ro, rd, base_color, Vec3::new(0.0, 0.0, 220.0), 1.0);
    assert_ne!(result, base_color);
}

// ============================================================================
// Scatter accumulation
// ============================================================================

#[test]
fn zero_scatter_strength_zeroes_the_coefficients() {
    let constants = AtmosphereConstants::default();
    assert_eq!(constants.scatter_coefficients(), [0.0, 0.0, 0.0]);
}

#[test]
fn scatter_coefficients_weight_short_wavelengths_harder() {
    let constants = AtmosphereConstants {
        scatter_strength: 1.0,
        ..AtmosphereConstants::default()
    };
    let [red, green, blue] = constants.scatter_coefficients();
    assert!(blue > green);
    assert!(green > red);
}

#[test]
fn scatter_light_in_vacuum_preserves_base_color() {
    // Far outside the shell the density is hugely negative-height, but a
    // zero sample distance integrates nothing.
    let constants = AtmosphereConstants::default();
    let base_color = Vec3::new(0.2, 0.4, 0.6);
    let result = scatter_light(
        &constants,
        Vec3::new(0.0, 0.0, 100.0),
        Vec3::Z,
        0.0,
        base_color,
    );
    assert_eq!(result, base_color);
}

// ============================================================================
// Canonical constants
// ============================================================================

#[test]
fn canonical_constants_are_pinned() {
    let constants = AtmosphereConstants::default();
    assert_eq!(constants.planet_center, [0.0, 0.0, 214.833_904]);
    assert!(approx(constants.planet_radius, 9.259_292_42e-2));
    assert!(approx(constants.shell_thickness, 5.0e-3));
    assert_eq!(constants.step_count, 10);
    assert!(approx(constants.density_falloff, 1.0));
    assert_eq!(constants.wavelengths, [700.0, 530.0, 440.0]);
    assert!(approx(constants.scatter_strength, 0.0));
    assert!(approx(constants.z_near, 0.01));
    assert!(approx(constants.z_far, 10_000.0));
}
