//! Shading Math Tests
//!
//! Tests for the CPU mirrors of the shader programs:
//! - merge_lighting: hand-computed lighting references, ambient handling
//! - CameraBlock: 256-byte layout, matrix offsets, normal-matrix refresh
//! - normal_matrix: inverse-transpose behavior under non-uniform scale
//! - gamma::correct: endpoints and monotonicity
//! - MergeOperation: subtract-then-add round trip
//! - blur::KERNEL: normalization of the full 9-tap footprint

use glam::{Mat4, Vec3};

use helios::engine::deferred::merge_lighting;
use helios::engine::effects::KERNEL;
use helios::engine::effects::MergeOperation;
use helios::engine::effects::gamma_correct;
use helios::engine::scene::{Camera, CameraBlock, normal_matrix};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
}

// ============================================================================
// Merge-pass lighting
// ============================================================================

#[test]
fn merge_lighting_matches_hand_computed_reference() {
    // A white surface 200 units out along +z, facing the camera. The
    // scaled distance is 200 * 0.005 = 1, so the inverse-square term is
    // exactly 1 and the result is diffuse * (1 - ambient) * albedo.
    let albedo = Vec3::ONE;
    let position = Vec3::new(0.0, 0.0, 200.0);
    let normal = Vec3::new(0.0, 0.0, -1.0);

    let lit = merge_lighting(albedo, position, normal, 0.1, 0.005);
    assert!(vec3_approx(lit, Vec3::splat(0.9)), "got {lit}");
}

#[test]
fn merge_lighting_scales_with_inverse_square_distance() {
    let albedo = Vec3::ONE;
    let normal = Vec3::new(0.0, 0.0, -1.0);

    let near = merge_lighting(albedo, Vec3::new(0.0, 0.0, 200.0), normal, 0.1, 0.005);
    let far = merge_lighting(albedo, Vec3::new(0.0, 0.0, 400.0), normal, 0.1, 0.005);

    // Doubling the distance quarters the light.
    assert!(vec3_approx(far * 4.0, near), "near {near}, far {far}");
}

#[test]
fn merge_lighting_clamps_back_facing_surfaces_to_zero() {
    // Normal pointing away from the light: dot < 0 clamps to zero.
    let lit = merge_lighting(
        Vec3::ONE,
        Vec3::new(0.0, 0.0, 200.0),
        Vec3::new(0.0, 0.0, 1.0),
        0.1,
        0.005,
    );
    assert!(vec3_approx(lit, Vec3::ZERO));
}

#[test]
fn merge_lighting_weights_by_incidence_angle() {
    // A surface tilted 60 degrees from the light direction receives
    // cos(60) = 0.5 of the head-on diffuse.
    let position = Vec3::new(0.0, 0.0, 200.0);
    let tilted = Vec3::new(0.0, (3.0_f32).sqrt() / 2.0, -0.5);

    let head_on = merge_lighting(Vec3::ONE, position, Vec3::new(0.0, 0.0, -1.0), 0.1, 0.005);
    let angled = merge_lighting(Vec3::ONE, position, tilted, 0.1, 0.005);
    assert!(vec3_approx(angled * 2.0, head_on));
}

#[test]
fn merge_lighting_ambient_reduces_output_linearly() {
    let position = Vec3::new(0.0, 0.0, 200.0);
    let normal = Vec3::new(0.0, 0.0, -1.0);

    let no_ambient = merge_lighting(Vec3::ONE, position, normal, 0.0, 0.005);
    let half_ambient = merge_lighting(Vec3::ONE, position, normal, 0.5, 0.005);

    assert!(vec3_approx(no_ambient, Vec3::ONE));
    assert!(vec3_approx(half_ambient, Vec3::splat(0.5)));
}

#[test]
fn merge_lighting_modulates_albedo_per_channel() {
    let albedo = Vec3::new(1.0, 0.5, 0.25);
    let lit = merge_lighting(
        albedo,
        Vec3::new(0.0, 0.0, 200.0),
        Vec3::new(0.0, 0.0, -1.0),
        0.1,
        0.005,
    );
    assert!(vec3_approx(lit, albedo * 0.9));
}

// ============================================================================
// Camera block
// ============================================================================

#[test]
fn camera_block_is_256_bytes() {
    assert_eq!(CameraBlock::SIZE, 256);
    assert_eq!(CameraBlock::identity().as_bytes().len(), 256);
}

#[test]
fn camera_block_lays_out_matrices_at_64_byte_offsets() {
    let projection = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    let view = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
    let model = Mat4::from_translation(Vec3::new(7.0, 8.0, 9.0));

    let mut block = CameraBlock::identity();
    block.set_camera(&Camera { projection, view });
    block.set_model(model);

    let bytes = block.as_bytes();
    let expect = |matrix: Mat4| -> Vec<u8> {
        bytemuck::cast_slice(&matrix.to_cols_array()).to_vec()
    };

    assert_eq!(&bytes[0..64], expect(projection).as_slice());
    assert_eq!(&bytes[64..128], expect(view).as_slice());
    assert_eq!(&bytes[128..192], expect(model).as_slice());
    // Translation has an identity upper 3x3, so its normal matrix is
    // identity.
    assert_eq!(&bytes[192..256], expect(Mat4::IDENTITY).as_slice());
}

#[test]
fn camera_block_refreshes_normal_matrix_on_model_change() {
    let mut block = CameraBlock::identity();
    block.set_model(Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)));

    let normal = block.normal();
    assert!(approx(normal.x_axis.x, 0.5));
    assert!(approx(normal.y_axis.y, 1.0));
    assert!(approx(normal.z_axis.z, 1.0));

    block.set_model(Mat4::IDENTITY);
    assert!(approx(block.normal().x_axis.x, 1.0));
}

#[test]
fn normal_matrix_is_inverse_transpose_of_upper_3x3() {
    let model = Mat4::from_scale(Vec3::new(2.0, 4.0, 8.0));
    let normal = normal_matrix(model);

    assert!(approx(normal.x_axis.x, 0.5));
    assert!(approx(normal.y_axis.y, 0.25));
    assert!(approx(normal.z_axis.z, 0.125));

    // Rotations are orthonormal; their normal matrix is the rotation
    // itself.
    let rotation = Mat4::from_rotation_y(1.1);
    let rotation_normal = normal_matrix(rotation);
    for (a, b) in rotation_normal
        .to_cols_array()
        .iter()
        .zip(rotation.to_cols_array())
    {
        assert!(approx(*a, b));
    }
}

// ============================================================================
// Gamma correction
// ============================================================================

#[test]
fn gamma_fixes_black_and_white() {
    assert_eq!(gamma_correct([0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
    let white = gamma_correct([1.0, 1.0, 1.0]);
    for channel in white {
        assert!(approx(channel, 1.0));
    }
}

#[test]
fn gamma_is_monotonic() {
    let mut previous = -1.0_f32;
    for step in 0..=100 {
        let value = step as f32 / 100.0;
        let [corrected, _, _] = gamma_correct([value, value, value]);
        assert!(corrected > previous, "gamma not monotonic at {value}");
        previous = corrected;
    }
}

#[test]
fn gamma_brightens_midtones() {
    let [corrected, _, _] = gamma_correct([0.5, 0.5, 0.5]);
    assert!(approx(corrected, 0.5_f32.powf(1.0 / 2.2)));
    assert!(corrected > 0.5);
}

// ============================================================================
// Frame merger
// ============================================================================

#[test]
fn merger_subtract_then_add_round_trips() {
    let a = [0.75, 0.5, 0.125];
    let b = [0.25, 0.25, 0.0625];

    let difference = MergeOperation::Subtract.combine(a, b);
    let reconstructed = MergeOperation::Add.combine(difference, b);

    for (lhs, rhs) in reconstructed.iter().zip(a) {
        assert!(approx(*lhs, rhs));
    }
}

#[test]
fn merger_add_is_commutative() {
    let a = [0.1, 0.2, 0.3];
    let b = [0.4, 0.5, 0.6];
    assert_eq!(MergeOperation::Add.combine(a, b), MergeOperation::Add.combine(b, a));
}

// ============================================================================
// Blur kernel
// ============================================================================

#[test]
fn blur_kernel_footprint_is_normalized() {
    // Center tap plus mirrored taps: k0 + 2 * (k1 + k2 + k3 + k4).
    let sum: f32 = KERNEL[0] + 2.0 * KERNEL[1..].iter().sum::<f32>();
    assert!((sum - 1.0).abs() < 1e-4, "kernel sums to {sum}");
}

#[test]
fn blur_kernel_weights_decrease_outward() {
    for pair in KERNEL.windows(2) {
        assert!(pair[0] > pair[1]);
    }
}
