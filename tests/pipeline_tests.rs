//! Pipeline Integration Tests
//!
//! End-to-end tests that drive the deferred renderer and the effect chain
//! against a live device (the headless explicit-backend configuration):
//! - merge pass output against the CPU lighting reference
//! - ping-pong blur: aliasing rejection and energy spread
//! - rebind contract: applying a swapped effect without rebind fails
//!
//! All tests here are `#[ignore]`d because they need a working GPU
//! adapter; run them with `cargo test -- --ignored` on a machine that has
//! one. The pure-math mirrors of the same formulas run unconditionally in
//! `shading_tests` and `atmosphere_tests`.

use glam::{Mat4, Vec3};

use helios::engine::deferred::{self, merge_lighting};
use helios::engine::effects::{BlurChain, Downscale, GammaCorrection, ScreenSpaceEffect};
use helios::engine::{Camera, DeferredRenderer, SceneObject};
use helios::errors::HeliosError;
use helios::graphics::buffer::DataType;
use helios::graphics::system::{BackendRequest, RenderSystem, RenderSystemDescriptor};
use helios::graphics::texture::SamplerState;
use helios::graphics::{
    AttributeDescription, AttributeType, BufferLayout, Extents2D, Model, Texture, TextureFormat,
};

fn headless_system(resolution: Extents2D) -> RenderSystem {
    let _ = env_logger::builder().is_test(true).try_init();
    RenderSystem::new(RenderSystemDescriptor {
        backend: BackendRequest::WgpuHeadless,
        fallback: None,
        resolution,
    })
    .expect("headless device")
}

/// Interleaved position/uv/normal quad spanning [-1, 1]^2 at local z = 0,
/// normal facing -z (toward the origin once translated down +z).
fn unit_quad(system: &mut RenderSystem) -> Model {
    #[rustfmt::skip]
    let vertices: [f32; 32] = [
        // position          uv          normal
        -1.0, -1.0, 0.0,     0.0, 0.0,   0.0, 0.0, -1.0,
         1.0, -1.0, 0.0,     1.0, 0.0,   0.0, 0.0, -1.0,
         1.0,  1.0, 0.0,     1.0, 1.0,   0.0, 0.0, -1.0,
        -1.0,  1.0, 0.0,     0.0, 1.0,   0.0, 0.0, -1.0,
    ];
    let indices: [u32; 6] = [0, 1, 2, 2, 3, 0];

    let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
    let index_bytes: &[u8] = bytemuck::cast_slice(&indices);

    let vertex_buffer = system.create_vertex_buffer(vertex_bytes.len() as u64).unwrap();
    system.write_buffer(&vertex_buffer, 0, vertex_bytes).unwrap();
    let index_buffer = system.create_index_buffer(index_bytes.len() as u64).unwrap();
    system.write_buffer(&index_buffer, 0, index_bytes).unwrap();

    let layout = BufferLayout::new(
        32,
        vec![
            AttributeDescription::new(0, AttributeType::new(DataType::Float32, 3).unwrap(), 0),
            AttributeDescription::new(1, AttributeType::new(DataType::Float32, 2).unwrap(), 12),
            AttributeDescription::new(2, AttributeType::new(DataType::Float32, 3).unwrap(), 20),
        ],
    )
    .unwrap();

    system
        .create_model(vec![vertex_buffer], vec![layout], index_buffer, indices.len() as u32)
        .unwrap()
}

fn white_texture(system: &mut RenderSystem) -> Texture {
    let size = Extents2D::new(1, 1).unwrap();
    system
        .create_texture_with(
            size,
            Some(&[255, 255, 255, 255]),
            TextureFormat::Color8,
            SamplerState::clamped_nearest(),
            Some("white"),
        )
        .unwrap()
}

/// Center texel of a Color8 readback as normalized floats.
fn center_rgb8(data: &[u8], size: Extents2D) -> [f32; 3] {
    let index = ((size.height / 2) * size.width + size.width / 2) as usize * 4;
    [
        f32::from(data[index]) / 255.0,
        f32::from(data[index + 1]) / 255.0,
        f32::from(data[index + 2]) / 255.0,
    ]
}

/// Center texel of a ColorF32 readback.
fn center_rgbf32(data: &[u8], size: Extents2D) -> Vec3 {
    let index = ((size.height / 2) * size.width + size.width / 2) as usize * 16;
    let texel: &[f32] = bytemuck::cast_slice(&data[index..index + 16]);
    Vec3::new(texel[0], texel[1], texel[2])
}

// ============================================================================
// Merge pass against the CPU reference
// ============================================================================

#[test]
#[ignore = "requires a live GPU adapter"]
fn merge_pass_output_matches_lighting_reference() {
    let resolution = Extents2D::new(32, 32).unwrap();
    let mut system = headless_system(resolution);

    let ambient = 0.1;
    let falloff = 0.005;
    let mut renderer = DeferredRenderer::new(&mut system, resolution, ambient, falloff).unwrap();

    // A white quad 200 units down +z, facing the sun at the origin. The
    // scaled distance is exactly 1 at the axis, so the center texel is
    // diffuse * 0.9 * white.
    let model = unit_quad(&mut system);
    let texture = white_texture(&mut system);
    let objects = vec![SceneObject {
        model,
        transform: Mat4::from_translation(Vec3::new(0.0, 0.0, 200.0)),
        texture,
    }];
    let camera = Camera {
        projection: Mat4::orthographic_lh(-1.0, 1.0, -1.0, 1.0, 0.0, 400.0),
        view: Mat4::IDENTITY,
    };

    renderer.process(&mut system, &objects, &camera).unwrap();

    // Feed the rasterized world position back into the scalar formula so
    // the comparison is insensitive to pixel-center conventions.
    let position_texture = renderer.texture(deferred::POSITION).unwrap().clone();
    let position_data = system.read_texture(&position_texture).unwrap();
    let position = center_rgbf32(&position_data, resolution);
    assert!((position.z - 200.0).abs() < 1e-3, "rasterized position {position}");

    let result_texture = renderer.result().clone();
    let result_data = system.read_texture(&result_texture).unwrap();
    let result = center_rgb8(&result_data, resolution);

    let expected = merge_lighting(Vec3::ONE, position, Vec3::new(0.0, 0.0, -1.0), ambient, falloff);
    for (channel, reference) in result.iter().zip([expected.x, expected.y, expected.z]) {
        // One quantization step of headroom on top of the 8-bit rounding.
        assert!(
            (channel - reference.clamp(0.0, 1.0)).abs() < 2.0 / 255.0,
            "got {result:?}, expected {expected}"
        );
    }
}

// ============================================================================
// Ping-pong blur
// ============================================================================

#[test]
#[ignore = "requires a live GPU adapter"]
fn blur_chain_spreads_energy_and_never_aliases() {
    let resolution = Extents2D::new(16, 16).unwrap();
    let mut system = headless_system(resolution);

    // A single white texel in the center of a black image.
    let mut data = vec![0_u8; (resolution.texel_count() * 4) as usize];
    let center = ((resolution.height / 2) * resolution.width + resolution.width / 2) as usize * 4;
    data[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);
    let source = system
        .create_texture_with(
            resolution,
            Some(&data),
            TextureFormat::Color8,
            SamplerState::clamped_linear(),
            Some("impulse"),
        )
        .unwrap();

    let mut blur = BlurChain::new(&mut system, resolution, 3).unwrap();

    // Every apply() inside run() enforces input != output; three pairs
    // completing proves the invariant held through all six swaps.
    let output = blur.run(&mut system, &source).unwrap().clone();
    assert!(!output.same_resource(&source));

    let blurred = system.read_texture(&output).unwrap();
    let center_value = blurred[center];
    let neighbor = blurred[center + 4];
    assert!(center_value < 255, "center must lose energy, got {center_value}");
    assert!(neighbor > 0, "neighbors must gain energy");

    // Running the chain over its own output texture must be rejected.
    assert!(matches!(
        blur.run(&mut system, &output),
        Err(HeliosError::StaleBindSet { .. })
    ));
}

// ============================================================================
// Downscale
// ============================================================================

#[test]
#[ignore = "requires a live GPU adapter"]
fn downscale_resamples_to_the_output_resolution() {
    let full = Extents2D::new(8, 8).unwrap();
    let half = Extents2D::new(4, 4).unwrap();
    let mut system = headless_system(full);

    // A constant field survives linear resampling exactly.
    let data = vec![200_u8; (full.texel_count() * 4) as usize];
    let source = system
        .create_texture_with(
            full,
            Some(&data),
            TextureFormat::Color8,
            SamplerState::clamped_linear(),
            Some("downscale_in"),
        )
        .unwrap();
    let output = system
        .create_texture_with(
            half,
            None,
            TextureFormat::Color8,
            SamplerState::clamped_linear(),
            Some("downscale_out"),
        )
        .unwrap();

    let mut downscale = Downscale::new(&mut system, source, output).unwrap();
    downscale.apply(&mut system).unwrap();

    let result_texture = downscale.output().clone();
    assert_eq!(result_texture.size(), half);
    let result = system.read_texture(&result_texture).unwrap();
    assert_eq!(result.len(), (half.texel_count() * 4) as usize);
    for texel in result.chunks_exact(4) {
        assert_eq!(&texel[..3], &[200, 200, 200], "got {texel:?}");
    }
}

// ============================================================================
// Render-target attachment directory
// ============================================================================

#[test]
#[ignore = "requires a live GPU adapter"]
fn render_target_attachments_keep_declaration_order() {
    let resolution = Extents2D::new(8, 8).unwrap();
    let mut system = headless_system(resolution);

    let first = system
        .create_texture(resolution, None, TextureFormat::Color8)
        .unwrap();
    let second = system
        .create_texture(resolution, None, TextureFormat::ColorF32)
        .unwrap();

    let target = system
        .create_render_target(
            "ordered",
            resolution,
            &[("first", &first), ("second", &second)],
            None,
        )
        .unwrap();

    let attachments = target.color_attachments();
    assert_eq!(attachments[0].label, "first");
    assert_eq!(attachments[0].index, 0);
    assert_eq!(attachments[1].label, "second");
    assert_eq!(attachments[1].index, 1);
    assert!(target.texture("second").unwrap().same_resource(&second));
    assert!(matches!(
        target.texture("third"),
        Err(HeliosError::UnknownAttachment { .. })
    ));
}

// ============================================================================
// Rebind contract
// ============================================================================

#[test]
#[ignore = "requires a live GPU adapter"]
fn swapped_effect_fails_to_apply_until_rebound() {
    let resolution = Extents2D::new(8, 8).unwrap();
    let mut system = headless_system(resolution);

    let data = vec![128_u8; (resolution.texel_count() * 4) as usize];
    let make_texture = |system: &mut RenderSystem, label| {
        system
            .create_texture_with(
                resolution,
                Some(&data),
                TextureFormat::Color8,
                SamplerState::clamped_linear(),
                Some(label),
            )
            .unwrap()
    };
    let input = make_texture(&mut system, "gamma_in");
    let replacement = make_texture(&mut system, "gamma_in_2");
    let output = make_texture(&mut system, "gamma_out");

    let mut gamma = GammaCorrection::new(&mut system, input, output).unwrap();
    gamma.apply(&mut system).unwrap();

    gamma.set_input(replacement);
    assert!(matches!(
        gamma.apply(&mut system),
        Err(HeliosError::StaleBindSet { effect: "gamma_correction" })
    ));

    gamma.rebind(&mut system).unwrap();
    gamma.apply(&mut system).unwrap();
}
