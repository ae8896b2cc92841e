//! Atmosphere ray-marching effect.
//!
//! For each pixel, a world-space ray is reconstructed from the inverse
//! view-projection; the ray is intersected against an analytic planet +
//! atmosphere shell. If it enters the shell before the surface depth,
//! optical depth is integrated along the ray in a fixed step count and
//! in-scattered light accumulates with Rayleigh-style wavelength^-4
//! coefficients; the base color is attenuated by transmittance. A ray
//! that never enters the shell passes the base color through unchanged.
//!
//! This is the numerically delicate part of the chain: step count and
//! shell thickness materially affect banding, so the constants are pinned
//! by tests against [`raymarch`], the scalar CPU mirror of the fragment
//! program.

use glam::Mat4;

use crate::errors::{HeliosError, Result};
use crate::graphics::renderer::{
    Bindings, PipelineBinding, TargetBinding, TargetRef, TextureBinding, UniformBinding,
};
use crate::graphics::shader::{BindSet, Shader};
use crate::graphics::system::RenderSystem;
use crate::graphics::texture::{SamplerState, Texture};
use crate::graphics::Buffer;
use crate::shaders::{self, AtmosphereConstants};

use super::{FULLSCREEN_VERTEX_COUNT, OutputTargets, ScreenSpaceEffect};

/// Scalar implementation of the ray-march, kept in lockstep with the
/// fragment programs. The unit tests drive this.
pub mod raymarch {
    use glam::Vec3;

    use crate::shaders::AtmosphereConstants;

    /// Nearest positive ray/sphere intersection distance, or `-1.0` when
    /// the ray misses (the sentinel the pass-through path keys on).
    #[must_use]
    pub fn sphere_intersection(ro: Vec3, rd: Vec3, center: Vec3, radius: f32) -> f32 {
        let oc = ro - center;
        let a = rd.dot(rd);
        let b = 2.0 * oc.dot(rd);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;

        if discriminant < 0.0 {
            return -1.0;
        }

        let sq = discriminant.sqrt();
        let t1 = (-b + sq) / (2.0 * a);
        let t2 = (-b - sq) / (2.0 * a);
        if t2 > 0.0 {
            t2
        } else if t1 > 0.0 {
            t1
        } else {
            -1.0
        }
    }

    /// Depth-buffer value to eye-space distance.
    #[must_use]
    pub fn linearize_depth(constants: &AtmosphereConstants, d: f32) -> f32 {
        let (near, far) = (constants.z_near, constants.z_far);
        near * far / (far + d * (near - far))
    }

    /// Exponential falloff density at a sample point:
    /// `exp(-h * falloff) * (1 - h)` for h = normalized height above the
    /// inner sphere.
    #[must_use]
    pub fn density(constants: &AtmosphereConstants, sample_point: Vec3) -> f32 {
        let center = Vec3::from(constants.planet_center);
        let ground_height = (sample_point - center).length() - constants.planet_radius;
        let normalized_height = ground_height / constants.shell_thickness;
        (-normalized_height * constants.density_falloff).exp() * (1.0 - normalized_height)
    }

    /// Path integral of density along `rd` over `ray_length`, with the
    /// fixed step count.
    #[must_use]
    pub fn optical_depth(
        constants: &AtmosphereConstants,
        ro: Vec3,
        rd: Vec3,
        ray_length: f32,
    ) -> f32 {
        let increment = 1.0 / (constants.step_count as f32 - 1.0);
        let step = ray_length * increment;

        let mut sample_point = ro;
        let mut depth = 0.0;
        let mut f = 0.0;
        while f <= 1.0 {
            depth += density(constants, sample_point) * step;
            sample_point += rd * step;
            f += increment;
        }
        depth
    }

    /// In-scattered light accumulated along the view ray inside the
    /// shell, plus the transmittance-attenuated base color.
    #[must_use]
    pub fn scatter_light(
        constants: &AtmosphereConstants,
        origin: Vec3,
        direction: Vec3,
        sample_distance: f32,
        base_color: Vec3,
    ) -> Vec3 {
        let center = Vec3::from(constants.planet_center);
        let coefficients = Vec3::from(constants.scatter_coefficients());
        let increment = 1.0 / (constants.step_count as f32 - 1.0);
        let step_size = sample_distance * increment;

        let mut acc_light = Vec3::ZERO;
        let mut view_optical_depth = 0.0;
        let mut f = 0.0;
        while f <= 1.0 {
            let current_pos = origin + f * sample_distance * direction;
            let to_sun = (-current_pos).normalize();
            let to_sun_thickness =
                sphere_intersection(current_pos, to_sun, center, constants.shell_radius());
            let to_surface =
                sphere_intersection(current_pos, to_sun, center, constants.planet_radius);

            if to_surface < 0.0 {
                let sun_optical_depth =
                    optical_depth(constants, current_pos, to_sun, to_sun_thickness);
                let point_density = density(constants, current_pos);

                view_optical_depth =
                    optical_depth(constants, current_pos, -direction, f * sample_distance);

                let transmittance =
                    (-(sun_optical_depth + view_optical_depth) * coefficients).exp();

                acc_light += point_density * transmittance * step_size;
            }
            f += increment;
        }

        let base_color_transmittance = (-view_optical_depth).exp();
        base_color * base_color_transmittance + acc_light
    }

    /// Full per-pixel evaluation: pass-through when the view ray misses
    /// the shell or the surface is closer than the entry point.
    #[must_use]
    pub fn trace(
        constants: &AtmosphereConstants,
        ro: Vec3,
        rd: Vec3,
        base_color: Vec3,
        base_position: Vec3,
        base_depth: f32,
    ) -> Vec3 {
        let center = Vec3::from(constants.planet_center);
        let dist = sphere_intersection(ro, rd, center, constants.shell_radius());
        let lin_depth = linearize_depth(constants, base_depth);

        if dist > 0.0 && dist < lin_depth {
            let intersection = ro + rd * dist;
            let other_side_dist = sphere_intersection(
                intersection + rd * 0.0001,
                rd,
                center,
                constants.shell_radius(),
            );
            let sample_dist = (base_position - intersection).length().min(other_side_dist);
            scatter_light(constants, intersection, rd, sample_dist, base_color)
        } else {
            base_color
        }
    }
}

/// Input textures of the atmosphere pass. The depth texture gates the
/// march against scene geometry; the position texture bounds the sample
/// distance when geometry sits inside the shell.
#[derive(Clone)]
pub struct AtmosphereInputs {
    pub color: Texture,
    pub position: Texture,
    pub depth: Texture,
}

pub struct Atmosphere {
    inputs: AtmosphereInputs,
    output: Texture,
    constants: AtmosphereConstants,
    vp_inverse_buffer: Buffer,
    shader: Shader,
    bind_set: Option<BindSet>,
    targets: OutputTargets,
    dirty: bool,
}

impl Atmosphere {
    pub fn new(
        system: &mut RenderSystem,
        inputs: AtmosphereInputs,
        output: Texture,
        constants: AtmosphereConstants,
    ) -> Result<Self> {
        let dialect = shaders::ShaderDialect::for_backend(system.backend_kind());
        let pair = shaders::atmosphere(dialect, &constants);
        let shader = system.create_render_shader(&pair.vertex, &pair.fragment)?;

        let vp_inverse_buffer = system.create_uniform_buffer(64)?;
        system.write_buffer(
            &vp_inverse_buffer,
            0,
            bytemuck::cast_slice(&Mat4::IDENTITY.to_cols_array()),
        )?;

        let mut effect = Self {
            inputs,
            output,
            constants,
            vp_inverse_buffer,
            shader,
            bind_set: None,
            targets: OutputTargets::new("atmosphere"),
            dirty: true,
        };
        effect.rebind(system)?;
        Ok(effect)
    }

    /// Uploads this frame's inverse view-projection matrix.
    pub fn set_view_projection_inverse(
        &mut self,
        system: &mut RenderSystem,
        vp_inverse: Mat4,
    ) -> Result<()> {
        system.write_buffer(
            &self.vp_inverse_buffer,
            0,
            bytemuck::cast_slice(&vp_inverse.to_cols_array()),
        )
    }

    pub fn set_inputs(&mut self, inputs: AtmosphereInputs) {
        self.inputs = inputs;
        self.dirty = true;
    }

    pub fn set_output(&mut self, output: Texture) {
        self.output = output;
        self.dirty = true;
    }

    #[must_use]
    pub fn constants(&self) -> &AtmosphereConstants {
        &self.constants
    }

    #[must_use]
    pub fn output(&self) -> &Texture {
        &self.output
    }
}

impl ScreenSpaceEffect for Atmosphere {
    fn name(&self) -> &'static str {
        "atmosphere"
    }

    fn rebind(&mut self, system: &mut RenderSystem) -> Result<()> {
        if let Some(old) = self.bind_set.take() {
            system.destroy_bind_set(old)?;
        }
        self.bind_set = Some(system.create_bind_set(
            &self.shader,
            &[
                TextureBinding {
                    unit: 0,
                    texture: &self.inputs.color,
                    name: "u_Albedo",
                    sampling: Some(SamplerState::clamped_linear()),
                },
                TextureBinding {
                    unit: 1,
                    texture: &self.inputs.position,
                    name: "u_Position",
                    sampling: Some(SamplerState::clamped_nearest()),
                },
                TextureBinding {
                    unit: 2,
                    texture: &self.inputs.depth,
                    name: "u_Depth",
                    sampling: Some(SamplerState::clamped_nearest()),
                },
            ],
            &[UniformBinding { slot: 0, buffer: &self.vp_inverse_buffer, name: "Matrices" }],
        )?);
        self.targets.ensure(system, &self.output)?;
        self.dirty = false;
        Ok(())
    }

    fn apply(&mut self, system: &mut RenderSystem) -> Result<()> {
        if self.dirty {
            return Err(HeliosError::StaleBindSet { effect: self.name() });
        }
        let Some(bind_set) = &self.bind_set else {
            return Err(HeliosError::StaleBindSet { effect: self.name() });
        };
        let target = self.targets.get(&self.output, self.name())?;

        let mut renderer = system.renderer();
        renderer.switch_render_target(&TargetBinding {
            target: TargetRef::Offscreen(target),
            clear_color: Some([0.0, 0.0, 0.0, 1.0]),
            clear_depth: None,
            enable_depth_test: false,
            output_attachments: None,
        })?;
        renderer.render_vertices(
            &PipelineBinding { shader: &self.shader, bindings: Bindings::Set(bind_set) },
            FULLSCREEN_VERTEX_COUNT,
            0,
        )
    }
}
