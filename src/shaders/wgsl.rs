//! WGSL sources for the explicit command-buffer backend.
//!
//! Vertex and fragment texts of one pipeline are concatenated into a
//! single module, so the interface structs (`VertexOutput` and friends)
//! are declared once in the vertex text and referenced by the fragment
//! text.
//!
//! Bindings follow the engine-wide numeric convention: uniform slot `s`
//! is `@binding(s)`, texture unit `u` is `@binding(8 + 2u)` with its
//! sampler at `@binding(8 + 2u + 1)`.

/// Shared full-screen-quad vertex stage used by the merge pass and every
/// screen-space effect.
pub const FULLSCREEN_VERTEX: &str = "
    const quad_positions = array(
        vec3f(-1.0, -1.0,  0.0),
        vec3f( 1.0, -1.0,  0.0),
        vec3f( 1.0,  1.0,  0.0),

        vec3f( 1.0,  1.0,  0.0),
        vec3f(-1.0,  1.0,  0.0),
        vec3f(-1.0, -1.0,  0.0)
    );

    const quad_uvs = array(
        vec2f(0.0, 1.0),
        vec2f(1.0, 1.0),
        vec2f(1.0, 0.0),

        vec2f(1.0, 0.0),
        vec2f(0.0, 0.0),
        vec2f(0.0, 1.0)
    );

    struct VertexOutput {
        @builtin(position) position: vec4f,
        @location(0) uv: vec2f
    }

    @vertex
    fn vertex_main(@builtin(vertex_index) index: u32) -> VertexOutput {

        var vs_out = VertexOutput();

        vs_out.position = vec4f(quad_positions[index], 1.0);
        vs_out.uv       = quad_uvs[index];

        return vs_out;
    }
";

/// Lit geometry pass, vertex stage: world-space position and normal out,
/// camera block at uniform slot 0.
pub const LIT_VERTEX: &str = "
    struct CommonData {
        projection: mat4x4f,
        view: mat4x4f,
        model: mat4x4f,
        normal: mat4x4f,
    }

    @group(0) @binding(0) var<uniform> u_common: CommonData;

    struct VertexInput {
        @location(0) position: vec3f,
        @location(1) uv: vec2f,
        @location(2) normal: vec3f
    }

    struct VertexOutput {
        @builtin(position) position: vec4f,
        @location(0) uv: vec2f,
        @location(1) normal: vec3f,
        @location(2) world_position: vec3f
    }

    @vertex
    fn vertex_main(vs_input: VertexInput) -> VertexOutput {

        let world_pos = u_common.model * vec4f(vs_input.position, 1.);

        var vs_out: VertexOutput;
        vs_out.world_position = world_pos.xyz;
        vs_out.position = u_common.projection * u_common.view * world_pos;
        vs_out.uv = vec2f(1. - vs_input.uv.x, vs_input.uv.y);
        vs_out.normal = (u_common.normal * vec4f(vs_input.normal, 0)).xyz;

        return vs_out;
    }
";

/// Lit geometry pass, fragment stage: writes albedo, world position, and
/// world normal into the first three G-buffer attachments.
pub const LIT_FRAGMENT: &str = "
    @group(0) @binding(8) var tex_surface: texture_2d<f32>;
    @group(0) @binding(9) var smp_surface: sampler;

    struct FragmentOutput {
        @location(0) color: vec4f,
        @location(1) world_position: vec4f,
        @location(2) normal: vec4f
    }

    @fragment
    fn fragment_main(fs_input: VertexOutput) -> FragmentOutput {

        var fs_out: FragmentOutput;

        fs_out.color          = textureSample(tex_surface, smp_surface, fs_input.uv);
        fs_out.world_position = vec4f(fs_input.world_position, 1.0);
        fs_out.normal         = vec4f(fs_input.normal, 1.0);

        return fs_out;
    }
";

/// Light-source geometry pass, vertex stage.
pub const LIGHT_VERTEX: &str = "
    struct CommonData {
        projection: mat4x4f,
        view: mat4x4f,
        model: mat4x4f,
        normal: mat4x4f,
    }

    @group(0) @binding(0) var<uniform> u_common: CommonData;

    struct VertexInput {
        @location(0) position: vec3f,
        @location(1) uv: vec2f,
        @location(2) normal: vec3f
    }

    struct VertexOutput {
        @builtin(position) position: vec4f,
        @location(0) uv: vec2f
    }

    @vertex
    fn vertex_main(vs_input: VertexInput) -> VertexOutput {

        var vs_out: VertexOutput;
        vs_out.position =
            u_common.projection * u_common.view * u_common.model * vec4f(vs_input.position, 1.);
        vs_out.uv = vec2f(1. - vs_input.uv.x, vs_input.uv.y);

        return vs_out;
    }
";

/// Light-source geometry pass, fragment stage: emissive color plus a
/// constant-one light mask.
pub const LIGHT_FRAGMENT: &str = "
    @group(0) @binding(8) var tex_surface: texture_2d<f32>;
    @group(0) @binding(9) var smp_surface: sampler;

    struct FragmentOutput {
        @location(0) color: vec4f,
        @location(1) light: vec4f
    }

    @fragment
    fn fragment_main(fs_input: VertexOutput) -> FragmentOutput {

        var fs_out: FragmentOutput;

        fs_out.color = textureSample(tex_surface, smp_surface, fs_input.uv);
        fs_out.light = vec4f(1.);

        return fs_out;
    }
";

/// Merge pass fragment: local lighting from the G-buffer into the result
/// image. `%AMBIENT%` and `%FALLOFF_SCALE%` are substituted at build time.
pub const MERGE_FRAGMENT: &str = "
    @group(0) @binding(8)  var tex_albedo: texture_2d<f32>;
    @group(0) @binding(9)  var smp_albedo: sampler;
    @group(0) @binding(10) var tex_position: texture_2d<f32>;
    @group(0) @binding(11) var smp_position: sampler;
    @group(0) @binding(12) var tex_normal: texture_2d<f32>;
    @group(0) @binding(13) var smp_normal: sampler;

    @fragment
    fn fragment_main(fs_input: VertexOutput) -> @location(0) vec4f {

        let base_color    = textureSample(tex_albedo,   smp_albedo,   fs_input.uv).xyz;
        let base_position = textureSample(tex_position, smp_position, fs_input.uv).xyz;
        let base_normal   = textureSample(tex_normal,   smp_normal,   fs_input.uv).xyz;

        let to_light = -base_position;
        let dist = length(to_light) * %FALLOFF_SCALE%;
        let to_light_norm = normalize(to_light);
        let ambient = %AMBIENT%;
        let diff = max(dot(to_light_norm, base_normal), 0.) / (dist * dist);

        let final_light = diff * (1. - ambient) * base_color;

        return vec4f(final_light, 1.0);
    }
";

/// Atmosphere ray-march fragment. Scene constants are substituted at
/// build time; the inverse view-projection arrives in the uniform block
/// at slot 0.
pub const ATMOSPHERE_FRAGMENT: &str = "
    struct Matrices {
        vp_inverse: mat4x4f
    }

    @group(0) @binding(0)  var<uniform> u_matrices: Matrices;

    @group(0) @binding(8)  var tex_albedo: texture_2d<f32>;
    @group(0) @binding(9)  var smp_albedo: sampler;
    @group(0) @binding(10) var tex_position: texture_2d<f32>;
    @group(0) @binding(11) var smp_position: sampler;
    @group(0) @binding(12) var tex_depth: texture_2d<f32>;
    @group(0) @binding(13) var smp_depth: sampler;

    const planet_pos = vec3f(%PLANET_X%, %PLANET_Y%, %PLANET_Z%);
    const planet_radius = %PLANET_RADIUS%;
    const atmosphere_thickness = %SHELL_THICKNESS%;
    const atmosphere_radius = planet_radius + atmosphere_thickness;

    const STEP_COUNT = %STEP_COUNT%;
    const STEP_INCREMENT = 1. / (STEP_COUNT - 1.);

    const DENSITY_FALLOFF = %DENSITY_FALLOFF%;

    const WAVE_LENGTHS = vec3f(%WAVELENGTH_R%, %WAVELENGTH_G%, %WAVELENGTH_B%);
    const SCATTER_STRENGTH = %SCATTER_STRENGTH%;
    const SCATTER_COEFFS = pow(400. / WAVE_LENGTHS, vec3f(4.)) * SCATTER_STRENGTH;

    fn sphere_intersection(ro: vec3f, rd: vec3f, center: vec3f, radius: f32) -> f32 {

        let oc = ro - center;
        let a = dot(rd, rd);
        let b = 2.0 * dot(oc, rd);
        let c = dot(oc, oc) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;

        if (discriminant < 0.) {
            return -1.0;
        }

        let sq = sqrt(discriminant);
        let t1 = (-b + sq) / (2.0 * a);
        let t2 = (-b - sq) / (2.0 * a);
        if (t2 > 0.) {
            return t2;
        }
        if (t1 > 0.) {
            return t1;
        }
        return -1.0;
    }

    fn linearize_depth(d: f32, z_near: f32, z_far: f32) -> f32 {
        return z_near * z_far / (z_far + d * (z_near - z_far));
    }

    fn get_density(sample_point: vec3f) -> f32 {
        let ground_height = length(sample_point - planet_pos) - planet_radius;
        let normalized_height = ground_height / atmosphere_thickness;
        return exp(-normalized_height * DENSITY_FALLOFF) * (1. - normalized_height);
    }

    fn get_optical_depth(ro: vec3f, rd: vec3f, ray_length: f32) -> f32 {
        let step = ray_length * STEP_INCREMENT;

        var sample_point = ro;
        var depth = 0.;
        for (var f = 0.0; f <= 1.0; f += STEP_INCREMENT) {
            depth += get_density(sample_point) * step;
            sample_point += rd * step;
        }

        return depth;
    }

    fn calculate_light(origin: vec3f, direction: vec3f, sample_distance: f32, base_color: vec3f) -> vec3f {

        let step_size = sample_distance * STEP_INCREMENT;

        var acc_light = vec3f(0.0);
        var view_optical_depth = 0.;
        for (var f = 0.0; f <= 1.0; f += STEP_INCREMENT) {

            let current_pos      = origin + f * sample_distance * direction;
            let to_sun           = normalize(-current_pos);
            let to_sun_thickness = sphere_intersection(current_pos, to_sun, planet_pos, atmosphere_radius);
            let to_surface       = sphere_intersection(current_pos, to_sun, planet_pos, planet_radius);

            if (to_surface < 0.) {

                let sun_optical_depth = get_optical_depth(current_pos, to_sun, to_sun_thickness);
                let density = get_density(current_pos);

                view_optical_depth = get_optical_depth(current_pos, -direction, f * sample_distance);

                let transmittance = exp(-(sun_optical_depth + view_optical_depth) * SCATTER_COEFFS);

                acc_light += density * transmittance * step_size;
            }
        }
        let base_color_transmittance = exp(-view_optical_depth);
        return base_color * base_color_transmittance + acc_light;
    }

    @fragment
    fn fragment_main(fs_input: VertexOutput) -> @location(0) vec4f {

        let base_color    = textureSample(tex_albedo,   smp_albedo,   fs_input.uv).xyz;
        let base_position = textureSample(tex_position, smp_position, fs_input.uv).xyz;
        let base_depth    = textureSample(tex_depth,    smp_depth,    fs_input.uv).x;

        let uv_normalized = vec2f(fs_input.uv.x, 1. - fs_input.uv.y) * 2. - 1.;
        var eye = u_matrices.vp_inverse * vec4f(uv_normalized, 0., 1.0);
        var end = u_matrices.vp_inverse * vec4f(uv_normalized, 1., 1.0);

        eye /= eye.w;
        end /= end.w;

        let ro = eye.xyz;
        let rd = normalize(end.xyz - eye.xyz);

        let dist = sphere_intersection(ro, rd, planet_pos, atmosphere_radius);
        let lin_depth = linearize_depth(base_depth, %Z_NEAR%, %Z_FAR%);

        var final_light = vec3f(0.);

        if (dist > 0. && dist < lin_depth) {

            let intersection = ro + rd * dist;
            let other_side_dist = sphere_intersection(intersection + rd * 0.0001, rd, planet_pos, atmosphere_radius);
            let sample_dist = min(length(base_position - intersection), other_side_dist);

            final_light = calculate_light(intersection, rd, sample_dist, base_color);
        }
        else {
            final_light = base_color;
        }

        return vec4f(final_light, 1.0);
    }
";

/// Separable blur fragment. `%DIR_X%`/`%DIR_Y%` select the direction and
/// `%WIDTH%`/`%HEIGHT%` convert it to a one-texel UV step.
pub const BLUR_FRAGMENT: &str = "
    const kernel = array(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);

    @group(0) @binding(8) var tex_image: texture_2d<f32>;
    @group(0) @binding(9) var smp_image: sampler;

    @fragment
    fn fragment_main(fs_input: VertexOutput) -> @location(0) vec4f {

        let pixel_step = vec2f(1.) / vec2f(%WIDTH%, %HEIGHT%);
        let direction = vec2f(%DIR_X%, %DIR_Y%) * pixel_step;

        var color = vec3f(0.);

        color += kernel[4] * textureSample(tex_image, smp_image, fs_input.uv + direction *  4.).xyz;
        color += kernel[3] * textureSample(tex_image, smp_image, fs_input.uv + direction *  3.).xyz;
        color += kernel[2] * textureSample(tex_image, smp_image, fs_input.uv + direction *  2.).xyz;
        color += kernel[1] * textureSample(tex_image, smp_image, fs_input.uv + direction *  1.).xyz;

        color += kernel[0] * textureSample(tex_image, smp_image, fs_input.uv).xyz;

        color += kernel[1] * textureSample(tex_image, smp_image, fs_input.uv + direction * -1.).xyz;
        color += kernel[2] * textureSample(tex_image, smp_image, fs_input.uv + direction * -2.).xyz;
        color += kernel[3] * textureSample(tex_image, smp_image, fs_input.uv + direction * -3.).xyz;
        color += kernel[4] * textureSample(tex_image, smp_image, fs_input.uv + direction * -4.).xyz;

        return vec4f(color, 1.0);
    }
";

/// Pointwise two-image merge; `%OPERATOR%` is `+` or `-`.
pub const MERGER_FRAGMENT: &str = "
    @group(0) @binding(8)  var tex_a: texture_2d<f32>;
    @group(0) @binding(9)  var smp_a: sampler;
    @group(0) @binding(10) var tex_b: texture_2d<f32>;
    @group(0) @binding(11) var smp_b: sampler;

    @fragment
    fn fragment_main(fs_input: VertexOutput) -> @location(0) vec4f {

        let a = textureSample(tex_a, smp_a, fs_input.uv).xyz;
        let b = textureSample(tex_b, smp_b, fs_input.uv).xyz;

        return vec4f(a %OPERATOR% b, 1.0);
    }
";

/// Per-channel gamma correction, `pow(c, 1 / 2.2)`.
pub const GAMMA_FRAGMENT: &str = "
    @group(0) @binding(8) var tex_image: texture_2d<f32>;
    @group(0) @binding(9) var smp_image: sampler;

    @fragment
    fn fragment_main(fs_input: VertexOutput) -> @location(0) vec4f {

        let base_color = textureSample(tex_image, smp_image, fs_input.uv).xyz;

        let corrected = pow(base_color, vec3(1. / 2.2));

        return vec4f(corrected, 1.0);
    }
";

/// Plain resample of the input at the output resolution; used by the
/// downscale and to-screen passes.
pub const PASSTHROUGH_FRAGMENT: &str = "
    @group(0) @binding(8) var tex_image: texture_2d<f32>;
    @group(0) @binding(9) var smp_image: sampler;

    @fragment
    fn fragment_main(fs_input: VertexOutput) -> @location(0) vec4f {

        return textureSample(tex_image, smp_image, fs_input.uv);
    }
";
