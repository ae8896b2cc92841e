//! GLSL 330 core sources for the immediate-mode backend.
//!
//! Sampler uniforms and `std140` uniform blocks are wired by name at draw
//! time, so the `u_*` names below are part of the binding contract.

/// Shared full-screen-quad vertex stage.
pub const FULLSCREEN_VERTEX: &str = "#version 330 core

    out vec2 vf_UV;

    const vec3 positions[6] = vec3[6](
        vec3(-1.0, -1.0, 0.0),
        vec3( 1.0, -1.0, 0.0),
        vec3( 1.0,  1.0, 0.0),

        vec3( 1.0,  1.0, 0.0),
        vec3(-1.0,  1.0, 0.0),
        vec3(-1.0, -1.0, 0.0)
    );

    const vec2 uvs[6] = vec2[6](
        vec2(0.0, 0.0),
        vec2(1.0, 0.0),
        vec2(1.0, 1.0),

        vec2(1.0, 1.0),
        vec2(0.0, 1.0),
        vec2(0.0, 0.0)
    );

    void main() {

        vf_UV = uvs[gl_VertexID];
        gl_Position = vec4(positions[gl_VertexID], 1.0);
    }
";

/// Lit geometry pass, vertex stage.
pub const LIT_VERTEX: &str = "#version 330 core

    layout (location = 0) in vec3 in_Position;
    layout (location = 1) in vec2 in_UV;
    layout (location = 2) in vec3 in_Normal;

    out vec3 vf_World_Position;
    out vec2 vf_UV;
    out vec3 vf_Normal;

    layout (std140) uniform CommonData {
        mat4 projection;
        mat4 view;
        mat4 model;
        mat4 normal;
    } u_common;

    void main() {

        vec4 world_pos = u_common.model * vec4(in_Position, 1.);

        vf_World_Position = world_pos.xyz;
        vf_UV             = vec2(1. - in_UV.x, in_UV.y);
        vf_Normal         = (u_common.normal * vec4(in_Normal, 0)).xyz;

        gl_Position = u_common.projection * u_common.view * world_pos;
    }
";

/// Lit geometry pass, fragment stage.
pub const LIT_FRAGMENT: &str = "#version 330 core
    precision highp float;

    in vec3 vf_World_Position;
    in vec2 vf_UV;
    in vec3 vf_Normal;

    layout (location = 0) out vec4 out_Color;
    layout (location = 1) out vec4 out_World_Position;
    layout (location = 2) out vec4 out_Normal;

    uniform sampler2D u_Texture;

    void main() {

        out_Color          = texture(u_Texture, vf_UV);
        out_World_Position = vec4(vf_World_Position, 1.0);
        out_Normal         = vec4(vf_Normal, 1.0);
    }
";

/// Light-source geometry pass, vertex stage.
pub const LIGHT_VERTEX: &str = "#version 330 core

    layout (location = 0) in vec3 in_Position;
    layout (location = 1) in vec2 in_UV;
    layout (location = 2) in vec3 in_Normal;

    out vec2 vf_UV;

    layout (std140) uniform CommonData {
        mat4 projection;
        mat4 view;
        mat4 model;
        mat4 normal;
    } u_common;

    void main() {

        vf_UV = vec2(1. - in_UV.x, in_UV.y);
        gl_Position = u_common.projection * u_common.view * u_common.model * vec4(in_Position, 1.);
    }
";

/// Light-source geometry pass, fragment stage.
pub const LIGHT_FRAGMENT: &str = "#version 330 core
    precision highp float;

    in vec2 vf_UV;

    layout (location = 0) out vec4 out_Color;
    layout (location = 1) out vec4 out_Light;

    uniform sampler2D u_Texture;

    void main() {

        out_Color = texture(u_Texture, vf_UV);
        out_Light = vec4(1.);
    }
";

/// Merge pass fragment; `%AMBIENT%` and `%FALLOFF_SCALE%` substituted at
/// build time.
pub const MERGE_FRAGMENT: &str = "#version 330 core
    precision highp float;

    in vec2 vf_UV;

    out vec4 out_Color;

    uniform sampler2D u_Albedo;
    uniform sampler2D u_Position;
    uniform sampler2D u_Normal;

    void main() {

        vec3 base_color = texture(u_Albedo, vf_UV).xyz;
        vec3 base_position = texture(u_Position, vf_UV).xyz;
        vec3 base_normal = texture(u_Normal, vf_UV).xyz;

        vec3 to_light = -base_position;
        float dist = length(to_light) * %FALLOFF_SCALE%;
        vec3 to_light_norm = normalize(to_light);
        float ambient = %AMBIENT%;
        float diff = max(dot(to_light_norm, base_normal), 0.) / (dist * dist);

        vec3 final_light = diff * (1. - ambient) * base_color;

        out_Color = vec4(final_light, 1.0);
    }
";

/// Atmosphere ray-march fragment; scene constants substituted at build
/// time.
pub const ATMOSPHERE_FRAGMENT: &str = "#version 330 core
    precision highp float;

    in vec2 vf_UV;

    out vec4 out_Color;

    layout (std140) uniform Matrices {
        mat4 vpInv;
    } u_Matrices;

    uniform sampler2D u_Albedo;
    uniform sampler2D u_Position;
    uniform sampler2D u_Depth;

    const vec3 planet_pos = vec3(%PLANET_X%, %PLANET_Y%, %PLANET_Z%);
    const float planet_radius = %PLANET_RADIUS%;
    const float atmosphere_thickness = %SHELL_THICKNESS%;
    const float atmosphere_radius = planet_radius + atmosphere_thickness;

    const float STEP_COUNT = %STEP_COUNT%;
    const float STEP_INCREMENT = 1. / (STEP_COUNT - 1.);

    const float DENSITY_FALLOFF = %DENSITY_FALLOFF%;

    const vec3 WAVE_LENGTHS = vec3(%WAVELENGTH_R%, %WAVELENGTH_G%, %WAVELENGTH_B%);
    const float SCATTER_STRENGTH = %SCATTER_STRENGTH%;
    const vec3 SCATTER_COEFFS = pow(400. / WAVE_LENGTHS, vec3(4.)) * SCATTER_STRENGTH;

    float sphere_intersection(vec3 ro, vec3 rd, vec3 center, float radius) {

        vec3 oc = ro - center;
        float a = dot(rd, rd);
        float b = 2.0 * dot(oc, rd);
        float c = dot(oc, oc) - radius * radius;
        float discriminant = b * b - 4.0 * a * c;

        if (discriminant < 0.) {
            return -1.0;
        }

        float sq = sqrt(discriminant);
        float t1 = (-b + sq) / (2.0 * a);
        float t2 = (-b - sq) / (2.0 * a);
        return t2 > 0. ? t2 : t1 > 0. ? t1 : -1.0;
    }

    float linearize_depth(float d, float z_near, float z_far) {
        return z_near * z_far / (z_far + d * (z_near - z_far));
    }

    float get_density(vec3 sample_point) {
        float ground_height = length(sample_point - planet_pos) - planet_radius;
        float normalized_height = ground_height / atmosphere_thickness;
        return exp(-normalized_height * DENSITY_FALLOFF) * (1. - normalized_height);
    }

    float get_optical_depth(vec3 ro, vec3 rd, float ray_length) {
        vec3 sample_point = ro;
        float step = ray_length * STEP_INCREMENT;
        float depth = 0.;
        for (float f = 0.0; f <= 1.0; f += STEP_INCREMENT) {
            depth += get_density(sample_point) * step;
            sample_point += rd * step;
        }

        return depth;
    }

    vec3 calculate_light(vec3 origin, vec3 direction, float sample_distance, vec3 base_color) {

        vec3 acc_light = vec3(0.0);
        float step_size = sample_distance * STEP_INCREMENT;
        float view_optical_depth = 0.;
        for (float f = 0.0; f <= 1.0; f += STEP_INCREMENT) {

            vec3 current_pos = origin + f * sample_distance * direction;
            vec3 to_sun = normalize(-current_pos);
            float to_sun_thickness = sphere_intersection(current_pos, to_sun, planet_pos, atmosphere_radius);
            float to_surface = sphere_intersection(current_pos, to_sun, planet_pos, planet_radius);

            if (to_surface < 0.) {

                float sun_optical_depth = get_optical_depth(current_pos, to_sun, to_sun_thickness);
                float density = get_density(current_pos);

                view_optical_depth = get_optical_depth(current_pos, -direction, f * sample_distance);

                vec3 transmittance = exp(-(sun_optical_depth + view_optical_depth) * SCATTER_COEFFS);

                acc_light += density * transmittance * step_size;
            }
        }
        float base_color_transmittance = exp(-view_optical_depth);
        return base_color * base_color_transmittance + acc_light;
    }

    void main() {

        vec3 base_color = texture(u_Albedo, vf_UV).xyz;
        vec3 base_position = texture(u_Position, vf_UV).xyz;
        float base_depth = texture(u_Depth, vf_UV).x;

        vec2 uv_normalized = vf_UV * 2. - 1.;
        vec4 eye = u_Matrices.vpInv * vec4(uv_normalized, -1., 1.0);
        vec4 end = u_Matrices.vpInv * vec4(uv_normalized, 1., 1.0);

        eye /= eye.w;
        end /= end.w;

        vec3 ro = eye.xyz;
        vec3 rd = normalize(end.xyz - eye.xyz);

        float dist = sphere_intersection(ro, rd, planet_pos, atmosphere_radius);
        float lin_depth = linearize_depth(base_depth, %Z_NEAR%, %Z_FAR%);

        vec3 final_light = vec3(0.);

        if (dist > 0. && dist < lin_depth) {

            vec3 intersection = ro + rd * dist;
            float other_side_dist = sphere_intersection(intersection + rd * 0.0001, rd, planet_pos, atmosphere_radius);
            float sample_dist = min(length(base_position - intersection), other_side_dist);

            final_light = calculate_light(intersection, rd, sample_dist, base_color);
        }
        else {
            final_light = base_color;
        }

        out_Color = vec4(final_light, 1.0);
    }
";

/// Separable blur fragment; direction and resolution substituted at build
/// time.
pub const BLUR_FRAGMENT: &str = "#version 330 core
    precision highp float;

    const float kernel[5] = float[5](0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);

    in vec2 vf_UV;

    out vec4 out_Color;

    uniform sampler2D u_Texture;

    void main() {

        vec2 pixel_step = vec2(1.) / vec2(%WIDTH%, %HEIGHT%);
        vec2 direction = vec2(%DIR_X%, %DIR_Y%) * pixel_step;

        vec3 color = vec3(0.);

        color += kernel[4] * texture(u_Texture, vf_UV + direction *  4.).xyz;
        color += kernel[3] * texture(u_Texture, vf_UV + direction *  3.).xyz;
        color += kernel[2] * texture(u_Texture, vf_UV + direction *  2.).xyz;
        color += kernel[1] * texture(u_Texture, vf_UV + direction *  1.).xyz;

        color += kernel[0] * texture(u_Texture, vf_UV).xyz;

        color += kernel[1] * texture(u_Texture, vf_UV + direction * -1.).xyz;
        color += kernel[2] * texture(u_Texture, vf_UV + direction * -2.).xyz;
        color += kernel[3] * texture(u_Texture, vf_UV + direction * -3.).xyz;
        color += kernel[4] * texture(u_Texture, vf_UV + direction * -4.).xyz;

        out_Color = vec4(color, 1.0);
    }
";

/// Pointwise two-image merge; `%OPERATOR%` is `+` or `-`.
pub const MERGER_FRAGMENT: &str = "#version 330 core
    precision highp float;

    in vec2 vf_UV;

    out vec4 out_Color;

    uniform sampler2D u_Texture_A;
    uniform sampler2D u_Texture_B;

    void main() {

        vec3 a = texture(u_Texture_A, vf_UV).xyz;
        vec3 b = texture(u_Texture_B, vf_UV).xyz;

        out_Color = vec4(a %OPERATOR% b, 1.0);
    }
";

/// Per-channel gamma correction.
pub const GAMMA_FRAGMENT: &str = "#version 330 core
    precision highp float;

    in vec2 vf_UV;

    out vec4 out_Color;

    uniform sampler2D u_Texture;

    void main() {

        vec3 base_color = texture(u_Texture, vf_UV).xyz;

        vec3 corrected = pow(base_color, vec3(1. / 2.2));

        out_Color = vec4(corrected, 1.0);
    }
";

/// Plain resample of the input; used by the downscale and to-screen
/// passes.
pub const PASSTHROUGH_FRAGMENT: &str = "#version 330 core
    precision highp float;

    in vec2 vf_UV;

    out vec4 out_Color;

    uniform sampler2D u_Texture;

    void main() {

        out_Color = texture(u_Texture, vf_UV);
    }
";
