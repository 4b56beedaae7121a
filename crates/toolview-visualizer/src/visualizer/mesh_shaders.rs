//! # OpenGL Shaders for Toolpath Rendering
//!
//! Both programs share attribute locations: position 0, normal 1, color 2.

pub const ATTRIB_POSITION: u32 = 0;
pub const ATTRIB_NORMAL: u32 = 1;
pub const ATTRIB_COLOR: u32 = 2;

/// Two-sided diffuse lighting over per-vertex colors.
pub const LIT_VERTEX_SHADER: &str = r#"
#version 330 core

layout (location = 0) in vec3 position;
layout (location = 1) in vec3 normal;
layout (location = 2) in vec4 color;

uniform mat4 mvp_matrix;
uniform mat3 normal_matrix;

out vec3 frag_normal;
out vec4 frag_color;

void main() {
    gl_Position = mvp_matrix * vec4(position, 1.0);
    frag_normal = normal_matrix * normal;
    frag_color = color;
}
"#;

pub const LIT_FRAGMENT_SHADER: &str = r#"
#version 330 core

in vec3 frag_normal;
in vec4 frag_color;

uniform vec3 light_direction;
uniform vec3 light_color;
uniform vec3 ambient_color;

out vec4 FragColor;

void main() {
    vec3 normal = normalize(frag_normal);
    if (!gl_FrontFacing) {
        normal = -normal;
    }

    float diff = abs(dot(normal, normalize(-light_direction)));
    vec3 lit = (ambient_color + diff * light_color) * frag_color.rgb;

    FragColor = vec4(min(lit, vec3(1.0)), frag_color.a);
}
"#;

/// Unlit; draws the vertex color, or `override_color` when enabled.
pub const FLAT_VERTEX_SHADER: &str = r#"
#version 330 core

layout (location = 0) in vec3 position;
layout (location = 2) in vec4 color;

uniform mat4 mvp_matrix;
uniform bool use_override;
uniform vec4 override_color;

out vec4 frag_color;

void main() {
    gl_Position = mvp_matrix * vec4(position, 1.0);
    frag_color = use_override ? override_color : color;
}
"#;

pub const FLAT_FRAGMENT_SHADER: &str = r#"
#version 330 core

in vec4 frag_color;
out vec4 FragColor;

void main() {
    FragColor = frag_color;
}
"#;
