//! WGSL shaders for fractal rendering

/// Entry point of the vertex stage in [`MESH_SHADER`]
pub const VERTEX_ENTRY: &str = "vs_main";

/// Entry point of the fragment stage in [`MESH_SHADER`]
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Lit mesh shader with ambient and one directional light.
///
/// Faces are shaded on both sides: the normal is flipped for back faces so
/// the side facing the camera is always lit from the light's side. Metalness
/// trades diffuse for tinted specular; roughness widens the highlight.
pub const MESH_SHADER: &str = r#"
struct Scene {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    camera_position: vec4<f32>,
    // xyz: position the light shines from, w: intensity
    light: vec4<f32>,
    light_color: vec4<f32>,
    // rgb premultiplied by intensity
    ambient: vec4<f32>,
    base_color: vec4<f32>,
    // x: metalness, y: roughness
    material: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> scene: Scene;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = scene.model * vec4<f32>(in.position, 1.0);
    out.world_position = world.xyz;
    out.world_normal = (scene.model * vec4<f32>(in.normal, 0.0)).xyz;
    out.clip_position = scene.view_proj * world;
    return out;
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    var n = normalize(in.world_normal);
    if (!front_facing) {
        n = -n;
    }

    let l = normalize(scene.light.xyz);
    let v = normalize(scene.camera_position.xyz - in.world_position);
    let h = normalize(l + v);

    let metalness = scene.material.x;
    let roughness = max(scene.material.y, 0.05);
    let albedo = scene.base_color.rgb;
    let diffuse_color = albedo * (1.0 - metalness);
    let specular_color = mix(vec3<f32>(0.04), albedo, metalness);

    let alpha = roughness * roughness;
    let shininess = 2.0 / (alpha * alpha) - 2.0;
    let specular = pow(max(dot(n, h), 0.0), shininess) * (shininess + 2.0) / 8.0;

    let n_dot_l = max(dot(n, l), 0.0);
    let direct = scene.light_color.rgb * scene.light.w * n_dot_l
        * (diffuse_color + specular_color * specular);
    let ambient = scene.ambient.rgb * diffuse_color;

    return vec4<f32>(ambient + direct, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_points_exist() {
        assert!(MESH_SHADER.contains(&format!("fn {}(", VERTEX_ENTRY)));
        assert!(MESH_SHADER.contains(&format!("fn {}(", FRAGMENT_ENTRY)));
    }
}
