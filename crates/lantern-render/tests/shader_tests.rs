//! Shader program tests: compile/link failure handling, reflection caching,
//! lazy uniform resolution and disposal, all against the recording device.

use std::sync::Arc;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use lantern_render::{
    AttributeType, RenderError, ShaderProgram, ShaderStage, UniformValue, default_shader,
};
use lantern_test_utils::{DeviceCall, RecordingDevice};

const MANY_UNIFORMS_VERTEX: &str = r"
    attribute vec2 position;
    uniform float u_time;
    uniform vec2 u_resolution;
    uniform vec3 u_tint;
    uniform vec4 u_bounds;
    uniform int u_frame;
    uniform ivec2 u_grid;
    uniform ivec3 u_cell;
    uniform ivec4 u_viewport;
    uniform mat3 u_normal;
    uniform mat4 u_mvp;
    void main() {
        gl_Position = u_mvp * vec4(position * u_resolution, 0.0, 1.0);
    }
";

const FLAT_FRAGMENT: &str = r"
    void main() {
        gl_FragColor = vec4(1.0);
    }
";

fn count_calls(device: &RecordingDevice, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
    device.calls().iter().filter(|call| predicate(call)).count()
}

#[test]
fn test_vertex_compile_failure_carries_the_log() {
    let device = Arc::new(RecordingDevice::new());
    device.fail_next_compile(ShaderStage::Vertex, "0:3 unexpected token");

    let result = default_shader(device.clone());
    assert_eq!(
        result.err(),
        Some(RenderError::CompileFailed {
            stage: ShaderStage::Vertex,
            log: "0:3 unexpected token".to_string(),
        })
    );
    // Nothing compiled, so nothing to clean up.
    assert_eq!(
        count_calls(&device, |c| matches!(c, DeviceCall::DeleteStage { .. })),
        0
    );
}

#[test]
fn test_fragment_compile_failure_deletes_the_vertex_stage() {
    let device = Arc::new(RecordingDevice::new());
    device.fail_next_compile(ShaderStage::Fragment, "undefined variable");

    let result = default_shader(device.clone());
    assert_eq!(
        result.err(),
        Some(RenderError::CompileFailed {
            stage: ShaderStage::Fragment,
            log: "undefined variable".to_string(),
        })
    );
    assert_eq!(
        count_calls(&device, |c| matches!(c, DeviceCall::DeleteStage { .. })),
        1
    );
}

#[test]
fn test_link_failure_deletes_both_stages() {
    let device = Arc::new(RecordingDevice::new());
    device.fail_next_link("varying count mismatch");

    let result = default_shader(device.clone());
    assert_eq!(
        result.err(),
        Some(RenderError::LinkFailed {
            log: "varying count mismatch".to_string(),
        })
    );
    assert_eq!(
        count_calls(&device, |c| matches!(c, DeviceCall::DeleteStage { .. })),
        2
    );
}

#[test]
fn test_active_uniforms_are_cached_at_link() {
    let device = Arc::new(RecordingDevice::new());
    let mut shader = default_shader(device.clone()).unwrap();
    device.clear_calls();

    let identity = Mat4::IDENTITY;
    shader.set_uniform_mat4("u_proj_view", &identity).unwrap();
    shader.set_uniform_i("u_texture", 0).unwrap();
    shader.set_uniform_mat4("u_proj_view", &identity).unwrap();

    // Every name came out of the reflection cache.
    assert_eq!(device.count_uniform_queries(), 0);
    assert_eq!(device.uniform_sets().len(), 3);
}

#[test]
fn test_uniform_missing_from_reflection_is_queried_once() {
    let device = Arc::new(RecordingDevice::new());
    device.hide_uniform("u_texture");
    let mut shader = default_shader(device.clone()).unwrap();
    device.clear_calls();

    shader.set_uniform_i("u_texture", 0).unwrap();
    shader.set_uniform_i("u_texture", 1).unwrap();

    assert_eq!(device.count_uniform_queries(), 1);
    assert_eq!(device.uniform_sets().len(), 2);
}

#[test]
fn test_unknown_uniform_is_skipped_when_lenient() {
    let device = Arc::new(RecordingDevice::new());
    let mut shader = default_shader(device.clone()).unwrap();
    device.clear_calls();

    shader.set_uniform_f("u_does_not_exist", 1.0).unwrap();
    shader.set_uniform_f("u_does_not_exist", 2.0).unwrap();

    // One negative query, cached; no writes ever reach the device.
    assert_eq!(device.count_uniform_queries(), 1);
    assert!(device.uniform_sets().is_empty());
    assert!(!shader.has_uniform("u_does_not_exist"));
}

#[test]
fn test_attribute_reflection_reports_pinned_locations() {
    let device = Arc::new(RecordingDevice::new());
    let shader = default_shader(device).unwrap();

    assert_eq!(shader.attribute_location("position"), Some(0));
    assert_eq!(shader.attribute_location("color"), Some(1));
    assert_eq!(shader.attribute_location("texcoord"), Some(2));
    assert_eq!(shader.attribute_type("position"), Some(AttributeType::Vec2));
    assert_eq!(shader.attribute_type("color"), Some(AttributeType::Vec4));
    assert_eq!(shader.attribute_size("texcoord"), Some(1));
    assert!(shader.has_attribute("position"));
    assert!(!shader.has_attribute("normal"));
    assert_eq!(shader.attributes().len(), 3);
}

#[test]
fn test_typed_setters_deliver_typed_values() {
    let device = Arc::new(RecordingDevice::new());
    let mut shader =
        ShaderProgram::new(device.clone(), MANY_UNIFORMS_VERTEX, FLAT_FRAGMENT).unwrap();
    device.clear_calls();

    shader.set_uniform_f("u_time", 1.25).unwrap();
    shader.set_uniform_vec2("u_resolution", Vec2::new(800.0, 600.0)).unwrap();
    shader.set_uniform_vec3("u_tint", Vec3::new(1.0, 0.5, 0.25)).unwrap();
    shader.set_uniform_vec4("u_bounds", Vec4::new(0.0, 0.0, 1.0, 1.0)).unwrap();
    shader.set_uniform_i("u_frame", 7).unwrap();
    shader.set_uniform_2i("u_grid", 4, 3).unwrap();
    shader.set_uniform_3i("u_cell", 1, 2, 3).unwrap();
    shader.set_uniform_4i("u_viewport", 0, 0, 800, 600).unwrap();
    shader.set_uniform_mat3("u_normal", &Mat3::IDENTITY).unwrap();
    shader.set_uniform_mat4("u_mvp", &Mat4::IDENTITY).unwrap();

    let values: Vec<UniformValue> = device
        .uniform_sets()
        .into_iter()
        .map(|(_, value)| value)
        .collect();
    assert_eq!(
        values,
        [
            UniformValue::Float(1.25),
            UniformValue::Vec2([800.0, 600.0]),
            UniformValue::Vec3([1.0, 0.5, 0.25]),
            UniformValue::Vec4([0.0, 0.0, 1.0, 1.0]),
            UniformValue::Int(7),
            UniformValue::IVec2([4, 3]),
            UniformValue::IVec3([1, 2, 3]),
            UniformValue::IVec4([0, 0, 800, 600]),
            UniformValue::Mat3(Mat3::IDENTITY.to_cols_array()),
            UniformValue::Mat4(Mat4::IDENTITY.to_cols_array()),
        ]
    );
}

#[test]
fn test_uniform_names_reflect_known_uniforms() {
    let device = Arc::new(RecordingDevice::new());
    let mut shader = default_shader(device).unwrap();

    shader.set_uniform_f("u_missing", 0.0).unwrap();

    let mut names = shader.uniform_names();
    names.sort_unstable();
    assert_eq!(names, ["u_proj_view", "u_texture"]);
    assert!(shader.has_uniform("u_proj_view"));
}

#[test]
fn test_dispose_releases_everything_once() {
    let device = Arc::new(RecordingDevice::new());
    let mut shader = default_shader(device.clone()).unwrap();
    device.clear_calls();

    shader.dispose();
    shader.dispose();

    assert!(!shader.is_valid());
    assert_eq!(
        count_calls(&device, |c| matches!(c, DeviceCall::DetachStage { .. })),
        2
    );
    assert_eq!(
        count_calls(&device, |c| matches!(c, DeviceCall::DeleteStage { .. })),
        2
    );
    assert_eq!(
        count_calls(&device, |c| matches!(c, DeviceCall::DeleteProgram { .. })),
        1
    );
}

#[test]
fn test_disposed_program_rejects_use() {
    let device = Arc::new(RecordingDevice::new());
    let mut shader = default_shader(device).unwrap();
    shader.dispose();

    assert_eq!(shader.use_program(), Err(RenderError::ProgramDisposed));
    assert_eq!(
        shader.uniform_location("u_proj_view"),
        Err(RenderError::ProgramDisposed)
    );
}

#[test]
fn test_drop_releases_the_program() {
    let device = Arc::new(RecordingDevice::new());
    {
        let _shader = default_shader(device.clone()).unwrap();
    }
    assert_eq!(
        count_calls(&device, |c| matches!(c, DeviceCall::DeleteProgram { .. })),
        1
    );
}
