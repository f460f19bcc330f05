//! Recording device for headless tests.
//!
//! [`RecordingDevice`] implements [`RenderDevice`] without touching a GPU.
//! Every driver call is appended to an in-memory log that tests inspect
//! through the `count_*` and accessor helpers. Linking scans the attached
//! shader sources for `uniform` and `attribute` declarations so reflection
//! behaves like a real driver, and the `fail_next_*` / `hide_uniform` knobs
//! let tests force the error and fallback paths.

use ahash::{HashMap, HashSet};
use parking_lot::Mutex;

use crate::device::{
    ActiveAttribute, ActiveUniform, AttributeType, PrimitiveKind, ProgramId, RenderDevice,
    ShaderStage, StageId, TextureId, UniformLocation, UniformValue,
};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CompileStage {
        stage: ShaderStage,
        id: StageId,
    },
    CompileFailed {
        stage: ShaderStage,
    },
    LinkProgram {
        id: ProgramId,
        bindings: Vec<(u32, String)>,
    },
    LinkFailed,
    DeleteStage {
        id: StageId,
    },
    DetachStage {
        program: ProgramId,
        stage: StageId,
    },
    DeleteProgram {
        id: ProgramId,
    },
    UseProgram {
        id: ProgramId,
    },
    QueryUniformLocation {
        program: ProgramId,
        name: String,
    },
    SetUniform {
        location: UniformLocation,
        value: UniformValue,
    },
    CreateTexture {
        id: TextureId,
        width: u32,
        height: u32,
    },
    DeleteTexture {
        id: TextureId,
    },
    BindTexture {
        id: TextureId,
    },
    BindAttribute {
        location: u32,
        components: u32,
        stride_bytes: u32,
        offset_components: u32,
        data: Vec<f32>,
    },
    DisableAttribute {
        location: u32,
    },
    DrawArrays {
        primitive: PrimitiveKind,
        first_vertex: usize,
        vertex_count: usize,
    },
}

#[derive(Debug, Clone)]
struct StageRecord {
    stage: ShaderStage,
    source: String,
}

#[derive(Debug, Clone)]
struct ProgramRecord {
    /// All linked uniforms, including ones hidden from reflection.
    uniforms: Vec<ActiveUniform>,
    attributes: Vec<ActiveAttribute>,
    stages: Vec<StageId>,
}

/// A [`RenderDevice`] that records every call instead of executing it.
///
/// Ids are issued from a shared counter starting at 1, so a `StageId` and a
/// `ProgramId` created by the same device never share a raw value.
pub struct RecordingDevice {
    calls: Mutex<Vec<DeviceCall>>,
    stages: Mutex<HashMap<StageId, StageRecord>>,
    programs: Mutex<HashMap<ProgramId, ProgramRecord>>,
    next_id: Mutex<u64>,
    hidden_uniforms: Mutex<HashSet<String>>,
    fail_compile: Mutex<Option<(ShaderStage, String)>>,
    fail_link: Mutex<Option<String>>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            stages: Mutex::new(HashMap::default()),
            programs: Mutex::new(HashMap::default()),
            next_id: Mutex::new(1),
            hidden_uniforms: Mutex::new(HashSet::default()),
            fail_compile: Mutex::new(None),
            fail_link: Mutex::new(None),
        }
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().push(call);
    }

    fn next_id(&self) -> u64 {
        let mut next = self.next_id.lock();
        let id = *next;
        *next += 1;
        id
    }

    /// Returns a copy of every call recorded so far, in order.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    /// Clears the call log. Linked programs and compiled stages survive.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the number of draw calls recorded.
    pub fn count_draw_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DeviceCall::DrawArrays { .. }))
            .count()
    }

    /// Returns the number of texture binds recorded.
    pub fn count_texture_binds(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DeviceCall::BindTexture { .. }))
            .count()
    }

    /// Returns the number of successful stage compiles recorded.
    pub fn count_stage_compiles(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DeviceCall::CompileStage { .. }))
            .count()
    }

    /// Returns the number of direct uniform location queries recorded.
    pub fn count_uniform_queries(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DeviceCall::QueryUniformLocation { .. }))
            .count()
    }

    /// All draw calls as `(primitive, first_vertex, vertex_count)`, in order.
    pub fn draw_calls(&self) -> Vec<(PrimitiveKind, usize, usize)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::DrawArrays {
                    primitive,
                    first_vertex,
                    vertex_count,
                } => Some((*primitive, *first_vertex, *vertex_count)),
                _ => None,
            })
            .collect()
    }

    /// Every texture bound, in bind order.
    pub fn bound_textures(&self) -> Vec<TextureId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::BindTexture { id } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Every uniform write, in order.
    pub fn uniform_sets(&self) -> Vec<(UniformLocation, UniformValue)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::SetUniform { location, value } => Some((*location, value.clone())),
                _ => None,
            })
            .collect()
    }

    /// The most recent value written to `location`, if any.
    pub fn last_uniform(&self, location: UniformLocation) -> Option<UniformValue> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find_map(|call| match call {
                DeviceCall::SetUniform { location: at, value } if *at == location => {
                    Some(value.clone())
                }
                _ => None,
            })
    }

    /// Vertex data uploads, one entry per buffer bind.
    ///
    /// The renderer binds one attribute per layout entry against the same
    /// interleaved slice; only the first attribute sits at offset zero, so
    /// filtering on that yields exactly one copy of the data per bind.
    pub fn vertex_uploads(&self) -> Vec<Vec<f32>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::BindAttribute {
                    offset_components: 0,
                    data,
                    ..
                } => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// The interleaved data of the most recent buffer bind, if any.
    pub fn last_vertex_data(&self) -> Option<Vec<f32>> {
        self.vertex_uploads().pop()
    }

    /// Hides `name` from [`RenderDevice::active_uniforms`] while keeping it
    /// resolvable through [`RenderDevice::uniform_location`]. Simulates a
    /// uniform the driver's reflection pass dropped.
    pub fn hide_uniform(&self, name: &str) {
        self.hidden_uniforms.lock().insert(name.to_string());
    }

    /// Arms the next compile of `stage` to fail with `log`.
    pub fn fail_next_compile(&self, stage: ShaderStage, log: &str) {
        *self.fail_compile.lock() = Some((stage, log.to_string()));
    }

    /// Arms the next link to fail with `log`.
    pub fn fail_next_link(&self, log: &str) {
        *self.fail_link.lock() = Some(log.to_string());
    }
}

impl RenderDevice for RecordingDevice {
    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<StageId, String> {
        let armed = {
            let mut fail = self.fail_compile.lock();
            let matches_stage = matches!(&*fail, Some((armed_stage, _)) if *armed_stage == stage);
            if matches_stage {
                fail.take().map(|(_, log)| log)
            } else {
                None
            }
        };
        if let Some(log) = armed {
            self.record(DeviceCall::CompileFailed { stage });
            return Err(log);
        }

        let id = StageId(self.next_id());
        self.stages.lock().insert(
            id,
            StageRecord {
                stage,
                source: source.to_string(),
            },
        );
        self.record(DeviceCall::CompileStage { stage, id });
        Ok(id)
    }

    fn link_program(
        &self,
        stages: &[StageId],
        bindings: &[(u32, &str)],
    ) -> Result<ProgramId, String> {
        let armed = self.fail_link.lock().take();
        if let Some(log) = armed {
            self.record(DeviceCall::LinkFailed);
            return Err(log);
        }

        let stage_map = self.stages.lock();
        let records: Vec<StageRecord> = stages
            .iter()
            .filter_map(|id| stage_map.get(id).cloned())
            .collect();
        drop(stage_map);

        // Uniforms appear once per program regardless of how many stages
        // declare them; locations are assigned in declaration order.
        let mut uniforms: Vec<ActiveUniform> = Vec::new();
        let mut next_location = 0i32;
        for record in &records {
            for (_, name, size) in parse_declarations(&record.source, "uniform") {
                if uniforms.iter().any(|u| u.name == name) {
                    continue;
                }
                uniforms.push(ActiveUniform {
                    name,
                    location: UniformLocation(next_location),
                });
                next_location += size as i32;
            }
        }

        let mut attributes: Vec<ActiveAttribute> = Vec::new();
        for record in &records {
            if record.stage != ShaderStage::Vertex {
                continue;
            }
            for (ty, name, size) in parse_declarations(&record.source, "attribute") {
                if attributes.iter().any(|a| a.name == name) {
                    continue;
                }
                attributes.push(ActiveAttribute {
                    name,
                    location: 0,
                    ty,
                    size,
                });
            }
        }

        // Pre-bound names take their requested location, every other
        // attribute gets the lowest free slot in declaration order.
        let mut used: Vec<u32> = Vec::new();
        for attr in &mut attributes {
            if let Some((location, _)) = bindings.iter().find(|(_, name)| *name == attr.name) {
                attr.location = *location;
                used.push(*location);
            }
        }
        let mut next_free = 0u32;
        for attr in &mut attributes {
            if bindings.iter().any(|(_, name)| *name == attr.name) {
                continue;
            }
            while used.contains(&next_free) {
                next_free += 1;
            }
            attr.location = next_free;
            used.push(next_free);
        }

        let id = ProgramId(self.next_id());
        self.programs.lock().insert(
            id,
            ProgramRecord {
                uniforms,
                attributes,
                stages: stages.to_vec(),
            },
        );
        self.record(DeviceCall::LinkProgram {
            id,
            bindings: bindings
                .iter()
                .map(|(location, name)| (*location, name.to_string()))
                .collect(),
        });
        Ok(id)
    }

    fn delete_stage(&self, stage: StageId) {
        self.stages.lock().remove(&stage);
        self.record(DeviceCall::DeleteStage { id: stage });
    }

    fn detach_stage(&self, program: ProgramId, stage: StageId) {
        if let Some(record) = self.programs.lock().get_mut(&program) {
            record.stages.retain(|id| *id != stage);
        }
        self.record(DeviceCall::DetachStage { program, stage });
    }

    fn delete_program(&self, program: ProgramId) {
        self.programs.lock().remove(&program);
        self.record(DeviceCall::DeleteProgram { id: program });
    }

    fn use_program(&self, program: ProgramId) {
        self.record(DeviceCall::UseProgram { id: program });
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveUniform> {
        let hidden = self.hidden_uniforms.lock();
        self.programs
            .lock()
            .get(&program)
            .map(|record| {
                record
                    .uniforms
                    .iter()
                    .filter(|u| !hidden.contains(&u.name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveAttribute> {
        self.programs
            .lock()
            .get(&program)
            .map(|record| record.attributes.clone())
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.record(DeviceCall::QueryUniformLocation {
            program,
            name: name.to_string(),
        });
        // Direct queries see hidden uniforms too.
        self.programs
            .lock()
            .get(&program)
            .and_then(|record| record.uniforms.iter().find(|u| u.name == name))
            .map(|u| u.location)
    }

    fn set_uniform(&self, location: UniformLocation, value: UniformValue) {
        self.record(DeviceCall::SetUniform { location, value });
    }

    fn create_texture(&self, width: u32, height: u32) -> TextureId {
        let id = TextureId(self.next_id());
        self.record(DeviceCall::CreateTexture { id, width, height });
        id
    }

    fn delete_texture(&self, texture: TextureId) {
        self.record(DeviceCall::DeleteTexture { id: texture });
    }

    fn bind_texture(&self, texture: TextureId) {
        self.record(DeviceCall::BindTexture { id: texture });
    }

    fn bind_attribute(
        &self,
        location: u32,
        components: u32,
        stride_bytes: u32,
        offset_components: u32,
        data: &[f32],
    ) {
        self.record(DeviceCall::BindAttribute {
            location,
            components,
            stride_bytes,
            offset_components,
            data: data.to_vec(),
        });
    }

    fn disable_attribute(&self, location: u32) {
        self.record(DeviceCall::DisableAttribute { location });
    }

    fn draw_arrays(&self, primitive: PrimitiveKind, first_vertex: usize, vertex_count: usize) {
        self.record(DeviceCall::DrawArrays {
            primitive,
            first_vertex,
            vertex_count,
        });
    }
}

fn strip_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '/' && i + 1 < chars.len() {
            if chars[i + 1] == '/' {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            if chars[i + 1] == '*' {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
                out.push(' ');
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Finds `keyword <type> <name>` declarations in GLSL source.
///
/// Returns `(type, name, array_size)` per declarator. Handles comments,
/// precision qualifiers, comma-separated declarator lists and `name[N]`
/// arrays. Statements without the keyword are skipped, so function bodies
/// never produce false positives.
fn parse_declarations(source: &str, keyword: &str) -> Vec<(AttributeType, String, u32)> {
    let stripped = strip_comments(source);
    let mut found = Vec::new();
    for statement in stripped.split(';') {
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        let Some(pos) = tokens.iter().position(|t| *t == keyword) else {
            continue;
        };
        let mut rest = &tokens[pos + 1..];
        while let Some((first, tail)) = rest.split_first() {
            if matches!(*first, "lowp" | "mediump" | "highp") {
                rest = tail;
            } else {
                break;
            }
        }
        let Some((ty_token, names)) = rest.split_first() else {
            continue;
        };
        let ty = AttributeType::from_glsl(ty_token);
        for declarator in names.join(" ").split(',') {
            let declarator = declarator.trim();
            if declarator.is_empty() {
                continue;
            }
            let (name, size) = match declarator.split_once('[') {
                Some((base, dims)) => {
                    let count = dims.trim_end_matches(']').trim().parse::<u32>().unwrap_or(1);
                    (base.trim(), count)
                }
                None => (declarator, 1),
            };
            found.push((ty, name.to_string(), size));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX_SOURCE: &str = r"
        attribute vec2 position;
        attribute vec4 color; // per-vertex tint
        attribute vec2 texcoord;
        uniform mat4 u_proj_view;
        varying vec4 v_color;
        varying vec2 v_texcoord;
        void main() {
            v_color = color;
            v_texcoord = texcoord;
            gl_Position = u_proj_view * vec4(position, 0.0, 1.0);
        }
    ";

    const FRAGMENT_SOURCE: &str = r"
        uniform sampler2D u_texture;
        varying vec4 v_color;
        varying vec2 v_texcoord;
        void main() {
            gl_FragColor = v_color * texture2D(u_texture, v_texcoord);
        }
    ";

    fn linked_program(device: &RecordingDevice) -> ProgramId {
        let vert = device
            .compile_stage(ShaderStage::Vertex, VERTEX_SOURCE)
            .unwrap();
        let frag = device
            .compile_stage(ShaderStage::Fragment, FRAGMENT_SOURCE)
            .unwrap();
        device.link_program(&[vert, frag], &[]).unwrap()
    }

    #[test]
    fn test_parse_declarations_skips_comments_and_bodies() {
        let source = r"
            /* uniform mat4 u_fake; */
            uniform highp float u_time; // seconds
            uniform vec2 u_scale, u_offset;
            uniform vec4 u_lights[4];
            void main() { gl_FragColor = vec4(u_time); }
        ";
        let found = parse_declarations(source, "uniform");
        let names: Vec<&str> = found.iter().map(|(_, name, _)| name.as_str()).collect();
        assert_eq!(names, ["u_time", "u_scale", "u_offset", "u_lights"]);
        assert_eq!(found[0].0, AttributeType::Float);
        assert_eq!(found[3].2, 4);
    }

    #[test]
    fn test_link_assigns_sequential_uniform_locations() {
        let device = RecordingDevice::new();
        let program = linked_program(&device);

        let uniforms = device.active_uniforms(program);
        assert_eq!(uniforms.len(), 2);
        assert_eq!(uniforms[0].name, "u_proj_view");
        assert_eq!(uniforms[0].location, UniformLocation(0));
        assert_eq!(uniforms[1].name, "u_texture");
        assert_eq!(uniforms[1].location, UniformLocation(1));
    }

    #[test]
    fn test_link_honors_attribute_bindings() {
        let device = RecordingDevice::new();
        let vert = device
            .compile_stage(ShaderStage::Vertex, VERTEX_SOURCE)
            .unwrap();
        let program = device
            .link_program(&[vert], &[(3, "position"), (0, "texcoord")])
            .unwrap();

        let attributes = device.active_attributes(program);
        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes[0].name, "position");
        assert_eq!(attributes[0].location, 3);
        assert_eq!(attributes[0].ty, AttributeType::Vec2);
        // "color" was not pre-bound, it takes the lowest free slot after 0.
        assert_eq!(attributes[1].name, "color");
        assert_eq!(attributes[1].location, 1);
        assert_eq!(attributes[2].name, "texcoord");
        assert_eq!(attributes[2].location, 0);
    }

    #[test]
    fn test_hidden_uniform_skips_reflection_but_resolves() {
        let device = RecordingDevice::new();
        device.hide_uniform("u_texture");
        let program = linked_program(&device);

        let names: Vec<String> = device
            .active_uniforms(program)
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, ["u_proj_view"]);
        assert_eq!(
            device.uniform_location(program, "u_texture"),
            Some(UniformLocation(1))
        );
        assert_eq!(device.count_uniform_queries(), 1);
    }

    #[test]
    fn test_fail_next_compile_is_consumed() {
        let device = RecordingDevice::new();
        device.fail_next_compile(ShaderStage::Fragment, "syntax error");

        // The armed stage is fragment, vertex still compiles.
        assert!(device.compile_stage(ShaderStage::Vertex, VERTEX_SOURCE).is_ok());
        let err = device
            .compile_stage(ShaderStage::Fragment, FRAGMENT_SOURCE)
            .unwrap_err();
        assert_eq!(err, "syntax error");
        assert!(device.compile_stage(ShaderStage::Fragment, FRAGMENT_SOURCE).is_ok());

        let failures = device
            .calls()
            .iter()
            .filter(|call| matches!(call, DeviceCall::CompileFailed { .. }))
            .count();
        assert_eq!(failures, 1);
    }

    #[test]
    fn test_fail_next_link_is_consumed() {
        let device = RecordingDevice::new();
        device.fail_next_link("varying mismatch");

        let vert = device
            .compile_stage(ShaderStage::Vertex, VERTEX_SOURCE)
            .unwrap();
        let frag = device
            .compile_stage(ShaderStage::Fragment, FRAGMENT_SOURCE)
            .unwrap();
        assert_eq!(
            device.link_program(&[vert, frag], &[]).unwrap_err(),
            "varying mismatch"
        );
        assert!(device.link_program(&[vert, frag], &[]).is_ok());
    }

    #[test]
    fn test_call_counts_and_accessors() {
        let device = RecordingDevice::new();
        let texture = device.create_texture(64, 32);
        device.bind_texture(texture);
        device.bind_attribute(0, 2, 32, 0, &[1.0, 2.0]);
        device.bind_attribute(1, 4, 32, 2, &[1.0, 2.0]);
        device.draw_arrays(PrimitiveKind::Triangles, 0, 6);

        assert_eq!(device.count_texture_binds(), 1);
        assert_eq!(device.count_draw_calls(), 1);
        assert_eq!(device.bound_textures(), [texture]);
        assert_eq!(device.draw_calls(), [(PrimitiveKind::Triangles, 0, 6)]);
        // Two attribute binds over the same slice count as one upload.
        assert_eq!(device.vertex_uploads().len(), 1);
        assert_eq!(device.last_vertex_data(), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn test_clear_calls_keeps_linked_programs() {
        let device = RecordingDevice::new();
        let program = linked_program(&device);
        device.clear_calls();

        assert_eq!(device.call_count(), 0);
        assert_eq!(device.active_uniforms(program).len(), 2);
    }
}
