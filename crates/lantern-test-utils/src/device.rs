//! Driver abstraction for the renderer.
//!
//! The renderer talks to the GPU exclusively through [`RenderDevice`], an
//! object-safe trait over the small set of driver operations 2D rendering
//! needs. Production code wraps a real graphics context; tests use
//! [`RecordingDevice`](crate::RecordingDevice).

/// Handle to a compiled shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(pub u64);

/// Handle to a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u64);

/// Handle to a device texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Location of a uniform within a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// The two programmable stages a program links from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Primitive assembly mode for draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// A value passed to a uniform setter.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

/// Data type of a vertex attribute, as reported by program reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Unknown,
}

impl AttributeType {
    /// Parses a GLSL type keyword. Unrecognized keywords map to
    /// [`AttributeType::Unknown`] rather than failing.
    pub fn from_glsl(keyword: &str) -> Self {
        match keyword {
            "float" => AttributeType::Float,
            "vec2" => AttributeType::Vec2,
            "vec3" => AttributeType::Vec3,
            "vec4" => AttributeType::Vec4,
            "mat3" => AttributeType::Mat3,
            "mat4" => AttributeType::Mat4,
            _ => AttributeType::Unknown,
        }
    }

    /// Number of float components this type occupies in a vertex stream.
    pub fn components(&self) -> u32 {
        match self {
            AttributeType::Float => 1,
            AttributeType::Vec2 => 2,
            AttributeType::Vec3 => 3,
            AttributeType::Vec4 => 4,
            AttributeType::Mat3 => 9,
            AttributeType::Mat4 => 16,
            AttributeType::Unknown => 0,
        }
    }
}

/// A uniform reported active after linking.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUniform {
    pub name: String,
    pub location: UniformLocation,
}

/// An attribute reported active after linking.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveAttribute {
    pub name: String,
    pub location: u32,
    pub ty: AttributeType,
    pub size: u32,
}

/// Driver operations the renderer depends on.
///
/// Implementations must be `Send + Sync`; the renderer shares one device
/// across every resource it creates via `Arc<dyn RenderDevice>`.
///
/// Error-returning operations report the driver's info log as a plain
/// `String`; callers wrap it in their own error types.
pub trait RenderDevice: Send + Sync {
    /// Compiles one shader stage from source. On failure the `Err` carries
    /// the driver's compile log.
    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<StageId, String>;

    /// Links compiled stages into a program. `bindings` assigns attribute
    /// locations before linking, mirroring `glBindAttribLocation`. On
    /// failure the `Err` carries the driver's link log.
    fn link_program(&self, stages: &[StageId], bindings: &[(u32, &str)])
    -> Result<ProgramId, String>;

    fn delete_stage(&self, stage: StageId);

    fn detach_stage(&self, program: ProgramId, stage: StageId);

    fn delete_program(&self, program: ProgramId);

    fn use_program(&self, program: ProgramId);

    /// Uniforms the linker kept. Uniforms optimized out of the program do
    /// not appear here even when the source declares them.
    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveUniform>;

    /// Attributes the linker kept, with their resolved locations.
    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveAttribute>;

    /// Direct location query for a single uniform. Returns `None` when the
    /// program has no uniform of that name.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn set_uniform(&self, location: UniformLocation, value: UniformValue);

    fn create_texture(&self, width: u32, height: u32) -> TextureId;

    fn delete_texture(&self, texture: TextureId);

    fn bind_texture(&self, texture: TextureId);

    /// Points one attribute at a slice of interleaved vertex data and
    /// enables it. `offset_components` is measured in floats from the start
    /// of a vertex.
    fn bind_attribute(
        &self,
        location: u32,
        components: u32,
        stride_bytes: u32,
        offset_components: u32,
        data: &[f32],
    );

    fn disable_attribute(&self, location: u32);

    fn draw_arrays(&self, primitive: PrimitiveKind, first_vertex: usize, vertex_count: usize);
}
