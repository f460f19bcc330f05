//! Error types for the renderer.

use std::fmt;

use lantern_test_utils::ShaderStage;

/// Errors produced by shader, buffer and batch operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A shader stage failed to compile. `log` carries the driver's info log.
    CompileFailed { stage: ShaderStage, log: String },
    /// Stages compiled but the program failed to link.
    LinkFailed { log: String },
    /// The shader program was disposed and can no longer be used.
    ProgramDisposed,
    /// Strict mode is enabled and the program has no uniform of this name.
    UnknownUniform { name: String },
    /// `begin` was called while a drawing session was already active.
    AlreadyDrawing,
    /// A session-scoped operation was called outside `begin`/`end`.
    NotDrawing,
    /// A vertex buffer was requested with room for zero vertices.
    ZeroCapacity,
    /// Raw vertex data did not match the batch's vertex layout.
    InvalidVertexData { expected: usize, actual: usize },
    /// The texture was disposed and can no longer be drawn.
    TextureDisposed,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::CompileFailed { stage, log } => {
                write!(f, "failed to compile {stage} stage: {log}")
            }
            RenderError::LinkFailed { log } => write!(f, "failed to link program: {log}"),
            RenderError::ProgramDisposed => write!(f, "shader program was disposed"),
            RenderError::UnknownUniform { name } => {
                write!(f, "no uniform named '{name}' in program")
            }
            RenderError::AlreadyDrawing => {
                write!(f, "drawing session already active, call end before begin")
            }
            RenderError::NotDrawing => write!(f, "no active drawing session, call begin first"),
            RenderError::ZeroCapacity => {
                write!(f, "vertex buffer capacity must hold at least one vertex")
            }
            RenderError::InvalidVertexData { expected, actual } => {
                write!(
                    f,
                    "vertex data must be exactly {expected} floats for one quad, got {actual}"
                )
            }
            RenderError::TextureDisposed => write!(f, "texture was disposed"),
        }
    }
}

impl std::error::Error for RenderError {}

pub type RenderResult<T> = Result<T, RenderError>;
