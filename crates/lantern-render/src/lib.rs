//! Batched 2D sprite rendering over a pluggable driver.
//!
//! The crate renders textured quads through a [`SpriteBatch`] that merges
//! consecutive same-texture draws into single draw calls without ever
//! reordering them, keeping alpha blending deterministic. All driver access
//! goes through the [`RenderDevice`] trait, so the whole pipeline runs
//! headless under [`lantern_test_utils::RecordingDevice`] in tests.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use glam::Vec2;
//! use lantern_render::{Color, SpriteBatch, Texture};
//! use lantern_test_utils::RecordingDevice;
//!
//! let device = Arc::new(RecordingDevice::new());
//! let mut batch = SpriteBatch::with_default_shader(device.clone(), 500)?;
//! batch.resize(800.0, 600.0)?;
//!
//! let sprites = Texture::new(device.clone(), 256, 256);
//!
//! batch.begin()?;
//! batch.set_color(Color::WHITE.with_alpha(0.8));
//! for i in 0..16 {
//!     batch.draw(&sprites, Vec2::new(i as f32 * 16.0, 32.0))?;
//! }
//! batch.end()?;
//!
//! // Sixteen same-texture quads collapse into one draw call.
//! assert_eq!(device.count_draw_calls(), 1);
//! # Ok::<(), lantern_render::RenderError>(())
//! ```
//!
//! # Modules
//!
//! - [`batch`] - The sprite batch, its vertex format and built-in shader
//! - [`shader`] - Program compilation, reflection and uniform setters
//! - [`texture`] - Textures, regions and named atlases
//! - [`vertex`] - Vertex layouts and the CPU staging buffer
//! - [`color`] - RGBA tint colors
//! - [`error`] - The [`RenderError`] type every fallible operation returns

pub mod batch;
pub mod color;
pub mod error;
pub mod shader;
pub mod texture;
pub mod vertex;

pub use batch::{
    ATTR_COLOR, ATTR_POSITION, ATTR_TEXCOORD, BatchStats, DEFAULT_FRAGMENT_SHADER,
    DEFAULT_MAX_QUADS, DEFAULT_VERTEX_SHADER, SpriteBatch, SpriteVertex, UNIFORM_PROJ_VIEW,
    UNIFORM_TEXTURE, VERTEX_COMPONENTS, VERTICES_PER_QUAD, default_shader, sprite_vertex_layout,
};
pub use color::Color;
pub use error::{RenderError, RenderResult};
pub use shader::{ShaderProgram, StrictScope, set_strict_mode, strict_mode};
pub use texture::{Texture, TextureAtlas, TextureRegion, TextureSurface, UvRect};
pub use vertex::{VertexAttribute, VertexBuffer, VertexLayout};

// Driver-facing types surface here too, so most callers only import this
// crate and the device implementation they render with.
pub use lantern_test_utils::{
    ActiveAttribute, ActiveUniform, AttributeType, PrimitiveKind, ProgramId, RenderDevice,
    ShaderStage, StageId, TextureId, UniformLocation, UniformValue,
};
