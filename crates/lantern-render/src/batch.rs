//! Batched 2D sprite rendering.
//!
//! [`SpriteBatch`] collects textured quads into one CPU-side vertex buffer
//! and submits them in as few draw calls as possible without reordering.
//! Quads accumulate while they share a texture and the buffer has room; a
//! different texture or a full buffer flushes everything pending first, so
//! submission order is exactly draw-call order and alpha blending stays
//! correct.
//!
//! ```
//! use std::sync::Arc;
//! use glam::Vec2;
//! use lantern_render::{SpriteBatch, Texture};
//! use lantern_test_utils::RecordingDevice;
//!
//! let device = Arc::new(RecordingDevice::new());
//! let mut batch = SpriteBatch::with_default_shader(device.clone(), 1000)?;
//! let texture = Texture::new(device, 64, 64);
//!
//! batch.begin()?;
//! batch.draw(&texture, Vec2::new(10.0, 10.0))?;
//! batch.draw(&texture, Vec2::new(90.0, 10.0))?;
//! batch.end()?;
//! # Ok::<(), lantern_render::RenderError>(())
//! ```

use std::sync::Arc;

use glam::{Mat4, Vec2};
use lantern_core::geometry::Rect;
use lantern_core::math::ortho_2d;
use lantern_core::profiling::profile_function;
use lantern_test_utils::{PrimitiveKind, RenderDevice, TextureId};
use static_assertions::const_assert_eq;
use tracing::trace;

use crate::color::Color;
use crate::error::{RenderError, RenderResult};
use crate::shader::{ShaderProgram, StrictScope};
use crate::texture::{Texture, TextureRegion, TextureSurface};
use crate::vertex::{VertexAttribute, VertexBuffer, VertexLayout};

/// Quad capacity for batches that do not pick their own.
pub const DEFAULT_MAX_QUADS: usize = 1000;
/// Two triangles per quad, no index buffer.
pub const VERTICES_PER_QUAD: usize = 6;
/// Position (2) + color (4) + texcoord (2).
pub const VERTEX_COMPONENTS: usize = 8;

pub const UNIFORM_PROJ_VIEW: &str = "u_proj_view";
pub const UNIFORM_TEXTURE: &str = "u_texture";
pub const ATTR_POSITION: &str = "position";
pub const ATTR_COLOR: &str = "color";
pub const ATTR_TEXCOORD: &str = "texcoord";

pub const DEFAULT_VERTEX_SHADER: &str = r"
attribute vec2 position;
attribute vec4 color;
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

pub const DEFAULT_FRAGMENT_SHADER: &str = r"
uniform sampler2D u_texture;

varying vec4 v_color;
varying vec2 v_texcoord;

void main() {
    gl_FragColor = v_color * texture2D(u_texture, v_texcoord);
}
";

/// The interleaved layout every sprite vertex uses.
pub fn sprite_vertex_layout() -> VertexLayout {
    VertexLayout::new(vec![
        VertexAttribute::new(0, ATTR_POSITION, 2),
        VertexAttribute::new(1, ATTR_COLOR, 4),
        VertexAttribute::new(2, ATTR_TEXCOORD, 2),
    ])
}

/// Compiles the built-in textured-quad shader with attribute locations
/// pinned to [`sprite_vertex_layout`].
///
/// Every batch owns its shader; there is no process-wide default program to
/// share or leak.
pub fn default_shader(device: Arc<dyn RenderDevice>) -> RenderResult<ShaderProgram> {
    let layout = sprite_vertex_layout();
    ShaderProgram::with_attributes(
        device,
        DEFAULT_VERTEX_SHADER,
        DEFAULT_FRAGMENT_SHADER,
        &layout.bindings(),
    )
}

/// One sprite vertex as written into the staging buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub texcoord: [f32; 2],
}

const_assert_eq!(
    std::mem::size_of::<SpriteVertex>(),
    VERTEX_COMPONENTS * std::mem::size_of::<f32>()
);

/// Per-session counters, reset by [`SpriteBatch::begin`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub quads: u32,
    pub flushes: u32,
    pub vertices: u32,
}

/// Accumulates textured quads and submits them in texture-contiguous runs.
///
/// Drawing happens inside a `begin`/`end` session. Between those calls any
/// number of `draw*` calls may be made; the batch flushes on its own when
/// the texture changes or the buffer fills, and `end` flushes whatever is
/// left.
pub struct SpriteBatch {
    device: Arc<dyn RenderDevice>,
    shader: ShaderProgram,
    buffer: VertexBuffer,
    projection: Mat4,
    view: Mat4,
    color: Color,
    bound_texture: Option<TextureId>,
    /// Vertices written since the last flush.
    write_index: usize,
    /// Vertex capacity; reaching it forces a flush.
    max_index: usize,
    drawing: bool,
    stats: BatchStats,
}

impl SpriteBatch {
    /// Creates a batch with room for `max_quads` quads per flush
    /// ([`DEFAULT_MAX_QUADS`] suits most scenes) using the caller's shader.
    /// The projection and view start as identity; call
    /// [`resize`](Self::resize) or [`set_projection`](Self::set_projection)
    /// before drawing anything meaningful.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        shader: ShaderProgram,
        max_quads: usize,
    ) -> RenderResult<Self> {
        profile_function!();
        let max_index = max_quads * VERTICES_PER_QUAD;
        let buffer = VertexBuffer::new(
            device.clone(),
            sprite_vertex_layout(),
            max_index * VERTEX_COMPONENTS,
        )?;
        let mut batch = Self {
            device,
            shader,
            buffer,
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            color: Color::WHITE,
            bound_texture: None,
            write_index: 0,
            max_index,
            drawing: false,
            stats: BatchStats::default(),
        };
        batch.update_uniforms()?;
        Ok(batch)
    }

    /// Creates a batch rendering through [`default_shader`].
    pub fn with_default_shader(
        device: Arc<dyn RenderDevice>,
        max_quads: usize,
    ) -> RenderResult<Self> {
        let shader = default_shader(device.clone())?;
        Self::new(device, shader, max_quads)
    }

    /// Opens a drawing session: makes the shader current and resets the
    /// write cursor, texture run and per-session stats.
    pub fn begin(&mut self) -> RenderResult<()> {
        if self.drawing {
            return Err(RenderError::AlreadyDrawing);
        }
        self.shader.use_program()?;
        self.drawing = true;
        self.write_index = 0;
        self.bound_texture = None;
        self.stats = BatchStats::default();
        self.buffer.clear();
        Ok(())
    }

    /// Closes the session, flushing any pending quads.
    pub fn end(&mut self) -> RenderResult<()> {
        if !self.drawing {
            return Err(RenderError::NotDrawing);
        }
        self.drawing = false;
        self.flush();
        Ok(())
    }

    /// Submits everything pending as one draw call. Does nothing when no
    /// vertices are queued, so it is safe to call at any point.
    pub fn flush(&mut self) {
        if self.write_index == 0 {
            return;
        }
        profile_function!();
        let vertex_count = self.write_index;
        if let Some(texture) = self.bound_texture {
            self.device.bind_texture(texture);
        }
        self.buffer.flip();
        self.buffer.bind();
        self.buffer.draw(PrimitiveKind::Triangles, 0, vertex_count);
        self.buffer.unbind();
        self.buffer.clear();
        self.write_index = 0;
        self.stats.flushes += 1;
        self.stats.vertices += vertex_count as u32;
        trace!(vertices = vertex_count, "flushed sprite batch");
    }

    /// Draws a surface at its natural size.
    pub fn draw(&mut self, texture: &impl TextureSurface, position: Vec2) -> RenderResult<()> {
        let size = Vec2::new(texture.width(), texture.height());
        self.emit(texture, position, size, Vec2::ZERO, 0.0)
    }

    /// Draws a surface stretched to `size`.
    pub fn draw_sized(
        &mut self,
        texture: &impl TextureSurface,
        position: Vec2,
        size: Vec2,
    ) -> RenderResult<()> {
        self.emit(texture, position, size, Vec2::ZERO, 0.0)
    }

    /// Draws a surface rotated by `radians` around `position + origin`,
    /// with `origin` measured from the quad's top-left corner.
    pub fn draw_rotated(
        &mut self,
        texture: &impl TextureSurface,
        position: Vec2,
        size: Vec2,
        origin: Vec2,
        radians: f32,
    ) -> RenderResult<()> {
        self.emit(texture, position, size, origin, radians)
    }

    /// Draws a pixel-space sub-rectangle of `texture` at its natural size.
    pub fn draw_region(
        &mut self,
        texture: &Texture,
        region: Rect<f32>,
        position: Vec2,
    ) -> RenderResult<()> {
        let region = TextureRegion::new(texture, region);
        self.draw(&region, position)
    }

    /// Draws a pixel-space sub-rectangle of `texture` stretched to `size`.
    pub fn draw_region_scaled(
        &mut self,
        texture: &Texture,
        region: Rect<f32>,
        position: Vec2,
        size: Vec2,
    ) -> RenderResult<()> {
        let region = TextureRegion::new(texture, region);
        self.draw_sized(&region, position, size)
    }

    /// Queues one pre-built quad: six vertices in the sprite layout. The
    /// data passes through untouched: the batch color is not applied and
    /// positions are used as given.
    pub fn draw_vertices(
        &mut self,
        texture: &impl TextureSurface,
        vertices: &[f32],
    ) -> RenderResult<()> {
        if !self.drawing {
            return Err(RenderError::NotDrawing);
        }
        let quad = VERTICES_PER_QUAD * VERTEX_COMPONENTS;
        if vertices.len() != quad {
            return Err(RenderError::InvalidVertexData {
                expected: quad,
                actual: vertices.len(),
            });
        }
        let id = texture.texture_id().ok_or(RenderError::TextureDisposed)?;
        self.prepare(id);
        self.buffer.put_slice(vertices);
        self.write_index += VERTICES_PER_QUAD;
        self.stats.quads += 1;
        Ok(())
    }

    fn emit(
        &mut self,
        texture: &dyn TextureSurface,
        position: Vec2,
        size: Vec2,
        origin: Vec2,
        radians: f32,
    ) -> RenderResult<()> {
        if !self.drawing {
            return Err(RenderError::NotDrawing);
        }
        let id = texture.texture_id().ok_or(RenderError::TextureDisposed)?;
        self.prepare(id);

        let uv = texture.uv();
        let [tl, tr, br, bl] = quad_corners(position, size, origin, radians);
        let color = self.color.to_array();

        self.push_vertex(tl, color, [uv.u, uv.v]);
        self.push_vertex(tr, color, [uv.u2, uv.v]);
        self.push_vertex(bl, color, [uv.u, uv.v2]);
        self.push_vertex(tr, color, [uv.u2, uv.v]);
        self.push_vertex(br, color, [uv.u2, uv.v2]);
        self.push_vertex(bl, color, [uv.u, uv.v2]);

        self.write_index += VERTICES_PER_QUAD;
        self.stats.quads += 1;
        Ok(())
    }

    /// Flushes when `texture` breaks the current run or the buffer is full.
    fn prepare(&mut self, texture: TextureId) {
        if self.bound_texture != Some(texture) {
            self.flush();
            self.bound_texture = Some(texture);
        } else if self.write_index >= self.max_index {
            self.flush();
        }
    }

    fn push_vertex(&mut self, position: Vec2, color: [f32; 4], texcoord: [f32; 2]) {
        let vertex = SpriteVertex {
            position: position.to_array(),
            color,
            texcoord,
        };
        self.buffer
            .put_slice(bytemuck::cast_slice(std::slice::from_ref(&vertex)));
    }

    /// Tint applied to quads queued after this call. Already-queued
    /// vertices keep the color they were built with.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Rebuilds the projection for a `width` by `height` viewport with the
    /// origin at the top-left and y growing downward.
    pub fn resize(&mut self, width: f32, height: f32) -> RenderResult<()> {
        if self.drawing {
            self.flush();
        }
        self.projection = ortho_2d(0.0, 0.0, width, height);
        self.update_uniforms()
    }

    pub fn set_projection(&mut self, projection: Mat4) -> RenderResult<()> {
        if self.drawing {
            self.flush();
        }
        self.projection = projection;
        self.update_uniforms()
    }

    pub fn set_view(&mut self, view: Mat4) -> RenderResult<()> {
        if self.drawing {
            self.flush();
        }
        self.view = view;
        self.update_uniforms()
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn combined_matrix(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Uploads the combined matrix and sampler slot to the shader.
    ///
    /// Resolution runs lenient regardless of the global mode: a custom
    /// shader without the standard uniforms is fine, the writes are simply
    /// skipped.
    pub fn update_uniforms(&mut self) -> RenderResult<()> {
        self.shader.use_program()?;
        let _lenient = StrictScope::disabled();
        let combined = self.combined_matrix();
        self.shader.set_uniform_mat4(UNIFORM_PROJ_VIEW, &combined)?;
        self.shader.set_uniform_i(UNIFORM_TEXTURE, 0)?;
        Ok(())
    }

    /// Swaps the active shader, returning the previous one so the caller
    /// decides when to dispose it. Pending quads are flushed through the
    /// old shader first. With `refresh_uniforms` the standard uniforms are
    /// uploaded to the new program immediately; without it the new program
    /// only becomes current mid-session, otherwise at the next
    /// [`begin`](Self::begin).
    pub fn set_shader(
        &mut self,
        shader: ShaderProgram,
        refresh_uniforms: bool,
    ) -> RenderResult<ShaderProgram> {
        if self.drawing {
            self.flush();
        }
        let previous = std::mem::replace(&mut self.shader, shader);
        if refresh_uniforms {
            self.update_uniforms()?;
        } else if self.drawing {
            self.shader.use_program()?;
        }
        Ok(previous)
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    pub fn shader_mut(&mut self) -> &mut ShaderProgram {
        &mut self.shader
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Counters for the current session (or the last one, after `end`).
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Vertex capacity before a forced flush.
    pub fn max_vertices(&self) -> usize {
        self.max_index
    }
}

/// Corner positions of a quad as `[top_left, top_right, bottom_right,
/// bottom_left]` in draw space.
fn quad_corners(position: Vec2, size: Vec2, origin: Vec2, radians: f32) -> [Vec2; 4] {
    if radians != 0.0 {
        return rotated_corners(position, size, origin, radians);
    }
    let right = position.x + size.x;
    let bottom = position.y + size.y;
    [
        position,
        Vec2::new(right, position.y),
        Vec2::new(right, bottom),
        Vec2::new(position.x, bottom),
    ]
}

/// Rotates the quad's corners around `position + origin`, with the corners
/// expressed relative to that pivot first.
fn rotated_corners(position: Vec2, size: Vec2, origin: Vec2, radians: f32) -> [Vec2; 4] {
    let (sin, cos) = radians.sin_cos();
    let pivot = position + origin;
    let local = [
        Vec2::new(-origin.x, -origin.y),
        Vec2::new(size.x - origin.x, -origin.y),
        Vec2::new(size.x - origin.x, size.y - origin.y),
        Vec2::new(-origin.x, size.y - origin.y),
    ];
    local.map(|corner| {
        Vec2::new(
            pivot.x + cos * corner.x - sin * corner.y,
            pivot.y + sin * corner.x + cos * corner.y,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Vec2, expected: Vec2) {
        assert!(
            (actual.x - expected.x).abs() < 1e-5 && (actual.y - expected.y).abs() < 1e-5,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_zero_rotation_is_axis_aligned() {
        let corners = quad_corners(
            Vec2::new(10.0, 10.0),
            Vec2::new(20.0, 20.0),
            Vec2::ZERO,
            0.0,
        );
        assert_eq!(corners[0], Vec2::new(10.0, 10.0));
        assert_eq!(corners[1], Vec2::new(30.0, 10.0));
        assert_eq!(corners[2], Vec2::new(30.0, 30.0));
        assert_eq!(corners[3], Vec2::new(10.0, 30.0));
    }

    #[test]
    fn test_rotation_path_with_zero_angle_matches() {
        let corners = rotated_corners(
            Vec2::new(10.0, 10.0),
            Vec2::new(20.0, 20.0),
            Vec2::ZERO,
            0.0,
        );
        assert_close(corners[0], Vec2::new(10.0, 10.0));
        assert_close(corners[1], Vec2::new(30.0, 10.0));
        assert_close(corners[2], Vec2::new(30.0, 30.0));
        assert_close(corners[3], Vec2::new(10.0, 30.0));
    }

    #[test]
    fn test_quarter_turn_around_center() {
        // 2x2 quad at the origin spun a quarter turn around its center.
        let corners = quad_corners(
            Vec2::ZERO,
            Vec2::new(2.0, 2.0),
            Vec2::new(1.0, 1.0),
            std::f32::consts::FRAC_PI_2,
        );
        assert_close(corners[0], Vec2::new(2.0, 0.0));
        assert_close(corners[1], Vec2::new(2.0, 2.0));
        assert_close(corners[2], Vec2::new(0.0, 2.0));
        assert_close(corners[3], Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_rotation_preserves_pivot_distance() {
        let position = Vec2::new(5.0, 7.0);
        let size = Vec2::new(4.0, 2.0);
        let origin = Vec2::new(1.0, 1.0);
        let pivot = position + origin;

        let flat = quad_corners(position, size, origin, 0.0);
        let turned = quad_corners(position, size, origin, 0.7);
        for (a, b) in flat.iter().zip(turned.iter()) {
            assert!((a.distance(pivot) - b.distance(pivot)).abs() < 1e-4);
        }
    }
}
