/// Fast mathematical operations using SIMD-accelerated `glam` types.
///
/// This module re-exports all types and functions from the [`glam`] crate,
/// which provides high-performance vector and matrix mathematics using SIMD
/// instructions when available.
///
/// # Common Types
///
/// - [`Vec2`]: 2D vector (x, y)
/// - [`Vec3`]: 3D vector (x, y, z)
/// - [`Mat3`], [`Mat4`]: 3x3 and 4x4 matrices
///
/// [`glam`]: https://docs.rs/glam
pub mod fast {
    pub use glam::*;
}

pub use fast::*;

/// Builds an orthographic projection matrix with an OpenGL-style depth range
/// of -1 to 1.
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(left, right, bottom, top, near, far)
}

/// Builds a pixel-space orthographic projection for 2D rendering.
///
/// The origin `(x, y)` maps to the top-left corner of the viewport and the
/// y axis points down, which matches screen coordinates. Near and far planes
/// are fixed at 1 and -1.
///
/// # Example
/// ```
/// use lantern_core::math::{Vec3, ortho_2d};
///
/// let projection = ortho_2d(0.0, 0.0, 800.0, 600.0);
/// let center = projection.transform_point3(Vec3::new(400.0, 300.0, 0.0));
/// assert!(center.x.abs() < 1e-6 && center.y.abs() < 1e-6);
/// ```
pub fn ortho_2d(x: f32, y: f32, width: f32, height: f32) -> Mat4 {
    ortho(x, x + width, y + height, y, 1.0, -1.0)
}
