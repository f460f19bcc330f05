//! Textures, sub-rectangle regions and named region atlases.
//!
//! The batch draws anything implementing [`TextureSurface`]: a whole
//! [`Texture`], a [`TextureRegion`] pointing at part of one, or a region
//! looked up by name in a [`TextureAtlas`].

use std::sync::Arc;

use ahash::HashMap;
use lantern_core::geometry::{Rect, Size};
use lantern_test_utils::{RenderDevice, TextureId};
use tracing::{debug, warn};

use crate::error::{RenderError, RenderResult};

/// Normalized texture coordinates of a rectangular area.
///
/// `(u, v)` is the top-left corner, `(u2, v2)` the bottom-right, both in
/// `0.0..=1.0` texture space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
}

impl UvRect {
    /// The whole texture.
    pub const FULL: UvRect = UvRect::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(u: f32, v: f32, u2: f32, v2: f32) -> Self {
        Self { u, v, u2, v2 }
    }

    /// Converts a pixel-space rectangle into normalized coordinates.
    pub fn from_pixels(rect: Rect<f32>, texture_width: u32, texture_height: u32) -> Self {
        let w = texture_width as f32;
        let h = texture_height as f32;
        Self {
            u: rect.x / w,
            v: rect.y / h,
            u2: rect.right() / w,
            v2: rect.bottom() / h,
        }
    }

    pub fn flip_horizontal(self) -> Self {
        Self {
            u: self.u2,
            u2: self.u,
            ..self
        }
    }

    pub fn flip_vertical(self) -> Self {
        Self {
            v: self.v2,
            v2: self.v,
            ..self
        }
    }
}

/// Anything the batch can sample from: a handle, draw-space dimensions and
/// the sampled sub-area.
pub trait TextureSurface {
    /// The underlying device texture, or `None` once disposed.
    fn texture_id(&self) -> Option<TextureId>;

    /// Natural width in draw units.
    fn width(&self) -> f32;

    /// Natural height in draw units.
    fn height(&self) -> f32;

    /// The area of the texture this surface samples.
    fn uv(&self) -> UvRect;
}

/// An owned device texture.
pub struct Texture {
    device: Arc<dyn RenderDevice>,
    id: Option<TextureId>,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn new(device: Arc<dyn RenderDevice>, width: u32, height: u32) -> Self {
        let id = device.create_texture(width, height);
        Self {
            device,
            id: Some(id),
            width,
            height,
        }
    }

    /// Adopts a texture id created elsewhere, for example by an image
    /// loader. The wrapper takes over deletion.
    pub fn from_raw(
        device: Arc<dyn RenderDevice>,
        id: TextureId,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            device,
            id: Some(id),
            width,
            height,
        }
    }

    pub fn id(&self) -> Option<TextureId> {
        self.id
    }

    /// Makes this texture current for sampling.
    pub fn bind(&self) -> RenderResult<()> {
        let id = self.id.ok_or(RenderError::TextureDisposed)?;
        self.device.bind_texture(id);
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_some()
    }

    pub fn pixel_width(&self) -> u32 {
        self.width
    }

    pub fn pixel_height(&self) -> u32 {
        self.height
    }

    /// Releases the device texture. Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some(id) = self.id.take() {
            self.device.delete_texture(id);
            debug!(?id, "disposed texture");
        }
    }
}

impl TextureSurface for Texture {
    fn texture_id(&self) -> Option<TextureId> {
        self.id
    }

    fn width(&self) -> f32 {
        self.width as f32
    }

    fn height(&self) -> f32 {
        self.height as f32
    }

    fn uv(&self) -> UvRect {
        UvRect::FULL
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// A rectangular part of a texture, in pixel coordinates.
#[derive(Clone, Copy)]
pub struct TextureRegion<'t> {
    texture: &'t Texture,
    rect: Rect<f32>,
    uv: UvRect,
}

impl<'t> TextureRegion<'t> {
    pub fn new(texture: &'t Texture, rect: Rect<f32>) -> Self {
        let uv = UvRect::from_pixels(rect, texture.pixel_width(), texture.pixel_height());
        Self { texture, rect, uv }
    }

    pub fn texture(&self) -> &'t Texture {
        self.texture
    }

    pub fn rect(&self) -> Rect<f32> {
        self.rect
    }
}

impl TextureSurface for TextureRegion<'_> {
    fn texture_id(&self) -> Option<TextureId> {
        self.texture.texture_id()
    }

    fn width(&self) -> f32 {
        self.rect.width
    }

    fn height(&self) -> f32 {
        self.rect.height
    }

    fn uv(&self) -> UvRect {
        self.uv
    }
}

/// Named pixel regions over one texture.
///
/// Regions can be placed freely or on a uniform grid, mirroring how sprite
/// sheets are usually laid out.
pub struct TextureAtlas {
    texture: Texture,
    regions: HashMap<String, Rect<f32>>,
}

impl TextureAtlas {
    pub fn new(texture: Texture) -> Self {
        Self {
            texture,
            regions: HashMap::default(),
        }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Registers a region at explicit pixel coordinates.
    pub fn insert(&mut self, name: impl Into<String>, rect: Rect<f32>) {
        self.regions.insert(name.into(), rect);
    }

    /// Registers a region by grid cell. Cell `(column, row)` of a uniform
    /// grid of `cell`-sized tiles starting at the top-left corner.
    pub fn insert_cell(&mut self, name: impl Into<String>, column: u32, row: u32, cell: Size<u32>) {
        let rect = Rect::new(
            (column * cell.width) as f32,
            (row * cell.height) as f32,
            cell.width as f32,
            cell.height as f32,
        );
        self.insert(name, rect);
    }

    /// Looks up a named region. Unknown names log a warning and return
    /// `None` so a missing sprite never takes the frame down.
    pub fn region(&self, name: &str) -> Option<TextureRegion<'_>> {
        match self.regions.get(name) {
            Some(rect) => Some(TextureRegion::new(&self.texture, *rect)),
            None => {
                warn!(name, "texture region not found");
                None
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
