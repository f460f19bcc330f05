//! Vertex layouts and CPU-side vertex buffers.
//!
//! A [`VertexLayout`] describes how interleaved float data maps onto shader
//! attributes. A [`VertexBuffer`] accumulates that data on the CPU and hands
//! it to the device in one piece per flush.

use std::sync::Arc;

use lantern_test_utils::{PrimitiveKind, RenderDevice};

use crate::error::{RenderError, RenderResult};

/// One attribute of an interleaved vertex layout.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    pub location: u32,
    pub name: String,
    pub components: u32,
}

impl VertexAttribute {
    pub fn new(location: u32, name: impl Into<String>, components: u32) -> Self {
        Self {
            location,
            name: name.into(),
            components,
        }
    }
}

/// An ordered set of attributes sharing one interleaved buffer.
///
/// Attribute order in the layout is the order components appear within each
/// vertex. Locations must be unique; a duplicate is a bug in the caller and
/// panics immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    total_components: u32,
}

impl VertexLayout {
    pub fn new(attributes: Vec<VertexAttribute>) -> Self {
        for (i, a) in attributes.iter().enumerate() {
            for b in &attributes[i + 1..] {
                assert!(
                    a.location != b.location,
                    "attribute location {} used twice in layout",
                    a.location
                );
            }
        }
        let total_components = attributes.iter().map(|a| a.components).sum();
        Self {
            attributes,
            total_components,
        }
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Float components per vertex.
    pub fn total_components(&self) -> u32 {
        self.total_components
    }

    /// Byte distance between consecutive vertices.
    pub fn stride_bytes(&self) -> u32 {
        self.total_components * std::mem::size_of::<f32>() as u32
    }

    /// Float offset of attribute `index` from the start of a vertex.
    pub fn offset_of(&self, index: usize) -> u32 {
        self.attributes[..index].iter().map(|a| a.components).sum()
    }

    /// `(location, name)` pairs for pre-binding attribute locations at link.
    pub fn bindings(&self) -> Vec<(u32, &str)> {
        self.attributes
            .iter()
            .map(|a| (a.location, a.name.as_str()))
            .collect()
    }
}

/// A fixed-capacity CPU staging buffer for interleaved vertex data.
///
/// The buffer follows the classic position/limit protocol: writers `put`
/// floats at the position, `flip` before reading, and `clear` to start the
/// next frame. Binding points every layout attribute at the flipped region.
///
/// ```
/// use std::sync::Arc;
/// use lantern_render::{VertexAttribute, VertexBuffer, VertexLayout};
/// use lantern_test_utils::{PrimitiveKind, RecordingDevice};
///
/// let device = Arc::new(RecordingDevice::new());
/// let layout = VertexLayout::new(vec![VertexAttribute::new(0, "position", 2)]);
/// let mut buffer = VertexBuffer::new(device, layout, 12)?;
///
/// buffer.put(0.0).put(0.0).put(1.0).put(0.0).put(0.0).put(1.0);
/// buffer.flip();
/// buffer.bind();
/// buffer.draw(PrimitiveKind::Triangles, 0, 3);
/// buffer.unbind();
/// buffer.clear();
/// # Ok::<(), lantern_render::RenderError>(())
/// ```
pub struct VertexBuffer {
    device: Arc<dyn RenderDevice>,
    layout: VertexLayout,
    data: Vec<f32>,
    position: usize,
    limit: usize,
}

impl VertexBuffer {
    /// Allocates a buffer holding `capacity` floats.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        layout: VertexLayout,
        capacity: usize,
    ) -> RenderResult<Self> {
        if capacity == 0 {
            return Err(RenderError::ZeroCapacity);
        }
        Ok(Self {
            device,
            layout,
            data: vec![0.0; capacity],
            position: 0,
            limit: capacity,
        })
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Floats written since the last `clear` (or read cursor after `flip`).
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Writes one float at the position and advances it.
    pub fn put(&mut self, value: f32) -> &mut Self {
        debug_assert!(self.position < self.limit, "vertex buffer overflow");
        self.data[self.position] = value;
        self.position += 1;
        self
    }

    /// Writes a slice at the position and advances past it.
    pub fn put_slice(&mut self, values: &[f32]) -> &mut Self {
        let end = self.position + values.len();
        debug_assert!(end <= self.limit, "vertex buffer overflow");
        self.data[self.position..end].copy_from_slice(values);
        self.position = end;
        self
    }

    /// Switches from writing to reading: the written region becomes the
    /// bindable region.
    pub fn flip(&mut self) -> &mut Self {
        self.limit = self.position;
        self.position = 0;
        self
    }

    /// Resets for writing a fresh frame. Contents are not zeroed.
    pub fn clear(&mut self) -> &mut Self {
        self.position = 0;
        self.limit = self.data.len();
        self
    }

    /// Points every layout attribute at the flipped region and enables it.
    pub fn bind(&self) {
        let stride = self.layout.stride_bytes();
        let region = &self.data[..self.limit];
        for (index, attr) in self.layout.attributes().iter().enumerate() {
            self.device.bind_attribute(
                attr.location,
                attr.components,
                stride,
                self.layout.offset_of(index),
                region,
            );
        }
    }

    /// Disables every layout attribute.
    pub fn unbind(&self) {
        for attr in self.layout.attributes() {
            self.device.disable_attribute(attr.location);
        }
    }

    pub fn draw(&self, primitive: PrimitiveKind, first_vertex: usize, vertex_count: usize) {
        self.device.draw_arrays(primitive, first_vertex, vertex_count);
    }
}

#[cfg(test)]
mod tests {
    use lantern_test_utils::RecordingDevice;

    use super::*;

    fn sample_layout() -> VertexLayout {
        VertexLayout::new(vec![
            VertexAttribute::new(0, "position", 2),
            VertexAttribute::new(1, "color", 4),
            VertexAttribute::new(2, "texcoord", 2),
        ])
    }

    #[test]
    fn test_layout_stride_and_offsets() {
        let layout = sample_layout();
        assert_eq!(layout.total_components(), 8);
        assert_eq!(layout.stride_bytes(), 32);
        assert_eq!(layout.offset_of(0), 0);
        assert_eq!(layout.offset_of(1), 2);
        assert_eq!(layout.offset_of(2), 6);
    }

    #[test]
    fn test_layout_bindings_order() {
        let layout = sample_layout();
        assert_eq!(
            layout.bindings(),
            [(0, "position"), (1, "color"), (2, "texcoord")]
        );
    }

    #[test]
    #[should_panic(expected = "used twice")]
    fn test_layout_rejects_duplicate_locations() {
        VertexLayout::new(vec![
            VertexAttribute::new(0, "position", 2),
            VertexAttribute::new(0, "color", 4),
        ]);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let device = Arc::new(RecordingDevice::new());
        let result = VertexBuffer::new(device, sample_layout(), 0);
        assert_eq!(result.err(), Some(RenderError::ZeroCapacity));
    }

    #[test]
    fn test_put_flip_clear_cycle() {
        let device = Arc::new(RecordingDevice::new());
        let mut buffer = VertexBuffer::new(device, sample_layout(), 16).unwrap();

        buffer.put(1.0).put(2.0).put_slice(&[3.0, 4.0]);
        assert_eq!(buffer.position(), 4);

        buffer.flip();
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.limit(), 4);

        buffer.clear();
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.limit(), 16);
    }

    #[test]
    #[should_panic(expected = "vertex buffer overflow")]
    fn test_put_past_capacity_panics() {
        let device = Arc::new(RecordingDevice::new());
        let mut buffer = VertexBuffer::new(device, sample_layout(), 8).unwrap();

        for i in 0..8 {
            buffer.put(i as f32);
        }
        buffer.put(8.0);
    }

    #[test]
    #[should_panic(expected = "vertex buffer overflow")]
    fn test_put_slice_past_capacity_panics() {
        let device = Arc::new(RecordingDevice::new());
        let mut buffer = VertexBuffer::new(device, sample_layout(), 8).unwrap();

        buffer.put_slice(&[0.0; 4]);
        buffer.put_slice(&[0.0; 6]);
    }

    #[test]
    fn test_bind_points_every_attribute_at_flipped_region() {
        let device = Arc::new(RecordingDevice::new());
        let mut buffer = VertexBuffer::new(device.clone(), sample_layout(), 32).unwrap();

        for i in 0..8 {
            buffer.put(i as f32);
        }
        buffer.flip();
        buffer.bind();

        let calls = device.calls();
        assert_eq!(calls.len(), 3);
        // One upload of the flipped region, shared by all three attributes.
        let uploads = device.vertex_uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].len(), 8);
        assert_eq!(uploads[0][7], 7.0);
    }
}
