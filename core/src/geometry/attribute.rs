//! Vertex attributes.

use super::format::VertexFormat;

/// Describes how one named vertex channel reads from a geometry buffer.
///
/// `stride` and `offset` are optional at declaration time; the missing ones
/// are filled in by [`GeometryLayout::check_attributes`] by packing every
/// attribute that shares a buffer in declaration order.
///
/// [`GeometryLayout::check_attributes`]: super::GeometryLayout::check_attributes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Index of the geometry buffer this attribute reads from.
    pub buffer_index: usize,
    /// Data format.
    pub format: VertexFormat,
    /// Declared stride in bytes, `None` to pack.
    pub stride: Option<u32>,
    /// Declared byte offset, `None` to pack.
    pub offset: Option<u32>,
    /// Advance once per instance instead of once per vertex.
    pub instance: bool,
    /// Explicit shader location, overriding the program's.
    pub location: Option<u32>,
    resolved_stride: u32,
    resolved_offset: u32,
}

impl Attribute {
    /// Create a per-vertex attribute on buffer 0 with packed stride and offset.
    pub fn new(format: VertexFormat) -> Self {
        Self {
            buffer_index: 0,
            format,
            stride: None,
            offset: None,
            instance: false,
            location: None,
            resolved_stride: format.size(),
            resolved_offset: 0,
        }
    }

    /// Read from the given buffer slot.
    pub fn at_buffer(mut self, buffer_index: usize) -> Self {
        self.buffer_index = buffer_index;
        self
    }

    /// Use an explicit stride.
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = Some(stride);
        self
    }

    /// Use an explicit byte offset.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Advance once per instance.
    pub fn per_instance(mut self) -> Self {
        self.instance = true;
        self
    }

    /// Bind at an explicit shader location.
    pub fn with_location(mut self, location: u32) -> Self {
        self.location = Some(location);
        self
    }

    /// Effective stride in bytes.
    pub fn stride(&self) -> u32 {
        self.resolved_stride
    }

    /// Effective byte offset.
    pub fn offset(&self) -> u32 {
        self.resolved_offset
    }

    pub(crate) fn resolve(&mut self, packed_stride: u32, packed_offset: u32) {
        self.resolved_stride = self.stride.unwrap_or(packed_stride);
        self.resolved_offset = self.offset.unwrap_or(packed_offset);
    }
}
