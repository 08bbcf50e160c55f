//! Geometry: buffers plus a shared attribute layout.
//!
//! This module provides:
//! - [`PrimitiveTopology`] - How vertices are assembled into primitives
//! - [`IndexFormat`] - Index data format (u16 or u32)
//! - [`GeometryDescriptor`] - Descriptor for creating geometries, optionally from a prototype
//! - [`Geometry`] - Buffer list, attribute layout, topology and instancing parameters

use std::sync::Arc;

use crate::buffer::{Buffer, BufferData, BufferUsage};
use crate::error::CoreError;
use crate::resource::{DisposeEvent, DisposeQueue, DisposeSignal, GeometryId};

use super::attribute::Attribute;
use super::format::VertexFormat;
use super::layout::GeometryLayout;
use super::multi_draw::DrawRange;

/// Primitive topology describing how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a separate point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Vertices form a connected strip of lines.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Vertices form a connected strip of triangles.
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Get the number of vertices per primitive (for non-strip topologies).
    pub fn vertices_per_primitive(&self) -> Option<u32> {
        match self {
            Self::PointList => Some(1),
            Self::LineList => Some(2),
            Self::TriangleList => Some(3),
            Self::LineStrip | Self::TriangleStrip => None,
        }
    }
}

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers.
    #[default]
    Uint16,
    /// 32-bit unsigned integers. Needs a context capability on some targets.
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> u32 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Where an attribute reads its data from.
#[derive(Debug, Clone)]
pub enum AttributeSource {
    /// An existing buffer, shared by reference.
    Buffer(Arc<Buffer>),
    /// An array that is promoted to a new vertex buffer.
    Data(BufferData),
}

impl AttributeSource {
    fn into_buffer(self, usage: BufferUsage) -> Arc<Buffer> {
        match self {
            Self::Buffer(buffer) => buffer,
            Self::Data(data) => Buffer::from_data(data, usage),
        }
    }
}

impl From<Arc<Buffer>> for AttributeSource {
    fn from(value: Arc<Buffer>) -> Self {
        Self::Buffer(value)
    }
}

impl From<&Arc<Buffer>> for AttributeSource {
    fn from(value: &Arc<Buffer>) -> Self {
        Self::Buffer(Arc::clone(value))
    }
}

impl From<BufferData> for AttributeSource {
    fn from(value: BufferData) -> Self {
        Self::Data(value)
    }
}

macro_rules! impl_source_from_vec {
    ($($ty:ty),*) => {
        $(
            impl From<Vec<$ty>> for AttributeSource {
                fn from(value: Vec<$ty>) -> Self {
                    Self::Data(value.into())
                }
            }
        )*
    };
}

impl_source_from_vec!(f32, u32, i32, u16, u8);

/// Declaration of one attribute in a [`GeometryDescriptor`].
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    /// Data format.
    pub format: VertexFormat,
    /// Source buffer. `None` uses the geometry's default vertex buffer.
    pub buffer: Option<AttributeSource>,
    /// Explicit stride in bytes.
    pub stride: Option<u32>,
    /// Explicit byte offset.
    pub offset: Option<u32>,
    /// Advance once per instance.
    pub instance: bool,
    /// Explicit shader location.
    pub location: Option<u32>,
}

impl AttributeDescriptor {
    /// Declare a per-vertex attribute on the default vertex buffer.
    pub fn new(format: VertexFormat) -> Self {
        Self {
            format,
            buffer: None,
            stride: None,
            offset: None,
            instance: false,
            location: None,
        }
    }

    /// Read from a specific buffer or array.
    pub fn with_buffer(mut self, buffer: impl Into<AttributeSource>) -> Self {
        self.buffer = Some(buffer.into());
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
}

impl From<VertexFormat> for AttributeDescriptor {
    fn from(format: VertexFormat) -> Self {
        Self::new(format)
    }
}

/// Snapshot of a prototype geometry's shared state.
#[derive(Debug, Clone)]
struct GeometryProto {
    layout: Arc<GeometryLayout>,
    buffers: Vec<Arc<Buffer>>,
    index_slot: Option<usize>,
}

/// Descriptor for creating a [`Geometry`].
///
/// # Example
///
/// ```
/// use vellum_core::geometry::{AttributeDescriptor, Geometry, GeometryDescriptor, VertexFormat};
///
/// let triangle = Geometry::new(
///     GeometryDescriptor::new()
///         .with_vertex_buffer(vec![0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0])
///         .with_attribute("aPosition", VertexFormat::Float32x2),
/// )
/// .unwrap();
/// assert_eq!(triangle.get_size(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeometryDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Attributes in declaration order.
    pub attributes: Vec<(String, AttributeDescriptor)>,
    /// Default vertex buffer (slot 0).
    pub vertex_buffer: Option<AttributeSource>,
    /// Index buffer holding `u16` or `u32` data.
    pub index_buffer: Option<AttributeSource>,
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Draw instanced.
    pub instanced: bool,
    /// Vertices per virtual instance.
    pub vertex_per_instance: u32,
    /// Indices per virtual instance.
    pub index_per_instance: u32,
    /// Default instance count.
    pub instance_count: u32,
    proto: Option<GeometryProto>,
}

impl GeometryDescriptor {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self {
            instance_count: 1,
            ..Default::default()
        }
    }

    /// Start from a prototype geometry.
    ///
    /// The new geometry shares the prototype's attribute layout and buffer
    /// list; [`with_vertex_buffer`](Self::with_vertex_buffer) and
    /// [`with_index_buffer`](Self::with_index_buffer) override single slots.
    /// Topology and instancing parameters are copied and can be overridden.
    pub fn with_proto(proto: &Geometry) -> Self {
        Self {
            label: proto.label.clone(),
            attributes: Vec::new(),
            vertex_buffer: None,
            index_buffer: None,
            topology: proto.topology,
            instanced: proto.instanced,
            vertex_per_instance: proto.vertex_per_instance,
            index_per_instance: proto.index_per_instance,
            instance_count: proto.instance_count,
            proto: Some(GeometryProto {
                layout: Arc::clone(&proto.layout),
                buffers: proto.buffers.clone(),
                index_slot: proto.index_slot,
            }),
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Declare an attribute.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        attribute: impl Into<AttributeDescriptor>,
    ) -> Self {
        self.attributes.push((name.into(), attribute.into()));
        self
    }

    /// Set the default vertex buffer.
    pub fn with_vertex_buffer(mut self, buffer: impl Into<AttributeSource>) -> Self {
        self.vertex_buffer = Some(buffer.into());
        self
    }

    /// Set the index buffer.
    pub fn with_index_buffer(mut self, buffer: impl Into<AttributeSource>) -> Self {
        self.index_buffer = Some(buffer.into());
        self
    }

    /// Set the primitive topology.
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Draw instanced with the given default instance count.
    pub fn with_instancing(mut self, instance_count: u32) -> Self {
        self.instanced = true;
        self.instance_count = instance_count;
        self
    }

    /// Set the virtual instance size used by multi-draw batching.
    pub fn with_virtual_instance(mut self, vertex_per_instance: u32, index_per_instance: u32) -> Self {
        self.vertex_per_instance = vertex_per_instance;
        self.index_per_instance = index_per_instance;
        self
    }
}

/// Buffers, a shared attribute layout, topology and instancing parameters.
///
/// Native handles (VAOs, buffer objects) live in the rendering contexts, keyed
/// by [`GeometryId`] and [`BufferId`](crate::resource::BufferId).
pub struct Geometry {
    id: GeometryId,
    label: Option<String>,
    layout: Arc<GeometryLayout>,
    buffers: Vec<Arc<Buffer>>,
    index_slot: Option<usize>,
    topology: PrimitiveTopology,
    instanced: bool,
    vertex_per_instance: u32,
    index_per_instance: u32,
    instance_count: u32,
    buffers_version: u64,
    layout_version: u64,
    destroyed: bool,
    dispose: DisposeSignal,
}

impl Geometry {
    /// Create a geometry from a descriptor.
    ///
    /// # Errors
    ///
    /// - [`CoreError::MissingVertexBuffer`] if an attribute has no buffer and
    ///   there is no default vertex buffer.
    /// - [`CoreError::InvalidIndexBuffer`] if the index buffer does not hold
    ///   `u16` or `u32` data.
    pub fn new(descriptor: GeometryDescriptor) -> Result<Self, CoreError> {
        let (layout, buffers, index_slot) = match descriptor.proto {
            Some(proto) => (proto.layout, proto.buffers, proto.index_slot),
            None => (Arc::new(GeometryLayout::new()), Vec::new(), None),
        };

        let mut geometry = Self {
            id: GeometryId::next(),
            label: descriptor.label,
            layout,
            buffers,
            index_slot,
            topology: descriptor.topology,
            instanced: descriptor.instanced,
            vertex_per_instance: descriptor.vertex_per_instance,
            index_per_instance: descriptor.index_per_instance,
            instance_count: descriptor.instance_count,
            buffers_version: 0,
            layout_version: 0,
            destroyed: false,
            dispose: DisposeSignal::new(),
        };

        if let Some(source) = descriptor.vertex_buffer {
            let buffer = source.into_buffer(BufferUsage::VERTEX);
            if geometry.buffers.is_empty() {
                geometry.buffers.push(buffer);
            } else {
                geometry.buffers[0] = buffer;
            }
        }

        for (name, attribute) in descriptor.attributes {
            geometry.add_attribute(name, attribute)?;
        }

        if let Some(source) = descriptor.index_buffer {
            geometry.set_index_buffer(source.into_buffer(BufferUsage::INDEX))?;
        }

        geometry.check_attributes();

        log::trace!(
            "Geometry: created {:?} ({:?}), {} attributes, {} buffers",
            geometry.label,
            geometry.id,
            geometry.layout.len(),
            geometry.buffers.len()
        );

        Ok(geometry)
    }

    /// Unique identity.
    pub fn id(&self) -> GeometryId {
        self.id
    }

    /// Debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The attribute layout.
    pub fn layout(&self) -> &GeometryLayout {
        &self.layout
    }

    /// Check if two geometries share one layout allocation.
    pub fn shares_layout_with(&self, other: &Geometry) -> bool {
        Arc::ptr_eq(&self.layout, &other.layout)
    }

    /// Check if the geometry declares attribute `name`.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.layout.contains(name)
    }

    /// Get an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.layout.get(name)
    }

    /// All buffer slots, including the index buffer.
    pub fn buffers(&self) -> &[Arc<Buffer>] {
        &self.buffers
    }

    /// Get the buffer in slot `index`.
    pub fn buffer(&self, index: usize) -> Option<&Arc<Buffer>> {
        self.buffers.get(index)
    }

    /// The index buffer, if any.
    pub fn index_buffer(&self) -> Option<&Arc<Buffer>> {
        self.index_slot.and_then(|slot| self.buffers.get(slot))
    }

    /// Slot of the index buffer in [`buffers`](Self::buffers).
    pub fn index_slot(&self) -> Option<usize> {
        self.index_slot
    }

    /// Index format of the index buffer's current data.
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.index_buffer().and_then(|buffer| buffer.index_format())
    }

    /// Number of indices, or `None` for non-indexed geometry.
    pub fn index_count(&self) -> Option<u32> {
        let buffer = self.index_buffer()?;
        let format = buffer.index_format()?;
        Some((buffer.byte_length() / format.size() as u64) as u32)
    }

    /// Primitive topology.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Set the primitive topology.
    pub fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.topology = topology;
    }

    /// Whether draws are instanced.
    pub fn instanced(&self) -> bool {
        self.instanced
    }

    /// Enable or disable instanced draws.
    pub fn set_instanced(&mut self, instanced: bool) {
        self.instanced = instanced;
    }

    /// Default instance count.
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Set the default instance count.
    pub fn set_instance_count(&mut self, instance_count: u32) {
        self.instance_count = instance_count;
    }

    /// Vertices per virtual instance.
    pub fn vertex_per_instance(&self) -> u32 {
        self.vertex_per_instance
    }

    /// Indices per virtual instance.
    pub fn index_per_instance(&self) -> u32 {
        self.index_per_instance
    }

    /// Counter bumped whenever a buffer slot is replaced.
    pub fn buffers_version(&self) -> u64 {
        self.buffers_version
    }

    /// Counter bumped whenever an attribute is added or replaced.
    ///
    /// Bound contexts compare it on every bind, independently of who ran
    /// [`check_attributes`](Self::check_attributes).
    pub fn layout_version(&self) -> u64 {
        self.layout_version
    }

    /// Register a named attribute.
    ///
    /// Without a buffer the attribute reads from the default vertex buffer
    /// (slot 0). A buffer already in the geometry is reused, not duplicated.
    /// The layout is copied first if it is shared with other geometries.
    pub fn add_attribute(
        &mut self,
        name: impl Into<String>,
        attribute: impl Into<AttributeDescriptor>,
    ) -> Result<(), CoreError> {
        let name = name.into();
        let descriptor = attribute.into();

        let buffer_index = match descriptor.buffer {
            Some(source) => self.attach_buffer(source.into_buffer(BufferUsage::VERTEX)),
            None if self.buffers.is_empty() || self.index_slot == Some(0) => {
                return Err(CoreError::MissingVertexBuffer(name));
            }
            None => 0,
        };

        let mut attribute = Attribute::new(descriptor.format).at_buffer(buffer_index);
        attribute.stride = descriptor.stride;
        attribute.offset = descriptor.offset;
        attribute.instance = descriptor.instance;
        attribute.location = descriptor.location;

        Arc::make_mut(&mut self.layout).add(name, attribute);
        self.layout_version += 1;
        Ok(())
    }

    fn attach_buffer(&mut self, buffer: Arc<Buffer>) -> usize {
        match self.buffers.iter().position(|b| b.id() == buffer.id()) {
            Some(index) => index,
            None => {
                self.buffers.push(buffer);
                self.buffers.len() - 1
            }
        }
    }

    /// Resolve packed strides and offsets if the layout changed.
    ///
    /// Returns `true` if the layout was recomputed.
    pub fn check_attributes(&mut self) -> bool {
        if !self.layout.is_dirty() {
            return false;
        }
        Arc::make_mut(&mut self.layout).check_attributes()
    }

    /// Number of vertices, derived from the first per-vertex attribute.
    ///
    /// Computed as the attribute buffer's byte length divided by the
    /// attribute's stride. Call [`check_attributes`](Self::check_attributes)
    /// after structural changes so the stride is current.
    pub fn get_size(&self) -> u32 {
        let attribute = self
            .layout
            .iter()
            .map(|(_, attr)| attr)
            .find(|attr| !attr.instance)
            .or_else(|| self.layout.iter().map(|(_, attr)| attr).next());

        let Some(attribute) = attribute else {
            return 0;
        };
        let Some(buffer) = self.buffers.get(attribute.buffer_index) else {
            return 0;
        };
        let stride = match attribute.stride() {
            0 => attribute.format.size(),
            stride => stride,
        };
        (buffer.byte_length() / stride as u64) as u32
    }

    /// Replace the buffer in slot `index`, returning the old one.
    ///
    /// Attribute metadata is untouched. Bound contexts notice the change
    /// through [`buffers_version`](Self::buffers_version) and move their
    /// buffer references on the next bind.
    ///
    /// # Errors
    ///
    /// - [`CoreError::BufferSlotOutOfRange`] if the slot does not exist.
    /// - [`CoreError::InvalidIndexBuffer`] if the slot holds the index buffer
    ///   and the new buffer is not valid index data.
    pub fn swap_buffer(&mut self, index: usize, buffer: Arc<Buffer>) -> Result<Arc<Buffer>, CoreError> {
        if index >= self.buffers.len() {
            return Err(CoreError::BufferSlotOutOfRange {
                index,
                len: self.buffers.len(),
            });
        }
        if self.index_slot == Some(index) {
            validate_index_buffer(&buffer)?;
        }
        let old = std::mem::replace(&mut self.buffers[index], buffer);
        self.buffers_version += 1;
        Ok(old)
    }

    /// Set or replace the index buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidIndexBuffer`] if the buffer does not hold
    /// `u16` or `u32` data.
    pub fn set_index_buffer(&mut self, buffer: Arc<Buffer>) -> Result<Option<Arc<Buffer>>, CoreError> {
        validate_index_buffer(&buffer)?;
        match self.index_slot {
            Some(slot) => {
                let old = std::mem::replace(&mut self.buffers[slot], buffer);
                self.buffers_version += 1;
                Ok(Some(old))
            }
            None => {
                self.buffers.push(buffer);
                self.index_slot = Some(self.buffers.len() - 1);
                self.buffers_version += 1;
                Ok(None)
            }
        }
    }

    /// Draw range covering `count` virtual instances starting at `first`.
    ///
    /// Virtual instances are fixed-size runs of indices (indexed geometry) or
    /// vertices (non-indexed geometry) packed back to back in one buffer.
    /// Ranges past `u32::MAX` elements saturate.
    pub fn virtual_range(&self, first: u32, count: u32) -> DrawRange {
        let per_instance = if self.index_slot.is_some() {
            self.index_per_instance
        } else {
            self.vertex_per_instance
        };
        DrawRange::new(
            first.saturating_mul(per_instance),
            count.saturating_mul(per_instance),
        )
    }

    /// Subscribe a context queue to this geometry's destruction.
    pub fn subscribe(&self, queue: &Arc<DisposeQueue>) {
        self.dispose.subscribe(queue);
    }

    /// Check if [`Geometry::destroy`] was called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Release the geometry's native state in every subscribed context.
    ///
    /// Buffers are left alive; they may be shared with other geometries.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.dispose.emit(DisposeEvent::Geometry(self.id));
        log::trace!("Geometry: destroyed {:?} ({:?})", self.label, self.id);
    }
}

fn validate_index_buffer(buffer: &Buffer) -> Result<(), CoreError> {
    if buffer.index_format().is_none() {
        return Err(CoreError::InvalidIndexBuffer(format!(
            "buffer {:?} ({:?}) does not hold u16 or u32 data",
            buffer.label(),
            buffer.id()
        )));
    }
    Ok(())
}

impl Drop for Geometry {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geometry")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("attributes", &self.layout.len())
            .field("buffers", &self.buffers.len())
            .field("topology", &self.topology)
            .field("instanced", &self.instanced)
            .field("instance_count", &self.instance_count)
            .finish()
    }
}

static_assertions::assert_impl_all!(Geometry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Geometry {
        Geometry::new(
            GeometryDescriptor::new()
                .with_label("triangle")
                .with_vertex_buffer(vec![0.0f32; 15])
                .with_attribute("aPosition", VertexFormat::Float32x2)
                .with_attribute("aColor", VertexFormat::Float32x3),
        )
        .unwrap()
    }

    #[test]
    fn test_default_vertex_buffer_and_packing() {
        let geometry = triangle();
        assert_eq!(geometry.buffers().len(), 1);
        assert_eq!(geometry.attribute("aColor").unwrap().offset(), 8);
        assert_eq!(geometry.attribute("aColor").unwrap().stride(), 20);
        assert_eq!(geometry.get_size(), 3);
    }

    #[test]
    fn test_attribute_without_vertex_buffer_fails() {
        let result = Geometry::new(
            GeometryDescriptor::new().with_attribute("aPosition", VertexFormat::Float32x2),
        );
        assert_eq!(
            result.unwrap_err(),
            CoreError::MissingVertexBuffer("aPosition".to_string())
        );
    }

    #[test]
    fn test_shared_buffer_is_not_duplicated() {
        let shared = Buffer::from_data(vec![0.0f32; 12], BufferUsage::VERTEX);
        let geometry = Geometry::new(
            GeometryDescriptor::new()
                .with_attribute(
                    "aPosition",
                    AttributeDescriptor::new(VertexFormat::Float32x2).with_buffer(&shared),
                )
                .with_attribute(
                    "aUV",
                    AttributeDescriptor::new(VertexFormat::Float32x2).with_buffer(&shared),
                ),
        )
        .unwrap();
        assert_eq!(geometry.buffers().len(), 1);
        assert_eq!(geometry.attribute("aUV").unwrap().offset(), 8);
        assert_eq!(geometry.get_size(), 3);
    }

    #[test]
    fn test_index_buffer_validation() {
        let result = Geometry::new(
            GeometryDescriptor::new()
                .with_vertex_buffer(vec![0.0f32; 6])
                .with_attribute("aPosition", VertexFormat::Float32x2)
                .with_index_buffer(vec![0.0f32, 1.0, 2.0]),
        );
        assert!(matches!(result, Err(CoreError::InvalidIndexBuffer(_))));

        let geometry = Geometry::new(
            GeometryDescriptor::new()
                .with_vertex_buffer(vec![0.0f32; 8])
                .with_attribute("aPosition", VertexFormat::Float32x2)
                .with_index_buffer(vec![0u16, 1, 2, 0, 2, 3]),
        )
        .unwrap();
        assert_eq!(geometry.index_format(), Some(IndexFormat::Uint16));
        assert_eq!(geometry.index_count(), Some(6));
        assert_eq!(geometry.index_slot(), Some(1));
    }

    #[test]
    fn test_swap_buffer_out_of_range() {
        let mut geometry = triangle();
        let replacement = Buffer::from_data(vec![1.0f32; 15], BufferUsage::VERTEX);
        let err = geometry.swap_buffer(3, replacement).unwrap_err();
        assert_eq!(err, CoreError::BufferSlotOutOfRange { index: 3, len: 1 });
        assert_eq!(geometry.buffers_version(), 0);
    }

    #[test]
    fn test_swap_buffer_keeps_layout() {
        let mut geometry = triangle();
        let before = geometry.layout().clone();
        let replacement = Buffer::from_data(vec![1.0f32; 30], BufferUsage::VERTEX);
        let old = geometry.swap_buffer(0, Arc::clone(&replacement)).unwrap();

        assert_ne!(old.id(), replacement.id());
        assert_eq!(geometry.layout(), &before);
        assert_eq!(geometry.buffer(0).unwrap().id(), replacement.id());
        assert_eq!(geometry.buffers_version(), 1);
        assert_eq!(geometry.get_size(), 6);
    }

    #[test]
    fn test_proto_shares_layout_and_overrides_vertex_buffer() {
        let proto = triangle();
        let clone = Geometry::new(
            GeometryDescriptor::with_proto(&proto).with_vertex_buffer(vec![2.0f32; 15]),
        )
        .unwrap();

        assert!(clone.shares_layout_with(&proto));
        assert_ne!(clone.buffer(0).unwrap().id(), proto.buffer(0).unwrap().id());
        assert_ne!(clone.id(), proto.id());
        assert_eq!(clone.topology(), proto.topology());
    }

    #[test]
    fn test_adding_attribute_to_clone_copies_layout() {
        let proto = triangle();
        let mut clone = Geometry::new(GeometryDescriptor::with_proto(&proto)).unwrap();
        clone
            .add_attribute(
                "aExtra",
                AttributeDescriptor::new(VertexFormat::Float32).with_buffer(vec![0.0f32; 3]),
            )
            .unwrap();
        assert!(!clone.shares_layout_with(&proto));
        assert!(clone.has_attribute("aExtra"));
        assert!(!proto.has_attribute("aExtra"));
        assert!(clone.check_attributes());
    }

    #[test]
    fn test_layout_version_tracks_attribute_changes() {
        let mut geometry = triangle();
        let version = geometry.layout_version();

        geometry.check_attributes();
        let _ = geometry.get_size();
        assert_eq!(geometry.layout_version(), version);

        geometry
            .add_attribute("aPosition", VertexFormat::Float32x3)
            .unwrap();
        assert_eq!(geometry.layout_version(), version + 1);
        geometry.check_attributes();
        assert_eq!(geometry.layout_version(), version + 1);
    }

    #[test]
    fn test_virtual_range() {
        let geometry = Geometry::new(
            GeometryDescriptor::new()
                .with_vertex_buffer(vec![0.0f32; 64])
                .with_attribute("aPosition", VertexFormat::Float32x2)
                .with_index_buffer(vec![0u16; 48])
                .with_virtual_instance(4, 6),
        )
        .unwrap();
        assert_eq!(geometry.virtual_range(2, 3), DrawRange::new(12, 18));

        let far = geometry.virtual_range(u32::MAX / 2, u32::MAX);
        assert_eq!(far.offset, u32::MAX);
        assert_eq!(far.count, u32::MAX);
    }

    #[test]
    fn test_destroy_notifies_subscribers() {
        let mut geometry = triangle();
        let queue = DisposeQueue::new();
        geometry.subscribe(&queue);
        geometry.destroy();
        geometry.destroy();
        assert_eq!(queue.drain(), vec![DisposeEvent::Geometry(geometry.id())]);
        assert!(geometry.is_destroyed());
    }
}
