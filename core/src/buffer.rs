//! Buffers: CPU-side typed data plus update versioning.
//!
//! A [`Buffer`] owns the CPU mirror of a block of GPU memory. It never owns a
//! native handle itself; rendering contexts keep their own side tables keyed
//! by [`BufferId`] and compare [`Buffer::update_id`] with the value they last
//! uploaded to decide whether to re-upload.
//!
//! # Example
//!
//! ```
//! use vellum_core::buffer::{Buffer, BufferData, BufferUsage};
//!
//! let buffer = Buffer::from_data(vec![0.0f32, 1.0, 2.0], BufferUsage::VERTEX);
//! let before = buffer.update_id();
//! buffer.modify(|data| {
//!     if let BufferData::F32(values) = data {
//!         values[0] = 5.0;
//!     }
//! });
//! assert!(buffer.update_id() > before);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;

use crate::error::CoreError;
use crate::geometry::IndexFormat;
use crate::resource::{BufferId, DisposeEvent, DisposeQueue, DisposeSignal};

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 3;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 4;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::VERTEX
    }
}

/// Typed CPU-side contents of a buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferData {
    /// 32-bit floats.
    F32(Vec<f32>),
    /// 32-bit unsigned integers.
    U32(Vec<u32>),
    /// 32-bit signed integers.
    I32(Vec<i32>),
    /// 16-bit unsigned integers.
    U16(Vec<u16>),
    /// Raw bytes.
    U8(Vec<u8>),
}

impl BufferData {
    /// View the data as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::F32(v) => bytemuck::cast_slice(v),
            Self::U32(v) => bytemuck::cast_slice(v),
            Self::I32(v) => bytemuck::cast_slice(v),
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::U8(v) => v,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U8(v) => v.len(),
        }
    }

    /// Check if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        match self {
            Self::F32(_) | Self::U32(_) | Self::I32(_) => 4,
            Self::U16(_) => 2,
            Self::U8(_) => 1,
        }
    }

    /// Size of the whole array in bytes.
    pub fn byte_length(&self) -> u64 {
        (self.len() * self.element_size()) as u64
    }

    /// Index format implied by the element type, if it is a valid index type.
    pub fn index_format(&self) -> Option<IndexFormat> {
        match self {
            Self::U16(_) => Some(IndexFormat::Uint16),
            Self::U32(_) => Some(IndexFormat::Uint32),
            _ => None,
        }
    }
}

impl From<Vec<f32>> for BufferData {
    fn from(value: Vec<f32>) -> Self {
        Self::F32(value)
    }
}

impl From<Vec<u32>> for BufferData {
    fn from(value: Vec<u32>) -> Self {
        Self::U32(value)
    }
}

impl From<Vec<i32>> for BufferData {
    fn from(value: Vec<i32>) -> Self {
        Self::I32(value)
    }
}

impl From<Vec<u16>> for BufferData {
    fn from(value: Vec<u16>) -> Self {
        Self::U16(value)
    }
}

impl From<Vec<u8>> for BufferData {
    fn from(value: Vec<u8>) -> Self {
        Self::U8(value)
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Initial CPU data. `None` creates a GPU-only buffer of `size` bytes.
    pub data: Option<BufferData>,
    /// Size in bytes, used when `data` is `None`.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
    /// Hint that the contents rarely change after the first upload.
    pub is_static: bool,
}

impl BufferDescriptor {
    /// Create a descriptor for a GPU-only buffer of `size` bytes.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            data: None,
            size,
            usage,
            is_static: false,
        }
    }

    /// Create a descriptor initialised with CPU data.
    pub fn with_data(data: impl Into<BufferData>, usage: BufferUsage) -> Self {
        let data = data.into();
        Self {
            label: None,
            size: data.byte_length(),
            data: Some(data),
            usage,
            is_static: false,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Mark the buffer as static.
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}

struct BufferState {
    data: Option<BufferData>,
    byte_length: u64,
    is_static: bool,
}

/// A block of vertex, index or uniform data with a CPU mirror.
///
/// Buffers are shared between geometries as `Arc<Buffer>`. Contents are
/// mutated through [`Buffer::set_data`] or [`Buffer::modify`], both of which
/// advance the update counter; GPU mirrors re-check the counter on every bind.
pub struct Buffer {
    id: BufferId,
    usage: BufferUsage,
    label: Option<String>,
    state: RwLock<BufferState>,
    update_id: AtomicU64,
    destroyed: AtomicBool,
    dispose: DisposeSignal,
}

impl Buffer {
    /// Create a buffer from a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ZeroSizedBuffer`] if the descriptor has no data and
    /// a zero size.
    pub fn new(descriptor: BufferDescriptor) -> Result<Arc<Self>, CoreError> {
        let byte_length = descriptor
            .data
            .as_ref()
            .map(BufferData::byte_length)
            .unwrap_or(descriptor.size);
        if descriptor.data.is_none() && byte_length == 0 {
            return Err(CoreError::ZeroSizedBuffer(
                descriptor.label.unwrap_or_default(),
            ));
        }

        let buffer = Self {
            id: BufferId::next(),
            usage: descriptor.usage,
            label: descriptor.label,
            state: RwLock::new(BufferState {
                data: descriptor.data,
                byte_length,
                is_static: descriptor.is_static,
            }),
            update_id: AtomicU64::new(1),
            destroyed: AtomicBool::new(false),
            dispose: DisposeSignal::new(),
        };

        log::trace!(
            "Buffer: created {:?} ({:?}), {} bytes",
            buffer.label,
            buffer.id,
            byte_length
        );

        Ok(Arc::new(buffer))
    }

    /// Promote an array to a buffer.
    pub fn from_data(data: impl Into<BufferData>, usage: BufferUsage) -> Arc<Self> {
        let data = data.into();
        let byte_length = data.byte_length();
        Arc::new(Self {
            id: BufferId::next(),
            usage,
            label: None,
            state: RwLock::new(BufferState {
                data: Some(data),
                byte_length,
                is_static: false,
            }),
            update_id: AtomicU64::new(1),
            destroyed: AtomicBool::new(false),
            dispose: DisposeSignal::new(),
        })
    }

    /// Unique identity of this buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Usage flags.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Size of the buffer in bytes.
    pub fn byte_length(&self) -> u64 {
        self.state.read().byte_length
    }

    /// Whether the buffer was hinted as static.
    pub fn is_static(&self) -> bool {
        self.state.read().is_static
    }

    /// Check if the buffer holds CPU data.
    pub fn has_data(&self) -> bool {
        self.state.read().data.is_some()
    }

    /// Index format of the CPU data, if it is 16-bit or 32-bit unsigned.
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.state
            .read()
            .data
            .as_ref()
            .and_then(BufferData::index_format)
    }

    /// Monotonic counter advanced by every update.
    pub fn update_id(&self) -> u64 {
        self.update_id.load(Ordering::Acquire)
    }

    /// Read the CPU data.
    pub fn read<R>(&self, f: impl FnOnce(Option<&BufferData>) -> R) -> R {
        f(self.state.read().data.as_ref())
    }

    /// Copy the CPU data out as bytes.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        self.read(|data| data.map(|d| d.as_bytes().to_vec()))
    }

    /// Replace the CPU data and bump the update counter.
    pub fn set_data(&self, data: impl Into<BufferData>) {
        let data = data.into();
        {
            let mut state = self.state.write();
            state.byte_length = data.byte_length();
            state.data = Some(data);
        }
        self.update();
    }

    /// Mutate the CPU data in place and bump the update counter.
    ///
    /// Does nothing for GPU-only buffers.
    pub fn modify<R>(&self, f: impl FnOnce(&mut BufferData) -> R) -> Option<R> {
        let result = {
            let mut state = self.state.write();
            let result = state.data.as_mut().map(f);
            if let Some(byte_length) = state.data.as_ref().map(BufferData::byte_length) {
                state.byte_length = byte_length;
            }
            result
        };
        if result.is_some() {
            self.update();
        }
        result
    }

    /// Mark the contents as changed.
    pub fn update(&self) {
        self.update_id.fetch_add(1, Ordering::AcqRel);
    }

    /// Subscribe a context queue to this buffer's destruction.
    pub fn subscribe(&self, queue: &Arc<DisposeQueue>) {
        self.dispose.subscribe(queue);
    }

    /// Check if [`Buffer::destroy`] was called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Drop the CPU data and notify every subscribed context.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.write().data = None;
        self.dispose.emit(DisposeEvent::Buffer(self.id));
        log::trace!("Buffer: destroyed {:?} ({:?})", self.label, self.id);
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("usage", &self.usage)
            .field("byte_length", &self.byte_length())
            .field("update_id", &self.update_id())
            .finish()
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_data_bytes() {
        let data = BufferData::from(vec![1u16, 2, 3]);
        assert_eq!(data.byte_length(), 6);
        assert_eq!(data.element_size(), 2);
        assert_eq!(data.as_bytes(), &[1, 0, 2, 0, 3, 0]);
        assert_eq!(data.index_format(), Some(IndexFormat::Uint16));
        assert_eq!(BufferData::from(vec![1.0f32]).index_format(), None);
    }

    #[test]
    fn test_update_counter_advances() {
        let buffer = Buffer::from_data(vec![0.0f32; 4], BufferUsage::VERTEX);
        let first = buffer.update_id();
        buffer.update();
        let second = buffer.update_id();
        buffer.set_data(vec![1.0f32; 8]);
        let third = buffer.update_id();
        assert!(first < second && second < third);
        assert_eq!(buffer.byte_length(), 32);
    }

    #[test]
    fn test_modify_gpu_only_buffer_is_noop() {
        let buffer = Buffer::new(BufferDescriptor::new(64, BufferUsage::COPY_DST)).unwrap();
        let before = buffer.update_id();
        assert!(buffer.modify(|_| ()).is_none());
        assert_eq!(buffer.update_id(), before);
        assert_eq!(buffer.byte_length(), 64);
        assert!(!buffer.has_data());
    }

    #[test]
    fn test_zero_sized_buffer_rejected() {
        let result = Buffer::new(BufferDescriptor::new(0, BufferUsage::VERTEX).with_label("empty"));
        assert_eq!(
            result.unwrap_err(),
            CoreError::ZeroSizedBuffer("empty".to_string())
        );
    }

    #[test]
    fn test_destroy_notifies_once() {
        let buffer = Buffer::from_data(vec![0u32; 3], BufferUsage::INDEX);
        let queue = DisposeQueue::new();
        buffer.subscribe(&queue);
        buffer.destroy();
        buffer.destroy();
        assert_eq!(queue.drain(), vec![DisposeEvent::Buffer(buffer.id())]);
        assert!(buffer.is_destroyed());
        assert!(!buffer.has_data());
    }
}
