//! Native buffer objects of one context.
//!
//! Buffers know nothing about the contexts that mirror them. This system keeps
//! a side table from [`BufferId`] to the native handle, the last synced update
//! counter, the allocated size and the number of geometries holding the
//! buffer. A buffer with no holders left is freed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use vellum_core::buffer::Buffer;
use vellum_core::resource::{BufferId, DisposeQueue};

use crate::backend::{BufferHandle, BufferTarget, GlBackend, UsageHint};
use crate::error::GraphicsError;

#[derive(Debug, Clone, Copy)]
struct GlBufferRecord {
    handle: BufferHandle,
    update_id: u64,
    allocated: u64,
    ref_count: u32,
}

/// Buffer mirrors of one context.
#[derive(Debug)]
pub struct GlBufferSystem {
    queue: Arc<DisposeQueue>,
    records: HashMap<BufferId, GlBufferRecord>,
    bound_array: Option<BufferHandle>,
}

impl GlBufferSystem {
    /// Create an empty system that subscribes buffers to `queue`.
    pub fn new(queue: Arc<DisposeQueue>) -> Self {
        Self {
            queue,
            records: HashMap::new(),
            bound_array: None,
        }
    }

    /// Get the native handle of a buffer, creating and uploading it if needed.
    ///
    /// The buffer's update counter is compared with the synced one on every
    /// call, so stale contents are never assumed current.
    pub fn ensure(
        &mut self,
        backend: &dyn GlBackend,
        buffer: &Buffer,
    ) -> Result<BufferHandle, GraphicsError> {
        let record = match self.records.entry(buffer.id()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let handle = backend.create_buffer()?;
                buffer.subscribe(&self.queue);
                log::trace!(
                    "GlBufferSystem: created {:?} for {:?} ({:?})",
                    handle,
                    buffer.label(),
                    buffer.id()
                );
                entry.insert(GlBufferRecord {
                    handle,
                    update_id: 0,
                    allocated: 0,
                    ref_count: 0,
                })
            }
        };

        if record.update_id != buffer.update_id() {
            upload(backend, record, buffer);
        }
        Ok(record.handle)
    }

    /// Native handle of a buffer, if this context has one.
    pub fn handle(&self, id: BufferId) -> Option<BufferHandle> {
        self.records.get(&id).map(|record| record.handle)
    }

    /// Number of geometries holding a buffer.
    pub fn ref_count(&self, id: BufferId) -> Option<u32> {
        self.records.get(&id).map(|record| record.ref_count)
    }

    /// Number of live buffer mirrors.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no buffer is mirrored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn inc_ref(&mut self, id: BufferId) {
        if let Some(record) = self.records.get_mut(&id) {
            record.ref_count += 1;
        }
    }

    /// Drop one holder; the native buffer is deleted when none remain.
    pub(crate) fn dec_ref(&mut self, backend: &dyn GlBackend, id: BufferId) {
        let Some(record) = self.records.get_mut(&id) else {
            return;
        };
        record.ref_count = record.ref_count.saturating_sub(1);
        if record.ref_count == 0 {
            self.dispose_buffer(backend, id, false);
        }
    }

    /// Forget a buffer. The native object is deleted unless the context was lost.
    pub fn dispose_buffer(&mut self, backend: &dyn GlBackend, id: BufferId, context_lost: bool) -> bool {
        let Some(record) = self.records.remove(&id) else {
            return false;
        };
        if self.bound_array == Some(record.handle) {
            self.bound_array = None;
        }
        if !context_lost {
            backend.delete_buffer(record.handle);
        }
        log::trace!("GlBufferSystem: released {:?} ({:?})", record.handle, id);
        true
    }

    /// Forget every buffer.
    pub fn dispose_all(&mut self, backend: &dyn GlBackend, context_lost: bool) {
        if !context_lost {
            for record in self.records.values() {
                backend.delete_buffer(record.handle);
            }
        }
        self.records.clear();
        self.bound_array = None;
    }

    /// Bind `handle` as the array buffer unless it already is.
    pub(crate) fn bind_array(&mut self, backend: &dyn GlBackend, handle: BufferHandle) {
        if self.bound_array != Some(handle) {
            backend.bind_buffer(BufferTarget::Array, Some(handle));
            self.bound_array = Some(handle);
        }
    }

    pub(crate) fn bound_array(&self) -> Option<BufferHandle> {
        self.bound_array
    }

    pub(crate) fn set_bound_array(&mut self, handle: Option<BufferHandle>) {
        self.bound_array = handle;
    }
}

/// Uploads go through the copy-write target so the bound vertex array's
/// element binding is never disturbed.
fn upload(backend: &dyn GlBackend, record: &mut GlBufferRecord, buffer: &Buffer) {
    let update_id = buffer.update_id();
    let target = BufferTarget::CopyWrite;
    let hint = if buffer.is_static() {
        UsageHint::Static
    } else {
        UsageHint::Dynamic
    };

    backend.bind_buffer(target, Some(record.handle));
    buffer.read(|data| match data {
        Some(data) => {
            let bytes = data.as_bytes();
            let size = bytes.len() as u64;
            if record.allocated > 0 && record.allocated >= size {
                backend.buffer_sub_data(target, 0, bytes);
            } else {
                backend.buffer_data(target, bytes, hint);
                record.allocated = size;
            }
        }
        None => {
            let size = buffer.byte_length();
            if record.allocated < size {
                backend.allocate_buffer(target, size, hint);
                record.allocated = size;
            }
        }
    });
    record.update_id = update_id;
}
