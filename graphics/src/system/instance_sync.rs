//! Base-instance emulation for instance-rate attributes.
//!
//! Without a native base-instance draw, an instanced draw starting at instance
//! `b` is issued as a regular instanced draw after re-pointing every
//! instance-rate attribute at `b * stride + offset` bytes. An
//! [`InstanceSyncProgram`] is the precomputed list of native calls doing that
//! for one attribute layout. Programs are cached process-wide by layout
//! signature, so geometries sharing a layout share one program.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use vellum_core::geometry::VertexFormat;

use crate::backend::{AttribPointer, BufferHandle, BufferTarget, GlBackend};

static SYNC_PROGRAMS: LazyLock<Mutex<HashMap<String, Arc<InstanceSyncProgram>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// One instance-rate attribute as seen by the sync program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncAttribute {
    /// Geometry buffer slot.
    pub slot: usize,
    /// Data format.
    pub format: VertexFormat,
    /// Resolved byte stride.
    pub stride: u32,
    /// Resolved byte offset.
    pub offset: u32,
    /// Shader location.
    pub location: u32,
}

/// A step of an [`InstanceSyncProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// Bind the buffer in this slot as the array buffer.
    BindBuffer(usize),
    /// Re-point an attribute at the current base instance.
    Pointer {
        /// Shader location.
        location: u32,
        /// Data format.
        format: VertexFormat,
        /// Byte stride.
        stride: u32,
        /// Byte offset of the attribute within an element.
        offset: u32,
    },
}

/// Precomputed pointer updates for one instance attribute layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSyncProgram {
    signature: String,
    steps: Vec<SyncStep>,
    buffer_switches: usize,
}

impl InstanceSyncProgram {
    /// Cache key of an attribute list: `slot/format/stride/offset@location`
    /// per attribute, in order.
    pub fn signature_of(attributes: &[SyncAttribute]) -> String {
        let mut signature = String::new();
        for (i, attr) in attributes.iter().enumerate() {
            if i > 0 {
                signature.push('|');
            }
            let _ = write!(
                signature,
                "{}/{}/{}/{}@{}",
                attr.slot, attr.format, attr.stride, attr.offset, attr.location
            );
        }
        signature
    }

    /// Build a program for `attributes`, bypassing the cache.
    ///
    /// A buffer bind step is emitted before the first attribute and at every
    /// buffer transition.
    pub fn compile(attributes: &[SyncAttribute]) -> Self {
        let mut steps = Vec::with_capacity(attributes.len() + 1);
        let mut current = None;
        let mut binds = 0usize;
        for attr in attributes {
            if current != Some(attr.slot) {
                steps.push(SyncStep::BindBuffer(attr.slot));
                current = Some(attr.slot);
                binds += 1;
            }
            steps.push(SyncStep::Pointer {
                location: attr.location,
                format: attr.format,
                stride: attr.stride,
                offset: attr.offset,
            });
        }

        Self {
            signature: Self::signature_of(attributes),
            steps,
            buffer_switches: binds.saturating_sub(1),
        }
    }

    /// Get the cached program for `attributes`, compiling it on first use.
    pub fn get_or_compile(attributes: &[SyncAttribute]) -> Arc<Self> {
        let signature = Self::signature_of(attributes);
        let mut cache = SYNC_PROGRAMS.lock();
        if let Some(program) = cache.get(&signature) {
            return Arc::clone(program);
        }
        let program = Arc::new(Self::compile(attributes));
        log::trace!("InstanceSyncProgram: compiled {signature}");
        cache.insert(signature, Arc::clone(&program));
        program
    }

    /// Layout signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[SyncStep] {
        &self.steps
    }

    /// Number of buffer changes between attributes. Zero when every
    /// attribute reads from one buffer.
    pub fn buffer_switches(&self) -> usize {
        self.buffer_switches
    }

    /// Re-point every attribute at `base_instance`.
    ///
    /// `buffers` maps geometry slots to native handles. `last_buffer` is the
    /// array buffer currently bound; binds to it are skipped. Returns the
    /// array buffer bound afterwards.
    pub fn run(
        &self,
        backend: &dyn GlBackend,
        base_instance: u32,
        buffers: &[BufferHandle],
        last_buffer: Option<BufferHandle>,
    ) -> Option<BufferHandle> {
        let mut bound = last_buffer;
        for step in &self.steps {
            match *step {
                SyncStep::BindBuffer(slot) => {
                    let Some(&handle) = buffers.get(slot) else {
                        log::error!("InstanceSyncProgram: no buffer in slot {slot}");
                        continue;
                    };
                    if bound != Some(handle) {
                        backend.bind_buffer(BufferTarget::Array, Some(handle));
                        bound = Some(handle);
                    }
                }
                SyncStep::Pointer {
                    location,
                    format,
                    stride,
                    offset,
                } => {
                    let byte_offset = base_instance as u64 * stride as u64 + offset as u64;
                    let pointer = AttribPointer::new(format, stride, byte_offset);
                    if format.is_integer() {
                        backend.vertex_attrib_ipointer(location, &pointer);
                    } else {
                        backend.vertex_attrib_pointer(location, &pointer);
                    }
                }
            }
        }
        bound
    }
}
