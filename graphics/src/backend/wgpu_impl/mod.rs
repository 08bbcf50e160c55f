//! WebGPU-style buffer context built on `wgpu`.
//!
//! There are no vertex array objects or transform feedback on this path:
//! [`WgpuContext`] only mirrors data-model buffers into `wgpu::Buffer`s so the
//! copy subsystem can relocate elements with `copy_buffer_to_buffer`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use vellum_core::buffer::{Buffer, BufferUsage};
use vellum_core::copy::BufferCopyOperation;
use vellum_core::resource::{BufferId, DisposeEvent, DisposeQueue};

use crate::copy::BufferCopier;
use crate::error::GraphicsError;

/// Copy offsets and sizes must be multiples of this.
const COPY_ALIGNMENT: u64 = wgpu::COPY_BUFFER_ALIGNMENT;

fn align(size: u64) -> u64 {
    size.max(COPY_ALIGNMENT).div_ceil(COPY_ALIGNMENT) * COPY_ALIGNMENT
}

fn usages(usage: BufferUsage) -> wgpu::BufferUsages {
    let mut usages = wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
    if usage.contains(BufferUsage::VERTEX) {
        usages |= wgpu::BufferUsages::VERTEX;
    }
    if usage.contains(BufferUsage::INDEX) {
        usages |= wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        usages |= wgpu::BufferUsages::UNIFORM;
    }
    usages
}

struct WgpuBufferRecord {
    buffer: wgpu::Buffer,
    update_id: u64,
}

/// Side table of `wgpu::Buffer`s for data-model buffers.
pub struct WgpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    buffers: HashMap<BufferId, WgpuBufferRecord>,
    dispose_queue: Arc<DisposeQueue>,
}

impl WgpuContext {
    /// Create a context on the first available adapter, without a surface.
    pub fn new_headless() -> Result<Self, GraphicsError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| GraphicsError::InitializationFailed(format!("No compatible GPU adapter: {e}")))?;

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Vellum Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| GraphicsError::InitializationFailed(format!("Device creation failed: {e}")))?;

        Ok(Self::from_device(Arc::new(device), Arc::new(queue)))
    }

    /// Create a context on an existing device.
    pub fn from_device(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            dispose_queue: DisposeQueue::new(),
        }
    }

    /// Get the wgpu device.
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the wgpu queue.
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Number of mirrored buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Mirror `buffer`, creating or re-uploading it when needed.
    ///
    /// Sizes are rounded up to [`wgpu::COPY_BUFFER_ALIGNMENT`] and uploads
    /// are zero-padded to match.
    pub fn ensure_buffer(&mut self, buffer: &Buffer) -> Result<wgpu::Buffer, GraphicsError> {
        if buffer.is_destroyed() {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer {:?} is destroyed",
                buffer.label()
            )));
        }

        let record = match self.buffers.entry(buffer.id()) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let native = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: buffer.label(),
                    size: align(buffer.byte_length()),
                    usage: usages(buffer.usage()),
                    mapped_at_creation: false,
                });
                buffer.subscribe(&self.dispose_queue);
                log::trace!(
                    "WgpuContext: created {} bytes for {:?} ({:?})",
                    native.size(),
                    buffer.label(),
                    buffer.id()
                );
                entry.insert(WgpuBufferRecord {
                    buffer: native,
                    update_id: 0,
                })
            }
        };

        if record.update_id != buffer.update_id() {
            if let Some(mut bytes) = buffer.to_bytes() {
                bytes.resize(align(bytes.len() as u64) as usize, 0);
                if bytes.len() as u64 > record.buffer.size() {
                    record.buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                        label: buffer.label(),
                        size: bytes.len() as u64,
                        usage: usages(buffer.usage()),
                        mapped_at_creation: false,
                    });
                }
                self.queue.write_buffer(&record.buffer, 0, &bytes);
            }
            record.update_id = buffer.update_id();
        }
        Ok(record.buffer.clone())
    }

    /// Read back the contents of a mirrored buffer.
    pub fn read_buffer(&self, id: BufferId) -> Result<Vec<u8>, GraphicsError> {
        let record = self.buffers.get(&id).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("{id:?} is not mirrored by this context"))
        })?;
        let size = record.buffer.size();

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vellum Readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Vellum Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(&record.buffer, 0, &staging, 0, size);
        let submission_index = self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::PollType::Wait {
            submission_index: Some(submission_index),
            timeout: Some(Duration::from_secs(10)),
        });

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(GraphicsError::ResourceCreationFailed(format!(
                    "buffer mapping failed: {e}"
                )));
            }
            Err(_) => {
                return Err(GraphicsError::ResourceCreationFailed(
                    "buffer mapping was never completed".to_owned(),
                ));
            }
        }

        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }

    /// Drop mirrors of destroyed buffers. Returns the number released.
    pub fn flush_disposals(&mut self) -> usize {
        let mut released = 0;
        for event in self.dispose_queue.drain() {
            if let DisposeEvent::Buffer(id) = event {
                if let Some(record) = self.buffers.remove(&id) {
                    record.buffer.destroy();
                    released += 1;
                }
            }
        }
        released
    }
}

impl std::fmt::Debug for WgpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuContext")
            .field("buffers", &self.buffers.len())
            .finish()
    }
}

/// Copies each operation with `copy_buffer_to_buffer` in one submission.
#[derive(Debug, Default, Clone, Copy)]
pub struct WgpuBufferCopier;

impl WgpuBufferCopier {
    /// Create a wgpu copier.
    pub fn new() -> Self {
        Self
    }
}

impl BufferCopier<WgpuContext> for WgpuBufferCopier {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn do_copy(
        &mut self,
        ctx: &mut WgpuContext,
        src: &Buffer,
        dst: &Buffer,
        stride_bytes: u32,
        ops: &[BufferCopyOperation],
        count: usize,
    ) -> bool {
        let stride = stride_bytes as u64;
        if stride == 0 || stride % COPY_ALIGNMENT != 0 {
            log::debug!(
                "WgpuBufferCopier: refusing stride {stride_bytes}, not a multiple of {COPY_ALIGNMENT}"
            );
            return false;
        }

        let (src_native, dst_native) = match (ctx.ensure_buffer(src), ctx.ensure_buffer(dst)) {
            (Ok(src), Ok(dst)) => (src, dst),
            (Err(err), _) | (_, Err(err)) => {
                log::error!("WgpuBufferCopier: {err}");
                return false;
            }
        };

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Vellum Copy Encoder"),
            });
        for op in ops.iter().take(count) {
            encoder.copy_buffer_to_buffer(
                &src_native,
                op.src as u64 * stride,
                &dst_native,
                op.dst as u64 * stride,
                op.count as u64 * stride,
            );
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
        true
    }
}
