//! Growable element storage with GPU-side relocation.
//!
//! A [`GrowableBuffer`] hands out blocks of stride-sized elements from an
//! append-only buffer. When a request does not fit, the live blocks are
//! compacted into a bigger buffer with the first copier that accepts the
//! request. The replaced buffer is kept as a spare and reused by the next
//! relocation when it is large enough, so steady-state growth ping-pongs
//! between two allocations.
//!
//! # Example
//!
//! ```ignore
//! let mut storage = GrowableBuffer::new("particles", 32, 1024, BufferUsage::VERTEX)?
//!     .with_copier(Box::new(TransformFeedbackCopier::new(8)))
//!     .with_copier(Box::new(NativeBufferCopier::new()));
//!
//! let block = storage.allocate(&mut ctx, 256)?;
//! // Write particle data at `block.offset`, draw from `storage.buffer()`...
//! storage.free(block.id);
//! ```

use std::sync::Arc;

use vellum_core::buffer::{Buffer, BufferDescriptor, BufferUsage};
use vellum_core::copy::CopyBatch;
use vellum_core::pool::Pool;

use crate::error::GraphicsError;

use super::BufferCopier;

/// Identity of a [`BufferBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

/// A live block of elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferBlock {
    /// Block identity.
    pub id: BlockId,
    /// First element. Changes when the buffer is relocated.
    pub offset: u32,
    /// Number of elements.
    pub count: u32,
}

impl BufferBlock {
    /// One past the last element.
    pub fn end(&self) -> u32 {
        self.offset + self.count
    }
}

/// Append-only, relocatable element storage for context `C`.
pub struct GrowableBuffer<C: ?Sized> {
    label: String,
    usage: BufferUsage,
    stride_bytes: u32,
    buffer: Arc<Buffer>,
    spare: Option<Arc<Buffer>>,
    capacity: u32,
    cursor: u32,
    blocks: Vec<BufferBlock>,
    next_block: u64,
    generation: u64,
    batches: Pool<CopyBatch>,
    copiers: Vec<Box<dyn BufferCopier<C>>>,
}

impl<C: ?Sized> GrowableBuffer<C> {
    /// Create storage for `capacity` elements of `stride_bytes` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] for a zero stride or
    /// capacity.
    pub fn new(
        label: impl Into<String>,
        stride_bytes: u32,
        capacity: u32,
        usage: BufferUsage,
    ) -> Result<Self, GraphicsError> {
        let label = label.into();
        if stride_bytes == 0 || capacity == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "growable buffer {label:?} needs a non-zero stride and capacity"
            )));
        }
        let usage = usage | BufferUsage::COPY_SRC | BufferUsage::COPY_DST;
        let buffer = create_storage(&label, usage, stride_bytes, capacity)?;

        Ok(Self {
            label,
            usage,
            stride_bytes,
            buffer,
            spare: None,
            capacity,
            cursor: 0,
            blocks: Vec::new(),
            next_block: 0,
            generation: 0,
            batches: Pool::new(),
            copiers: Vec::new(),
        })
    }

    /// Append a copier. Copiers are tried in the order they were added.
    pub fn with_copier(mut self, copier: Box<dyn BufferCopier<C>>) -> Self {
        self.copiers.push(copier);
        self
    }

    /// The current buffer.
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// Element stride in bytes.
    pub fn stride_bytes(&self) -> u32 {
        self.stride_bytes
    }

    /// Capacity in elements.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of live elements.
    pub fn len(&self) -> u32 {
        self.blocks.iter().map(|block| block.count).sum()
    }

    /// Check if there are no live blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of relocations so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Get a live block.
    pub fn block(&self, id: BlockId) -> Option<BufferBlock> {
        self.blocks.iter().copied().find(|block| block.id == id)
    }

    /// Live blocks, in buffer order.
    pub fn blocks(&self) -> &[BufferBlock] {
        &self.blocks
    }

    /// Reserve `count` elements, relocating live blocks if they do not fit.
    ///
    /// # Errors
    ///
    /// - [`GraphicsError::InvalidParameter`] for an empty request.
    /// - [`GraphicsError::FeatureNotSupported`] if no copier accepted the
    ///   relocation. The storage is left unchanged.
    pub fn allocate(&mut self, ctx: &mut C, count: u32) -> Result<BufferBlock, GraphicsError> {
        if count == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "empty allocation from {:?}",
                self.label
            )));
        }
        if self.capacity - self.cursor < count {
            self.relocate(ctx, count)?;
        }

        let block = BufferBlock {
            id: BlockId(self.next_block),
            offset: self.cursor,
            count,
        };
        self.next_block += 1;
        self.cursor += count;
        self.blocks.push(block);
        Ok(block)
    }

    /// Release a block. Returns `false` if it was not live.
    pub fn free(&mut self, id: BlockId) -> bool {
        let Some(index) = self.blocks.iter().position(|block| block.id == id) else {
            return false;
        };
        let block = self.blocks.remove(index);
        if block.end() == self.cursor {
            self.cursor = self.blocks.last().map_or(0, BufferBlock::end);
        }
        true
    }

    fn relocate(&mut self, ctx: &mut C, count: u32) -> Result<(), GraphicsError> {
        let live = self.len();
        let needed = live + count;
        let target = match self.spare.take() {
            Some(spare) if capacity_of(&spare, self.stride_bytes) >= needed => spare,
            _ => {
                let capacity = needed.max(self.capacity.saturating_mul(2));
                create_storage(&self.label, self.usage, self.stride_bytes, capacity)?
            }
        };

        let mut batch = self.batches.acquire();
        let mut dst = 0;
        for block in &self.blocks {
            batch.push(block.offset, dst, block.count);
            dst += block.count;
        }

        let source = &self.buffer;
        let stride = self.stride_bytes;
        let copier = if batch.is_empty() {
            Some("none")
        } else {
            self.copiers
                .iter_mut()
                .find_map(|copier| {
                    copier
                        .do_copy(ctx, source, &target, stride, batch.ops(), batch.len())
                        .then(|| copier.name())
                })
        };
        let ops = batch.len();
        self.batches.release(batch);

        let Some(copier) = copier else {
            self.spare = Some(target);
            return Err(GraphicsError::FeatureNotSupported(format!(
                "no copier could relocate {:?} with stride {}",
                self.label, self.stride_bytes
            )));
        };

        let mut offset = 0;
        for block in &mut self.blocks {
            block.offset = offset;
            offset += block.count;
        }
        let old = std::mem::replace(&mut self.buffer, target);
        self.spare = Some(old);
        self.capacity = capacity_of(&self.buffer, self.stride_bytes);
        self.cursor = offset;
        self.generation += 1;

        log::debug!(
            "GrowableBuffer: relocated {live} elements of {:?} with {copier} ({ops} copies), capacity {}",
            self.label,
            self.capacity
        );
        Ok(())
    }
}

impl<C: ?Sized> std::fmt::Debug for GrowableBuffer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrowableBuffer")
            .field("label", &self.label)
            .field("stride_bytes", &self.stride_bytes)
            .field("capacity", &self.capacity)
            .field("cursor", &self.cursor)
            .field("blocks", &self.blocks.len())
            .field("generation", &self.generation)
            .field("copiers", &self.copiers.len())
            .finish()
    }
}

fn create_storage(
    label: &str,
    usage: BufferUsage,
    stride_bytes: u32,
    capacity: u32,
) -> Result<Arc<Buffer>, GraphicsError> {
    let size = stride_bytes as u64 * capacity as u64;
    Ok(Buffer::new(BufferDescriptor::new(size, usage).with_label(label))?)
}

fn capacity_of(buffer: &Buffer, stride_bytes: u32) -> u32 {
    (buffer.byte_length() / stride_bytes as u64) as u32
}
