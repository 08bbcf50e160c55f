//! Buffer-to-buffer copy operations.
//!
//! A [`BufferCopyOperation`] moves `count` stride-sized elements from element
//! offset `src` of one buffer to element offset `dst` of another. Operations
//! are collected into a [`CopyBatch`]; batches are pooled so relocation loops
//! that run every frame reuse their allocations.

use crate::pool::Poolable;

/// Copy `count` elements from element offset `src` to element offset `dst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferCopyOperation {
    /// Source element offset.
    pub src: u32,
    /// Destination element offset.
    pub dst: u32,
    /// Number of elements.
    pub count: u32,
}

impl BufferCopyOperation {
    /// Create an operation.
    pub fn new(src: u32, dst: u32, count: u32) -> Self {
        Self { src, dst, count }
    }
}

impl Poolable for BufferCopyOperation {
    fn new_empty() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// An ordered list of copy operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyBatch {
    ops: Vec<BufferCopyOperation>,
}

impl CopyBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation.
    ///
    /// An operation that continues the previous one in both buffers is merged
    /// into it. Empty operations are dropped.
    pub fn push(&mut self, src: u32, dst: u32, count: u32) {
        if count == 0 {
            return;
        }
        if let Some(last) = self.ops.last_mut() {
            if last.src + last.count == src && last.dst + last.count == dst {
                last.count += count;
                return;
            }
        }
        self.ops.push(BufferCopyOperation::new(src, dst, count));
    }

    /// The operations.
    pub fn ops(&self) -> &[BufferCopyOperation] {
        &self.ops
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if the batch has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Total number of elements moved.
    pub fn element_count(&self) -> u64 {
        self.ops.iter().map(|op| op.count as u64).sum()
    }
}

impl Poolable for CopyBatch {
    fn new_empty() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.ops.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Pool;

    #[test]
    fn test_push_merges_contiguous_operations() {
        let mut batch = CopyBatch::new();
        batch.push(0, 100, 4);
        batch.push(4, 104, 2);
        batch.push(10, 106, 3);
        batch.push(13, 109, 0);
        assert_eq!(
            batch.ops(),
            &[
                BufferCopyOperation::new(0, 100, 6),
                BufferCopyOperation::new(10, 106, 3),
            ]
        );
        assert_eq!(batch.element_count(), 9);
    }

    #[test]
    fn test_pooled_batches_are_reset() {
        let mut pool = Pool::<CopyBatch>::new();
        let mut batch = pool.acquire();
        batch.push(1, 2, 3);
        pool.release(batch);
        assert!(pool.acquire().is_empty());
    }
}
