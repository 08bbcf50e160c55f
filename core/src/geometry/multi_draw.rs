//! Multi-draw range batches.

use super::data::Geometry;

/// One range of a multi-draw batch.
///
/// `offset` and `count` are in elements: vertices for non-indexed geometry,
/// indices for indexed geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DrawRange {
    /// First vertex or index.
    pub offset: u32,
    /// Number of vertices or indices.
    pub count: u32,
    /// First instance.
    pub base_instance: u32,
    /// Number of instances.
    pub instance_count: u32,
}

impl DrawRange {
    /// Create a single-instance range.
    pub fn new(offset: u32, count: u32) -> Self {
        Self {
            offset,
            count,
            base_instance: 0,
            instance_count: 1,
        }
    }

    /// Draw `instance_count` instances starting at `base_instance`.
    pub fn with_instances(mut self, base_instance: u32, instance_count: u32) -> Self {
        self.base_instance = base_instance;
        self.instance_count = instance_count;
        self
    }
}

/// Parallel arrays of draw ranges, submitted as one multi-draw call or as an
/// emulated loop.
///
/// The four arrays always have the same length, which is the capacity.
/// Only the first [`count`](Self::count) entries are live.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultiDrawBuffer {
    offsets: Vec<u32>,
    counts: Vec<u32>,
    base_instances: Vec<u32>,
    instance_counts: Vec<u32>,
    count: usize,
}

impl MultiDrawBuffer {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch with room for `capacity` ranges.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buffer = Self::default();
        buffer.ensure_capacity(capacity);
        buffer
    }

    /// Number of live ranges.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Check if there are no live ranges.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Allocated length of the parallel arrays.
    pub fn capacity(&self) -> usize {
        self.offsets.len()
    }

    /// Grow the arrays to hold at least `capacity` ranges.
    ///
    /// Growth at least doubles; live ranges are preserved.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if capacity <= self.capacity() {
            return;
        }
        let new_capacity = capacity.max(self.capacity() * 2);
        self.offsets.resize(new_capacity, 0);
        self.counts.resize(new_capacity, 0);
        self.base_instances.resize(new_capacity, 0);
        self.instance_counts.resize(new_capacity, 0);
    }

    /// Append a range.
    pub fn push(&mut self, range: DrawRange) {
        self.ensure_capacity(self.count + 1);
        let i = self.count;
        self.offsets[i] = range.offset;
        self.counts[i] = range.count;
        self.base_instances[i] = range.base_instance;
        self.instance_counts[i] = range.instance_count;
        self.count += 1;
    }

    /// Append a range of virtual instances of `geometry`.
    ///
    /// See [`Geometry::virtual_range`].
    pub fn push_virtual(
        &mut self,
        geometry: &Geometry,
        first: u32,
        virtual_count: u32,
        base_instance: u32,
        instance_count: u32,
    ) {
        let range = geometry
            .virtual_range(first, virtual_count)
            .with_instances(base_instance, instance_count);
        self.push(range);
    }

    /// Drop every live range, keeping the capacity.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Get a live range.
    pub fn get(&self, index: usize) -> Option<DrawRange> {
        (index < self.count).then(|| DrawRange {
            offset: self.offsets[index],
            count: self.counts[index],
            base_instance: self.base_instances[index],
            instance_count: self.instance_counts[index],
        })
    }

    /// Iterate live ranges.
    pub fn ranges(&self) -> impl Iterator<Item = DrawRange> + '_ {
        (0..self.count).filter_map(|i| self.get(i))
    }

    /// Live offsets.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets[..self.count]
    }

    /// Live counts.
    pub fn counts(&self) -> &[u32] {
        &self.counts[..self.count]
    }

    /// Live base instances.
    pub fn base_instances(&self) -> &[u32] {
        &self.base_instances[..self.count]
    }

    /// Live instance counts.
    pub fn instance_counts(&self) -> &[u32] {
        &self.instance_counts[..self.count]
    }
}
