//! Object pooling for hot per-frame allocations.
//!
//! [`Pool<T>`] keeps released values on a free list so the next
//! [`acquire`](Pool::acquire) reuses them instead of allocating. Values are
//! [`reset`](Poolable::reset) on release.
//!
//! # Example
//!
//! ```
//! use vellum_core::pool::{Pool, Poolable};
//!
//! #[derive(Debug, Default)]
//! struct Scratch {
//!     data: Vec<u8>,
//! }
//!
//! impl Poolable for Scratch {
//!     fn new_empty() -> Self {
//!         Self::default()
//!     }
//!     fn reset(&mut self) {
//!         self.data.clear();
//!     }
//! }
//!
//! let mut pool = Pool::<Scratch>::new();
//! let mut scratch = pool.acquire();
//! scratch.data.extend_from_slice(&[1, 2, 3]);
//! pool.release(scratch);
//!
//! let reused = pool.acquire();
//! assert!(reused.data.is_empty());
//! assert!(reused.data.capacity() >= 3);
//! ```

/// Trait for types that can be pooled and reused.
pub trait Poolable {
    /// Create a new empty instance.
    fn new_empty() -> Self;

    /// Reset the value to an empty state, preserving allocated capacity.
    fn reset(&mut self);
}

/// A free list of reusable values.
#[derive(Debug)]
pub struct Pool<T: Poolable> {
    free: Vec<T>,
    created: usize,
}

impl<T: Poolable> Pool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            created: 0,
        }
    }

    /// Take a value from the free list, or create one.
    pub fn acquire(&mut self) -> T {
        match self.free.pop() {
            Some(value) => value,
            None => {
                self.created += 1;
                T::new_empty()
            }
        }
    }

    /// Reset a value and return it to the free list.
    pub fn release(&mut self, mut value: T) {
        value.reset();
        self.free.push(value);
    }

    /// Release every value from an iterator.
    pub fn release_all(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.release(value);
        }
    }

    /// Number of values waiting on the free list.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of values ever created by this pool.
    pub fn created(&self) -> usize {
        self.created
    }
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct TestScratch {
        data: Vec<u32>,
    }

    impl Poolable for TestScratch {
        fn new_empty() -> Self {
            Self::default()
        }
        fn reset(&mut self) {
            self.data.clear();
        }
    }

    #[test]
    fn test_acquire_creates_when_empty() {
        let mut pool = Pool::<TestScratch>::new();
        let first = pool.acquire();
        let second = pool.acquire();
        assert_eq!(pool.created(), 2);
        pool.release_all([first, second]);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_release_resets_and_reuses() {
        let mut pool = Pool::<TestScratch>::new();
        let mut value = pool.acquire();
        value.data.extend(0..16);
        pool.release(value);

        let value = pool.acquire();
        assert!(value.data.is_empty());
        assert!(value.data.capacity() >= 16);
        assert_eq!(pool.created(), 1);
        assert_eq!(pool.available(), 0);
    }
}
