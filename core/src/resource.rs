//! Resource identity and dispose notification.
//!
//! Data-model objects ([`Buffer`](crate::buffer::Buffer),
//! [`Geometry`](crate::geometry::Geometry)) know nothing about the rendering
//! contexts that hold native handles for them. Each context owns a
//! [`DisposeQueue`] and subscribes it to the objects it uploads; destroying an
//! object pushes a [`DisposeEvent`] into every live subscribed queue, and the
//! context drains the queue when it is ready to release native handles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Unique identity of a [`Buffer`](crate::buffer::Buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    pub(crate) fn next() -> Self {
        Self(next_id())
    }

    /// Raw numeric value, for logging.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Unique identity of a [`Geometry`](crate::geometry::Geometry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

impl GeometryId {
    pub(crate) fn next() -> Self {
        Self(next_id())
    }

    /// Raw numeric value, for logging.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A data-model object was destroyed and its native handles can be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisposeEvent {
    /// A buffer was destroyed.
    Buffer(BufferId),
    /// A geometry was destroyed.
    Geometry(GeometryId),
}

/// Per-context inbox of dispose events.
#[derive(Debug, Default)]
pub struct DisposeQueue {
    pending: Mutex<Vec<DisposeEvent>>,
}

impl DisposeQueue {
    /// Create an empty queue.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push an event.
    pub fn push(&self, event: DisposeEvent) {
        self.pending.lock().push(event);
    }

    /// Take every pending event, in the order they were pushed.
    pub fn drain(&self) -> Vec<DisposeEvent> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Check if no events are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

/// The subscriber list owned by a data-model object.
#[derive(Debug, Default)]
pub struct DisposeSignal {
    subscribers: Mutex<Vec<Weak<DisposeQueue>>>,
}

impl DisposeSignal {
    /// Create a signal with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a queue. Subscribing the same queue twice is a no-op.
    pub fn subscribe(&self, queue: &Arc<DisposeQueue>) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|weak| weak.strong_count() > 0);
        let already = subscribers
            .iter()
            .any(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(queue)));
        if !already {
            subscribers.push(Arc::downgrade(queue));
        }
    }

    /// Remove a queue from the subscriber list.
    pub fn unsubscribe(&self, queue: &Arc<DisposeQueue>) {
        self.subscribers
            .lock()
            .retain(|weak| weak.strong_count() > 0 && !std::ptr::eq(weak.as_ptr(), Arc::as_ptr(queue)));
    }

    /// Push `event` into every live subscriber and clear the list.
    pub fn emit(&self, event: DisposeEvent) {
        let subscribers = std::mem::take(&mut *self.subscribers.lock());
        for queue in subscribers.iter().filter_map(Weak::upgrade) {
            queue.push(event);
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

static_assertions::assert_impl_all!(DisposeQueue: Send, Sync);
static_assertions::assert_impl_all!(DisposeSignal: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = BufferId::next();
        let b = BufferId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn test_emit_reaches_every_subscriber_once() {
        let signal = DisposeSignal::new();
        let first = DisposeQueue::new();
        let second = DisposeQueue::new();
        signal.subscribe(&first);
        signal.subscribe(&first);
        signal.subscribe(&second);
        assert_eq!(signal.subscriber_count(), 2);

        let id = GeometryId::next();
        signal.emit(DisposeEvent::Geometry(id));

        assert_eq!(first.drain(), vec![DisposeEvent::Geometry(id)]);
        assert_eq!(second.drain(), vec![DisposeEvent::Geometry(id)]);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_queue_is_skipped() {
        let signal = DisposeSignal::new();
        {
            let queue = DisposeQueue::new();
            signal.subscribe(&queue);
        }
        assert_eq!(signal.subscriber_count(), 0);
        signal.emit(DisposeEvent::Buffer(BufferId::next()));
    }

    #[test]
    fn test_unsubscribe() {
        let signal = DisposeSignal::new();
        let queue = DisposeQueue::new();
        signal.subscribe(&queue);
        signal.unsubscribe(&queue);
        signal.emit(DisposeEvent::Buffer(BufferId::next()));
        assert!(queue.is_empty());
    }
}
