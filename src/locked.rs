//! Lock-based reference backend: a `VecDeque` behind a `parking_lot::Mutex`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::config::QueueConfig;
use crate::error::{CapacityError, PushError};
use crate::trace::debug;
use crate::ConcurrentQueue;

/// Unbounded FIFO guarded by a single mutex.
///
/// The lock is held only for one `push_back`/`pop_front`. The length is
/// mirrored into an atomic while the lock is held so that
/// [`was_size`](Self::was_size) can be read without taking it.
pub struct MutexQueue<T> {
    items: Mutex<VecDeque<T>>,
    len: AtomicUsize,
}

impl<T> MutexQueue<T> {
    /// Creates an empty queue sized for
    /// [`DEFAULT_CAPACITY`](crate::DEFAULT_CAPACITY) items.
    pub fn new() -> Self {
        Self::preallocated(QueueConfig::new().capacity)
    }

    /// Creates an empty queue with room for `capacity` items before it
    /// reallocates.
    ///
    /// The capacity is checked with the same rules as
    /// [`LockFreeQueue`](crate::LockFreeQueue) so that swapping backends never
    /// changes which configurations are accepted. It is not a bound: pushes
    /// always succeed.
    pub fn with_capacity(capacity: usize) -> Result<Self, CapacityError> {
        Self::with_config(QueueConfig::new().with_capacity(capacity))
    }

    /// Creates a queue from a full configuration. The backoff policy is unused.
    pub fn with_config(config: QueueConfig) -> Result<Self, CapacityError> {
        config.validate()?;
        Ok(Self::preallocated(config.capacity))
    }

    fn preallocated(capacity: usize) -> Self {
        debug!(capacity, "mutex queue created");
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            len: AtomicUsize::new(0),
        }
    }

    /// Appends `value`. Never fails.
    pub fn try_push(&self, value: T) -> Result<(), PushError<T>> {
        let mut items = self.items.lock();
        items.push_back(value);
        self.len.store(items.len(), Ordering::Relaxed);
        Ok(())
    }

    /// Removes the front element, or `None` if empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut items = self.items.lock();
        let value = items.pop_front()?;
        self.len.store(items.len(), Ordering::Relaxed);
        Some(value)
    }

    /// Lock-free snapshot of the length. Heuristic only.
    #[inline]
    pub fn was_size(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Lock-free snapshot emptiness check. Heuristic only.
    #[inline]
    pub fn was_empty(&self) -> bool {
        self.was_size() == 0
    }
}

impl<T> Default for MutexQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MutexQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexQueue")
            .field("was_size", &self.was_size())
            .finish()
    }
}

impl<T: Send> ConcurrentQueue<T> for MutexQueue<T> {
    #[inline]
    fn try_push(&self, value: T) -> Result<(), PushError<T>> {
        MutexQueue::try_push(self, value)
    }

    #[inline]
    fn try_pop(&self) -> Option<T> {
        MutexQueue::try_pop(self)
    }

    #[inline]
    fn was_empty(&self) -> bool {
        MutexQueue::was_empty(self)
    }

    #[inline]
    fn was_size(&self) -> usize {
        MutexQueue::was_size(self)
    }

    #[inline]
    fn capacity(&self) -> Option<usize> {
        None
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn push_never_fails() {
        let q = MutexQueue::with_capacity(64).unwrap();
        for i in 0..10_000 {
            assert!(q.try_push(i).is_ok());
        }
        assert_eq!(q.was_size(), 10_000);
        assert_eq!(q.try_pop(), Some(0));
        assert_eq!(q.was_size(), 9_999);
    }

    #[test]
    fn empty_pop() {
        let q = MutexQueue::<String>::new();
        assert!(q.try_pop().is_none());
        assert!(q.was_empty());
    }

    #[test]
    fn reports_unbounded() {
        let q = MutexQueue::<u8>::default();
        assert_eq!(ConcurrentQueue::capacity(&q), None);
    }

    #[test]
    fn validates_like_lock_free() {
        assert!(MutexQueue::<u8>::with_capacity(8).is_err());
        assert!(MutexQueue::<u8>::with_capacity(100).is_err());
    }
}
