//! Lock-free bounded ring.
//!
//! Two-phase protocol:
//!
//! 1. **Reserve.** A producer CASes `tail` forward (a consumer CASes `head`),
//!    which gives it exclusive rights to position `index & mask` for this lap.
//! 2. **Hand off.** The slot's state tag arbitrates with whoever used that
//!    position one lap earlier: producers wait for `Empty`, consumers wait for
//!    `Loaded`. The release store that ends each phase is the only edge that
//!    makes a payload write (or the vacating read) visible to the peer.
//!
//! Counters run free and may overflow; only `tail - head` and `index & mask`
//! are ever used, both of which stay exact under wrapping arithmetic.

use core::fmt;

use crossbeam_utils::CachePadded;

use crate::backoff::Backoff;
use crate::config::QueueConfig;
use crate::error::{CapacityError, PushError};
use crate::slot::Slot;
use crate::sync::{spin_loop, AtomicUsize, Ordering};
use crate::trace::debug;
use crate::ConcurrentQueue;

/// Fixed-capacity MPMC queue coordinated purely through atomics.
///
/// ```
/// use handoff_queue::LockFreeQueue;
///
/// let queue = LockFreeQueue::with_capacity(64).unwrap();
/// queue.try_push(1).unwrap();
/// queue.try_push(2).unwrap();
/// assert_eq!(queue.try_pop(), Some(1));
/// assert_eq!(queue.try_pop(), Some(2));
/// assert_eq!(queue.try_pop(), None);
/// ```
pub struct LockFreeQueue<T> {
    /// Next position to consume.
    head: CachePadded<AtomicUsize>,
    /// Next position to produce into.
    tail: CachePadded<AtomicUsize>,
    slots: Box<[Slot<T>]>,
    mask: usize,
    backoff: Backoff,
}

// SAFETY: payloads move between threads only through the slot protocol.
unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}

impl<T> LockFreeQueue<T> {
    /// Creates a queue with [`DEFAULT_CAPACITY`](crate::DEFAULT_CAPACITY) slots.
    pub fn new() -> Self {
        match Self::with_config(QueueConfig::new()) {
            Ok(queue) => queue,
            Err(err) => panic!("{err}"),
        }
    }

    /// Creates a queue with `capacity` slots.
    ///
    /// `capacity` must be at least [`MIN_CAPACITY`](crate::MIN_CAPACITY) and,
    /// unlike a plain modulo ring, also a power of two: slot indices are the
    /// free-running counters masked by `capacity - 1`, which only stays
    /// consistent across counter overflow when `capacity` divides `2^64`.
    /// Values such as 96 or 100 are therefore rejected with
    /// [`CapacityError::NotPowerOfTwo`] rather than rounded.
    pub fn with_capacity(capacity: usize) -> Result<Self, CapacityError> {
        Self::with_config(QueueConfig::new().with_capacity(capacity))
    }

    /// Creates a queue from a full configuration.
    pub fn with_config(config: QueueConfig) -> Result<Self, CapacityError> {
        config.validate()?;
        let capacity = config.capacity;
        let slots: Box<[Slot<T>]> = (0..capacity).map(|_| Slot::new()).collect();

        debug!(capacity, backoff = ?config.backoff, "lock-free queue created");

        Ok(Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots,
            mask: capacity - 1,
            backoff: config.backoff,
        })
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot(&self, index: usize) -> &Slot<T> {
        &self.slots[index & self.mask]
    }

    /// Enqueues `value`, or hands it back if the ring is full.
    pub fn try_push(&self, value: T) -> Result<(), PushError<T>> {
        let capacity = self.capacity();
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let head = self.head.load(Ordering::Relaxed);
            let len = tail.wrapping_sub(head);
            if len == capacity {
                return Err(PushError(value));
            }
            if len > capacity {
                // `head` overtook our stale `tail`; only a fresh read can tell.
                spin_loop();
                tail = self.tail.load(Ordering::Relaxed);
                continue;
            }
            match self.tail.compare_exchange_weak(
                tail,
                tail.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => tail = current,
            }
        }

        let slot = self.slot(tail);
        slot.claim_for_write(&mut self.backoff.spinner());
        // SAFETY: the slot is held in `Loading` by this thread.
        unsafe { slot.publish(value) };
        Ok(())
    }

    /// Dequeues the oldest reserved element, or `None` if the ring is empty.
    pub fn try_pop(&self) -> Option<T> {
        let capacity = self.capacity();
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let tail = self.tail.load(Ordering::Relaxed);
            if tail == head {
                return None;
            }
            if tail.wrapping_sub(head) > capacity {
                // A peer consumer moved `head` past the `tail` we read; that
                // `tail` is stale and reserving now would overrun it.
                spin_loop();
                head = self.head.load(Ordering::Relaxed);
                continue;
            }
            match self.head.compare_exchange_weak(
                head,
                head.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => head = current,
            }
        }

        let slot = self.slot(head);
        slot.claim_for_read(&mut self.backoff.spinner());
        // SAFETY: the slot is held in `Unloading` by this thread.
        Some(unsafe { slot.release() })
    }

    /// Snapshot of the occupancy. Heuristic only: the two counters are not
    /// read as a pair.
    #[inline]
    pub fn was_size(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        Self::occupancy(head, tail, self.capacity())
    }

    /// `tail - head`, or zero when the pair is torn with `head` read ahead
    /// of `tail`.
    #[inline]
    fn occupancy(head: usize, tail: usize, capacity: usize) -> usize {
        let len = tail.wrapping_sub(head);
        if len > capacity {
            0
        } else {
            len
        }
    }

    /// Snapshot emptiness check. Heuristic only.
    #[inline]
    pub fn was_empty(&self) -> bool {
        self.was_size() == 0
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LockFreeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeQueue")
            .field("capacity", &self.capacity())
            .field("was_size", &self.was_size())
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    fn drop(&mut self) {
        let mut released = 0usize;
        for slot in self.slots.iter() {
            // SAFETY: `&mut self` rules out concurrent access.
            if unsafe { slot.drop_loaded() } {
                released += 1;
            }
        }
        if released > 0 {
            debug!(released, "dropped undelivered items with queue");
        }
    }
}

impl<T: Send> ConcurrentQueue<T> for LockFreeQueue<T> {
    #[inline]
    fn try_push(&self, value: T) -> Result<(), PushError<T>> {
        LockFreeQueue::try_push(self, value)
    }

    #[inline]
    fn try_pop(&self) -> Option<T> {
        LockFreeQueue::try_pop(self)
    }

    #[inline]
    fn was_empty(&self) -> bool {
        LockFreeQueue::was_empty(self)
    }

    #[inline]
    fn was_size(&self) -> usize {
        LockFreeQueue::was_size(self)
    }

    #[inline]
    fn capacity(&self) -> Option<usize> {
        Some(LockFreeQueue::capacity(self))
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::slot::SlotState;

    #[test]
    fn smoke() {
        let q = LockFreeQueue::<i32>::with_capacity(64).unwrap();
        q.try_push(42).unwrap();
        assert_eq!(q.try_pop(), Some(42));
    }

    #[test]
    fn fill_then_drain() {
        let q = LockFreeQueue::<usize>::with_capacity(64).unwrap();
        assert!(q.try_pop().is_none());
        for i in 0..64 {
            assert!(q.try_push(i).is_ok());
        }
        assert_eq!(q.try_push(99).map_err(PushError::into_inner), Err(99));
        for i in 0..64 {
            assert_eq!(q.try_pop(), Some(i));
        }
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn slots_return_to_empty() {
        let q = LockFreeQueue::<u8>::with_capacity(64).unwrap();
        for i in 0..10 {
            q.try_push(i).unwrap();
        }
        assert!(q.slots[..10].iter().all(|s| s.state() == SlotState::Loaded));
        while q.try_pop().is_some() {}
        assert!(q.slots.iter().all(|s| s.state() == SlotState::Empty));
    }

    #[test]
    fn counters_survive_overflow() {
        let q = LockFreeQueue::<usize>::with_capacity(64).unwrap();
        let start = usize::MAX - 5;
        q.head.store(start, Ordering::Relaxed);
        q.tail.store(start, Ordering::Relaxed);

        for i in 0..64 {
            q.try_push(i).unwrap();
        }
        assert!(q.try_push(64).is_err());
        assert_eq!(q.was_size(), 64);
        for i in 0..64 {
            assert_eq!(q.try_pop(), Some(i));
        }
        assert!(q.was_empty());
        assert_eq!(q.tail.load(Ordering::Relaxed), start.wrapping_add(64));
    }

    #[test]
    fn torn_snapshot_reads_empty() {
        assert_eq!(LockFreeQueue::<u8>::occupancy(11, 10, 64), 0);
        assert_eq!(LockFreeQueue::<u8>::occupancy(usize::MAX, 0, 64), 1);
        assert_eq!(LockFreeQueue::<u8>::occupancy(0, 64, 64), 64);
    }

    #[test]
    fn head_ahead_of_tail_is_not_full() {
        let q = LockFreeQueue::<u32>::with_capacity(64).unwrap();
        q.head.store(5, Ordering::Relaxed);
        q.tail.store(4, Ordering::Relaxed);
        assert_eq!(q.was_size(), 0);
        assert!(q.was_empty());
    }

    #[test]
    fn default_capacity() {
        let q = LockFreeQueue::<u64>::default();
        assert_eq!(q.capacity(), crate::DEFAULT_CAPACITY);
    }

    #[test]
    fn rejects_bad_capacity() {
        assert_eq!(
            LockFreeQueue::<u8>::with_capacity(16).unwrap_err(),
            CapacityError::TooSmall {
                requested: 16,
                minimum: 64
            }
        );
        assert_eq!(
            LockFreeQueue::<u8>::with_capacity(96).unwrap_err(),
            CapacityError::NotPowerOfTwo { requested: 96 }
        );
    }

    #[test]
    fn backoff_is_kept() {
        let config = QueueConfig::new().with_backoff(Backoff::Spin);
        let q = LockFreeQueue::<u8>::with_config(config).unwrap();
        assert_eq!(q.backoff, Backoff::Spin);
    }

    #[test]
    fn debug_output() {
        let q = LockFreeQueue::<u8>::with_capacity(64).unwrap();
        q.try_push(1).unwrap();
        let rendered = format!("{q:?}");
        assert!(rendered.contains("capacity: 64"));
        assert!(rendered.contains("was_size: 1"));
    }
}
