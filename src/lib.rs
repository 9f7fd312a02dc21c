//! handoff_queue - bounded, non-blocking MPMC handoff queue.
//!
//! Two interchangeable backends share one contract:
//!
//! - [`LockFreeQueue`]: a fixed ring of slots. Producers and consumers reserve
//!   positions by CAS on free-running `tail`/`head` counters, then hand each
//!   slot off through a four-state tag (`Empty -> Loading -> Loaded ->
//!   Unloading`).
//! - [`MutexQueue`]: a `VecDeque` behind a `parking_lot::Mutex`. Unbounded.
//!
//! [`Queue`] binds to one of them at build time: the lock-free ring by
//! default, the mutex FIFO with the `lock-based` feature. Code that must work
//! with either can take `impl ConcurrentQueue<T>`.
//!
//! No operation ever parks the calling thread. A full push or an empty pop
//! returns immediately and the caller decides whether to retry, spin or yield.
//! Every accepted push is delivered to exactly one pop. A single producer
//! feeding a single consumer sees FIFO order; pushes racing from different
//! producers have no global order.
//!
//! ```
//! use handoff_queue::Queue;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(Queue::<u64>::new());
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || {
//!         for i in 0..100 {
//!             let mut item = i;
//!             while let Err(full) = queue.try_push(item) {
//!                 item = full.into_inner();
//!                 std::hint::spin_loop();
//!             }
//!         }
//!     })
//! };
//!
//! let mut sum = 0;
//! let mut received = 0;
//! while received < 100 {
//!     if let Some(v) = queue.try_pop() {
//!         sum += v;
//!         received += 1;
//!     }
//! }
//! producer.join().unwrap();
//! assert_eq!(sum, (0..100u64).sum::<u64>());
//! ```
#![warn(missing_docs)]

mod backoff;
mod config;
mod error;
mod lock_free;
mod locked;
mod slot;
mod sync;
mod trace;

pub use backoff::Backoff;
pub use config::QueueConfig;
pub use error::{CapacityError, PushError};
pub use lock_free::LockFreeQueue;
pub use locked::MutexQueue;
pub use trace::init_tracing;

/// Smallest ring the lock-free backend accepts.
pub const MIN_CAPACITY: usize = 64;

/// Ring size used by `new()` and `Default`.
pub const DEFAULT_CAPACITY: usize = 1024;

/// The queue selected for this build.
#[cfg(not(feature = "lock-based"))]
pub type Queue<T> = LockFreeQueue<T>;

/// The queue selected for this build.
#[cfg(feature = "lock-based")]
pub type Queue<T> = MutexQueue<T>;

/// The non-blocking operations every backend provides.
///
/// `false`-style results (`Err` from [`try_push`](Self::try_push), `None`
/// from [`try_pop`](Self::try_pop)) are the normal "try again later" signal
/// and never indicate a fault.
pub trait ConcurrentQueue<T>: Send + Sync {
    /// Enqueues `value`. On a full queue the value is returned untouched.
    fn try_push(&self, value: T) -> Result<(), PushError<T>>;

    /// Dequeues one element, or returns `None` if the queue is empty.
    fn try_pop(&self) -> Option<T>;

    /// Best-effort emptiness snapshot. Exact only once the queue is quiescent.
    fn was_empty(&self) -> bool;

    /// Best-effort occupancy snapshot. Exact only once the queue is quiescent.
    fn was_size(&self) -> usize;

    /// Slot count, or `None` for an unbounded backend.
    fn capacity(&self) -> Option<usize>;

    /// Out-parameter form of [`try_pop`](Self::try_pop): on success the
    /// element is moved into `out`, on an empty queue `out` is left as is.
    fn try_pop_into(&self, out: &mut T) -> bool {
        match self.try_pop() {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Pops up to `max` elements into `out` without waiting. Stops at the
    /// first empty observation and returns how many were moved.
    fn drain_into(&self, out: &mut Vec<T>, max: usize) -> usize {
        let mut moved = 0;
        while moved < max {
            match self.try_pop() {
                Some(value) => {
                    out.push(value);
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }
}
