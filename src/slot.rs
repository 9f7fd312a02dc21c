//! Ring storage cell and its four-state ownership protocol.

use core::mem::MaybeUninit;

use crate::backoff::Spinner;
use crate::sync::{AtomicU8, Ordering, UnsafeCell};

/// Ownership phase of a slot.
///
/// Slots cycle `Empty -> Loading -> Loaded -> Unloading -> Empty` forever.
/// The thread that moved a slot into `Loading` or `Unloading` owns the payload
/// until it performs the next transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum SlotState {
    Empty = 0,
    Loading = 1,
    Loaded = 2,
    Unloading = 3,
}

impl SlotState {
    /// The only state this one may legally move to.
    pub(crate) const fn next(self) -> Self {
        match self {
            Self::Empty => Self::Loading,
            Self::Loading => Self::Loaded,
            Self::Loaded => Self::Unloading,
            Self::Unloading => Self::Empty,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Empty,
            1 => Self::Loading,
            2 => Self::Loaded,
            3 => Self::Unloading,
            _ => panic!("corrupt slot state tag"),
        }
    }
}

#[cfg(feature = "padded-slots")]
type StateTag = crossbeam_utils::CachePadded<AtomicU8>;
#[cfg(not(feature = "padded-slots"))]
type StateTag = AtomicU8;

#[cfg(feature = "padded-slots")]
fn state_tag(state: SlotState) -> StateTag {
    crossbeam_utils::CachePadded::new(AtomicU8::new(state as u8))
}

#[cfg(not(feature = "padded-slots"))]
fn state_tag(state: SlotState) -> StateTag {
    AtomicU8::new(state as u8)
}

/// One payload plus its state tag.
///
/// With the `padded-slots` feature the tag sits on its own cache line, so
/// threads spinning on a tag do not contend with the payload copy next door.
#[repr(C)]
pub(crate) struct Slot<T> {
    state: StateTag,
    data: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: `data` is only touched by the thread that holds the slot in
// `Loading` or `Unloading`, and the acquire/release pairs on `state` order
// those accesses.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: state_tag(SlotState::Empty),
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Spins until the slot moves `from -> from.next()` under this thread.
    #[inline]
    fn acquire_transition(&self, from: SlotState, spinner: &mut Spinner) {
        let to = from.next();
        while self
            .state
            .compare_exchange_weak(from as u8, to as u8, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spinner.snooze();
        }
    }

    /// Hands the slot to the next phase, publishing everything written before.
    #[inline]
    fn release_transition(&self, from: SlotState) {
        debug_assert_eq!(self.state(), from, "illegal slot transition");
        self.state.store(from.next() as u8, Ordering::Release);
    }

    /// Waits for the previous occupant to be vacated, then claims the slot
    /// for writing (`Empty -> Loading`).
    #[inline]
    pub(crate) fn claim_for_write(&self, spinner: &mut Spinner) {
        self.acquire_transition(SlotState::Empty, spinner);
    }

    /// Stores `value` and publishes it (`Loading -> Loaded`).
    ///
    /// # Safety
    ///
    /// The caller must hold the slot in `Loading` via [`Slot::claim_for_write`].
    #[inline]
    pub(crate) unsafe fn publish(&self, value: T) {
        self.data.with_mut(|ptr| unsafe {
            (*ptr).write(value);
        });
        self.release_transition(SlotState::Loading);
    }

    /// Waits for a published payload, then claims the slot for reading
    /// (`Loaded -> Unloading`).
    #[inline]
    pub(crate) fn claim_for_read(&self, spinner: &mut Spinner) {
        self.acquire_transition(SlotState::Loaded, spinner);
    }

    /// Moves the payload out and frees the slot (`Unloading -> Empty`).
    ///
    /// # Safety
    ///
    /// The caller must hold the slot in `Unloading` via [`Slot::claim_for_read`].
    #[inline]
    pub(crate) unsafe fn release(&self) -> T {
        let value = self.data.with(|ptr| unsafe { (*ptr).assume_init_read() });
        self.release_transition(SlotState::Unloading);
        value
    }

    /// Drops a payload that was published but never consumed.
    ///
    /// # Safety
    ///
    /// No other thread may access the slot.
    pub(crate) unsafe fn drop_loaded(&self) -> bool {
        if self.state() != SlotState::Loaded {
            return false;
        }
        self.data.with_mut(|ptr| unsafe { (*ptr).assume_init_drop() });
        self.state.store(SlotState::Empty as u8, Ordering::Relaxed);
        true
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::backoff::Backoff;

    #[test]
    fn cycle_is_closed() {
        let mut state = SlotState::Empty;
        let expected = [
            SlotState::Loading,
            SlotState::Loaded,
            SlotState::Unloading,
            SlotState::Empty,
        ];
        for want in expected {
            state = state.next();
            assert_eq!(state, want);
        }
    }

    #[test]
    fn single_thread_lifecycle() {
        let slot = Slot::<String>::new();
        let mut spinner = Backoff::Spin.spinner();
        assert_eq!(slot.state(), SlotState::Empty);

        slot.claim_for_write(&mut spinner);
        assert_eq!(slot.state(), SlotState::Loading);
        unsafe { slot.publish(String::from("payload")) };
        assert_eq!(slot.state(), SlotState::Loaded);

        slot.claim_for_read(&mut spinner);
        assert_eq!(slot.state(), SlotState::Unloading);
        let value = unsafe { slot.release() };
        assert_eq!(value, "payload");
        assert_eq!(slot.state(), SlotState::Empty);
    }

    #[test]
    fn drop_loaded_only_touches_published() {
        let slot = Slot::<Vec<u8>>::new();
        let mut spinner = Backoff::Spin.spinner();
        assert!(!unsafe { slot.drop_loaded() });

        slot.claim_for_write(&mut spinner);
        unsafe { slot.publish(vec![1, 2, 3]) };
        assert!(unsafe { slot.drop_loaded() });
        assert_eq!(slot.state(), SlotState::Empty);
    }

    #[cfg(feature = "padded-slots")]
    #[test]
    fn padded_tag_gets_its_own_line() {
        assert!(core::mem::size_of::<Slot<u8>>() >= 2 * core::mem::align_of::<StateTag>());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "illegal slot transition")]
    fn publish_without_claim_panics() {
        let slot = Slot::<u32>::new();
        unsafe { slot.publish(7) };
    }
}
