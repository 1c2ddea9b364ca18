//! Write-once broadcast slot.

use parking_lot::Mutex;

/// A subscriber waiting on a slot.
pub(crate) type Subscriber<T> = Box<dyn FnOnce(T) + Send>;

enum SlotState<T> {
    /// Not yet written; subscribers wait here.
    Empty(Vec<Subscriber<T>>),
    /// Written; the value is final.
    Written(T),
    /// Will never be written; new subscribers are dropped.
    Closed,
}

/// A slot that can be written once and notifies every subscriber.
///
/// Subscribers registered after the write are invoked immediately with a
/// clone of the stored value; those registered after [`Slot::close`] are
/// dropped. Subscribers always run outside the lock.
pub(crate) struct Slot<T: Clone> {
    state: Mutex<SlotState<T>>,
}

impl<T: Clone> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty(Vec::new())),
        }
    }

    pub(crate) fn written(value: T) -> Self {
        Self {
            state: Mutex::new(SlotState::Written(value)),
        }
    }

    pub(crate) fn closed() -> Self {
        Self {
            state: Mutex::new(SlotState::Closed),
        }
    }

    /// Writes the slot. Returns false if it was already written or closed.
    pub(crate) fn write(&self, value: T) -> bool {
        let waiting = {
            let mut state = self.state.lock();
            if !matches!(*state, SlotState::Empty(_)) {
                return false;
            }
            match std::mem::replace(&mut *state, SlotState::Written(value.clone())) {
                SlotState::Empty(waiting) => waiting,
                SlotState::Written(_) | SlotState::Closed => Vec::new(),
            }
        };

        for subscriber in waiting {
            subscriber(value.clone());
        }
        true
    }

    pub(crate) fn subscribe(&self, subscriber: Subscriber<T>) {
        let mut state = self.state.lock();
        match &mut *state {
            SlotState::Empty(waiting) => waiting.push(subscriber),
            SlotState::Written(value) => {
                let value = value.clone();
                drop(state);
                subscriber(value);
            }
            SlotState::Closed => {
                drop(state);
                drop(subscriber);
            }
        }
    }

    /// Marks a slot that will never be written, dropping its subscribers
    /// now and any registered later.
    pub(crate) fn close(&self) {
        let discarded = {
            let mut state = self.state.lock();
            if let SlotState::Empty(waiting) = &mut *state {
                let waiting = std::mem::take(waiting);
                *state = SlotState::Closed;
                waiting
            } else {
                Vec::new()
            }
        };
        drop(discarded);
    }

    pub(crate) fn get(&self) -> Option<T> {
        match &*self.state.lock() {
            SlotState::Written(value) => Some(value.clone()),
            SlotState::Empty(_) | SlotState::Closed => None,
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        match &*self.state.lock() {
            SlotState::Empty(waiting) => waiting.len(),
            SlotState::Written(_) | SlotState::Closed => 0,
        }
    }
}
