use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Single slot where the newest value wins. Readers can peek without
/// consuming, and waiters are woken on every `set`.
pub struct Latest1Queue<T> {
    slot: Mutex<Option<T>>,
    notify_any: Arc<Notify>,
}

impl<T: Clone> Latest1Queue<T> {
    pub fn new(notify_any: Arc<Notify>) -> Self {
        Self {
            slot: Mutex::new(None),
            notify_any,
        }
    }

    /// Stores `value`, returning whatever it displaced.
    pub fn set(&self, value: T) -> Option<T> {
        let displaced = self.slot.lock().replace(value);
        self.notify_any.notify_waiters();
        displaced
    }

    pub fn peek(&self) -> Option<T> {
        self.slot.lock().clone()
    }

    pub fn try_recv(&self) -> Option<T> {
        self.slot.lock().take()
    }

    /// Clears the slot only if `still_current` holds for the stored value.
    pub fn take_if(&self, still_current: impl FnOnce(&T) -> bool) -> Option<T> {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(still_current) {
            slot.take()
        } else {
            None
        }
    }
}
