use std::collections::VecDeque;

use parking_lot::Mutex;

/// Bounded FIFO that evicts its oldest entry once full.
pub struct FifoDropOldestQueue<T> {
    buf: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T: Clone> FifoDropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends `value`, returning the entry evicted to make room, if any.
    pub fn push_overwrite(&self, value: T) -> Option<T> {
        let mut buf = self.buf.lock();
        let evicted = if buf.len() >= self.capacity {
            buf.pop_front()
        } else {
            None
        };
        buf.push_back(value);
        evicted
    }

    pub fn try_recv(&self) -> Option<T> {
        self.buf.lock().pop_front()
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.buf.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
