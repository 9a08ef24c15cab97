//! Fixed-capacity FIFO log shared between request tasks.
//!
//! Used for recent notifications, recent request failures, and the host
//! metrics history. Once `capacity` entries are held, each push evicts the
//! oldest entry.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the inner value if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct BoundedLog<T> {
    capacity: usize,
    entries: Mutex<VecDeque<T>>,
}

impl<T: Clone> BoundedLog<T> {
    /// Create a log holding at most `capacity` entries (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Append an entry. Returns the evicted entry when the log was full.
    pub fn push(&self, entry: T) -> Option<T> {
        let mut entries = lock(&self.entries);
        let evicted = if entries.len() >= self.capacity {
            entries.pop_front()
        } else {
            None
        };
        entries.push_back(entry);
        evicted
    }

    /// Append several entries under one lock, evicting as needed.
    pub fn extend<I: IntoIterator<Item = T>>(&self, items: I) {
        let mut entries = lock(&self.entries);
        for item in items {
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(item);
        }
    }

    /// All entries, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        lock(&self.entries).iter().cloned().collect()
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<T> {
        lock(&self.entries).iter().rev().take(limit).cloned().collect()
    }

    /// Most recently pushed entry.
    pub fn latest(&self) -> Option<T> {
        lock(&self.entries).back().cloned()
    }
}
