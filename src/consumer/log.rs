//! Append-only in-memory message log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Messages received from the broker, in arrival order.
///
/// The subscriber task is the only writer; HTTP handlers read full
/// snapshots. Every read sees a prefix of the final sequence: an append is
/// either fully visible or not at all. Never pruned, never persisted.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: RwLock<Vec<String>>,
    rejected: AtomicU64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message at the end of the log.
    pub fn append(&self, message: String) {
        self.write().push(message);
    }

    /// Copy of every message received so far, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Count a delivery that could not be appended.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Deliveries dropped because they could not be decoded.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<String>> {
        self.messages
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<String>> {
        self.messages
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
