//! Cached copy of the consumer's report.

use chrono::{DateTime, Utc};
use std::sync::{RwLock, RwLockReadGuard};

#[derive(Debug, Default)]
struct SnapshotState {
    messages: Vec<String>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// The dashboard's latest full copy of the consumer log.
///
/// Replacement happens under a single write lock, so readers observe either
/// the previous copy or the new one, never a mix.
#[derive(Debug, Default)]
pub struct Snapshot {
    state: RwLock<SnapshotState>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new copy of the report.
    pub fn replace(&self, messages: Vec<String>) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.messages = messages;
        state.refreshed_at = Some(Utc::now());
    }

    /// Cached messages, in consumer order.
    pub fn messages(&self) -> Vec<String> {
        self.read().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().messages.is_empty()
    }

    /// When the cache was last replaced, if ever.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.read().refreshed_at
    }

    fn read(&self) -> RwLockReadGuard<'_, SnapshotState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
