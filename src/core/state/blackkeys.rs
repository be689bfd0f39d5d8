// src/core/state/blackkeys.rs

//! The time-bounded per-key blacklist managed by `PROXY BLACK`.

use crate::core::metrics;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A key that requests may not touch until `deadline`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlackKeyEntry {
    pub key: Bytes,
    pub created_at: Instant,
    pub deadline: Instant,
}

impl BlackKeyEntry {
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }

    /// How long the entry was in place.
    pub fn lifetime(&self) -> Duration {
        self.deadline.saturating_duration_since(self.created_at)
    }
}

/// Shared key blacklist. Entries past their deadline stop blocking immediately and are
/// physically removed by the periodic sweep.
#[derive(Debug, Default)]
pub struct BlackKeys {
    entries: Mutex<HashMap<Bytes, BlackKeyEntry>>,
}

impl BlackKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the entry for `key`, blocking it for `ttl` from now.
    pub fn insert(&self, key: Bytes, ttl: Duration) -> BlackKeyEntry {
        let now = Instant::now();
        let entry = BlackKeyEntry {
            key: key.clone(),
            created_at: now,
            deadline: now + ttl,
        };
        let mut entries = self.entries.lock();
        entries.insert(key, entry.clone());
        metrics::BLACKED_KEYS.set(entries.len() as i64);
        entry
    }

    /// Returns the removed entry, or `None` if the key was not blacked.
    pub fn remove(&self, key: &[u8]) -> Option<BlackKeyEntry> {
        let mut entries = self.entries.lock();
        let removed = entries.remove(key);
        metrics::BLACKED_KEYS.set(entries.len() as i64);
        removed
    }

    pub fn is_blocked(&self, key: &[u8]) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Live keys in lexicographic order.
    pub fn live_keys(&self) -> Vec<Bytes> {
        let now = Instant::now();
        let mut keys: Vec<Bytes> = self
            .entries
            .lock()
            .values()
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Drops every entry whose deadline has passed and returns them.
    /// Visits every entry, so cost grows with the number of blacked keys.
    pub fn sweep_expired(&self) -> Vec<BlackKeyEntry> {
        let now = Instant::now();
        let mut expired = Vec::new();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| {
            if entry.is_live(now) {
                true
            } else {
                expired.push(entry.clone());
                false
            }
        });
        metrics::BLACKED_KEYS.set(entries.len() as i64);
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
