//! Durable buffer for unacknowledged review writes.
//!
//! Works as a small write-ahead log keyed by card id: a scored review is
//! recorded here before the remote write is attempted, and an entry is
//! removed only once that card's write has been individually acknowledged.
//! A reload or transient network failure therefore never loses a scored
//! review; at-least-once delivery is acceptable because the endpoint merges.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tracing::warn;

use kioku_core::types::CardProgress;

use crate::error::SyncError;

pub struct PendingCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, CardProgress>,
}

impl PendingCache {
    /// Volatile cache; useful when durability is handled elsewhere.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    /// File-backed cache. A missing or unreadable file starts empty rather
    /// than failing the session; corruption is logged and discarded.
    pub fn load(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "pending cache corrupt; starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: Some(path),
            entries,
        }
    }

    /// Record a review ahead of its write. Re-recording the same card
    /// replaces the buffered entry (the newest state wins).
    pub fn insert(&mut self, progress: CardProgress) -> Result<(), SyncError> {
        self.entries.insert(progress.card_id.clone(), progress);
        self.persist()
    }

    /// Clear one acknowledged entry.
    pub fn remove(&mut self, card_id: &str) -> Result<(), SyncError> {
        if self.entries.remove(card_id).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// Buffered entries in stable (card id) order.
    pub fn entries(&self) -> Vec<CardProgress> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<(), SyncError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string(&self.entries)
            .map_err(|e| SyncError::Cache(e.to_string()))?;
        fs::write(path, raw).map_err(|e| SyncError::Cache(e.to_string()))
    }
}
