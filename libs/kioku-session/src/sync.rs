//! Write path and snapshot deduplication.
//!
//! `SyncEngine` pairs the remote store with the pending cache: every review
//! is buffered before its write and cleared only on acknowledgement, and a
//! bounded timeout converts a hung write into a failure instead of leaving
//! it pending indefinitely. `SnapshotFilter` drops redundant snapshot
//! deliveries by comparing an order-stable fingerprint of the document set.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::warn;

use kioku_core::types::CardProgress;

use crate::error::SyncError;
use crate::pending::PendingCache;
use crate::store::ProgressStore;

/// Order-stable SHA-256 over a set of progress documents.
///
/// Documents are keyed by card id before hashing, so two snapshots with the
/// same contents in a different delivery order fingerprint identically.
pub fn fingerprint(docs: &[CardProgress]) -> String {
    let mut sorted: Vec<&CardProgress> = docs.iter().collect();
    sorted.sort_by(|a, b| a.card_id.cmp(&b.card_id));

    let mut hasher = Sha256::new();
    for doc in sorted {
        hasher.update(doc.card_id.as_bytes());
        hasher.update(
            format!(
                "|{}|{}|{}|{}|{}|{}\n",
                doc.ease_factor,
                doc.repetitions,
                doc.last_interval,
                doc.is_learning,
                doc.learning_step_index,
                doc.next_review,
            )
            .as_bytes(),
        );
    }
    format!("{:x}", hasher.finalize())
}

/// Drops snapshot deliveries whose contents match the last applied one.
#[derive(Debug, Default)]
pub struct SnapshotFilter {
    last: Option<String>,
}

impl SnapshotFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the snapshot differs from the last accepted one.
    pub fn accept(&mut self, docs: &[CardProgress]) -> bool {
        let print = fingerprint(docs);
        if self.last.as_deref() == Some(print.as_str()) {
            return false;
        }
        self.last = Some(print);
        true
    }
}

/// Outbound write path with buffering and a bounded timeout.
pub struct SyncEngine<S> {
    store: Arc<S>,
    pending: Mutex<PendingCache>,
    write_timeout: Duration,
}

impl<S: ProgressStore> SyncEngine<S> {
    pub fn new(store: Arc<S>, pending: PendingCache, write_timeout: Duration) -> Self {
        Self {
            store,
            pending: Mutex::new(pending),
            write_timeout,
        }
    }

    /// Persist one reviewed card: buffer first, write, clear on ack.
    ///
    /// On failure the buffered entry stays behind for a later flush or a
    /// user retry.
    pub async fn submit(
        &self,
        user_id: &str,
        chapter_id: &str,
        progress: CardProgress,
    ) -> Result<(), SyncError> {
        let card_id = progress.card_id.clone();
        self.pending
            .lock()
            .expect("pending cache lock")
            .insert(progress.clone())?;

        self.write(user_id, chapter_id, &progress).await?;

        self.pending
            .lock()
            .expect("pending cache lock")
            .remove(&card_id)?;
        Ok(())
    }

    /// Attempt every buffered entry, clearing each one individually as it
    /// is acknowledged. Returns the number flushed; the first error is
    /// reported after all entries have been tried.
    pub async fn flush(&self, user_id: &str, chapter_id: &str) -> Result<usize, SyncError> {
        let entries = self.pending.lock().expect("pending cache lock").entries();
        let mut flushed = 0;
        let mut first_error = None;

        for progress in entries {
            let card_id = progress.card_id.clone();
            match self.write(user_id, chapter_id, &progress).await {
                Ok(()) => {
                    self.pending
                        .lock()
                        .expect("pending cache lock")
                        .remove(&card_id)?;
                    flushed += 1;
                }
                Err(e) => {
                    warn!(card = %card_id, error = %e, "pending review not flushed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => Ok(flushed),
            Some(e) => Err(e),
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("pending cache lock").len()
    }

    async fn write(
        &self,
        user_id: &str,
        chapter_id: &str,
        progress: &CardProgress,
    ) -> Result<(), SyncError> {
        match tokio::time::timeout(
            self.write_timeout,
            self.store.write_progress(user_id, chapter_id, progress),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(self.write_timeout)),
        }
    }
}
