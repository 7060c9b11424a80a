//! Remote progress-store boundary.
//!
//! The session never talks to the document store directly; it goes through
//! [`ProgressStore`], which has an HTTP implementation against the backend
//! API and an in-memory implementation for tests and offline use.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use kioku_core::types::CardProgress;

use crate::error::SyncError;

/// Access to the per-(learner, chapter) progress collection and the
/// learner's study preferences.
///
/// Timestamps cross this boundary as epoch milliseconds regardless of the
/// store's native representation.
pub trait ProgressStore: Send + Sync + 'static {
    /// Fetch the full progress collection for a chapter. Deliveries are
    /// at-least-once; the caller deduplicates by fingerprint.
    fn fetch_snapshot(
        &self,
        user_id: &str,
        chapter_id: &str,
    ) -> impl Future<Output = Result<Vec<CardProgress>, SyncError>> + Send;

    /// Merge-write one reviewed card's progress.
    fn write_progress(
        &self,
        user_id: &str,
        chapter_id: &str,
        progress: &CardProgress,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// The learner's daily new-card limit override, if one is stored.
    fn fetch_daily_limit(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<u32>, SyncError>> + Send;

    fn save_daily_limit(
        &self,
        user_id: &str,
        limit: u32,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewWriteBody<'a> {
    chapter_id: &'a str,
    card_id: &'a str,
    progress: &'a CardProgress,
}

#[derive(Debug, Deserialize)]
struct SnapshotBody {
    progress: Vec<CardProgress>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesBody {
    daily_new_card_limit: Option<u32>,
}

/// HTTP implementation against the backend API.
///
/// The bearer token identifies the learner server-side, so the `user_id`
/// arguments are not sent on the wire.
pub struct HttpProgressStore {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpProgressStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(SyncError::Rejected { status, message })
    }
}

impl ProgressStore for HttpProgressStore {
    async fn fetch_snapshot(
        &self,
        _user_id: &str,
        chapter_id: &str,
    ) -> Result<Vec<CardProgress>, SyncError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/review-progress/{chapter_id}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let body: SnapshotBody = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))?;
        Ok(body.progress)
    }

    async fn write_progress(
        &self,
        _user_id: &str,
        chapter_id: &str,
        progress: &CardProgress,
    ) -> Result<(), SyncError> {
        let body = ReviewWriteBody {
            chapter_id,
            card_id: &progress.card_id,
            progress,
        };
        let resp = self
            .client
            .post(self.url("/api/review-progress"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Self::check(resp).await?;
        Ok(())
    }

    async fn fetch_daily_limit(&self, _user_id: &str) -> Result<Option<u32>, SyncError> {
        let resp = self
            .client
            .get(self.url("/api/user-preferences"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let body: PreferencesBody = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))?;
        Ok(body.daily_new_card_limit)
    }

    async fn save_daily_limit(&self, _user_id: &str, limit: u32) -> Result<(), SyncError> {
        let resp = self
            .client
            .post(self.url("/api/user-preferences"))
            .bearer_auth(&self.token)
            .json(&PreferencesBody {
                daily_new_card_limit: Some(limit),
            })
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Self::check(resp).await?;
        Ok(())
    }
}

/// In-memory store with the same merge-write semantics as the backend.
///
/// Used by tests and as a scratch store when no backend is configured. The
/// `offline` toggle makes every call fail with a network error, simulating
/// connectivity loss.
#[derive(Default)]
pub struct MemoryProgressStore {
    docs: Mutex<HashMap<(String, String), HashMap<String, CardProgress>>>,
    limits: Mutex<HashMap<String, u32>>,
    offline: AtomicBool,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), SyncError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Network("store offline".to_string()));
        }
        Ok(())
    }

    /// Seed documents directly, bypassing the write path.
    pub fn seed(&self, user_id: &str, chapter_id: &str, docs: Vec<CardProgress>) {
        let mut all = self.docs.lock().expect("doc store lock");
        let chapter = all
            .entry((user_id.to_string(), chapter_id.to_string()))
            .or_default();
        for doc in docs {
            chapter.insert(doc.card_id.clone(), doc);
        }
    }

    pub fn document(&self, user_id: &str, chapter_id: &str, card_id: &str) -> Option<CardProgress> {
        self.docs
            .lock()
            .expect("doc store lock")
            .get(&(user_id.to_string(), chapter_id.to_string()))
            .and_then(|chapter| chapter.get(card_id).cloned())
    }
}

impl ProgressStore for MemoryProgressStore {
    async fn fetch_snapshot(
        &self,
        user_id: &str,
        chapter_id: &str,
    ) -> Result<Vec<CardProgress>, SyncError> {
        self.ensure_online()?;
        let all = self.docs.lock().expect("doc store lock");
        let mut docs: Vec<CardProgress> = all
            .get(&(user_id.to_string(), chapter_id.to_string()))
            .map(|chapter| chapter.values().cloned().collect())
            .unwrap_or_default();
        docs.sort_by(|a, b| a.card_id.cmp(&b.card_id));
        Ok(docs)
    }

    async fn write_progress(
        &self,
        user_id: &str,
        chapter_id: &str,
        progress: &CardProgress,
    ) -> Result<(), SyncError> {
        self.ensure_online()?;
        progress
            .validate()
            .map_err(|e| SyncError::Rejected { status: 400, message: e.to_string() })?;
        self.seed(user_id, chapter_id, vec![progress.clone()]);
        Ok(())
    }

    async fn fetch_daily_limit(&self, user_id: &str) -> Result<Option<u32>, SyncError> {
        self.ensure_online()?;
        Ok(self
            .limits
            .lock()
            .expect("limit store lock")
            .get(user_id)
            .copied())
    }

    async fn save_daily_limit(&self, user_id: &str, limit: u32) -> Result<(), SyncError> {
        self.ensure_online()?;
        self.limits
            .lock()
            .expect("limit store lock")
            .insert(user_id.to_string(), limit);
        Ok(())
    }
}
