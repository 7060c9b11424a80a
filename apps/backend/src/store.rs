//! In-memory document store.
//!
//! Documents are keyed (learner, chapter, card) and written with merge
//! semantics: incoming top-level fields overwrite their keys, every other
//! stored field is retained. Preferences follow the same rule under a
//! (learner) scope. Progress is never deleted, only superseded by merges.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

type JsonDoc = Map<String, Value>;

/// A registered learner.
#[derive(Debug, Clone)]
pub struct Learner {
    pub id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct DocStore {
    /// token -> learner
    learners: RwLock<HashMap<String, Learner>>,
    /// (learner, chapter) -> card id -> document
    progress: RwLock<HashMap<(String, String), BTreeMap<String, JsonDoc>>>,
    /// learner -> preferences document
    preferences: RwLock<HashMap<String, JsonDoc>>,
}

impl DocStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mint a learner id and bearer token.
    pub async fn register_learner(&self, name: Option<String>) -> (String, String) {
        let learner = Learner {
            id: Uuid::new_v4().to_string(),
            name,
            created_at: Utc::now(),
        };
        let token = Uuid::new_v4().to_string();
        let id = learner.id.clone();
        self.learners.write().await.insert(token.clone(), learner);
        (id, token)
    }

    pub async fn learner_for_token(&self, token: &str) -> Option<Learner> {
        self.learners.read().await.get(token).cloned()
    }

    /// Merge-write one progress document.
    pub async fn merge_progress(
        &self,
        learner_id: &str,
        chapter_id: &str,
        card_id: &str,
        doc: JsonDoc,
    ) {
        let mut all = self.progress.write().await;
        let stored = all
            .entry((learner_id.to_string(), chapter_id.to_string()))
            .or_default()
            .entry(card_id.to_string())
            .or_default();
        for (key, value) in doc {
            stored.insert(key, value);
        }
    }

    /// All progress documents for (learner, chapter), in card-id order.
    pub async fn list_progress(&self, learner_id: &str, chapter_id: &str) -> Vec<Value> {
        self.progress
            .read()
            .await
            .get(&(learner_id.to_string(), chapter_id.to_string()))
            .map(|chapter| chapter.values().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    pub async fn merge_preferences(&self, learner_id: &str, doc: JsonDoc) {
        let mut all = self.preferences.write().await;
        let stored = all.entry(learner_id.to_string()).or_default();
        for (key, value) in doc {
            stored.insert(key, value);
        }
    }

    pub async fn preferences(&self, learner_id: &str) -> Option<JsonDoc> {
        self.preferences.read().await.get(learner_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(pairs: &[(&str, Value)]) -> JsonDoc {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn merge_retains_fields_absent_from_update() {
        let store = DocStore::new();
        store
            .merge_progress(
                "u",
                "ch",
                "k-01",
                doc(&[("easeFactor", json!(2.5)), ("streak", json!(7))]),
            )
            .await;
        store
            .merge_progress("u", "ch", "k-01", doc(&[("easeFactor", json!(2.36))]))
            .await;

        let docs = store.list_progress("u", "ch").await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["easeFactor"], json!(2.36));
        assert_eq!(docs[0]["streak"], json!(7));
    }

    #[tokio::test]
    async fn progress_is_scoped_per_learner_and_chapter() {
        let store = DocStore::new();
        store
            .merge_progress("u1", "ch", "k-01", doc(&[("easeFactor", json!(2.5))]))
            .await;

        assert_eq!(store.list_progress("u1", "ch").await.len(), 1);
        assert!(store.list_progress("u2", "ch").await.is_empty());
        assert!(store.list_progress("u1", "other").await.is_empty());
    }

    #[tokio::test]
    async fn registered_token_resolves_learner() {
        let store = DocStore::new();
        let (id, token) = store.register_learner(Some("tablet".into())).await;

        let learner = store.learner_for_token(&token).await.unwrap();
        assert_eq!(learner.id, id);
        assert_eq!(learner.name.as_deref(), Some("tablet"));
        assert!(store.learner_for_token("bogus").await.is_none());
    }
}
