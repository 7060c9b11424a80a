//! API request/response types.

use serde::{Deserialize, Serialize};

// === Learner registration ===

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub learner_id: String,
    pub token: String,
}

// === Review progress ===

/// Body of the review-write endpoint.
///
/// `progress` arrives as raw JSON: it is validated against the
/// `CardProgress` shape and range rules before being merge-written, but
/// unknown extra fields it carries are preserved by the merge.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWriteRequest {
    pub chapter_id: String,
    pub card_id: String,
    pub progress: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWriteResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review_iso: Option<String>,
}

/// Snapshot of a chapter's progress collection.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressSnapshotResponse {
    pub progress: Vec<serde_json::Value>,
}

// === Preferences ===

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesRequest {
    pub daily_new_card_limit: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    pub daily_new_card_limit: Option<u32>,
}
