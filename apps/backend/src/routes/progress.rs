//! Review-progress endpoints
//!
//! The write endpoint validates the payload shape and ranges before
//! merge-writing; the snapshot endpoint is the feed the client's
//! subscription loop polls. Timestamps cross this boundary as epoch
//! milliseconds.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::Value;

use kioku_core::types::CardProgress;

use crate::error::{ApiError, Result};
use crate::models::{ProgressSnapshotResponse, ReviewWriteRequest, ReviewWriteResponse};
use crate::routes::auth::AuthenticatedLearner;
use crate::AppState;

/// POST /api/review-progress
pub async fn write(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Json(request): Json<ReviewWriteRequest>,
) -> Result<Json<ReviewWriteResponse>> {
    if request.chapter_id.trim().is_empty() || request.card_id.trim().is_empty() {
        return Err(ApiError::Validation(
            "Missing required 'cardId' or 'chapterId'".to_string(),
        ));
    }

    // Shape check: non-negative integer repetitions and friends are
    // enforced by deserializing into the canonical progress type.
    let progress: CardProgress = serde_json::from_value(request.progress.clone())
        .map_err(|e| ApiError::Validation(format!("invalid progress payload: {e}")))?;
    progress
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    // The raw object is merged so fields this server does not know about
    // augment the stored document rather than being dropped.
    let mut doc = match request.progress {
        Value::Object(map) => map,
        _ => {
            return Err(ApiError::Validation(
                "progress payload must be an object".to_string(),
            ))
        }
    };
    doc.insert("cardId".to_string(), Value::String(request.card_id.clone()));

    state
        .store
        .merge_progress(&auth.learner_id, &request.chapter_id, &request.card_id, doc)
        .await;

    tracing::debug!(
        chapter = %request.chapter_id,
        card = %request.card_id,
        "progress saved"
    );

    Ok(Json(ReviewWriteResponse {
        message: "Progress saved.".to_string(),
        next_review_iso: progress.next_review_utc().map(|t| t.to_rfc3339()),
    }))
}

/// GET /api/review-progress/:chapter_id
pub async fn snapshot(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Path(chapter_id): Path<String>,
) -> Result<Json<ProgressSnapshotResponse>> {
    let progress = state.store.list_progress(&auth.learner_id, &chapter_id).await;
    Ok(Json(ProgressSnapshotResponse { progress }))
}
