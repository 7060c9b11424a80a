//! Learner registration endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::models::{RegisterRequest, RegisterResponse};
use crate::AppState;

/// POST /api/learners/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let (learner_id, token) = state.store.register_learner(request.name).await;
    tracing::info!(%learner_id, "learner registered");
    Ok(Json(RegisterResponse { learner_id, token }))
}
