//! Study-preferences endpoints

use axum::{extract::State, Extension, Json};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::{PreferencesResponse, UpdatePreferencesRequest};
use crate::routes::auth::AuthenticatedLearner;
use crate::AppState;

const DAILY_LIMIT_KEY: &str = "dailyNewCardLimit";

/// GET /api/user-preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
) -> Result<Json<PreferencesResponse>> {
    let daily_new_card_limit = state
        .store
        .preferences(&auth.learner_id)
        .await
        .and_then(|doc| doc.get(DAILY_LIMIT_KEY).and_then(Value::as_u64))
        .map(|v| v as u32);

    Ok(Json(PreferencesResponse { daily_new_card_limit }))
}

/// POST /api/user-preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Json(request): Json<UpdatePreferencesRequest>,
) -> Result<Json<PreferencesResponse>> {
    let mut doc = Map::new();
    doc.insert(
        DAILY_LIMIT_KEY.to_string(),
        Value::from(request.daily_new_card_limit),
    );
    state.store.merge_preferences(&auth.learner_id, doc).await;

    Ok(Json(PreferencesResponse {
        daily_new_card_limit: Some(request.daily_new_card_limit),
    }))
}
