//! Authentication middleware
//!
//! Token verification stands in for the identity layer: requests carry a
//! bearer token minted at registration, and everything behind the
//! middleware sees only the resolved learner id.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::error::{ApiError, Result};
use crate::AppState;

/// Authenticated learner info stored in request extensions
#[derive(Clone, Debug)]
pub struct AuthenticatedLearner {
    pub learner_id: String,
}

/// Auth middleware - extracts the learner token from the Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    // Skip auth for registration and health check
    let path = request.uri().path();
    if path == "/api/learners/register" || path == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization format".to_string()))?;

    let learner = state
        .store
        .learner_for_token(token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid learner token".to_string()))?;

    request.extensions_mut().insert(AuthenticatedLearner {
        learner_id: learner.id,
    });

    Ok(next.run(request).await)
}
