//! Common test utilities and fixtures for integration tests.
//!
//! The backend runs entirely against its in-memory document store, so a
//! test context is just a fresh router behind an `axum-test` server.

pub mod fixtures;

use axum::http::HeaderValue;
use axum_test::TestServer;

use kioku_backend::store::DocStore;
use kioku_backend::{app, AppState};

/// Test context wrapping a server over a fresh store.
pub struct TestContext {
    pub server: TestServer,
}

impl TestContext {
    pub fn new() -> Self {
        let state = AppState {
            store: DocStore::new(),
        };
        Self {
            server: TestServer::new(app(state)).expect("test server"),
        }
    }

    /// Register a learner and return its bearer token.
    pub async fn register_learner(&self) -> String {
        let response = self
            .server
            .post("/api/learners/register")
            .json(&serde_json::json!({ "name": "test device" }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["token"].as_str().expect("token").to_string()
    }

    /// Format an Authorization header value.
    pub fn auth_header_value(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {token}")).expect("header value")
    }
}
