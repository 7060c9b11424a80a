//! User-preferences API tests.

mod common;

use axum::http::{header::AUTHORIZATION, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::TestContext;

#[tokio::test]
async fn limit_defaults_to_absent() {
    let ctx = TestContext::new();
    let token = ctx.register_learner().await;

    let response = ctx
        .server
        .get("/api/user-preferences")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["dailyNewCardLimit"].is_null());
}

#[tokio::test]
async fn stored_limit_round_trips() {
    let ctx = TestContext::new();
    let token = ctx.register_learner().await;

    let response = ctx
        .server
        .post("/api/user-preferences")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&token))
        .json(&json!({ "dailyNewCardLimit": 20 }))
        .await;
    response.assert_status_ok();

    let response = ctx
        .server
        .get("/api/user-preferences")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["dailyNewCardLimit"], 20);
}

#[tokio::test]
async fn rejects_negative_limit() {
    let ctx = TestContext::new();
    let token = ctx.register_learner().await;

    let response = ctx
        .server
        .post("/api/user-preferences")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&token))
        .json(&json!({ "dailyNewCardLimit": -5 }))
        .await;
    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn preferences_are_scoped_per_learner() {
    let ctx = TestContext::new();
    let first = ctx.register_learner().await;
    let second = ctx.register_learner().await;

    let response = ctx
        .server
        .post("/api/user-preferences")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&first))
        .json(&json!({ "dailyNewCardLimit": 5 }))
        .await;
    response.assert_status_ok();

    let response = ctx
        .server
        .get("/api/user-preferences")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&second))
        .await;
    let body: serde_json::Value = response.json();
    assert!(body["dailyNewCardLimit"].is_null());
}

#[tokio::test]
async fn requires_authentication() {
    let ctx = TestContext::new();
    let response = ctx.server.get("/api/user-preferences").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}
