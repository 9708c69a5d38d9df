//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use timed_cache::{api::create_router, AppState, Config, Scheduler};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_state() -> AppState {
    AppState::from_config(&Config::default(), Scheduler::new())
}

fn create_test_app() -> Router {
    create_router(create_test_state())
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == Insert Endpoint Tests ==

#[tokio::test]
async fn test_insert_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/entries", r#"{"id":"cfg","value":{"limit":5}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("cfg"));
    assert!(json["expires_at"].is_string());
}

#[tokio::test]
async fn test_insert_endpoint_zero_ttl() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/entries", r#"{"id":"pinned","value":1,"ttl":0}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["expires_at"].is_null());
}

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/entries", r#"{"id": "missing value"}"#))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_empty_id_request() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/entries", r#"{"id":"","value":"v"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_insert_ttl_out_of_range_rejected() {
    let app = create_test_app();

    let body = format!(r#"{{"id":"code","value":"v","ttl":{}}}"#, u64::MAX);
    let response = app.clone().oneshot(put_json("/entries", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("out of range"));

    let response = app.oneshot(get("/entries/code")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Get Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();

    let set_response = app
        .clone()
        .oneshot(put_json("/entries", r#"{"id":"cfg","value":{"limit":5}}"#))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = app.oneshot(get("/entries/cfg")).await.unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    let json = body_to_json(get_response.into_body()).await;
    assert_eq!(json["id"], "cfg");
    assert_eq!(json["value"]["limit"], 5);
    assert!(json["created_at"].is_string());
    let expires_at = json["expires_at"].as_str().unwrap();
    assert!(!expires_at.is_empty());
    assert!(json["ttl_remaining"].as_u64().unwrap() > 3500);
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = app.oneshot(get("/entries/nonexistent")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

// == Alias Endpoint Tests ==

#[tokio::test]
async fn test_alias_lookup_and_delete_cascade() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json(
            "/entries",
            r#"{"id":"token_a","value":{"email":"alice@example.com"}}"#,
        ))
        .await
        .unwrap();

    let alias_response = app
        .clone()
        .oneshot(put_json(
            "/entries/token_a/aliases",
            r#"{"alias":"alice@example.com"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(alias_response.status(), StatusCode::OK);

    let by_alias = app
        .clone()
        .oneshot(get("/entries/alice@example.com"))
        .await
        .unwrap();
    assert_eq!(by_alias.status(), StatusCode::OK);
    let json = body_to_json(by_alias.into_body()).await;
    assert_eq!(json["value"]["email"], "alice@example.com");

    let delete_response = app.clone().oneshot(delete("/entries/token_a")).await.unwrap();
    assert_eq!(delete_response.status(), StatusCode::OK);

    let after = app.oneshot(get("/entries/alice@example.com")).await.unwrap();
    assert_eq!(after.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint_not_found() {
    let app = create_test_app();

    let response = app.oneshot(delete("/entries/nonexistent")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Resend Throttle Tests ==

#[tokio::test]
async fn test_resend_endpoint_throttles_fourth_request() {
    let app = create_test_app();

    for expected in 1..=3 {
        let response = app
            .clone()
            .oneshot(post("/verification/token_a/resend"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["resend_count"], expected);
        assert_eq!(json["remaining"], 3 - expected);
    }

    let response = app
        .oneshot(post("/verification/token_a/resend"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_in: u64 = response
        .headers()
        .get("retry-in")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_in > 3500 && retry_in <= 3600);
}

// == Stats / Health Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/entries", r#"{"id":"k1","value":"v1"}"#))
        .await
        .unwrap();
    app.clone().oneshot(get("/entries/k1")).await.unwrap();
    app.clone().oneshot(get("/entries/missing")).await.unwrap();

    let response = app.oneshot(get("/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["total_entries"], 1);
    assert_eq!(json["scheduled_jobs"], 1);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
}

// == Expiration Tests ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(put_json("/entries", r#"{"id":"code","value":"123456","ttl":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/entries/code")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(1300)).await;

    let response = app.oneshot(get("/entries/code")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_close_shuts_everything_down() {
    let state = create_test_state();
    let app = create_router(state.clone());

    app.clone()
        .oneshot(put_json("/entries", r#"{"id":"k1","value":"v1"}"#))
        .await
        .unwrap();
    state.close();

    assert_eq!(state.scheduler.job_count(), 0);
    let response = app
        .oneshot(put_json("/entries", r#"{"id":"k2","value":"v2"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
