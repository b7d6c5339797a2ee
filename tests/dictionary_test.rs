//! Dictionary proxy against a local stand-in for the upstream service.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

/// Echoes the received query parameters. `q=missing` yields 404, `q=down` a plain-text 503.
async fn upstream(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("q").map(String::as_str) {
        Some("missing") => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no entry" })),
        )
            .into_response(),
        Some("down") => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "maintenance",
        )
            .into_response(),
        _ => Json(json!({ "params": params })).into_response(),
    }
}

async fn spawn_upstream() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    let app = Router::new().route("/api/search", get(upstream));
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}/api/search")
}

async fn proxy_app(upstream_url: &str, api_key: Option<&str>) -> Router {
    let mut config = common::test_config(upstream_url);
    config.dictionary_api_key = api_key.map(String::from);
    common::test_app_with(config).await.0
}

#[tokio::test]
async fn forwards_query_unmodified_and_relays_body() {
    let url = spawn_upstream().await;
    let app = proxy_app(&url, None).await;

    let (status, body) = common::get(&app, "/api/dictionary/search?q=%EC%82%AC%EA%B3%BC%20pie").await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let json = common::json(&body);
    assert_eq!(json["params"]["q"], "사과 pie");
    assert!(json["params"].get("key").is_none());
    assert_eq!(json["params"].as_object().map(serde_json::Map::len), Some(1));
}

#[tokio::test]
async fn appends_api_key_when_configured() {
    let url = spawn_upstream().await;
    let app = proxy_app(&url, Some("secret-key")).await;

    let (status, body) = common::get(&app, "/api/dictionary/search?q=word").await;
    assert_eq!(status, StatusCode::OK);

    let json = common::json(&body);
    assert_eq!(json["params"]["q"], "word");
    assert_eq!(json["params"]["key"], "secret-key");
}

#[tokio::test]
async fn upstream_error_status_is_relayed_unchanged() {
    let url = spawn_upstream().await;
    let app = proxy_app(&url, None).await;

    let (status, body) = common::get(&app, "/api/dictionary/search?q=missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(common::json(&body)["error"], "no entry");

    let (status, body) = common::get(&app, "/api/dictionary/search?q=down").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "maintenance");
}

#[tokio::test]
async fn missing_query_is_a_bad_request() {
    let url = spawn_upstream().await;
    let app = proxy_app(&url, None).await;

    let (status, body) = common::get(&app, "/api/dictionary/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(common::json(&body)["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unreachable_upstream_is_a_bad_gateway() {
    // Reserve a port, then free it so nothing is listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let app = proxy_app(&format!("http://{addr}/api/search"), None).await;

    let (status, body) = common::get(&app, "/api/dictionary/search?q=word").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(common::json(&body)["error"]["code"], "BAD_GATEWAY");
}
