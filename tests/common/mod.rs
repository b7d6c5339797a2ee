#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::{Value, json};
use tower::ServiceExt;

use tattant_api::config::Config;
use tattant_api::entities::user;
use tattant_api::state::AppState;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-32chars";

/// Configuration for tests: in-memory database, cheap hashing, given dictionary upstream.
pub fn test_config(dictionary_api_url: &str) -> Config {
    let dictionary_api_url = dictionary_api_url.to_string();
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        "LOG_LEVEL" => Some("warn".to_string()),
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        "PASSWORD_HASH_COST" => Some("1".to_string()),
        "DICTIONARY_API_URL" => Some(dictionary_api_url.clone()),
        "DICTIONARY_TIMEOUT_SECS" => Some("5".to_string()),
        _ => None,
    })
    .expect("test config should load")
}

/// Fresh in-memory database with every migration applied.
pub async fn migrated_db() -> DatabaseConnection {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .expect("sqlite should connect");
    Migrator::up(&db, None).await.expect("migrations should apply");
    db
}

pub async fn test_app_with(config: Config) -> (Router, AppState) {
    let db = migrated_db().await;
    let state = AppState::new(db, config).expect("state should build");
    let app = tattant_api::routes::router().with_state(state.clone());
    (app, state)
}

pub async fn test_app() -> (Router, AppState) {
    test_app_with(test_config("http://127.0.0.1:9/unused")).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.expect("request should run");

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();

    (status, String::from_utf8(body.to_vec()).unwrap_or_default())
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request should build")
}

/// Send a GET request and return (status, body).
pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, request("GET", uri, None, None)).await
}

pub async fn get_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, String) {
    send(app, request("GET", uri, Some(token), None)).await
}

pub async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, String) {
    send(app, request("POST", uri, None, Some(body))).await
}

pub async fn post_json_with_auth(
    app: &Router,
    uri: &str,
    body: &Value,
    token: &str,
) -> (StatusCode, String) {
    send(app, request("POST", uri, Some(token), Some(body))).await
}

pub async fn patch_json_with_auth(
    app: &Router,
    uri: &str,
    body: &Value,
    token: &str,
) -> (StatusCode, String) {
    send(app, request("PATCH", uri, Some(token), Some(body))).await
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_default()
}

/// Register a user and return (`user_id`, `token`).
pub async fn register(app: &Router, email: &str, password: &str) -> (i64, String) {
    let (status, body) = post_json(
        app,
        "/api/auth/register",
        &json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    let json = json(&body);
    (
        json["user"]["id"].as_i64().unwrap_or_default(),
        json["token"].as_str().unwrap_or_default().to_string(),
    )
}

/// Register a user and grant the admin flag directly in the database.
pub async fn register_admin(app: &Router, db: &DatabaseConnection, email: &str) -> String {
    let (_, token) = register(app, email, "AdminPass123").await;
    user::Entity::update_many()
        .col_expr(user::Column::IsAdmin, Expr::value(true))
        .filter(user::Column::Email.eq(email))
        .exec(db)
        .await
        .expect("admin flag should update");
    token
}
