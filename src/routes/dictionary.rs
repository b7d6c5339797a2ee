use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// Build the dictionary route group: `/dictionary/...`
pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

/// `GET /api/dictionary/search?q=<keyword>`
///
/// Relays the upstream status, content type and body unchanged; only a
/// transport failure is turned into a 502.
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    let keyword = query
        .q
        .ok_or_else(|| AppError::BadRequest("Query parameter 'q' is required.".to_string()))?;

    let upstream = state.dictionary.search(&keyword).await.map_err(|e| {
        AppError::BadGateway(format!("Dictionary service unavailable: {e}"))
    })?;

    if !upstream.status.is_success() {
        tracing::warn!(
            status = upstream.status.as_u16(),
            "Dictionary upstream returned an error status"
        );
    }

    let content_type = upstream
        .content_type
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    Ok((
        upstream.status,
        [(header::CONTENT_TYPE, content_type)],
        Body::from(upstream.body),
    )
        .into_response())
}
