use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use super::users::UserResponse;
use crate::auth::middleware::AdminUser;
use crate::error::AppError;
use crate::services::LoyaltyService;
use crate::state::AppState;

/// Build the admin route group: `/admin/...`
pub fn router() -> Router<AppState> {
    Router::new().route("/users/{id}/points", post(adjust_points))
}

#[derive(Deserialize)]
struct AdjustPointsRequest {
    delta: i32,
}

/// `POST /api/admin/users/{id}/points`
async fn adjust_points(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    Json(body): Json<AdjustPointsRequest>,
) -> Result<Json<UserResponse>, AppError> {
    tracing::info!(admin_id = admin.id, user_id = id, delta = body.delta, "Adjusting points");
    let updated = LoyaltyService::adjust_points(&state.db, id, body.delta).await?;
    Ok(Json(UserResponse::from(&updated)))
}
