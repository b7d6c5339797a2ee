use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::entities::{coupon, coupon_redemption, user};
use crate::error::AppError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the user route group: `/users/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).patch(update_me))
        .route("/me/redemptions", get(list_redemptions))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub is_admin: bool,
    pub birthdate: Option<NaiveDate>,
    pub points: i32,
    pub created_at: String,
}

impl From<&user::Model> for UserResponse {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
            is_admin: u.is_admin,
            birthdate: u.birthdate,
            points: u.points,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMeRequest {
    name: Option<String>,
    birthdate: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RedemptionResponse {
    id: i32,
    coupon_id: i32,
    coupon_title: Option<String>,
    coupon_code: Option<String>,
    points_spent: i32,
    redeemed_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Reject birthdates later than today (UTC).
///
/// # Errors
///
/// Returns a descriptive error message for a future date.
pub fn validate_birthdate(birthdate: NaiveDate) -> Result<(), String> {
    if birthdate > Utc::now().date_naive() {
        return Err("Birthdate cannot be in the future.".to_string());
    }
    Ok(())
}

/// Trim a display name; empty becomes `None`.
///
/// # Errors
///
/// Returns a descriptive error message if the name is longer than 100 characters.
pub fn normalize_name(name: Option<&str>) -> Result<Option<String>, String> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if name.chars().count() > 100 {
        return Err("Name must be at most 100 characters.".to_string());
    }
    Ok(Some(name.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /api/users/me`
async fn get_me(AuthUser(user_model): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user_model))
}

/// `PATCH /api/users/me`
async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    Json(body): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let mut active: user::ActiveModel = user_model.into();

    if body.name.is_some() {
        let name = normalize_name(body.name.as_deref()).map_err(AppError::BadRequest)?;
        active.name = Set(name);
    }

    if let Some(birthdate) = body.birthdate {
        validate_birthdate(birthdate).map_err(AppError::BadRequest)?;
        active.birthdate = Set(Some(birthdate));
    }

    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&state.db).await?;

    Ok(Json(UserResponse::from(&updated)))
}

/// `GET /api/users/me/redemptions`
async fn list_redemptions(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
) -> Result<Json<Vec<RedemptionResponse>>, AppError> {
    let rows = coupon_redemption::Entity::find()
        .filter(coupon_redemption::Column::UserId.eq(user_model.id))
        .order_by_desc(coupon_redemption::Column::RedeemedAt)
        .order_by_desc(coupon_redemption::Column::Id)
        .find_also_related(coupon::Entity)
        .all(&state.db)
        .await?;

    let response = rows
        .into_iter()
        .map(|(redemption, coupon)| RedemptionResponse {
            id: redemption.id,
            coupon_id: redemption.coupon_id,
            coupon_title: coupon.as_ref().map(|c| c.title.clone()),
            coupon_code: coupon.map(|c| c.code),
            points_spent: redemption.points_spent,
            redeemed_at: redemption.redeemed_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn future_birthdate_is_rejected() {
        let tomorrow = Utc::now().date_naive() + chrono::Days::new(1);
        assert!(validate_birthdate(tomorrow).is_err());
        assert!(validate_birthdate(Utc::now().date_naive()).is_ok());
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(normalize_name(Some("  Ada  ")), Ok(Some("Ada".to_string())));
        assert_eq!(normalize_name(Some("   ")), Ok(None));
        assert_eq!(normalize_name(None), Ok(None));
        assert!(normalize_name(Some(&"a".repeat(101))).is_err());
    }
}
