use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::{AdminUser, AuthUser};
use crate::entities::coupon;
use crate::error::AppError;
use crate::services::LoyaltyService;
use crate::state::AppState;

/// Build the coupon route group: `/coupons/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_coupons).post(create_coupon))
        .route("/{id}/redeem", post(redeem_coupon))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CouponResponse {
    id: i32,
    title: String,
    description: Option<String>,
    code: String,
    discount_percent: i32,
    points_cost: Option<i32>,
    expires_at: Option<String>,
    created_at: String,
}

impl From<coupon::Model> for CouponResponse {
    fn from(c: coupon::Model) -> Self {
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
            code: c.code,
            discount_percent: c.discount_percent,
            points_cost: c.points_cost,
            expires_at: c.expires_at.map(|t| t.to_rfc3339()),
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCouponRequest {
    title: String,
    description: Option<String>,
    code: String,
    discount_percent: i32,
    points_cost: Option<i32>,
    expires_at: Option<DateTime<FixedOffset>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RedeemResponse {
    redemption_id: i32,
    coupon_id: i32,
    coupon_code: String,
    points_spent: i32,
    remaining_points: i32,
}

/// Column limits, in characters.
const MAX_TITLE_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_CODE_LEN: usize = 50;

/// Coupon fields as they will be stored.
struct NewCoupon {
    title: String,
    description: Option<String>,
    code: String,
}

/// Normalize the request and check it against the column limits.
///
/// Lengths are checked after normalization since uppercasing can lengthen a code.
fn validate_coupon(body: &CreateCouponRequest) -> Result<NewCoupon, String> {
    let title = body.title.trim().to_string();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(format!("Title must be between 1 and {MAX_TITLE_LEN} characters."));
    }

    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from);
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters."
        ));
    }

    let code = body.code.trim().to_uppercase();
    if code.is_empty() || code.chars().count() > MAX_CODE_LEN {
        return Err(format!("Code must be between 1 and {MAX_CODE_LEN} characters."));
    }

    if !(1..=100).contains(&body.discount_percent) {
        return Err("Discount must be between 1 and 100 percent.".to_string());
    }
    if body.points_cost.is_some_and(|cost| cost < 0) {
        return Err("Points cost cannot be negative.".to_string());
    }

    Ok(NewCoupon {
        title,
        description,
        code,
    })
}

/// `GET /api/coupons`
async fn list_coupons(State(state): State<AppState>) -> Result<Json<Vec<CouponResponse>>, AppError> {
    let coupons = coupon::Entity::find()
        .order_by_asc(coupon::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(coupons.into_iter().map(CouponResponse::from).collect()))
}

/// `POST /api/coupons`
async fn create_coupon(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<CouponResponse>), AppError> {
    let NewCoupon {
        title,
        description,
        code,
    } = validate_coupon(&body).map_err(AppError::BadRequest)?;

    let duplicate = coupon::Entity::find()
        .filter(coupon::Column::Code.eq(&code))
        .one(&state.db)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::Conflict("Coupon code already exists.".to_string()));
    }

    let now = Utc::now().fixed_offset();
    let created = coupon::ActiveModel {
        title: Set(title),
        description: Set(description),
        code: Set(code),
        discount_percent: Set(body.discount_percent),
        expires_at: Set(body.expires_at),
        created_at: Set(now),
        updated_at: Set(now),
        points_cost: Set(body.points_cost),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(coupon_id = created.id, admin_id = admin.id, "Coupon created");

    Ok((StatusCode::CREATED, Json(CouponResponse::from(created))))
}

/// `POST /api/coupons/{id}/redeem`
async fn redeem_coupon(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<RedeemResponse>, AppError> {
    let redemption = LoyaltyService::redeem_coupon(&state.db, user_model.id, id).await?;

    Ok(Json(RedeemResponse {
        redemption_id: redemption.record.id,
        coupon_id: redemption.coupon.id,
        coupon_code: redemption.coupon.code,
        points_spent: redemption.record.points_spent,
        remaining_points: redemption.remaining_points,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, description: Option<&str>, code: &str) -> CreateCouponRequest {
        CreateCouponRequest {
            title: title.to_string(),
            description: description.map(String::from),
            code: code.to_string(),
            discount_percent: 10,
            points_cost: Some(100),
            expires_at: None,
        }
    }

    #[test]
    fn fields_are_normalized() {
        let coupon = validate_coupon(&request("  Ten off ", Some("  "), " ten ")).ok();
        let coupon = coupon.map(|c| (c.title, c.description, c.code));
        assert_eq!(
            coupon,
            Some(("Ten off".to_string(), None, "TEN".to_string()))
        );
    }

    #[test]
    fn description_is_bounded_by_its_column() {
        let at_limit = "d".repeat(MAX_DESCRIPTION_LEN);
        assert!(validate_coupon(&request("T", Some(&at_limit), "A")).is_ok());

        let too_long = "d".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(validate_coupon(&request("T", Some(&too_long), "A")).is_err());
    }

    #[test]
    fn code_length_is_checked_after_uppercasing() {
        // 'ß' uppercases to "SS", so 26 characters become 52
        let code = "ß".repeat(26);
        assert!(code.chars().count() <= MAX_CODE_LEN);
        assert!(validate_coupon(&request("T", None, &code)).is_err());

        assert!(validate_coupon(&request("T", None, &"ß".repeat(25))).is_ok());
    }
}
