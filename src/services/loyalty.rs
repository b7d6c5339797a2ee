use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};

use crate::entities::{coupon, coupon_redemption, user};
use crate::error::AppError;

/// Result of buying a coupon with loyalty points.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub coupon: coupon::Model,
    pub record: coupon_redemption::Model,
    pub remaining_points: i32,
}

pub struct LoyaltyService;

impl LoyaltyService {
    /// Spend `user_id`'s points on a coupon.
    ///
    /// The balance check and deduction are one conditional `UPDATE`, committed
    /// together with the redemption row.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown coupon or user; `UnprocessableEntity` when the
    /// coupon has no points price, has expired, or the balance is too low.
    pub async fn redeem_coupon(
        db: &DatabaseConnection,
        user_id: i32,
        coupon_id: i32,
    ) -> Result<Redemption, AppError> {
        let coupon = coupon::Entity::find_by_id(coupon_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Coupon not found.".to_string()))?;

        let cost = coupon.points_cost.ok_or_else(|| {
            AppError::UnprocessableEntity("Coupon is not purchasable with points.".to_string())
        })?;

        let now = Utc::now().fixed_offset();
        if coupon.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Err(AppError::UnprocessableEntity(
                "Coupon has expired.".to_string(),
            ));
        }

        let txn = db.begin().await?;

        let result = user::Entity::update_many()
            .col_expr(user::Column::Points, Expr::col(user::Column::Points).sub(cost))
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::Points.gte(cost))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            let exists = user::Entity::find_by_id(user_id).one(&txn).await?.is_some();
            return Err(if exists {
                AppError::UnprocessableEntity("Insufficient points.".to_string())
            } else {
                AppError::NotFound("User not found.".to_string())
            });
        }

        let record = coupon_redemption::ActiveModel {
            user_id: Set(user_id),
            coupon_id: Set(coupon.id),
            points_spent: Set(cost),
            redeemed_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let remaining_points = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .map_or(0, |u| u.points);

        txn.commit().await?;

        tracing::info!(
            user_id,
            coupon_id = coupon.id,
            points_spent = cost,
            remaining_points,
            "Coupon redeemed with points"
        );

        Ok(Redemption {
            coupon,
            record,
            remaining_points,
        })
    }

    /// Add `delta` (possibly negative) to a user's balance.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown user; `UnprocessableEntity` if the balance
    /// would drop below zero or overflow.
    pub async fn adjust_points(
        db: &DatabaseConnection,
        user_id: i32,
        delta: i32,
    ) -> Result<user::Model, AppError> {
        let txn = db.begin().await?;

        let user_model = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        let points = user_model
            .points
            .checked_add(delta)
            .filter(|points| *points >= 0)
            .ok_or_else(|| {
                AppError::UnprocessableEntity("Points balance cannot go below zero.".to_string())
            })?;

        let mut active: user::ActiveModel = user_model.into();
        active.points = Set(points);
        active.updated_at = Set(Utc::now().fixed_offset());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        tracing::info!(user_id, delta, points, "Points balance adjusted");
        Ok(updated)
    }
}
