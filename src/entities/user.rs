use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    /// `None` for accounts created through Google sign-in.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub name: Option<String>,
    #[sea_orm(unique)]
    pub google_id: Option<String>,
    pub is_admin: bool,
    pub birthdate: Option<Date>,
    pub points: i32,
    #[serde(skip_serializing)]
    pub otp_code: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTimeWithTimeZone>,
    /// Wrong guesses against the current challenge.
    #[serde(skip_serializing)]
    pub otp_failed_attempts: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::coupon_redemption::Entity")]
    CouponRedemption,
}

impl Related<super::coupon_redemption::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CouponRedemption.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The pending OTP challenge, if both halves are present.
    ///
    /// A row with only one of the two columns set has no usable challenge.
    #[must_use]
    pub fn otp_challenge(&self) -> Option<(&str, DateTimeWithTimeZone)> {
        match (&self.otp_code, self.otp_expires_at) {
            (Some(code), Some(expires_at)) => Some((code.as_str(), expires_at)),
            _ => None,
        }
    }
}
