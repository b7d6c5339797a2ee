pub mod coupon;
pub mod coupon_redemption;
pub mod user;
