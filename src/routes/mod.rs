mod admin;
mod auth;
mod coupons;
mod dictionary;
mod health;
mod users;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router.
///
/// Structure:
/// - `GET /health` — lightweight liveness check
/// - `/api/health` — health check with database connectivity
/// - `/api/auth/...` — registration, login, OTP and Google sign-in
/// - `/api/users/...` — profile, birthdate, points, redemptions
/// - `/api/coupons/...` — coupon catalogue and redemption with points
/// - `/api/admin/...` — admin-only maintenance
/// - `/api/dictionary/search` — pass-through dictionary proxy
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .merge(health::api_router())
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/coupons", coupons::router())
        .nest("/admin", admin::router())
        .nest("/dictionary", dictionary::router());

    Router::new()
        .merge(health::root_router())
        .nest("/api", api)
}
