use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use oauth2::{AuthorizationCode, CsrfToken, Scope, TokenResponse};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use super::users::{UserResponse, normalize_name, validate_birthdate};
use crate::auth::otp::{self, OtpCheck};
use crate::auth::{jwt, oauth, password};
use crate::entities::user;
use crate::error::AppError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the auth route group: `/auth/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/otp/request", post(otp_request))
        .route("/otp/verify", post(otp_verify))
        .route("/oauth/google", get(oauth_google_initiate))
        .route("/oauth/google/callback", get(oauth_google_callback))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    password: String,
    name: Option<String>,
    birthdate: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct OtpRequest {
    email: String,
}

#[derive(Deserialize)]
struct OtpVerifyRequest {
    email: String,
    code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuthInitiateQuery {
    redirect_uri: Option<String>,
}

#[derive(Deserialize)]
struct OAuthCallbackQuery {
    code: String,
    state: String,
}

#[derive(Serialize)]
struct AuthResponse {
    user: UserResponse,
    token: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn auth_response(state: &AppState, user_model: &user::Model) -> Result<AuthResponse, AppError> {
    let token = jwt::generate_token(user_model.id, user_model.is_admin, &state.config)?;
    Ok(AuthResponse {
        user: UserResponse::from(user_model),
        token,
    })
}

async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, AppError> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?)
}

/// Write both OTP columns together so a row never holds half a challenge.
///
/// The failed-attempt counter restarts with every new or cleared challenge.
async fn store_otp(
    db: &DatabaseConnection,
    user_model: user::Model,
    challenge: Option<otp::OtpChallenge>,
) -> Result<user::Model, AppError> {
    let (code, expires_at) = challenge.map_or((None, None), |c| (Some(c.code), Some(c.expires_at)));

    let mut active: user::ActiveModel = user_model.into();
    active.otp_code = Set(code);
    active.otp_expires_at = Set(expires_at);
    active.otp_failed_attempts = Set(0);
    active.updated_at = Set(Utc::now().fixed_offset());
    Ok(active.update(db).await?)
}

/// Count a wrong guess; discard the challenge once the limit is reached.
async fn record_failed_otp(db: &DatabaseConnection, user_id: i32) -> Result<(), AppError> {
    user::Entity::update_many()
        .col_expr(
            user::Column::OtpFailedAttempts,
            Expr::col(user::Column::OtpFailedAttempts).add(1),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    let Some(current) = user::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(());
    };

    if current.otp_failed_attempts >= otp::MAX_FAILED_ATTEMPTS {
        tracing::warn!(user_id, "Too many wrong one-time codes, challenge discarded");
        store_otp(db, current, None).await?;
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/auth/register`
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let email = password::normalize_email(&body.email);

    password::validate_email(&email).map_err(AppError::BadRequest)?;
    password::validate_password(&body.password).map_err(AppError::BadRequest)?;
    let name = normalize_name(body.name.as_deref()).map_err(AppError::BadRequest)?;
    if let Some(birthdate) = body.birthdate {
        validate_birthdate(birthdate).map_err(AppError::BadRequest)?;
    }

    if find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered.".to_string()));
    }

    let password_hash = password::hash_password(&body.password, state.config.password_hash_cost)?;
    let now = Utc::now().fixed_offset();

    let user_model = user::ActiveModel {
        email: Set(email),
        password_hash: Set(Some(password_hash)),
        name: Set(name),
        google_id: Set(None),
        is_admin: Set(false),
        birthdate: Set(body.birthdate),
        points: Set(0),
        otp_code: Set(None),
        otp_expires_at: Set(None),
        otp_failed_attempts: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(user_id = user_model.id, "User registered");

    let response = auth_response(&state, &user_model)?;
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// `POST /api/auth/login`
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password.".to_string());

    let email = password::normalize_email(&body.email);
    let user_model = find_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;

    // Google-only accounts have no password to check against
    let hash = user_model.password_hash.as_deref().ok_or_else(invalid)?;
    if !password::verify_password(&body.password, hash)? {
        return Err(invalid());
    }

    Ok(Json(auth_response(&state, &user_model)?))
}

/// `POST /api/auth/otp/request`
async fn otp_request(
    State(state): State<AppState>,
    Json(body): Json<OtpRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = password::normalize_email(&body.email);
    let message = MessageResponse {
        message: "If the account exists, a one-time code has been sent.".to_string(),
    };

    let Some(user_model) = find_by_email(&state.db, &email).await? else {
        tracing::debug!("OTP requested for unknown email");
        return Ok(Json(message));
    };

    let challenge = otp::issue(Utc::now(), state.config.otp_ttl_secs);
    let code = challenge.code.clone();
    let user_model = store_otp(&state.db, user_model, Some(challenge)).await?;

    // Delivery stub until an email provider is wired in
    tracing::info!(
        user_id = user_model.id,
        code = %code,
        "One-time code generated (email sending not yet implemented)"
    );

    Ok(Json(message))
}

/// `POST /api/auth/otp/verify`
async fn otp_verify(
    State(state): State<AppState>,
    Json(body): Json<OtpVerifyRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = password::normalize_email(&body.email);
    let user_model = find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired code.".to_string()))?;

    match otp::check(user_model.otp_challenge(), &body.code, Utc::now()) {
        OtpCheck::Valid => {
            let user_model = store_otp(&state.db, user_model, None).await?;
            Ok(Json(auth_response(&state, &user_model)?))
        }
        OtpCheck::Expired => {
            store_otp(&state.db, user_model, None).await?;
            Err(AppError::Unauthorized("Invalid or expired code.".to_string()))
        }
        OtpCheck::Mismatch => {
            record_failed_otp(&state.db, user_model.id).await?;
            Err(AppError::Unauthorized("Invalid or expired code.".to_string()))
        }
        OtpCheck::Missing => Err(AppError::Unauthorized("Invalid or expired code.".to_string())),
    }
}

/// `GET /api/auth/oauth/google`
async fn oauth_google_initiate(
    State(state): State<AppState>,
    Query(query): Query<OAuthInitiateQuery>,
) -> Result<Response, AppError> {
    if state.config.google_client_id.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "Google OAuth is not configured.".to_string(),
        ));
    }

    if query
        .redirect_uri
        .as_deref()
        .is_some_and(|uri| !oauth::is_allowed_redirect(uri, &state.config.frontend_url))
    {
        return Err(AppError::BadRequest(
            "Redirect URI must be on the frontend origin.".to_string(),
        ));
    }

    let client = oauth::google_client(&state.config)?;
    let state_token =
        jwt::generate_oauth_state(&state.config.jwt_secret, query.redirect_uri.as_deref())?;

    let (auth_url, _csrf) = client
        .authorize_url(|| CsrfToken::new(state_token))
        .add_scope(Scope::new("openid".to_string()))
        .add_scope(Scope::new("email".to_string()))
        .add_scope(Scope::new("profile".to_string()))
        .url();

    Ok(Redirect::temporary(auth_url.as_str()).into_response())
}

/// `GET /api/auth/oauth/google/callback`
async fn oauth_google_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Response, AppError> {
    let state_claims = jwt::validate_oauth_state(&query.state, &state.config.jwt_secret)
        .map_err(|_| AppError::BadRequest("Invalid or expired OAuth state.".to_string()))?;

    let client = oauth::google_client(&state.config)?;
    let token_result = client
        .exchange_code(AuthorizationCode::new(query.code))
        .request_async(&state.http)
        .await
        .map_err(|e| AppError::BadGateway(format!("Failed to exchange authorization code: {e}")))?;

    let access_token = token_result.access_token().secret().clone();
    let google_user = oauth::fetch_google_userinfo(&state.http, &access_token)
        .await
        .map_err(|e| AppError::BadGateway(e.to_string()))?;

    let user_model = google_find_or_create_user(&state.db, google_user).await?;
    let response = auth_response(&state, &user_model)?;

    if let Some(redirect_uri) = state_claims.redirect_uri {
        let redirect_url = format!(
            "{redirect_uri}?provider=google&token={}",
            urlencoding::encode(&response.token)
        );
        return Ok(Redirect::temporary(&redirect_url).into_response());
    }

    Ok(Json(response).into_response())
}

/// Resolve a Google identity: by `google_id`, else link by verified email, else create.
async fn google_find_or_create_user(
    db: &DatabaseConnection,
    google_user: oauth::GoogleUserInfo,
) -> Result<user::Model, AppError> {
    let linked = user::Entity::find()
        .filter(user::Column::GoogleId.eq(&google_user.sub))
        .one(db)
        .await?;
    if let Some(user_model) = linked {
        return Ok(user_model);
    }

    let email = password::normalize_email(&google_user.email);
    let now = Utc::now().fixed_offset();

    if let Some(existing) = find_by_email(db, &email).await? {
        // Only Google's own verification proves the caller owns this address
        if google_user.email_verified != Some(true) {
            return Err(AppError::Conflict(
                "Email is already registered. Sign in with your password first.".to_string(),
            ));
        }
        tracing::info!(user_id = existing.id, "Linking Google account to existing user");
        let mut active: user::ActiveModel = existing.into();
        active.google_id = Set(Some(google_user.sub));
        active.updated_at = Set(now);
        return Ok(active.update(db).await?);
    }

    let user_model = user::ActiveModel {
        email: Set(email),
        password_hash: Set(None),
        name: Set(google_user.name),
        google_id: Set(Some(google_user.sub)),
        is_admin: Set(false),
        birthdate: Set(None),
        points: Set(0),
        otp_code: Set(None),
        otp_expires_at: Set(None),
        otp_failed_attempts: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = user_model.id, "User created from Google sign-in");
    Ok(user_model)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};

    async fn migrated_db() -> DatabaseConnection {
        let db = sea_orm::Database::connect("sqlite::memory:")
            .await
            .expect("sqlite should connect");
        Migrator::up(&db, None).await.expect("migrations should apply");
        db
    }

    async fn insert_password_user(db: &DatabaseConnection, email: &str) -> user::Model {
        let now = Utc::now().fixed_offset();
        user::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(Some("$argon2id$placeholder".to_string())),
            is_admin: Set(false),
            points: Set(0),
            otp_failed_attempts: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert user")
    }

    fn google(sub: &str, email: &str, email_verified: Option<bool>) -> oauth::GoogleUserInfo {
        oauth::GoogleUserInfo {
            sub: sub.to_string(),
            email: email.to_string(),
            email_verified,
            name: Some("Google User".to_string()),
        }
    }

    #[tokio::test]
    async fn verified_email_links_existing_account() {
        let db = migrated_db().await;
        let existing = insert_password_user(&db, "owner@example.com").await;

        let linked = google_find_or_create_user(&db, google("g-1", "Owner@Example.com", Some(true)))
            .await
            .expect("link");

        assert_eq!(linked.id, existing.id);
        assert_eq!(linked.google_id.as_deref(), Some("g-1"));
    }

    #[tokio::test]
    async fn unverified_email_does_not_take_over_existing_account() {
        let db = migrated_db().await;
        let existing = insert_password_user(&db, "victim@example.com").await;

        for verified in [Some(false), None] {
            let result =
                google_find_or_create_user(&db, google("g-2", "victim@example.com", verified)).await;
            assert!(matches!(result, Err(AppError::Conflict(_))));
        }

        let reloaded = user::Entity::find_by_id(existing.id)
            .one(&db)
            .await
            .expect("query")
            .expect("user");
        assert!(reloaded.google_id.is_none());
    }

    #[tokio::test]
    async fn new_google_user_is_created_and_found_again_by_subject() {
        let db = migrated_db().await;

        let created = google_find_or_create_user(&db, google("g-3", "fresh@example.com", None))
            .await
            .expect("create");
        assert_eq!(created.email, "fresh@example.com");
        assert!(created.password_hash.is_none());

        let again = google_find_or_create_user(&db, google("g-3", "fresh@example.com", None))
            .await
            .expect("find");
        assert_eq!(again.id, created.id);
    }
}
