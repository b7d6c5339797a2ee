use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

/// Claims embedded in access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's numeric ID as a string.
    pub sub: String,
    /// Admin flag at the time the token was issued.
    pub is_admin: bool,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued-at time (Unix timestamp).
    pub iat: i64,
}

impl Claims {
    /// Parse the subject back into a user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject is not a number.
    pub fn user_id(&self) -> anyhow::Result<i32> {
        self.sub
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid token subject: {}", self.sub))
    }
}

/// Issue an access token for the given user.
///
/// # Errors
///
/// Returns an error if JWT encoding fails.
pub fn generate_token(user_id: i32, is_admin: bool, config: &Config) -> anyhow::Result<String> {
    let now = Utc::now().timestamp();

    #[allow(clippy::cast_possible_wrap)]
    let exp = now + config.jwt_expiration_secs as i64;

    let claims = Claims {
        sub: user_id.to_string(),
        is_admin,
        exp,
        iat: now,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| anyhow::anyhow!("Failed to encode access token: {e}"))
}

/// Validate an access token and return its claims.
///
/// # Errors
///
/// Returns an error if the token is malformed, has a bad signature, or is expired.
pub fn validate_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| anyhow::anyhow!("Invalid access token: {e}"))?;

    Ok(token_data.claims)
}

/// Claims for OAuth CSRF state tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthStateClaims {
    pub csrf: String,
    pub redirect_uri: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Generate a short-lived JWT for OAuth CSRF state (30 minutes).
///
/// # Errors
///
/// Returns an error if JWT encoding fails.
pub fn generate_oauth_state(secret: &str, redirect_uri: Option<&str>) -> anyhow::Result<String> {
    let now = Utc::now();

    let claims = OAuthStateClaims {
        csrf: Uuid::new_v4().to_string(),
        redirect_uri: redirect_uri.map(String::from),
        exp: now.timestamp() + 1800,
        iat: now.timestamp(),
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| anyhow::anyhow!("Failed to encode OAuth state: {e}"))
}

/// Validate an OAuth CSRF state token.
///
/// # Errors
///
/// Returns an error if the state token is invalid or expired.
pub fn validate_oauth_state(state: &str, secret: &str) -> anyhow::Result<OAuthStateClaims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<OAuthStateClaims>(state, &key, &validation)
        .map_err(|e| anyhow::anyhow!("Invalid OAuth state: {e}"))?;

    Ok(token_data.claims)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn config(secret: &str) -> Config {
        let secret = secret.to_string();
        Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("sqlite::memory:".to_string()),
            "JWT_SECRET" => Some(secret.clone()),
            _ => None,
        })
        .expect("test config should load")
    }

    #[test]
    fn token_round_trips_subject_and_admin_flag() {
        let token = generate_token(42, true, &config("unit-test-secret")).expect("encode");

        let claims = validate_token(&token, "unit-test-secret").expect("decode");
        assert_eq!(claims.sub, "42");
        assert!(claims.is_admin);
        assert_eq!(claims.user_id().ok(), Some(42));
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = generate_token(1, false, &config("secret-a")).expect("encode");
        assert!(validate_token(&token, "secret-b").is_err());
    }

    #[test]
    fn oauth_state_keeps_redirect_uri() {
        let state = generate_oauth_state("s", Some("http://localhost:3000/cb")).expect("encode");
        let claims = validate_oauth_state(&state, "s").expect("decode");
        assert_eq!(
            claims.redirect_uri.as_deref(),
            Some("http://localhost:3000/cb")
        );
    }

    #[test]
    fn garbage_is_not_a_token() {
        assert!(validate_token("not-a-jwt", "s").is_err());
        assert!(validate_oauth_state("not-a-jwt", "s").is_err());
    }
}
