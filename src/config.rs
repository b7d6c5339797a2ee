use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Application configuration, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: IpAddr,
    pub server_port: u16,
    pub environment: Environment,
    pub log_level: String,
    pub auto_migrate: bool,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    /// Argon2 iteration count used for new password hashes.
    pub password_hash_cost: u32,
    pub otp_ttl_secs: u64,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    pub frontend_url: String,
    pub dictionary_api_url: String,
    pub dictionary_api_key: Option<String>,
    pub dictionary_timeout_secs: u64,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

pub const DEFAULT_DICTIONARY_API_URL: &str = "https://opendict.korean.go.kr/api/search";

impl Config {
    /// Load configuration from the process environment (and `.env` if present).
    ///
    /// Required: `DATABASE_URL`. Everything else has a default; see
    /// [`Config::from_lookup`].
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is not set or a value fails to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Secrets (`JWT_SECRET`, Google credentials) default to empty strings and
    /// are reported by [`Config::missing_secrets`] instead of failing here.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing, or if a numeric, boolean
    /// or address value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let environment = match lookup("ENVIRONMENT").as_deref() {
            Some("production") => Environment::Production,
            Some("staging") => Environment::Staging,
            _ => Environment::Development,
        };

        // PORT wins over SERVER_PORT so hosted platforms can inject it
        let server_port = lookup("PORT")
            .or_else(|| lookup("SERVER_PORT"))
            .map_or(Ok(5000), |raw| raw.parse::<u16>())
            .map_err(|_| anyhow::anyhow!("SERVER_PORT / PORT must be a valid u16"))?;

        let default_host = if environment == Environment::Production {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        };

        let server_host = lookup("SERVER_HOST")
            .unwrap_or_else(|| default_host.to_string())
            .parse::<IpAddr>()
            .map_err(|_| anyhow::anyhow!("SERVER_HOST must be a valid IP address"))?;

        let auto_migrate = match lookup("AUTO_MIGRATE") {
            Some(raw) => parse_bool("AUTO_MIGRATE", &raw)?,
            None => environment != Environment::Production,
        };

        let password_hash_cost = parse_or(&lookup, "PASSWORD_HASH_COST", 2_u32)?;
        if !(1..=10).contains(&password_hash_cost) {
            anyhow::bail!("PASSWORD_HASH_COST must be between 1 and 10");
        }

        Ok(Self {
            database_url,
            server_host,
            server_port,
            environment,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            auto_migrate,
            jwt_secret: lookup("JWT_SECRET").unwrap_or_default(),
            jwt_expiration_secs: parse_or(&lookup, "JWT_EXPIRATION_SECS", 86_400)?,
            password_hash_cost,
            otp_ttl_secs: parse_or(&lookup, "OTP_TTL_SECS", 300)?,
            google_client_id: lookup("GOOGLE_CLIENT_ID").unwrap_or_default(),
            google_client_secret: lookup("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            google_redirect_uri: lookup("GOOGLE_REDIRECT_URI").unwrap_or_default(),
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            dictionary_api_url: lookup("DICTIONARY_API_URL")
                .unwrap_or_else(|| DEFAULT_DICTIONARY_API_URL.to_string()),
            dictionary_api_key: lookup("DICTIONARY_API_KEY").filter(|key| !key.is_empty()),
            dictionary_timeout_secs: parse_or(&lookup, "DICTIONARY_TIMEOUT_SECS", 10)?,
        })
    }

    /// Names of secret settings that were left empty.
    ///
    /// These are not load errors; the server warns about them at startup.
    #[must_use]
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        [
            ("JWT_SECRET", &self.jwt_secret),
            ("GOOGLE_CLIENT_ID", &self.google_client_id),
            ("GOOGLE_CLIENT_SECRET", &self.google_client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Build the socket address for the server to bind to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_host, self.server_port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{key} has an invalid value: {raw}"))
    })
}

fn parse_bool(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!("{key} must be a boolean, got: {raw}")),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = load(&[("DATABASE_URL", "sqlite::memory:")]).expect("config should load");

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
        assert_eq!(config.jwt_expiration_secs, 86_400);
        assert_eq!(config.password_hash_cost, 2);
        assert_eq!(config.otp_ttl_secs, 300);
        assert_eq!(config.dictionary_api_url, DEFAULT_DICTIONARY_API_URL);
        assert!(config.dictionary_api_key.is_none());
        assert!(config.auto_migrate);
    }

    #[test]
    fn database_url_is_required() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn port_takes_precedence_over_server_port() {
        let config = load(&[
            ("DATABASE_URL", "x"),
            ("PORT", "4000"),
            ("SERVER_PORT", "5001"),
        ]);
        assert_eq!(config.map(|c| c.server_port).ok(), Some(4000));

        let config = load(&[("DATABASE_URL", "x"), ("SERVER_PORT", "5001")]);
        assert_eq!(config.map(|c| c.server_port).ok(), Some(5001));
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(load(&[("DATABASE_URL", "x"), ("PORT", "99999")]).is_err());
        assert!(load(&[("DATABASE_URL", "x"), ("PORT", "abc")]).is_err());
    }

    #[test]
    fn production_binds_all_interfaces_and_skips_auto_migrate() {
        let config = load(&[("DATABASE_URL", "x"), ("ENVIRONMENT", "production")]);
        let config = config.ok();
        assert_eq!(
            config.as_ref().map(|c| c.server_host.to_string()),
            Some("0.0.0.0".to_string())
        );
        assert_eq!(config.map(|c| c.auto_migrate), Some(false));
    }

    #[test]
    fn auto_migrate_can_be_overridden() {
        let config = load(&[
            ("DATABASE_URL", "x"),
            ("ENVIRONMENT", "production"),
            ("AUTO_MIGRATE", "yes"),
        ]);
        assert_eq!(config.map(|c| c.auto_migrate).ok(), Some(true));
        assert!(load(&[("DATABASE_URL", "x"), ("AUTO_MIGRATE", "maybe")]).is_err());
    }

    #[test]
    fn hash_cost_must_be_in_range() {
        assert!(load(&[("DATABASE_URL", "x"), ("PASSWORD_HASH_COST", "0")]).is_err());
        assert!(load(&[("DATABASE_URL", "x"), ("PASSWORD_HASH_COST", "11")]).is_err());
        let config = load(&[("DATABASE_URL", "x"), ("PASSWORD_HASH_COST", "4")]);
        assert_eq!(config.map(|c| c.password_hash_cost).ok(), Some(4));
    }

    #[test]
    fn missing_secrets_are_reported_not_rejected() {
        let config = load(&[("DATABASE_URL", "x"), ("GOOGLE_CLIENT_ID", "id")]);
        assert_eq!(
            config.map(|c| c.missing_secrets()).ok(),
            Some(vec!["JWT_SECRET", "GOOGLE_CLIENT_SECRET"])
        );
    }

    #[test]
    fn empty_dictionary_key_is_treated_as_unset() {
        let config = load(&[("DATABASE_URL", "x"), ("DICTIONARY_API_KEY", "")]);
        assert_eq!(config.map(|c| c.dictionary_api_key).ok(), Some(None));
    }
}
