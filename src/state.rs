use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::services::DictionaryClient;

/// Shared application state available to all request handlers via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    /// Outbound HTTP client shared by OAuth and the dictionary proxy.
    pub http: reqwest::Client,
    pub dictionary: DictionaryClient,
}

impl AppState {
    /// Assemble the state from a connected database and the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(db: DatabaseConnection, config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tattant-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        let dictionary = DictionaryClient::from_config(http.clone(), &config);

        Ok(Self {
            db,
            config: Arc::new(config),
            http,
            dictionary,
        })
    }
}
