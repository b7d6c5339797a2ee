use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode, header};

use crate::config::Config;

/// Thin client for the third-party dictionary search API.
///
/// Requests carry the keyword as `q` (plus `key` when an API key is configured)
/// and responses are handed back untouched.
#[derive(Debug, Clone)]
pub struct DictionaryClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

/// Raw upstream response as relayed to the caller.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl DictionaryClient {
    #[must_use]
    pub const fn new(
        http: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url,
            api_key,
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        Self::new(
            http,
            config.dictionary_api_url.clone(),
            config.dictionary_api_key.clone(),
            Duration::from_secs(config.dictionary_timeout_secs),
        )
    }

    /// Forward `query` to the upstream search endpoint.
    ///
    /// Non-2xx statuses are not errors here; they are returned for relaying.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure, timeout, or an unreadable body.
    pub async fn search(&self, query: &str) -> Result<UpstreamResponse, reqwest::Error> {
        let mut request = self
            .http
            .get(&self.base_url)
            .timeout(self.timeout)
            .query(&[("q", query)]);

        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await?;

        tracing::debug!(
            status = status.as_u16(),
            bytes = body.len(),
            "Dictionary upstream responded"
        );

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
