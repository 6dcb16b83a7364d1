//! HTTP access to the log feeds.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::FetchError;
use crate::record::RawRecord;
use crate::source::{LogSource, extract_rows};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }

    #[must_use]
    pub fn url_for(&self, source: LogSource) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), source.endpoint())
    }
}

/// Where records come from. The reconciler only sees this trait.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch(&self, source: LogSource) -> Result<Vec<RawRecord>, FetchError>;
}

/// GETs each feed from the backend with a hard timeout.
#[derive(Debug, Clone)]
pub struct HttpRecordFetcher {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpRecordFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get_body(&self, source: LogSource) -> Result<Value, FetchError> {
        let url = self.config.url_for(source);
        log::debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| self.transport_error(source, &err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                feed: source,
                status: status.as_u16(),
            });
        }
        response.json::<Value>().await.map_err(|err| {
            if err.is_decode() {
                FetchError::Decode {
                    feed: source,
                    message: err.to_string(),
                }
            } else {
                self.transport_error(source, &err)
            }
        })
    }

    fn transport_error(&self, source: LogSource, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                feed: source,
                timeout_ms: self.config.timeout_ms,
            }
        } else {
            FetchError::Transport {
                feed: source,
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl RecordFetcher for HttpRecordFetcher {
    async fn fetch(&self, source: LogSource) -> Result<Vec<RawRecord>, FetchError> {
        // The client timeout covers each phase; this bounds the whole exchange.
        let body = tokio::time::timeout(self.config.timeout(), self.get_body(source))
            .await
            .map_err(|_| FetchError::Timeout {
                feed: source,
                timeout_ms: self.config.timeout_ms,
            })??;
        let rows = extract_rows(body);
        log::debug!("{source}: {} records", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_without_double_slash() {
        let config = ClientConfig {
            base_url: "http://bank.test:3001/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(
            config.url_for(LogSource::Audit),
            "http://bank.test:3001/api/audit-log"
        );
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"timeout_ms": 250}"#).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }
}
