//! HTTP transport seam. The client talks to the service through the
//! [`Transport`] trait so tests can substitute a scripted transport.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::TransportError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One JSON-in, JSON-out request to the service.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, path: &str, body: &Map<String, Value>) -> Result<Value, TransportError>;
}

/// Production transport over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Network {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: &Map<String, Value>) -> Result<Value, TransportError> {
        let url = self.url(path);
        debug!(%url, "dispatching request");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network {
                message: e.to_string(),
            })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| TransportError::Network {
            message: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        let value: Value = serde_json::from_str(&text).map_err(|e| TransportError::Decode {
            message: format!("invalid JSON response: {e}"),
        })?;
        // The service reports some failures as 200 with an "error" field.
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Err(TransportError::Service {
                message: message.to_string(),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let transport = HttpTransport::new("https://eventregistry.org/").unwrap();
        assert_eq!(
            transport.url("/api/v1/article/getArticles"),
            "https://eventregistry.org/api/v1/article/getArticles"
        );
    }
}
