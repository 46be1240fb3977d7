//! The client: request pacing, retry, and the typed page fetch used by
//! the iterator.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{DispatchError, DispatchResult, TransportError};
use crate::query::SearchQuery;
use crate::transport::{HttpTransport, Transport};

/// One page of search results, as returned by a result section of the
/// response.
#[derive(Debug, Clone)]
pub struct ResultPage {
    pub results: Vec<Value>,
    pub total_results: u64,
    pub page: u32,
    pub pages: u64,
}

impl ResultPage {
    /// Extract the named section from a response body.
    fn from_response(value: &Value, section: &str) -> DispatchResult<Self> {
        let block = value.get(section).ok_or_else(|| {
            DispatchError::MalformedResponse(format!("response is missing the '{section}' section"))
        })?;
        let results = block
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DispatchError::MalformedResponse(format!(
                    "'{section}.results' is missing or not an array"
                ))
            })?
            .clone();
        let total_results = block
            .get("totalResults")
            .and_then(Value::as_u64)
            .unwrap_or(results.len() as u64);
        let page = block.get("page").and_then(Value::as_u64).unwrap_or(1) as u32;
        let pages = block.get("pages").and_then(Value::as_u64).unwrap_or(1);
        Ok(Self {
            results,
            total_results,
            page,
            pages,
        })
    }
}

/// Client for the news search service.
///
/// A single instance paces all of its outbound calls: no two requests
/// leave less than [`Config::min_delay`] apart, regardless of which task
/// issued them. Failed exchanges are retried up to
/// [`Config::retry_count`] times when the failure is transient.
pub struct EventRegistry {
    transport: Arc<dyn Transport>,
    config: Config,
    last_request: Mutex<Option<Instant>>,
}

impl EventRegistry {
    pub fn new(config: Config) -> Result<Self, TransportError> {
        let transport = Arc::new(HttpTransport::new(config.host.clone())?);
        Ok(Self::with_transport(config, transport))
    }

    /// Build a client over a custom transport. Used by tests and by
    /// callers that need to interpose on the HTTP layer.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config,
            last_request: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reserve the next send slot and return how long to wait for it.
    ///
    /// The slot is claimed under the lock so concurrent callers space
    /// out instead of piling onto the same deadline; the actual sleep
    /// happens outside the lock.
    fn reserve_slot(&self) -> Duration {
        let now = Instant::now();
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let send_at = match *last {
            Some(prev) => {
                let earliest = prev + self.config.min_delay;
                if earliest > now {
                    earliest
                } else {
                    now
                }
            }
            None => now,
        };
        *last = Some(send_at);
        send_at.saturating_duration_since(now)
    }

    async fn pace(&self) {
        let wait = self.reserve_slot();
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "pacing request");
            tokio::time::sleep(wait).await;
        }
    }

    /// Send one request, pacing and retrying as configured. Transient
    /// failures are re-attempted up to `retry_count` times; the error
    /// returned after the budget is spent reports the total attempt
    /// count.
    pub async fn dispatch(
        &self,
        path: &str,
        mut body: Map<String, Value>,
    ) -> DispatchResult<Value> {
        if let Some(key) = &self.config.api_key {
            body.insert("apiKey".to_string(), Value::String(key.clone()));
        }
        let mut attempts: u32 = 0;
        loop {
            self.pace().await;
            attempts += 1;
            if self.config.verbose {
                info!(path, attempt = attempts, "sending request");
            } else {
                debug!(path, attempt = attempts, "sending request");
            }
            match self.transport.post(path, &body).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() || attempts > self.config.retry_count {
                        return Err(DispatchError::fatal(attempts, &err));
                    }
                    warn!(path, attempt = attempts, error = %err, "retrying failed request");
                }
            }
        }
    }

    /// Execute a search and return the raw response body.
    pub async fn exec_query<Q: SearchQuery + ?Sized>(&self, query: &Q) -> DispatchResult<Value> {
        let body = query.body()?;
        self.dispatch(query.path(), body).await
    }

    /// Fetch one page of a search's result section.
    pub(crate) async fn fetch_page<Q: SearchQuery + ?Sized>(
        &self,
        query: &Q,
        page: u32,
        count: u32,
    ) -> DispatchResult<ResultPage> {
        let mut body = query.body()?;
        let section = query.result_section();
        body.insert(format!("{section}Page"), json!(page));
        body.insert(format!("{section}Count"), json!(count));
        let value = self.dispatch(query.path(), body).await?;
        ResultPage::from_response(&value, section)
    }

    /// Look up the URI for a concept label; `None` when nothing matches.
    pub async fn get_concept_uri(&self, label: &str) -> DispatchResult<Option<String>> {
        self.suggest_uri("/api/v1/suggestConceptsFast", label, "uri")
            .await
    }

    /// Look up the URI for a category label.
    pub async fn get_category_uri(&self, label: &str) -> DispatchResult<Option<String>> {
        self.suggest_uri("/api/v1/suggestCategoriesFast", label, "uri")
            .await
    }

    /// Look up the URI for a news source by name or domain.
    pub async fn get_news_source_uri(&self, name: &str) -> DispatchResult<Option<String>> {
        self.suggest_uri("/api/v1/suggestSourcesFast", name, "uri")
            .await
    }

    /// Look up the URI for a place name. Locations are keyed by their
    /// encyclopedia page URI.
    pub async fn get_location_uri(&self, name: &str) -> DispatchResult<Option<String>> {
        self.suggest_uri("/api/v1/suggestLocationsFast", name, "wikiUri")
            .await
    }

    /// Call a suggestion endpoint and take the top match's URI field.
    async fn suggest_uri(
        &self,
        path: &'static str,
        prefix: &str,
        uri_key: &str,
    ) -> DispatchResult<Option<String>> {
        let mut body = Map::new();
        body.insert("prefix".to_string(), Value::String(prefix.to_string()));
        body.insert("page".to_string(), json!(1));
        body.insert("count".to_string(), json!(5));
        let value = self.dispatch(path, body).await?;
        let suggestions = value.as_array().ok_or_else(|| {
            DispatchError::MalformedResponse(format!(
                "suggestion endpoint {path} did not return a list"
            ))
        })?;
        Ok(suggestions
            .first()
            .and_then(|item| item.get(uri_key))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_page_from_response() {
        let body = json!({
            "articles": {
                "results": [{"title": "a"}, {"title": "b"}],
                "totalResults": 42,
                "page": 2,
                "count": 2,
                "pages": 21
            }
        });
        let page = ResultPage::from_response(&body, "articles").unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.total_results, 42);
        assert_eq!(page.page, 2);
        assert_eq!(page.pages, 21);
    }

    #[test]
    fn test_result_page_missing_section() {
        let body = json!({"events": {"results": []}});
        let err = ResultPage::from_response(&body, "articles").unwrap_err();
        assert!(matches!(err, DispatchError::MalformedResponse(_)));
    }

    #[test]
    fn test_reserve_slot_spaces_consecutive_calls() {
        let config = Config::default().with_min_delay(Duration::from_millis(200));
        let client = EventRegistry::with_transport(
            config,
            Arc::new(crate::transport::HttpTransport::new("http://localhost").unwrap()),
        );
        assert!(client.reserve_slot().is_zero());
        let second = client.reserve_slot();
        assert!(second > Duration::from_millis(150));
        assert!(second <= Duration::from_millis(200));
    }
}
