//! End-to-end tests over a scripted transport: dispatch retry behavior,
//! request pacing, and paged iteration.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use eventregistry::{
    Config, DispatchError, EventRegistry, PagedIter, QueryArticles, QueryEvents, Transport,
    TransportError,
};

/// Transport that replays a scripted sequence of outcomes and records
/// every request it receives.
struct Scripted {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl Scripted {
    fn new(responses: Vec<Result<Value, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn call(&self, index: usize) -> (String, Map<String, Value>) {
        self.calls.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn post(&self, path: &str, body: &Map<String, Value>) -> Result<Value, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), body.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Network {
                    message: "script exhausted".to_string(),
                })
            })
    }
}

fn fast_config() -> Config {
    Config::new("test-key")
        .with_min_delay(Duration::ZERO)
        .with_retry_count(2)
}

fn articles_page(results: Vec<Value>, total: u64, page: u64, pages: u64) -> Value {
    json!({
        "articles": {
            "results": results,
            "totalResults": total,
            "page": page,
            "pages": pages
        }
    })
}

fn article(id: u64) -> Value {
    json!({"uri": id.to_string(), "title": format!("article {id}")})
}

#[tokio::test]
async fn retry_budget_spent_reports_total_attempts() {
    let transport = Scripted::new(vec![
        Err(TransportError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }),
        Err(TransportError::Network {
            message: "reset".to_string(),
        }),
        Err(TransportError::Status {
            status: 429,
            body: "slow down".to_string(),
        }),
    ]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());
    let err = client
        .exec_query(&QueryArticles::new().keywords("x"))
        .await
        .unwrap_err();
    match err {
        DispatchError::Fatal { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected Fatal, got {other:?}"),
    }
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn non_retryable_error_fails_on_first_attempt() {
    let transport = Scripted::new(vec![Err(TransportError::Service {
        message: "invalid api key".to_string(),
    })]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());
    let err = client
        .exec_query(&QueryArticles::new().keywords("x"))
        .await
        .unwrap_err();
    match err {
        DispatchError::Fatal { attempts, message } => {
            assert_eq!(attempts, 1);
            assert!(message.contains("invalid api key"));
        }
        other => panic!("expected Fatal, got {other:?}"),
    }
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn transient_failure_then_success() {
    let transport = Scripted::new(vec![
        Err(TransportError::Status {
            status: 500,
            body: String::new(),
        }),
        Ok(articles_page(vec![article(1)], 1, 1, 1)),
    ]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());
    let value = client
        .exec_query(&QueryArticles::new().keywords("x"))
        .await
        .unwrap();
    assert_eq!(value["articles"]["results"][0]["uri"], json!("1"));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn api_key_and_query_document_in_body() {
    let transport = Scripted::new(vec![Ok(articles_page(vec![], 0, 1, 1))]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());
    let _ = client
        .exec_query(&QueryArticles::new().keywords("Tesla"))
        .await
        .unwrap();
    let (path, body) = transport.call(0);
    assert_eq!(path, "/api/v1/article/getArticles");
    assert_eq!(body["apiKey"], json!("test-key"));
    assert_eq!(body["resultType"], json!("articles"));
    let doc: Value = serde_json::from_str(body["query"].as_str().unwrap()).unwrap();
    assert_eq!(doc, json!({"$query": {"keyword": "Tesla"}}));
}

#[tokio::test]
async fn consecutive_dispatches_are_paced() {
    let transport = Scripted::new(vec![
        Ok(articles_page(vec![article(1)], 1, 1, 1)),
        Ok(articles_page(vec![article(2)], 1, 1, 1)),
    ]);
    let config = Config::new("test-key")
        .with_min_delay(Duration::from_millis(80))
        .with_retry_count(0);
    let client = EventRegistry::with_transport(config, transport);
    let query = QueryArticles::new().keywords("x");

    let started = Instant::now();
    client.exec_query(&query).await.unwrap();
    client.exec_query(&query).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[tokio::test]
async fn iterator_trims_final_batch_to_max_items() {
    let transport = Scripted::new(vec![
        Ok(articles_page(vec![article(1), article(2)], 5, 1, 3)),
        Ok(articles_page(vec![article(3), article(4)], 5, 2, 3)),
    ]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());
    let mut iter = PagedIter::new(&client, QueryArticles::new().keywords("x"))
        .batch_size(2)
        .max_items(3);

    let first = iter.next_batch().await.unwrap();
    assert_eq!(first.items.len(), 2);
    assert!(first.error.is_none());

    let second = iter.next_batch().await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0]["uri"], json!("3"));

    assert!(iter.next_batch().await.is_none());
    assert_eq!(iter.consumed(), 3);
    assert_eq!(transport.call_count(), 2);

    // The per-page count never changes; the cap is enforced by trimming.
    let (_, body) = transport.call(1);
    assert_eq!(body["articlesPage"], json!(2));
    assert_eq!(body["articlesCount"], json!(2));
}

/// Transport that serves a fixed item store, windowing pages the way
/// the service does: page `p` with count `c` covers `[(p-1)*c, p*c)`.
struct Windowed {
    items: Vec<Value>,
}

#[async_trait]
impl Transport for Windowed {
    async fn post(&self, _path: &str, body: &Map<String, Value>) -> Result<Value, TransportError> {
        let page = body["articlesPage"].as_u64().unwrap() as usize;
        let count = body["articlesCount"].as_u64().unwrap() as usize;
        let start = (page - 1) * count;
        let end = (start + count).min(self.items.len());
        let results: Vec<Value> = self.items.get(start..end).unwrap_or(&[]).to_vec();
        let pages = (self.items.len() + count - 1) / count;
        Ok(json!({
            "articles": {
                "results": results,
                "totalResults": self.items.len(),
                "page": page,
                "pages": pages
            }
        }))
    }
}

#[tokio::test]
async fn capped_iteration_yields_each_item_exactly_once() {
    let transport = Arc::new(Windowed {
        items: (0u64..10).map(article).collect(),
    });
    let client = EventRegistry::with_transport(fast_config(), transport);
    let mut iter = PagedIter::new(&client, QueryArticles::new().keywords("x"))
        .batch_size(4)
        .max_items(6);

    let all = iter.drain().await.unwrap();
    let uris: Vec<&str> = all.iter().map(|a| a["uri"].as_str().unwrap()).collect();
    assert_eq!(uris, ["0", "1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn iterator_stops_on_empty_page() {
    let transport = Scripted::new(vec![Ok(articles_page(vec![], 0, 1, 1))]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());
    let mut iter = PagedIter::new(&client, QueryArticles::new().keywords("nothing"));
    assert!(iter.next_batch().await.is_none());
    assert!(iter.next_batch().await.is_none());
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn iterator_stops_after_last_page_without_extra_request() {
    let transport = Scripted::new(vec![
        Ok(articles_page(vec![article(1)], 2, 1, 2)),
        Ok(articles_page(vec![article(2)], 2, 2, 2)),
    ]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());
    let mut iter =
        PagedIter::new(&client, QueryArticles::new().keywords("x")).batch_size(1);
    assert_eq!(iter.next_batch().await.unwrap().items.len(), 1);
    assert_eq!(iter.next_batch().await.unwrap().items.len(), 1);
    assert!(iter.next_batch().await.is_none());
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn iterator_yields_error_batch_then_exhausts() {
    let transport = Scripted::new(vec![
        Ok(articles_page(vec![article(1)], 3, 1, 3)),
        Err(TransportError::Service {
            message: "invalid api key".to_string(),
        }),
    ]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());
    let mut iter =
        PagedIter::new(&client, QueryArticles::new().keywords("x")).batch_size(1);

    let first = iter.next_batch().await.unwrap();
    assert!(first.error.is_none());

    let second = iter.next_batch().await.unwrap();
    assert!(second.items.is_empty());
    assert!(matches!(second.error, Some(DispatchError::Fatal { .. })));

    assert!(iter.next_batch().await.is_none());
}

#[tokio::test]
async fn drain_collects_all_pages() {
    let transport = Scripted::new(vec![
        Ok(articles_page(vec![article(1), article(2)], 3, 1, 2)),
        Ok(articles_page(vec![article(3)], 3, 2, 2)),
    ]);
    let client = EventRegistry::with_transport(fast_config(), transport);
    let mut iter =
        PagedIter::new(&client, QueryArticles::new().keywords("x")).batch_size(2);
    let all = iter.drain().await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn drain_surfaces_fetch_error() {
    let transport = Scripted::new(vec![Err(TransportError::Service {
        message: "invalid api key".to_string(),
    })]);
    let client = EventRegistry::with_transport(fast_config(), transport);
    let mut iter = PagedIter::new(&client, QueryArticles::new().keywords("x"));
    assert!(matches!(
        iter.drain().await,
        Err(DispatchError::Fatal { .. })
    ));
}

#[tokio::test]
async fn reset_restarts_from_first_page() {
    let transport = Scripted::new(vec![
        Ok(articles_page(vec![article(1)], 1, 1, 1)),
        Ok(articles_page(vec![article(1)], 1, 1, 1)),
    ]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());
    let mut iter = PagedIter::new(&client, QueryArticles::new().keywords("x"));

    assert_eq!(iter.drain().await.unwrap().len(), 1);
    iter.reset();
    assert_eq!(iter.drain().await.unwrap().len(), 1);

    let (_, first) = transport.call(0);
    let (_, second) = transport.call(1);
    assert_eq!(first["articlesPage"], second["articlesPage"]);
}

#[tokio::test]
async fn event_iteration_uses_event_paging_params() {
    let transport = Scripted::new(vec![Ok(json!({
        "events": {
            "results": [{"uri": "e1"}],
            "totalResults": 1,
            "page": 1,
            "count": 1,
            "pages": 1
        }
    }))]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());
    let mut iter = PagedIter::new(&client, QueryEvents::new().keywords("quake"));
    let batch = iter.next_batch().await.unwrap();
    assert_eq!(batch.items.len(), 1);

    let (path, body) = transport.call(0);
    assert_eq!(path, "/api/v1/event/getEvents");
    assert!(body.contains_key("eventsPage"));
    assert!(body.contains_key("eventsCount"));
}

#[tokio::test]
async fn suggestion_endpoints_return_top_uri() {
    let transport = Scripted::new(vec![
        Ok(json!([
            {"uri": "concept/tesla", "label": "Tesla"},
            {"uri": "concept/tesla-inc", "label": "Tesla, Inc."}
        ])),
        Ok(json!([])),
        Ok(json!([{"wikiUri": "wiki/Berlin", "label": "Berlin"}])),
    ]);
    let client = EventRegistry::with_transport(fast_config(), transport.clone());

    let uri = client.get_concept_uri("tesla").await.unwrap();
    assert_eq!(uri.as_deref(), Some("concept/tesla"));

    let missing = client.get_concept_uri("zzzz").await.unwrap();
    assert!(missing.is_none());

    let location = client.get_location_uri("berlin").await.unwrap();
    assert_eq!(location.as_deref(), Some("wiki/Berlin"));

    let (path, body) = transport.call(0);
    assert_eq!(path, "/api/v1/suggestConceptsFast");
    assert_eq!(body["prefix"], json!("tesla"));
}
