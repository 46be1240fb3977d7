//! Client for the Event Registry news search API.
//!
//! Searches are boolean expressions over article and event metadata.
//! Build them either flat, with per-field setters on [`QueryArticles`] /
//! [`QueryEvents`], or explicitly as a combinator tree with
//! [`BaseQuery`] and [`CombinedQuery`]; both compile to the same JSON
//! query document. The [`EventRegistry`] client paces and retries
//! requests, and [`PagedIter`] walks result pages lazily under the
//! caller's control.
//!
//! ```no_run
//! use eventregistry::{Config, EventRegistry, PagedIter, QueryArticles};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EventRegistry::new(Config::new("API_KEY"))?;
//! let query = QueryArticles::new().keywords("Tesla").langs("eng");
//! let mut iter = PagedIter::new(&client, query).max_items(300);
//! while let Some(batch) = iter.next_batch().await {
//!     if let Some(err) = batch.error {
//!         eprintln!("iteration stopped: {err}");
//!         break;
//!     }
//!     for article in batch.items {
//!         println!("{}", article["title"]);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod iter;
pub mod query;
pub mod return_info;
pub mod transport;

pub use client::{EventRegistry, ResultPage};
pub use config::{Config, API_KEY_ENV};
pub use error::{DispatchError, DispatchResult, QueryError, QueryResult, TransportError};
pub use iter::{Batch, PagedIter, MAX_BATCH_SIZE};
pub use query::{
    ArticleFilters, BaseQuery, CombineMode, CombinedQuery, ComplexQuery, Condition, DateArg,
    DuplicateFilter, EventFilter, HasDuplicateFilter, IntoQueryExpr, KeywordLoc, QueryArticles,
    QueryEvents, QueryExpr, QueryItems, RequestedResult, SearchQuery,
};
pub use return_info::ReturnInfo;
pub use transport::{HttpTransport, Transport};
