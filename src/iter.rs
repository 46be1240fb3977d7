//! Pull-based paged iteration over search results.
//!
//! [`PagedIter`] fetches one page per [`next_batch`](PagedIter::next_batch)
//! call and hands the items back to the caller, who controls the pace and
//! can stop at any point. A failed fetch yields one final batch carrying
//! the error, after which the iterator is exhausted.

use serde_json::Value;
use tracing::debug;

use crate::client::EventRegistry;
use crate::error::{DispatchError, DispatchResult};
use crate::query::SearchQuery;

/// Hard ceiling on items per request, imposed by the service.
pub const MAX_BATCH_SIZE: u32 = 200;

const DEFAULT_BATCH_SIZE: u32 = 100;

/// One fetched batch. `error` is set on the final batch when iteration
/// stopped because a fetch failed; its `items` are empty in that case.
#[derive(Debug)]
pub struct Batch {
    pub items: Vec<Value>,
    pub error: Option<DispatchError>,
}

/// Lazily pages through a search's results.
pub struct PagedIter<'a, Q: SearchQuery> {
    client: &'a EventRegistry,
    query: Q,
    batch_size: u32,
    max_items: Option<u64>,
    page: u32,
    consumed: u64,
    done: bool,
}

impl<'a, Q: SearchQuery> PagedIter<'a, Q> {
    pub fn new(client: &'a EventRegistry, query: Q) -> Self {
        Self {
            client,
            query,
            batch_size: DEFAULT_BATCH_SIZE,
            max_items: None,
            page: 1,
            consumed: 0,
            done: false,
        }
    }

    /// Items to request per page, clamped to `1..=MAX_BATCH_SIZE`.
    pub fn batch_size(mut self, size: u32) -> Self {
        self.batch_size = size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Stop after yielding this many items in total. The final batch is
    /// trimmed so the cap is never exceeded.
    pub fn max_items(mut self, max: u64) -> Self {
        self.max_items = Some(max);
        self
    }

    /// How many items have been yielded so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Rewind to the first page. The next fetch starts the sequence
    /// over from the beginning.
    pub fn reset(&mut self) {
        self.page = 1;
        self.consumed = 0;
        self.done = false;
    }

    /// Fetch the next batch, or `None` when the sequence is exhausted.
    ///
    /// Exhaustion means: the item cap was reached, the service returned
    /// an empty or final page, or a previous batch carried an error.
    pub async fn next_batch(&mut self) -> Option<Batch> {
        if self.done {
            return None;
        }
        let remaining = match self.max_items {
            Some(max) => {
                let left = max.saturating_sub(self.consumed);
                if left == 0 {
                    self.done = true;
                    return None;
                }
                Some(left)
            }
            None => None,
        };

        // Every request uses the same per-page count. The service windows
        // pages as [(page-1)*count, page*count), so shrinking the count for
        // the final capped page would shift the window onto items already
        // yielded; the cap is enforced by trimming client-side instead.
        let page = match self
            .client
            .fetch_page(&self.query, self.page, self.batch_size)
            .await
        {
            Ok(page) => page,
            Err(err) => {
                self.done = true;
                return Some(Batch {
                    items: Vec::new(),
                    error: Some(err),
                });
            }
        };

        if page.results.is_empty() {
            self.done = true;
            return None;
        }

        let mut items = page.results;
        if let Some(left) = remaining {
            if items.len() as u64 > left {
                items.truncate(left as usize);
            }
        }
        self.consumed += items.len() as u64;
        debug!(
            page = self.page,
            yielded = items.len(),
            consumed = self.consumed,
            total = page.total_results,
            "fetched result page"
        );

        if (self.page as u64) >= page.pages {
            self.done = true;
        }
        self.page += 1;
        if let Some(max) = self.max_items {
            if self.consumed >= max {
                self.done = true;
            }
        }

        Some(Batch {
            items,
            error: None,
        })
    }

    /// Collect the remaining items into one vector, surfacing the first
    /// fetch error, if any.
    pub async fn drain(&mut self) -> DispatchResult<Vec<Value>> {
        let mut all = Vec::new();
        while let Some(batch) = self.next_batch().await {
            if let Some(err) = batch.error {
                return Err(err);
            }
            all.extend(batch.items);
        }
        Ok(all)
    }
}
