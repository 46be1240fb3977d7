//! Query construction: field conditions, combinator trees, and the
//! flat/explicit builders that compile to the request document.

pub mod articles;
pub mod base;
pub mod events;
pub mod expr;
pub mod fields;
pub mod items;

pub use articles::{ArticleFilters, DuplicateFilter, EventFilter, HasDuplicateFilter, QueryArticles};
pub use base::{BaseQuery, CombinedQuery, ComplexQuery, IntoQueryExpr};
pub use events::QueryEvents;
pub use expr::QueryExpr;
pub use fields::{parse_date, Condition, DateArg, KeywordLoc};
pub use items::{CombineMode, QueryItems};

use serde_json::{Map, Value};

use crate::error::QueryResult;
use crate::return_info::ReturnInfo;

/// Per-field combination modes applied when a plain list is given
/// without an explicit ALL-of/ANY-of wrapper.
pub(crate) mod defaults {
    use super::items::CombineMode;

    pub(crate) const KEYWORDS: CombineMode = CombineMode::Any;
    pub(crate) const CONCEPTS: CombineMode = CombineMode::All;
    pub(crate) const CATEGORIES: CombineMode = CombineMode::Any;
    pub(crate) const SOURCES: CombineMode = CombineMode::Any;
    pub(crate) const LOCATIONS: CombineMode = CombineMode::Any;
    pub(crate) const LANGS: CombineMode = CombineMode::Any;
    /// Every `ignore_*` field combines as ANY-of before negation.
    pub(crate) const IGNORE: CombineMode = CombineMode::Any;
}

/// Result-list shaping for one request: which section to return, how to
/// sort it, and which per-item details to include.
#[derive(Debug, Clone)]
pub struct RequestedResult {
    result_type: String,
    sort_by: Option<String>,
    sort_by_asc: Option<bool>,
    return_info: ReturnInfo,
}

impl RequestedResult {
    pub fn new(result_type: impl Into<String>) -> Self {
        Self {
            result_type: result_type.into(),
            sort_by: None,
            sort_by_asc: None,
            return_info: ReturnInfo::new(),
        }
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn sort_by_asc(mut self, ascending: bool) -> Self {
        self.sort_by_asc = Some(ascending);
        self
    }

    pub fn return_info(mut self, info: ReturnInfo) -> Self {
        self.return_info = info;
        self
    }

    pub(crate) fn result_type(&self) -> &str {
        &self.result_type
    }

    /// Write the sort and detail parameters into a request body. The
    /// parameter names are prefixed with the result section, matching
    /// the service's `articlesSortBy` / `eventsSortBy` convention.
    pub(crate) fn merge_into(&self, body: &mut Map<String, Value>) {
        body.insert(
            "resultType".to_string(),
            Value::String(self.result_type.clone()),
        );
        if let Some(sort_by) = &self.sort_by {
            body.insert(
                format!("{}SortBy", self.result_type),
                Value::String(sort_by.clone()),
            );
        }
        if let Some(asc) = self.sort_by_asc {
            body.insert(format!("{}SortByAsc", self.result_type), Value::Bool(asc));
        }
        self.return_info.merge_into(body);
    }
}

/// A compiled, dispatchable search. The client and the paged iterator
/// only see this surface: an endpoint path, a result section name, and
/// a request body to which paging parameters are appended.
pub trait SearchQuery {
    /// Endpoint path, e.g. `/api/v1/article/getArticles`.
    fn path(&self) -> &'static str;

    /// Name of the result section in the response (`articles`, `events`),
    /// also the prefix for paging and sort parameter names.
    fn result_section(&self) -> &'static str;

    /// Build the request body: the compiled `$query` document as the
    /// `query` parameter, plus result-shaping parameters. Paging is
    /// appended by the caller.
    fn body(&self) -> QueryResult<Map<String, Value>>;
}
