//! Flat event search builder.

use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};
use crate::query::base::ComplexQuery;
use crate::query::defaults;
use crate::query::expr::{self, QueryExpr};
use crate::query::fields::{Condition, DateArg, KeywordLoc};
use crate::query::items::QueryItems;
use crate::query::{RequestedResult, SearchQuery};

/// Flat event search, mirroring [`QueryArticles`] for the event
/// endpoint, plus bounds on the article count per event.
///
/// [`QueryArticles`]: crate::query::articles::QueryArticles
#[derive(Debug, Clone)]
pub struct QueryEvents {
    keywords: QueryItems,
    keyword_loc: Option<KeywordLoc>,
    concepts: QueryItems,
    categories: QueryItems,
    category_include_sub: Option<bool>,
    sources: QueryItems,
    source_locations: QueryItems,
    source_groups: QueryItems,
    locations: QueryItems,
    langs: QueryItems,
    date_start: Option<DateArg>,
    date_end: Option<DateArg>,
    min_max_articles: Option<(u32, u32)>,
    ignore_keywords: QueryItems,
    ignore_keyword_loc: Option<KeywordLoc>,
    ignore_concepts: QueryItems,
    ignore_categories: QueryItems,
    ignore_sources: QueryItems,
    ignore_source_locations: QueryItems,
    ignore_source_groups: QueryItems,
    ignore_locations: QueryItems,
    ignore_langs: QueryItems,
    requested: RequestedResult,
    complex: Option<ComplexQuery>,
}

impl Default for QueryEvents {
    fn default() -> Self {
        Self {
            keywords: QueryItems::default(),
            keyword_loc: None,
            concepts: QueryItems::default(),
            categories: QueryItems::default(),
            category_include_sub: None,
            sources: QueryItems::default(),
            source_locations: QueryItems::default(),
            source_groups: QueryItems::default(),
            locations: QueryItems::default(),
            langs: QueryItems::default(),
            date_start: None,
            date_end: None,
            min_max_articles: None,
            ignore_keywords: QueryItems::default(),
            ignore_keyword_loc: None,
            ignore_concepts: QueryItems::default(),
            ignore_categories: QueryItems::default(),
            ignore_sources: QueryItems::default(),
            ignore_source_locations: QueryItems::default(),
            ignore_source_groups: QueryItems::default(),
            ignore_locations: QueryItems::default(),
            ignore_langs: QueryItems::default(),
            requested: RequestedResult::new("events").sort_by("rel"),
            complex: None,
        }
    }
}

impl QueryEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a pre-built combinator tree instead of the flat fields.
    pub fn init_with_complex_query(query: ComplexQuery) -> Self {
        Self {
            complex: Some(query),
            ..Self::default()
        }
    }

    pub fn keywords(mut self, items: impl Into<QueryItems>) -> Self {
        self.keywords = items.into();
        self
    }

    pub fn keyword_loc(mut self, loc: KeywordLoc) -> Self {
        self.keyword_loc = Some(loc);
        self
    }

    pub fn concepts(mut self, items: impl Into<QueryItems>) -> Self {
        self.concepts = items.into();
        self
    }

    pub fn categories(mut self, items: impl Into<QueryItems>) -> Self {
        self.categories = items.into();
        self
    }

    pub fn category_include_sub(mut self, include_sub: bool) -> Self {
        self.category_include_sub = Some(include_sub);
        self
    }

    pub fn sources(mut self, items: impl Into<QueryItems>) -> Self {
        self.sources = items.into();
        self
    }

    pub fn source_locations(mut self, items: impl Into<QueryItems>) -> Self {
        self.source_locations = items.into();
        self
    }

    pub fn source_groups(mut self, items: impl Into<QueryItems>) -> Self {
        self.source_groups = items.into();
        self
    }

    pub fn locations(mut self, items: impl Into<QueryItems>) -> Self {
        self.locations = items.into();
        self
    }

    pub fn langs(mut self, items: impl Into<QueryItems>) -> Self {
        self.langs = items.into();
        self
    }

    pub fn date_start(mut self, date: impl Into<DateArg>) -> Self {
        self.date_start = Some(date.into());
        self
    }

    pub fn date_end(mut self, date: impl Into<DateArg>) -> Self {
        self.date_end = Some(date.into());
        self
    }

    /// Keep only events whose article count falls within `min..=max`.
    pub fn min_max_articles_in_event(mut self, min: u32, max: u32) -> Self {
        self.min_max_articles = Some((min, max));
        self
    }

    pub fn ignore_keywords(mut self, items: impl Into<QueryItems>) -> Self {
        self.ignore_keywords = items.into();
        self
    }

    pub fn ignore_keyword_loc(mut self, loc: KeywordLoc) -> Self {
        self.ignore_keyword_loc = Some(loc);
        self
    }

    pub fn ignore_concepts(mut self, items: impl Into<QueryItems>) -> Self {
        self.ignore_concepts = items.into();
        self
    }

    pub fn ignore_categories(mut self, items: impl Into<QueryItems>) -> Self {
        self.ignore_categories = items.into();
        self
    }

    pub fn ignore_sources(mut self, items: impl Into<QueryItems>) -> Self {
        self.ignore_sources = items.into();
        self
    }

    pub fn ignore_source_locations(mut self, items: impl Into<QueryItems>) -> Self {
        self.ignore_source_locations = items.into();
        self
    }

    pub fn ignore_source_groups(mut self, items: impl Into<QueryItems>) -> Self {
        self.ignore_source_groups = items.into();
        self
    }

    pub fn ignore_locations(mut self, items: impl Into<QueryItems>) -> Self {
        self.ignore_locations = items.into();
        self
    }

    pub fn ignore_langs(mut self, items: impl Into<QueryItems>) -> Self {
        self.ignore_langs = items.into();
        self
    }

    pub fn requested_result(mut self, requested: RequestedResult) -> Self {
        self.requested = requested;
        self
    }

    fn flat_expr(&self) -> QueryResult<QueryExpr> {
        let mut positive = Vec::new();
        let loc = self.keyword_loc;
        if let Some(node) = self
            .keywords
            .resolve(defaults::KEYWORDS, |value| Condition::Keyword { value, loc })?
        {
            positive.push(node);
        }
        if let Some(node) = self
            .concepts
            .resolve(defaults::CONCEPTS, Condition::ConceptUri)?
        {
            positive.push(node);
        }
        let include_sub = self.category_include_sub;
        if let Some(node) = self.categories.resolve(defaults::CATEGORIES, |uri| {
            Condition::CategoryUri { uri, include_sub }
        })? {
            positive.push(node);
        }
        if let Some(node) = self.sources.resolve(defaults::SOURCES, Condition::SourceUri)? {
            positive.push(node);
        }
        if let Some(node) = self
            .source_locations
            .resolve(defaults::SOURCES, Condition::SourceLocationUri)?
        {
            positive.push(node);
        }
        if let Some(node) = self
            .source_groups
            .resolve(defaults::SOURCES, Condition::SourceGroupUri)?
        {
            positive.push(node);
        }
        if let Some(node) = self
            .locations
            .resolve(defaults::LOCATIONS, Condition::LocationUri)?
        {
            positive.push(node);
        }
        if let Some(node) = self.langs.resolve(defaults::LANGS, Condition::Lang)? {
            positive.push(node);
        }
        if let Some(date) = &self.date_start {
            positive.push(QueryExpr::Cond(Condition::DateStart(date.resolve()?)));
        }
        if let Some(date) = &self.date_end {
            positive.push(QueryExpr::Cond(Condition::DateEnd(date.resolve()?)));
        }
        if let Some((min, max)) = self.min_max_articles {
            positive.push(QueryExpr::Cond(Condition::MinArticlesInEvent(min)));
            positive.push(QueryExpr::Cond(Condition::MaxArticlesInEvent(max)));
        }

        let mut ignored = Vec::new();
        let ignore_loc = self.ignore_keyword_loc;
        if let Some(node) = self.ignore_keywords.resolve(defaults::IGNORE, |value| {
            Condition::Keyword {
                value,
                loc: ignore_loc,
            }
        })? {
            ignored.push(node);
        }
        if let Some(node) = self
            .ignore_concepts
            .resolve(defaults::IGNORE, Condition::ConceptUri)?
        {
            ignored.push(node);
        }
        if let Some(node) = self.ignore_categories.resolve(defaults::IGNORE, |uri| {
            Condition::CategoryUri {
                uri,
                include_sub: None,
            }
        })? {
            ignored.push(node);
        }
        if let Some(node) = self
            .ignore_sources
            .resolve(defaults::IGNORE, Condition::SourceUri)?
        {
            ignored.push(node);
        }
        if let Some(node) = self
            .ignore_source_locations
            .resolve(defaults::IGNORE, Condition::SourceLocationUri)?
        {
            ignored.push(node);
        }
        if let Some(node) = self
            .ignore_source_groups
            .resolve(defaults::IGNORE, Condition::SourceGroupUri)?
        {
            ignored.push(node);
        }
        if let Some(node) = self
            .ignore_locations
            .resolve(defaults::IGNORE, Condition::LocationUri)?
        {
            ignored.push(node);
        }
        if let Some(node) = self
            .ignore_langs
            .resolve(defaults::IGNORE, Condition::Lang)?
        {
            ignored.push(node);
        }

        expr::combine_clauses(positive, ignored)
    }

    /// Compile to the full request document.
    pub fn compile(&self) -> QueryResult<Value> {
        if let Some(complex) = &self.complex {
            return Ok(complex.compile());
        }
        let mut root = Map::new();
        root.insert("$query".to_string(), self.flat_expr()?.to_value());
        Ok(Value::Object(root))
    }
}

impl SearchQuery for QueryEvents {
    fn path(&self) -> &'static str {
        "/api/v1/event/getEvents"
    }

    fn result_section(&self) -> &'static str {
        "events"
    }

    fn body(&self) -> QueryResult<Map<String, Value>> {
        let doc = self.compile()?;
        let text = serde_json::to_string(&doc)
            .map_err(|e| QueryError::MalformedQuery(e.to_string()))?;
        let mut body = Map::new();
        body.insert("query".to_string(), Value::String(text));
        self.requested.merge_into(&mut body);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_query_with_article_bounds() {
        let doc = QueryEvents::new()
            .concepts("uri:earthquake")
            .min_max_articles_in_event(10, 500)
            .compile()
            .unwrap();
        assert_eq!(
            doc,
            json!({
                "$query": {
                    "$and": [
                        {"conceptUri": "uri:earthquake"},
                        {"minArticlesInEvent": 10},
                        {"maxArticlesInEvent": 500}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_event_query_ignores_negate() {
        let doc = QueryEvents::new()
            .keywords("flood")
            .ignore_locations(vec!["uri:loc1", "uri:loc2"])
            .compile()
            .unwrap();
        assert_eq!(
            doc,
            json!({
                "$query": {
                    "$and": [
                        {"keyword": "flood"},
                        {"$not": {"$or": [
                            {"locationUri": "uri:loc1"},
                            {"locationUri": "uri:loc2"}
                        ]}}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_event_body_params_use_events_prefix() {
        let q = QueryEvents::new()
            .keywords("flood")
            .requested_result(RequestedResult::new("events").sort_by("size"));
        let body = q.body().unwrap();
        assert_eq!(body["resultType"], json!("events"));
        assert_eq!(body["eventsSortBy"], json!("size"));
        let inner: Value = serde_json::from_str(body["query"].as_str().unwrap()).unwrap();
        assert_eq!(inner, json!({"$query": {"keyword": "flood"}}));
    }

    #[test]
    fn test_event_default_sort_is_relevance() {
        let body = QueryEvents::new().keywords("x").body().unwrap();
        assert_eq!(body["eventsSortBy"], json!("rel"));
        assert!(!body.contains_key("eventsSortByAsc"));
    }

    #[test]
    fn test_event_empty_query_rejected() {
        assert!(QueryEvents::new().compile().is_err());
    }
}
