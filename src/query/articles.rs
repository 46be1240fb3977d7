//! Flat article search builder and its `$filter` vocabulary.

use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};
use crate::query::base::ComplexQuery;
use crate::query::defaults;
use crate::query::expr::{self, QueryExpr};
use crate::query::fields::{Condition, DateArg, KeywordLoc};
use crate::query::items::QueryItems;
use crate::query::{RequestedResult, SearchQuery};

/// Duplicate-status filter for article results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateFilter {
    SkipDuplicates,
    KeepOnlyDuplicates,
    #[default]
    KeepAll,
}

impl DuplicateFilter {
    fn as_str(self) -> Option<&'static str> {
        match self {
            DuplicateFilter::SkipDuplicates => Some("skipDuplicates"),
            DuplicateFilter::KeepOnlyDuplicates => Some("keepOnlyDuplicates"),
            DuplicateFilter::KeepAll => None,
        }
    }
}

/// Filter on whether an article itself has duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HasDuplicateFilter {
    SkipHasDuplicates,
    KeepOnlyHasDuplicates,
    #[default]
    KeepAll,
}

impl HasDuplicateFilter {
    fn as_str(self) -> Option<&'static str> {
        match self {
            HasDuplicateFilter::SkipHasDuplicates => Some("skipHasDuplicates"),
            HasDuplicateFilter::KeepOnlyHasDuplicates => Some("keepOnlyHasDuplicates"),
            HasDuplicateFilter::KeepAll => None,
        }
    }
}

/// Filter on whether an article is assigned to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    SkipArticlesWithoutEvent,
    KeepOnlyArticlesWithoutEvent,
    #[default]
    KeepAll,
}

impl EventFilter {
    fn as_str(self) -> Option<&'static str> {
        match self {
            EventFilter::SkipArticlesWithoutEvent => Some("skipArticlesWithoutEvent"),
            EventFilter::KeepOnlyArticlesWithoutEvent => Some("keepOnlyArticlesWithoutEvent"),
            EventFilter::KeepAll => None,
        }
    }
}

/// The `$filter` block of an article search. `KeepAll` values are the
/// service defaults and are omitted from the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleFilters {
    pub is_duplicate: DuplicateFilter,
    pub has_duplicate: HasDuplicateFilter,
    pub has_event: EventFilter,
}

impl ArticleFilters {
    fn to_map(self) -> Map<String, Value> {
        let mut filter = Map::new();
        if let Some(v) = self.is_duplicate.as_str() {
            filter.insert("isDuplicate".to_string(), Value::String(v.to_string()));
        }
        if let Some(v) = self.has_duplicate.as_str() {
            filter.insert("hasDuplicate".to_string(), Value::String(v.to_string()));
        }
        if let Some(v) = self.has_event.as_str() {
            filter.insert("hasEvent".to_string(), Value::String(v.to_string()));
        }
        filter
    }
}

/// Flat article search: positive fields conjoin, `ignore_*` fields are
/// ORed together and negated as one branch.
#[derive(Debug, Clone)]
pub struct QueryArticles {
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
    date_mention_start: Option<DateArg>,
    date_mention_end: Option<DateArg>,
    ignore_keywords: QueryItems,
    ignore_keyword_loc: Option<KeywordLoc>,
    ignore_concepts: QueryItems,
    ignore_categories: QueryItems,
    ignore_sources: QueryItems,
    ignore_source_locations: QueryItems,
    ignore_source_groups: QueryItems,
    ignore_locations: QueryItems,
    ignore_langs: QueryItems,
    filters: ArticleFilters,
    requested: RequestedResult,
    complex: Option<ComplexQuery>,
}

impl Default for QueryArticles {
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
            date_mention_start: None,
            date_mention_end: None,
            ignore_keywords: QueryItems::default(),
            ignore_keyword_loc: None,
            ignore_concepts: QueryItems::default(),
            ignore_categories: QueryItems::default(),
            ignore_sources: QueryItems::default(),
            ignore_source_locations: QueryItems::default(),
            ignore_source_groups: QueryItems::default(),
            ignore_locations: QueryItems::default(),
            ignore_langs: QueryItems::default(),
            filters: ArticleFilters::default(),
            // Relevance order, descending, unless the caller overrides.
            requested: RequestedResult::new("articles")
                .sort_by("rel")
                .sort_by_asc(false),
            complex: None,
        }
    }
}

impl QueryArticles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a pre-built combinator tree instead of the flat fields. Any
    /// flat conditions already set are discarded.
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

    pub fn date_mention_start(mut self, date: impl Into<DateArg>) -> Self {
        self.date_mention_start = Some(date.into());
        self
    }

    pub fn date_mention_end(mut self, date: impl Into<DateArg>) -> Self {
        self.date_mention_end = Some(date.into());
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

    pub fn is_duplicate_filter(mut self, filter: DuplicateFilter) -> Self {
        self.filters.is_duplicate = filter;
        self
    }

    pub fn has_duplicate_filter(mut self, filter: HasDuplicateFilter) -> Self {
        self.filters.has_duplicate = filter;
        self
    }

    pub fn event_filter(mut self, filter: EventFilter) -> Self {
        self.filters.has_event = filter;
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
        if let Some(date) = &self.date_mention_start {
            positive.push(QueryExpr::Cond(Condition::DateMentionStart(date.resolve()?)));
        }
        if let Some(date) = &self.date_mention_end {
            positive.push(QueryExpr::Cond(Condition::DateMentionEnd(date.resolve()?)));
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
        let filter = self.filters.to_map();
        if !filter.is_empty() {
            root.insert("$filter".to_string(), Value::Object(filter));
        }
        Ok(Value::Object(root))
    }
}

impl SearchQuery for QueryArticles {
    fn path(&self) -> &'static str {
        "/api/v1/article/getArticles"
    }

    fn result_section(&self) -> &'static str {
        "articles"
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
