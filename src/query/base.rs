//! Explicit query builders: hand-assembled combinator trees.
//!
//! [`BaseQuery`] describes one conjunction of field conditions,
//! [`CombinedQuery`] joins sub-queries with AND/OR, and [`ComplexQuery`]
//! wraps a finished tree (or its JSON text form) for dispatch. All three
//! compile to the same canonical document shape as the flat builders.

use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};
use crate::query::defaults;
use crate::query::expr::QueryExpr;
use crate::query::fields::{Condition, DateArg, KeywordLoc};
use crate::query::items::{CombineMode, QueryItems};

/// Anything that can be lowered into a combinator tree.
pub trait IntoQueryExpr {
    fn into_expr(self) -> QueryResult<QueryExpr>;
}

impl IntoQueryExpr for QueryExpr {
    fn into_expr(self) -> QueryResult<QueryExpr> {
        Ok(self)
    }
}

/// A single conjunction of field conditions, with an optional excluded
/// sub-query.
#[derive(Debug, Clone, Default)]
pub struct BaseQuery {
    keyword: QueryItems,
    keyword_loc: Option<KeywordLoc>,
    concept_uri: QueryItems,
    category_uri: QueryItems,
    category_include_sub: Option<bool>,
    source_uri: QueryItems,
    source_location_uri: QueryItems,
    source_group_uri: QueryItems,
    location_uri: QueryItems,
    lang: QueryItems,
    date_start: Option<DateArg>,
    date_end: Option<DateArg>,
    date_mention: Vec<DateArg>,
    min_max_articles_in_event: Option<(u32, u32)>,
    exclude: Option<Box<QueryExpr>>,
}

impl BaseQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, items: impl Into<QueryItems>) -> Self {
        self.keyword = items.into();
        self
    }

    pub fn keyword_loc(mut self, loc: KeywordLoc) -> Self {
        self.keyword_loc = Some(loc);
        self
    }

    pub fn concept_uri(mut self, items: impl Into<QueryItems>) -> Self {
        self.concept_uri = items.into();
        self
    }

    pub fn category_uri(mut self, items: impl Into<QueryItems>) -> Self {
        self.category_uri = items.into();
        self
    }

    pub fn category_include_sub(mut self, include_sub: bool) -> Self {
        self.category_include_sub = Some(include_sub);
        self
    }

    pub fn source_uri(mut self, items: impl Into<QueryItems>) -> Self {
        self.source_uri = items.into();
        self
    }

    pub fn source_location_uri(mut self, items: impl Into<QueryItems>) -> Self {
        self.source_location_uri = items.into();
        self
    }

    pub fn source_group_uri(mut self, items: impl Into<QueryItems>) -> Self {
        self.source_group_uri = items.into();
        self
    }

    pub fn location_uri(mut self, items: impl Into<QueryItems>) -> Self {
        self.location_uri = items.into();
        self
    }

    pub fn lang(mut self, items: impl Into<QueryItems>) -> Self {
        self.lang = items.into();
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

    /// Add a mentioned-date condition; several calls combine as ANY-of.
    pub fn date_mention(mut self, date: impl Into<DateArg>) -> Self {
        self.date_mention.push(date.into());
        self
    }

    /// Bounds on the number of articles in matched events.
    pub fn min_max_articles_in_event(mut self, min: u32, max: u32) -> Self {
        self.min_max_articles_in_event = Some((min, max));
        self
    }

    /// Exclude everything matched by `query` from this query's results.
    pub fn exclude(mut self, query: impl IntoQueryExpr) -> QueryResult<Self> {
        self.exclude = Some(Box::new(query.into_expr()?));
        Ok(self)
    }
}

impl IntoQueryExpr for BaseQuery {
    fn into_expr(self) -> QueryResult<QueryExpr> {
        let mut positive = Vec::new();
        let keyword_loc = self.keyword_loc;
        if let Some(node) = self.keyword.resolve(defaults::KEYWORDS, |value| {
            Condition::Keyword {
                value,
                loc: keyword_loc,
            }
        })? {
            positive.push(node);
        }
        if let Some(node) = self
            .concept_uri
            .resolve(defaults::CONCEPTS, Condition::ConceptUri)?
        {
            positive.push(node);
        }
        let include_sub = self.category_include_sub;
        if let Some(node) = self.category_uri.resolve(defaults::CATEGORIES, |uri| {
            Condition::CategoryUri { uri, include_sub }
        })? {
            positive.push(node);
        }
        if let Some(node) = self
            .source_uri
            .resolve(defaults::SOURCES, Condition::SourceUri)?
        {
            positive.push(node);
        }
        if let Some(node) = self
            .source_location_uri
            .resolve(defaults::SOURCES, Condition::SourceLocationUri)?
        {
            positive.push(node);
        }
        if let Some(node) = self
            .source_group_uri
            .resolve(defaults::SOURCES, Condition::SourceGroupUri)?
        {
            positive.push(node);
        }
        if let Some(node) = self
            .location_uri
            .resolve(defaults::LOCATIONS, Condition::LocationUri)?
        {
            positive.push(node);
        }
        if let Some(node) = self.lang.resolve(defaults::LANGS, Condition::Lang)? {
            positive.push(node);
        }
        if let Some(date) = &self.date_start {
            positive.push(QueryExpr::Cond(Condition::DateStart(date.resolve()?)));
        }
        if let Some(date) = &self.date_end {
            positive.push(QueryExpr::Cond(Condition::DateEnd(date.resolve()?)));
        }
        match self.date_mention.len() {
            0 => {}
            1 => positive.push(QueryExpr::Cond(Condition::DateMention(
                self.date_mention[0].resolve()?,
            ))),
            _ => {
                let dates: Vec<QueryExpr> = self
                    .date_mention
                    .iter()
                    .map(|d| Ok(QueryExpr::Cond(Condition::DateMention(d.resolve()?))))
                    .collect::<QueryResult<_>>()?;
                positive.push(QueryExpr::or(dates)?);
            }
        }
        if let Some((min, max)) = self.min_max_articles_in_event {
            positive.push(QueryExpr::Cond(Condition::MinArticlesInEvent(min)));
            positive.push(QueryExpr::Cond(Condition::MaxArticlesInEvent(max)));
        }

        if positive.is_empty() && self.exclude.is_none() {
            return Err(QueryError::InvalidExpression(
                "base query has no conditions".to_string(),
            ));
        }
        let ignored = match self.exclude {
            Some(excluded) => vec![*excluded],
            None => vec![],
        };
        super::expr::combine_clauses(positive, ignored)
    }
}

/// AND/OR combination of sub-queries, with an optional excluded
/// sub-query.
#[derive(Debug, Clone)]
pub struct CombinedQuery {
    mode: CombineMode,
    children: Vec<QueryExpr>,
    exclude: Option<Box<QueryExpr>>,
}

impl CombinedQuery {
    /// All sub-queries must match.
    pub fn and(children: Vec<QueryExpr>) -> QueryResult<Self> {
        if children.is_empty() {
            return Err(QueryError::InvalidExpression(
                "combined AND query requires at least one sub-query".to_string(),
            ));
        }
        Ok(Self {
            mode: CombineMode::All,
            children,
            exclude: None,
        })
    }

    /// Any matching sub-query is sufficient.
    pub fn or(children: Vec<QueryExpr>) -> QueryResult<Self> {
        if children.is_empty() {
            return Err(QueryError::InvalidExpression(
                "combined OR query requires at least one sub-query".to_string(),
            ));
        }
        Ok(Self {
            mode: CombineMode::Any,
            children,
            exclude: None,
        })
    }

    /// Exclude everything matched by `query` from the combined results.
    pub fn exclude(mut self, query: impl IntoQueryExpr) -> QueryResult<Self> {
        self.exclude = Some(Box::new(query.into_expr()?));
        Ok(self)
    }
}

impl IntoQueryExpr for CombinedQuery {
    fn into_expr(self) -> QueryResult<QueryExpr> {
        let combined = match self.mode {
            CombineMode::All => QueryExpr::and(self.children)?,
            CombineMode::Any => QueryExpr::or(self.children)?,
        };
        match self.exclude {
            None => Ok(combined),
            Some(excluded) => QueryExpr::and(vec![combined, QueryExpr::not(*excluded)]),
        }
    }
}

/// A finished combinator tree ready for dispatch, optionally carrying a
/// verbatim `$filter` object.
///
/// This is the thin explicit-query wrapper: no field-level validation
/// happens here beyond what tree construction and parsing already did.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexQuery {
    expr: QueryExpr,
    filter: Option<Map<String, Value>>,
}

impl ComplexQuery {
    pub fn new(query: impl IntoQueryExpr) -> QueryResult<Self> {
        Ok(Self {
            expr: query.into_expr()?,
            filter: None,
        })
    }

    /// Parse a full `{"$query": ...}` document from JSON text.
    pub fn from_json_text(text: &str) -> QueryResult<Self> {
        let (expr, filter) = QueryExpr::parse_document_text(text)?;
        Ok(Self { expr, filter })
    }

    /// Parse a full `{"$query": ...}` document from a pre-parsed value.
    pub fn from_value(value: &Value) -> QueryResult<Self> {
        let (expr, filter) = QueryExpr::parse_document(value)?;
        Ok(Self { expr, filter })
    }

    pub fn expr(&self) -> &QueryExpr {
        &self.expr
    }

    /// Produce the compiled query document.
    pub fn compile(&self) -> Value {
        let mut root = Map::new();
        root.insert("$query".to_string(), self.expr.to_value());
        if let Some(filter) = &self.filter {
            if !filter.is_empty() {
                root.insert("$filter".to_string(), Value::Object(filter.clone()));
            }
        }
        Value::Object(root)
    }
}

impl IntoQueryExpr for ComplexQuery {
    fn into_expr(self) -> QueryResult<QueryExpr> {
        Ok(self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_query_single_field() {
        let expr = BaseQuery::new()
            .keyword("obama")
            .keyword_loc(KeywordLoc::Title)
            .into_expr()
            .unwrap();
        assert_eq!(
            expr.to_document(),
            json!({"$query": {"keyword": "obama", "keywordLoc": "title"}})
        );
    }

    #[test]
    fn test_base_query_with_exclude() {
        let exclude = BaseQuery::new().lang(QueryItems::or(["eng", "deu"]));
        let expr = BaseQuery::new()
            .keyword(QueryItems::and(["obama", "trump"]))
            .exclude(exclude)
            .unwrap()
            .into_expr()
            .unwrap();
        assert_eq!(
            expr.to_document(),
            json!({
                "$query": {
                    "$and": [
                        {"$and": [{"keyword": "obama"}, {"keyword": "trump"}]},
                        {"$not": {"$or": [{"lang": "eng"}, {"lang": "deu"}]}}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_base_query_empty_fails() {
        assert!(matches!(
            BaseQuery::new().into_expr(),
            Err(QueryError::InvalidExpression(_))
        ));
    }

    #[test]
    fn test_base_query_bad_date_fails_before_dispatch() {
        let result = BaseQuery::new().date_start("02/05/2017").into_expr();
        assert!(matches!(result, Err(QueryError::InvalidDate { .. })));
    }

    #[test]
    fn test_combined_query_or_with_exclude() {
        let cq = CombinedQuery::or(vec![
            BaseQuery::new()
                .date_start("2017-02-05")
                .date_end("2017-02-05")
                .into_expr()
                .unwrap(),
            BaseQuery::new().concept_uri("uri:trump").into_expr().unwrap(),
        ])
        .unwrap()
        .exclude(BaseQuery::new().concept_uri("uri:obama"))
        .unwrap();
        assert_eq!(
            cq.into_expr().unwrap().to_document(),
            json!({
                "$query": {
                    "$and": [
                        {"$or": [
                            {"$and": [{"dateStart": "2017-02-05"}, {"dateEnd": "2017-02-05"}]},
                            {"conceptUri": "uri:trump"}
                        ]},
                        {"$not": {"conceptUri": "uri:obama"}}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_combined_query_rejects_no_children() {
        assert!(CombinedQuery::and(vec![]).is_err());
        assert!(CombinedQuery::or(vec![]).is_err());
    }

    #[test]
    fn test_complex_query_from_text_round_trip() {
        let text = r#"
        {
            "$query": {
                "$or": [
                    {"dateStart": "2017-02-05", "dateEnd": "2017-02-05"},
                    {"conceptUri": "uri:trump"}
                ],
                "$not": {"conceptUri": "uri:obama"}
            }
        }
        "#;
        let cq = ComplexQuery::from_json_text(text).unwrap();
        let recompiled = ComplexQuery::from_value(&cq.compile()).unwrap();
        assert_eq!(recompiled.expr(), cq.expr());
    }

    #[test]
    fn test_complex_query_keeps_filter() {
        let text = r#"{"$query": {"keyword": "x"}, "$filter": {"isDuplicate": "skipDuplicates"}}"#;
        let cq = ComplexQuery::from_json_text(text).unwrap();
        assert_eq!(
            cq.compile(),
            json!({"$query": {"keyword": "x"}, "$filter": {"isDuplicate": "skipDuplicates"}})
        );
    }

    #[test]
    fn test_min_max_articles_expand_to_two_conditions() {
        let expr = BaseQuery::new()
            .keyword("quake")
            .min_max_articles_in_event(10, 100)
            .into_expr()
            .unwrap();
        assert_eq!(
            expr.to_document(),
            json!({
                "$query": {
                    "$and": [
                        {"keyword": "quake"},
                        {"minArticlesInEvent": 10},
                        {"maxArticlesInEvent": 100}
                    ]
                }
            })
        );
    }
}
