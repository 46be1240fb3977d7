//! The boolean combinator tree and its canonical JSON serialization.
//!
//! A query is an AND/OR/NOT expression over atomic conditions. Children
//! are exclusively owned by their parent node, so the tree is acyclic by
//! construction. Serialization uses the service's reserved keys: `$and`
//! and `$or` carry ordered child lists, `$not` carries a single clause,
//! and the document root wraps the whole clause under `$query`.

use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};
use crate::query::fields::{Condition, KeywordLoc};

/// A node of the boolean query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    Cond(Condition),
    And(Vec<QueryExpr>),
    Or(Vec<QueryExpr>),
    Not(Box<QueryExpr>),
}

impl QueryExpr {
    /// Conjunction of one or more sub-expressions.
    pub fn and(children: Vec<QueryExpr>) -> QueryResult<Self> {
        if children.is_empty() {
            return Err(QueryError::InvalidExpression(
                "$and requires at least one operand".to_string(),
            ));
        }
        Ok(QueryExpr::And(children))
    }

    /// Disjunction of one or more sub-expressions.
    pub fn or(children: Vec<QueryExpr>) -> QueryResult<Self> {
        if children.is_empty() {
            return Err(QueryError::InvalidExpression(
                "$or requires at least one operand".to_string(),
            ));
        }
        Ok(QueryExpr::Or(children))
    }

    /// Negation of a sub-expression.
    pub fn not(child: QueryExpr) -> Self {
        QueryExpr::Not(Box::new(child))
    }

    pub fn cond(condition: Condition) -> Self {
        QueryExpr::Cond(condition)
    }

    /// Serialize this clause. An AND or OR of exactly one child collapses
    /// to that child's own serialization.
    pub fn to_value(&self) -> Value {
        match self {
            QueryExpr::Cond(c) => c.to_value(),
            QueryExpr::And(children) if children.len() == 1 => children[0].to_value(),
            QueryExpr::Or(children) if children.len() == 1 => children[0].to_value(),
            QueryExpr::And(children) => {
                let items: Vec<Value> = children.iter().map(QueryExpr::to_value).collect();
                let mut map = Map::new();
                map.insert("$and".to_string(), Value::Array(items));
                Value::Object(map)
            }
            QueryExpr::Or(children) => {
                let items: Vec<Value> = children.iter().map(QueryExpr::to_value).collect();
                let mut map = Map::new();
                map.insert("$or".to_string(), Value::Array(items));
                Value::Object(map)
            }
            QueryExpr::Not(child) => {
                let mut map = Map::new();
                map.insert("$not".to_string(), child.to_value());
                Value::Object(map)
            }
        }
    }

    /// Serialize as a full query document: `{"$query": <clause>}`.
    pub fn to_document(&self) -> Value {
        let mut root = Map::new();
        root.insert("$query".to_string(), self.to_value());
        Value::Object(root)
    }

    /// Parse a clause object (the value under `$query`, or any nested
    /// clause).
    ///
    /// Accepted shapes per entry: `$and`/`$or` with a non-empty array of
    /// clauses, `$not` with a single clause object, a field name with a
    /// scalar value, a field name with a list of scalars (ANY-of), or a
    /// field name with an explicit `{"$and": [...]}` / `{"$or": [...]}`
    /// value wrapper. An object with several entries is the conjunction
    /// of its parts, which is how the service treats sibling keys.
    pub fn parse(value: &Value) -> QueryResult<Self> {
        let map = value.as_object().ok_or_else(|| {
            QueryError::MalformedQuery(format!("query clause must be a JSON object, got {value}"))
        })?;
        if map.is_empty() {
            return Err(QueryError::MalformedQuery("empty query clause".to_string()));
        }

        // Companion keys attach to their primary field's condition.
        let keyword_loc = match map.get("keywordLoc") {
            Some(Value::String(s)) => Some(KeywordLoc::from_str(s)?),
            Some(other) => {
                return Err(QueryError::MalformedQuery(format!(
                    "keywordLoc expects a string, got {other}"
                )))
            }
            None => None,
        };
        let include_sub = match map.get("categoryIncludeSub") {
            Some(Value::Bool(b)) => Some(*b),
            Some(other) => {
                return Err(QueryError::MalformedQuery(format!(
                    "categoryIncludeSub expects a boolean, got {other}"
                )))
            }
            None => None,
        };
        if keyword_loc.is_some() && !map.contains_key("keyword") {
            return Err(QueryError::MalformedQuery(
                "keywordLoc without a keyword field".to_string(),
            ));
        }
        if include_sub.is_some() && !map.contains_key("categoryUri") {
            return Err(QueryError::MalformedQuery(
                "categoryIncludeSub without a categoryUri field".to_string(),
            ));
        }

        let mut nodes = Vec::new();
        for (key, entry) in map {
            if Condition::is_companion_key(key) {
                continue;
            }
            match key.as_str() {
                "$and" => nodes.push(Self::parse_operand_list(entry, "$and", QueryExpr::and)?),
                "$or" => nodes.push(Self::parse_operand_list(entry, "$or", QueryExpr::or)?),
                "$not" => nodes.push(QueryExpr::not(Self::parse(entry)?)),
                other if other.starts_with('$') => {
                    return Err(QueryError::MalformedQuery(format!(
                        "unknown reserved key '{other}'"
                    )));
                }
                field => nodes.push(Self::parse_field(field, entry, keyword_loc, include_sub)?),
            }
        }

        debug_assert!(!nodes.is_empty());
        if nodes.len() == 1 {
            Ok(nodes.into_iter().next().unwrap())
        } else {
            QueryExpr::and(nodes)
        }
    }

    fn parse_operand_list<F>(entry: &Value, key: &str, build: F) -> QueryResult<Self>
    where
        F: FnOnce(Vec<QueryExpr>) -> QueryResult<QueryExpr>,
    {
        let items = entry.as_array().ok_or_else(|| {
            QueryError::MalformedQuery(format!("'{key}' expects an array of clauses, got {entry}"))
        })?;
        if items.is_empty() {
            return Err(QueryError::MalformedQuery(format!("'{key}' with no operands")));
        }
        let children: Vec<QueryExpr> = items.iter().map(Self::parse).collect::<QueryResult<_>>()?;
        build(children)
    }

    fn parse_field(
        field: &str,
        entry: &Value,
        keyword_loc: Option<KeywordLoc>,
        include_sub: Option<bool>,
    ) -> QueryResult<Self> {
        let attach = |mut cond: Condition| -> Condition {
            match &mut cond {
                Condition::Keyword { loc, .. } => *loc = keyword_loc,
                Condition::CategoryUri {
                    include_sub: slot, ..
                } => *slot = include_sub,
                _ => {}
            }
            cond
        };
        let conditions_of = |scalars: &[Value]| -> QueryResult<Vec<QueryExpr>> {
            scalars
                .iter()
                .map(|v| Condition::from_scalar(field, v).map(|c| QueryExpr::Cond(attach(c))))
                .collect()
        };

        match entry {
            Value::Array(scalars) => {
                if scalars.is_empty() {
                    return Err(QueryError::MalformedQuery(format!(
                        "field '{field}' with an empty value list"
                    )));
                }
                let children = conditions_of(scalars)?;
                if children.len() == 1 {
                    Ok(children.into_iter().next().unwrap())
                } else {
                    QueryExpr::or(children)
                }
            }
            Value::Object(wrapper) => {
                // Value-level combinator: {"field": {"$and": [v1, v2]}}.
                let (op, scalars) = match (wrapper.get("$and"), wrapper.get("$or")) {
                    (Some(v), None) => ("$and", v),
                    (None, Some(v)) => ("$or", v),
                    _ => {
                        return Err(QueryError::MalformedQuery(format!(
                            "field '{field}' value must be a scalar, a list, or a single \
                             $and/$or wrapper"
                        )));
                    }
                };
                if wrapper.len() != 1 {
                    return Err(QueryError::MalformedQuery(format!(
                        "field '{field}' wrapper must contain only '{op}'"
                    )));
                }
                let scalars = scalars.as_array().ok_or_else(|| {
                    QueryError::MalformedQuery(format!(
                        "'{op}' wrapper of field '{field}' expects an array"
                    ))
                })?;
                if scalars.is_empty() {
                    return Err(QueryError::MalformedQuery(format!(
                        "'{op}' wrapper of field '{field}' with no values"
                    )));
                }
                let children = conditions_of(scalars)?;
                if op == "$and" {
                    QueryExpr::and(children)
                } else {
                    QueryExpr::or(children)
                }
            }
            scalar => Ok(QueryExpr::Cond(attach(Condition::from_scalar(field, scalar)?))),
        }
    }

    /// Parse a full query document: the root must carry `$query`, and may
    /// carry `$filter`. Returns the clause tree and the verbatim filter
    /// object, if present.
    pub fn parse_document(value: &Value) -> QueryResult<(Self, Option<Map<String, Value>>)> {
        let root = value.as_object().ok_or_else(|| {
            QueryError::MalformedQuery(format!("query document must be a JSON object, got {value}"))
        })?;
        let clause = root
            .get("$query")
            .ok_or_else(|| QueryError::MalformedQuery("missing '$query' root key".to_string()))?;
        let mut filter = None;
        for (key, entry) in root {
            match key.as_str() {
                "$query" => {}
                "$filter" => {
                    let map = entry.as_object().ok_or_else(|| {
                        QueryError::MalformedQuery(format!(
                            "'$filter' expects an object, got {entry}"
                        ))
                    })?;
                    filter = Some(map.clone());
                }
                other => {
                    return Err(QueryError::MalformedQuery(format!(
                        "unknown root key '{other}'"
                    )));
                }
            }
        }
        Ok((Self::parse(clause)?, filter))
    }

    /// Parse a query document from JSON text.
    pub fn parse_document_text(text: &str) -> QueryResult<(Self, Option<Map<String, Value>>)> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| QueryError::MalformedQuery(format!("invalid JSON: {e}")))?;
        Self::parse_document(&value)
    }
}

/// Combine a flat builder's positive and ignored subtrees into the
/// canonical clause shape: `AND(positive..., NOT(OR(ignored...)))`, with
/// the NOT branch dropped when nothing is ignored and the OR dropped for
/// a single ignored subtree. When several ignored subtrees merge, any
/// that are themselves ORs are spliced into the combined OR.
pub(crate) fn combine_clauses(
    positive: Vec<QueryExpr>,
    ignored: Vec<QueryExpr>,
) -> QueryResult<QueryExpr> {
    let mut children = positive;
    match ignored.len() {
        0 => {}
        1 => {
            let only = ignored.into_iter().next().unwrap();
            children.push(QueryExpr::not(only));
        }
        _ => {
            let mut merged = Vec::new();
            for node in ignored {
                match node {
                    QueryExpr::Or(subtrees) => merged.extend(subtrees),
                    other => merged.push(other),
                }
            }
            children.push(QueryExpr::not(QueryExpr::or(merged)?));
        }
    }
    if children.is_empty() {
        return Err(QueryError::InvalidExpression(
            "query has no filter conditions".to_string(),
        ));
    }
    QueryExpr::and(children)
}
