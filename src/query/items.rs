//! Scalar-or-list-or-combinator inputs for multi-valued filter fields.
//!
//! Every filter parameter that accepts several values takes a
//! [`QueryItems`]: absent, one value, a plain list, or an explicit
//! ALL-of / ANY-of wrapper. The value is resolved exactly once, at the
//! builder boundary, into a combinator subtree; nothing downstream
//! branches on its shape again.

use crate::error::QueryResult;
use crate::query::expr::QueryExpr;
use crate::query::fields::Condition;

/// How multiple values of one field combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    /// Matching any one value is sufficient (`$or`).
    Any,
    /// Every value must match (`$and`).
    All,
}

/// Zero, one or many values for a single filter field.
///
/// A plain list combines with the field's documented default mode;
/// [`QueryItems::and`] / [`QueryItems::or`] always override the default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueryItems {
    #[default]
    Absent,
    One(String),
    /// Plain list; combination mode comes from the field's default.
    List(Vec<String>),
    /// Explicit ALL-of wrapper.
    All(Vec<String>),
    /// Explicit ANY-of wrapper.
    Any(Vec<String>),
}

impl QueryItems {
    /// All provided values must match.
    pub fn and<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryItems::All(items.into_iter().map(Into::into).collect())
    }

    /// Any one of the provided values matching is sufficient.
    pub fn or<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryItems::Any(items.into_iter().map(Into::into).collect())
    }

    pub fn is_absent(&self) -> bool {
        match self {
            QueryItems::Absent => true,
            QueryItems::One(_) => false,
            QueryItems::List(v) | QueryItems::All(v) | QueryItems::Any(v) => v.is_empty(),
        }
    }

    /// Resolve into a combinator subtree for one field, or `None` when
    /// absent (the field is omitted from the compiled document).
    pub(crate) fn resolve<F>(&self, default_mode: CombineMode, make: F) -> QueryResult<Option<QueryExpr>>
    where
        F: Fn(String) -> Condition,
    {
        let (mode, values) = match self {
            QueryItems::Absent => return Ok(None),
            QueryItems::One(value) => {
                return Ok(Some(QueryExpr::Cond(make(value.clone()))));
            }
            QueryItems::List(values) => (default_mode, values),
            QueryItems::All(values) => (CombineMode::All, values),
            QueryItems::Any(values) => (CombineMode::Any, values),
        };
        if values.is_empty() {
            return Ok(None);
        }
        let children: Vec<QueryExpr> = values
            .iter()
            .map(|v| QueryExpr::Cond(make(v.clone())))
            .collect();
        let expr = match mode {
            CombineMode::Any => QueryExpr::or(children)?,
            CombineMode::All => QueryExpr::and(children)?,
        };
        Ok(Some(expr))
    }
}

impl From<&str> for QueryItems {
    fn from(s: &str) -> Self {
        QueryItems::One(s.to_string())
    }
}

impl From<String> for QueryItems {
    fn from(s: String) -> Self {
        QueryItems::One(s)
    }
}

impl From<Vec<String>> for QueryItems {
    fn from(v: Vec<String>) -> Self {
        QueryItems::List(v)
    }
}

impl From<Vec<&str>> for QueryItems {
    fn from(v: Vec<&str>) -> Self {
        QueryItems::List(v.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for QueryItems {
    fn from(v: [&str; N]) -> Self {
        QueryItems::List(v.iter().map(|s| s.to_string()).collect())
    }
}
