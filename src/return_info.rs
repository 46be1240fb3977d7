//! Result-shape configuration (`ReturnInfo`).
//!
//! An opaque mapping of flags describing which optional fields the
//! service should populate on returned items. The core never interprets
//! the contents; it only merges them verbatim into the request body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};

/// Opaque bag of result-shape flags, e.g. `includeArticleConcepts: true`
/// or `articleBodyLen: -1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnInfo(Map<String, Value>);

impl ReturnInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a pre-built JSON object. Fails if the value is not an object.
    pub fn from_value(value: Value) -> QueryResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(QueryError::MalformedQuery(format!(
                "return info must be a JSON object, got {other}"
            ))),
        }
    }

    /// Set a single flag. Chainable.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy every flag into a request body, shadowing existing keys.
    pub(crate) fn merge_into(&self, body: &mut Map<String, Value>) {
        for (key, value) in &self.0 {
            body.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flags_pass_through_unchanged() {
        let info = ReturnInfo::new()
            .set("includeArticleConcepts", true)
            .set("articleBodyLen", -1);
        let mut body = Map::new();
        info.merge_into(&mut body);
        assert_eq!(body.get("includeArticleConcepts"), Some(&json!(true)));
        assert_eq!(body.get("articleBodyLen"), Some(&json!(-1)));
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        assert!(ReturnInfo::from_value(json!([1, 2])).is_err());
        assert!(ReturnInfo::from_value(json!({"a": 1})).is_ok());
    }

    #[test]
    fn test_nested_flags_are_opaque() {
        // Nested structures are carried verbatim, never inspected.
        let info = ReturnInfo::from_value(json!({
            "articleInfo": {"concepts": true, "categories": true}
        }))
        .unwrap();
        let mut body = Map::new();
        info.merge_into(&mut body);
        assert_eq!(
            body.get("articleInfo"),
            Some(&json!({"concepts": true, "categories": true}))
        );
    }
}
