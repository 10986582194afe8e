//! Resource records, deltas and bulk update payloads

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a record within a resource
pub type RecordId = String;

/// Partial record holding only the fields a client intends to change
pub type Delta = Map<String, Value>;

/// Extract the record id of a JSON row
///
/// String ids are returned as-is, numeric ids are rendered as text.
pub fn record_id(record: &Value) -> Option<RecordId> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Body of `PUT /{resource}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateRequest {
    pub ids: Vec<RecordId>,
    pub data: Delta,
}

/// Result of a bulk update
///
/// `data` lists the ids that were updated; `errors` maps every id that
/// failed to the server's message. A non-empty `errors` is a partial
/// failure: the ids in `data` were still written.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkUpdateResponse {
    pub data: Vec<RecordId>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub errors: IndexMap<RecordId, String>,
}

impl BulkUpdateResponse {
    pub fn is_partial_failure(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id() {
        assert_eq!(record_id(&json!({"id": "org-1"})), Some("org-1".to_string()));
        assert_eq!(record_id(&json!({"id": 42})), Some("42".to_string()));
        assert_eq!(record_id(&json!({"name": "no id"})), None);
        assert_eq!(record_id(&json!({"id": null})), None);
    }

    #[test]
    fn test_bulk_response_omits_empty_errors() {
        let response = BulkUpdateResponse {
            data: vec!["a".to_string()],
            errors: IndexMap::new(),
        };
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({"data": ["a"]}));

        let parsed: BulkUpdateResponse =
            serde_json::from_value(json!({"data": [], "errors": {"b": "locked"}})).unwrap();
        assert!(parsed.is_partial_failure());
        assert_eq!(parsed.errors["b"], "locked");
    }
}
