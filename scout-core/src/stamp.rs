// scout-core/src/stamp.rs

//! Reproducibility stamps: a sha256 over the canonical JSON encoding of the
//! fields that change a query's results.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub const STAMP_PREFIX: &str = "sha256:";

/// Rebuilds `value` with every object's keys in ascending order.
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Canonical encoding: object keys sorted, no insignificant whitespace, raw UTF-8.
pub fn canonical_json(value: &Value) -> String {
    // Serializing a `Value` cannot fail: all keys are strings.
    serde_json::to_string(&sort_keys(value)).unwrap_or_default()
}

pub fn query_stamp(semantic_fields: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(semantic_fields).as_bytes());
    format!("{}{:x}", STAMP_PREFIX, hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_stamp() {
        let a: Value = serde_json::from_str(r#"{"root":"/r","case":"smart","context":0}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"context":0,"case":"smart","root":"/r"}"#).unwrap();
        assert_eq!(query_stamp(&a), query_stamp(&b));
    }

    #[test]
    fn stamp_shape() {
        let stamp = query_stamp(&json!({"root": "/r"}));
        assert!(stamp.starts_with("sha256:"));
        assert_eq!(stamp.len(), "sha256:".len() + 64);
    }

    #[test]
    fn semantic_change_changes_stamp() {
        let a = query_stamp(&json!({"root": "/r", "max_lines": 500}));
        let b = query_stamp(&json!({"root": "/r", "max_lines": 499}));
        assert_ne!(a, b);
    }

    #[test]
    fn canonical_json_is_compact_and_sorted() {
        let value = json!({"b": 1, "a": {"d": "é", "c": [1, 2]}});
        assert_eq!(canonical_json(&value), r#"{"a":{"c":[1,2],"d":"é"},"b":1}"#);
    }
}
