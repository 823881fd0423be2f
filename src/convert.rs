//! Bridging serde_json documents into records.
//!
//! JSON files, JSON lines and API responses all arrive as `serde_json::Value`
//! and pass through here once, at load time.

use serde_json::Value as Json;

use crate::{Record, Value};

/// Convert one JSON value, keeping its own types. Numbers that fit an `i64`
/// stay integers.
pub fn json_to_value(v: Json) -> Value {
    match v {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(items.into_iter().map(json_to_value).collect()),
        Json::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}

/// Turn one JSON document into a record.
///
/// Objects map key-for-key; any other JSON value is wrapped as `{"value": v}`.
pub fn json_to_record(v: Json) -> Record {
    match v {
        Json::Object(fields) => fields
            .into_iter()
            .map(|(k, v)| (k, json_to_value(v)))
            .collect(),
        other => [("value", json_to_value(other))].into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_become_records() {
        let record = json_to_record(json!({"id": 1, "tags": ["a"], "price": 2.5}));
        assert_eq!(record.get("id"), Some(&Value::Integer(1)));
        assert_eq!(record.get("price"), Some(&Value::Float(2.5)));
        assert_eq!(
            record.get("tags"),
            Some(&Value::Array(vec![Value::String("a".into())]))
        );
    }

    #[test]
    fn scalars_are_wrapped() {
        let record = json_to_record(json!("x"));
        assert_eq!(record.get("value"), Some(&Value::String("x".into())));
    }

    #[test]
    fn large_unsigned_numbers_fall_back_to_float() {
        assert_eq!(json_to_value(json!(u64::MAX)), Value::Float(u64::MAX as f64));
    }
}
