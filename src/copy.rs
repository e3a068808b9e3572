//! Deep copy for JSON values.
//!
//! Consumers that want to keep a state snapshot around as plain JSON use
//! [`deep_copy`] so later edits never alias the original tree.

use serde_json::{Map, Value};

/// Returns `true` for `null`, `false`, zero and the empty string.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Recursively copy `value`.
///
/// Falsy values come back unchanged. Arrays are copied element by element
/// and objects field by field; scalars are copied directly.
#[must_use]
pub fn deep_copy(value: &Value) -> Value {
    if is_falsy(value) {
        return value.clone();
    }

    match value {
        Value::Array(items) => Value::Array(items.iter().map(deep_copy).collect()),
        Value::Object(fields) => {
            let mut copy = Map::with_capacity(fields.len());
            for (key, field) in fields {
                copy.insert(key.clone(), deep_copy(field));
            }
            Value::Object(copy)
        }
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_values_returned_unchanged() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert_eq!(deep_copy(&value), value);
        }
    }

    #[test]
    fn test_nested_structure_copied() {
        let original = json!({
            "link": "connected",
            "networks": [{"ssid": "home", "rssi": -40, "enc": true}],
            "globalStats": {"brightness": 128, "on": true, "followSun": false}
        });
        let mut copy = deep_copy(&original);
        assert_eq!(copy, original);

        copy["networks"][0]["ssid"] = json!("changed");
        assert_eq!(original["networks"][0]["ssid"], "home");
    }

    #[test]
    fn test_empty_containers_are_copied() {
        assert_eq!(deep_copy(&json!([])), json!([]));
        assert_eq!(deep_copy(&json!({})), json!({}));
    }
}
