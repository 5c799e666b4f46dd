//! JSON traversal and coercion
//!
//! Helpers for pulling required and optional values out of loosely typed
//! provider documents. Paths are dot-separated object keys; a purely numeric
//! segment indexes into an array (`value.0.fpVal`).
//!
//! Each helper distinguishes three outcomes: found and well typed, found and
//! ill typed (`TypeMismatch`), and not found. A JSON `null` counts as not found.

use crate::error::MappingError;
use serde_json::Value;

/// Resolve `path` against `node`, returning `None` when any segment is missing
pub fn find_node<'a>(node: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = node;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

pub fn require_node<'a>(node: &'a Value, path: &str) -> Result<&'a Value, MappingError> {
    find_node(node, path).ok_or_else(|| MappingError::missing(path))
}

pub fn optional_node<'a>(node: &'a Value, path: &str) -> Option<&'a Value> {
    find_node(node, path)
}

pub fn require_f64(node: &Value, path: &str) -> Result<f64, MappingError> {
    as_f64(require_node(node, path)?, path)
}

pub fn optional_f64(node: &Value, path: &str) -> Result<Option<f64>, MappingError> {
    find_node(node, path).map(|v| as_f64(v, path)).transpose()
}

pub fn require_i64(node: &Value, path: &str) -> Result<i64, MappingError> {
    as_i64(require_node(node, path)?, path)
}

pub fn optional_i64(node: &Value, path: &str) -> Result<Option<i64>, MappingError> {
    find_node(node, path).map(|v| as_i64(v, path)).transpose()
}

pub fn require_str<'a>(node: &'a Value, path: &str) -> Result<&'a str, MappingError> {
    as_str(require_node(node, path)?, path)
}

pub fn optional_str<'a>(node: &'a Value, path: &str) -> Result<Option<&'a str>, MappingError> {
    find_node(node, path).map(|v| as_str(v, path)).transpose()
}

pub fn require_bool(node: &Value, path: &str) -> Result<bool, MappingError> {
    as_bool(require_node(node, path)?, path)
}

pub fn optional_bool(node: &Value, path: &str) -> Result<Option<bool>, MappingError> {
    find_node(node, path).map(|v| as_bool(v, path)).transpose()
}

/// Epoch values arrive as integral numbers or as strings of digits
pub fn optional_epoch(node: &Value, path: &str) -> Result<Option<i64>, MappingError> {
    match find_node(node, path) {
        None => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| MappingError::mismatch(path, "epoch integer")),
        Some(v) => as_i64(v, path).map(Some),
    }
}

fn as_f64(value: &Value, path: &str) -> Result<f64, MappingError> {
    value
        .as_f64()
        .ok_or_else(|| MappingError::mismatch(path, "number"))
}

fn as_i64(value: &Value, path: &str) -> Result<i64, MappingError> {
    if let Some(i) = value.as_i64() {
        return Ok(i);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(MappingError::mismatch(path, "integer")),
    }
}

fn as_str<'a>(value: &'a Value, path: &str) -> Result<&'a str, MappingError> {
    value
        .as_str()
        .ok_or_else(|| MappingError::mismatch(path, "string"))
}

fn as_bool(value: &Value, path: &str) -> Result<bool, MappingError> {
    value
        .as_bool()
        .ok_or_else(|| MappingError::mismatch(path, "boolean"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "HP": 120,
            "note": "after lunch",
            "nested": { "value": [{ "fpVal": 12.5 }] },
            "flag": true,
            "empty": null,
            "nanos": "1400000000000000000"
        })
    }

    #[test]
    fn test_find_nested_array_path() {
        let doc = doc();
        assert_eq!(require_f64(&doc, "nested.value.0.fpVal").unwrap(), 12.5);
        assert!(find_node(&doc, "nested.value.1.fpVal").is_none());
    }

    #[test]
    fn test_required_missing_field() {
        let err = require_f64(&doc(), "LP").unwrap_err();
        assert!(matches!(err, MappingError::MissingRequiredField { ref path } if path == "LP"));
    }

    #[test]
    fn test_null_is_absent() {
        let doc = doc();
        assert_eq!(optional_str(&doc, "empty").unwrap(), None);
        assert!(require_node(&doc, "empty").is_err());
    }

    #[test]
    fn test_type_mismatch_when_present() {
        let doc = doc();
        assert!(matches!(
            optional_f64(&doc, "note"),
            Err(MappingError::TypeMismatch { .. })
        ));
        assert!(matches!(
            require_str(&doc, "HP"),
            Err(MappingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_integer_coercion() {
        let doc = json!({ "a": 60.0, "b": 60.5, "x": 7 });
        assert_eq!(require_i64(&doc, "a").unwrap(), 60);
        assert!(require_i64(&doc, "b").is_err());
        assert_eq!(require_f64(&doc, "x").unwrap(), 7.0);
    }

    #[test]
    fn test_optional_present_values() {
        let doc = doc();
        assert_eq!(optional_str(&doc, "note").unwrap(), Some("after lunch"));
        assert_eq!(optional_bool(&doc, "flag").unwrap(), Some(true));
        assert!(require_bool(&doc, "flag").unwrap());
        assert_eq!(optional_i64(&doc, "missing").unwrap(), None);
    }

    #[test]
    fn test_epoch_from_string() {
        let doc = doc();
        assert_eq!(
            optional_epoch(&doc, "nanos").unwrap(),
            Some(1_400_000_000_000_000_000)
        );
        assert_eq!(optional_epoch(&doc, "HP").unwrap(), Some(120));
        assert!(optional_epoch(&doc, "note").is_err());
    }
}
