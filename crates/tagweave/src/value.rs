//! Helpers for context values.
//!
//! Context data is plain [`serde_json::Value`], so anything that implements
//! `Serialize` can be bound into a render context.

pub use serde_json::Value;

/// Walks a dotted path into a value.
///
/// Supports:
/// - Object keys: `user.name`
/// - Array indices: `items.0` or `items.0.name`
///
/// An empty path returns the value itself.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => {
                let index: usize = part.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Formats a value for output.
///
/// Strings are written without quotes and null is empty. Arrays and objects
/// use their JSON representation.
pub fn to_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Truthiness used by conditional tags.
///
/// Null, `false`, zero, and empty strings, arrays or objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
