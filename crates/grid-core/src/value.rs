//! Cell value resolution and coercion
//!
//! Every component that needs a cell value (filtering, sorting, quick
//! filter, CSV export) goes through `resolve_field`, so nested-field
//! semantics stay consistent everywhere.

use serde_json::Value;

/// Resolve a dot-delimited field path against a row record.
///
/// Each segment indexes into the previous result. Returns `None` if the
/// path is empty, any intermediate is missing or null, or the final
/// value is null. Never panics.
pub fn resolve_field<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = data;
    for part in path.split('.') {
        if current.is_null() {
            return None;
        }
        current = current.get(part)?;
    }

    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// String-coerce a cell value for display, filtering and export.
///
/// Missing values render as the empty string. Composite values render as
/// their JSON text.
pub fn display_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Numeric coercion for the number filter and the default comparator.
///
/// JSON numbers pass through; numeric strings parse; booleans coerce to
/// 0/1. Everything else (including empty strings) is `None`.
pub fn as_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// A value is blank when it is missing or an empty string.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_paths() {
        let row = json!({ "user": { "address": { "city": "Oslo" } } });
        assert_eq!(
            resolve_field(&row, "user.address.city"),
            Some(&json!("Oslo"))
        );
    }

    #[test]
    fn missing_and_null_intermediates_resolve_to_none() {
        let row = json!({ "user": null, "name": "Ann" });
        assert_eq!(resolve_field(&row, "user.address.city"), None);
        assert_eq!(resolve_field(&row, "nope"), None);
        assert_eq!(resolve_field(&row, ""), None);
    }

    #[test]
    fn null_leaf_resolves_to_none() {
        let row = json!({ "age": null });
        assert_eq!(resolve_field(&row, "age"), None);
    }

    #[test]
    fn display_coercion() {
        assert_eq!(display_string(Some(&json!("x"))), "x");
        assert_eq!(display_string(Some(&json!(1.5))), "1.5");
        assert_eq!(display_string(Some(&json!(30))), "30");
        assert_eq!(display_string(Some(&json!(true))), "true");
        assert_eq!(display_string(None), "");
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(as_number(Some(&json!(25))), Some(25.0));
        assert_eq!(as_number(Some(&json!("3.5"))), Some(3.5));
        assert_eq!(as_number(Some(&json!("abc"))), None);
        assert_eq!(as_number(Some(&json!(""))), None);
        assert_eq!(as_number(None), None);
    }

    #[test]
    fn blankness() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&json!(""))));
        assert!(!is_blank(Some(&json!(0))));
        assert!(!is_blank(Some(&json!("x"))));
    }
}
