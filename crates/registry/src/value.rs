//! Presence and typing helpers applied at every ingestion boundary.
//!
//! Source feeds disagree about what "missing" looks like (null, empty
//! string, NaN-turned-string). Internal logic only ever sees "present with
//! a real value" or absent, enforced by [`non_empty`].

use serde_json::Value;

/// Treat `Null` and the empty string as absent.
///
/// A higher-priority source carrying an empty value must never shadow a
/// lower-priority source's real value.
pub fn non_empty(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(other),
    }
}

/// Opportunistically type a raw scalar: integer, else float, else string.
pub fn coerce_scalar(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(x) = raw.parse::<f64>() {
        if x.is_finite() {
            return Value::from(x);
        }
    }
    Value::from(raw)
}

/// Render a scalar for indexing/display: strings without quotes, numbers
/// via their canonical formatting. Maps and arrays yield `None`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_and_empty_string_are_absent() {
        assert!(non_empty(&Value::Null).is_none());
        assert!(non_empty(&json!("")).is_none());
    }

    #[test]
    fn zero_and_false_are_present() {
        assert_eq!(non_empty(&json!(0)), Some(&json!(0)));
        assert_eq!(non_empty(&json!(false)), Some(&json!(false)));
        assert_eq!(non_empty(&json!(" ")), Some(&json!(" ")));
    }

    #[test]
    fn scalar_coercion_order() {
        assert_eq!(coerce_scalar("25544"), json!(25544));
        assert_eq!(coerce_scalar("51.64"), json!(51.64));
        assert_eq!(coerce_scalar("LEO"), json!("LEO"));
        assert_eq!(coerce_scalar("NaN"), json!("NaN"));
    }
}
