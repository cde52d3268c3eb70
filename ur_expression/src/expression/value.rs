//! Helpers over `serde_json::Value`, the runtime value of every expression

use super::error::ExpressionError;
use serde_json::{Number, Value};

/// Missing and `null` are both treated as absent
pub fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Structural equality where numbers compare by numeric value (`1 == 1.0`)
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, v)| b.get(k).map_or(false, |other| values_equal(v, other)))
        }
        _ => left == right,
    }
}

/// Build a JSON number, keeping integral results as integers
pub fn number_value(number: f64) -> Result<Value, ExpressionError> {
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        return Ok(Value::Number(Number::from(number as i64)));
    }
    Number::from_f64(number)
        .map(Value::Number)
        .ok_or_else(|| ExpressionError::type_mismatch("finite number", "NaN or infinity", "arithmetic"))
}

/// Read a number operand; absent operands count as zero
pub fn as_number(value: &Value, context: &str) -> Result<f64, ExpressionError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ExpressionError::type_mismatch("number", "unrepresentable number", context)),
        other => Err(ExpressionError::type_mismatch("number", type_name(other), context)),
    }
}

/// Conditions accept booleans; absent is false
pub fn truthy(value: &Value, context: &str) -> Result<bool, ExpressionError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(ExpressionError::type_mismatch("boolean", type_name(other), context)),
    }
}

/// Text rendering used by string builtins; absent renders as empty
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Navigate into a value by object key or numeric list index
pub fn get_path<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_equality_ignores_representation() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!({"a": [1, 2]}), &json!({"a": [1.0, 2]})));
        assert!(!values_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn test_number_value_keeps_integers() {
        assert_eq!(number_value(3.0).unwrap(), json!(3));
        assert_eq!(number_value(2.5).unwrap(), json!(2.5));
        assert!(number_value(f64::NAN).is_err());
    }

    #[test]
    fn test_absent() {
        assert!(is_absent(None));
        assert!(is_absent(Some(&Value::Null)));
        assert!(!is_absent(Some(&json!(""))));
    }

    #[test]
    fn test_truthy_rejects_strings() {
        assert!(truthy(&json!(true), "rule").unwrap());
        assert!(!truthy(&Value::Null, "rule").unwrap());
        assert!(truthy(&json!("yes"), "rule").is_err());
    }

    #[test]
    fn test_get_path() {
        let value = json!({"rows": [{"name": "a"}, {"name": "b"}]});
        let path = vec!["rows".to_string(), "1".to_string(), "name".to_string()];
        assert_eq!(get_path(&value, &path), Some(&json!("b")));
        assert_eq!(get_path(&value, &["missing".to_string()]), None);
    }
}
