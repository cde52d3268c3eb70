//! Checking computed values against declared field types

use super::field::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ur_expression::expression::value::values_equal;
use ur_expression::ExpressionError;

/// The part of a field type a computed value is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueShape {
    String,
    Number,
    PositiveNumber,
    Boolean,
    Date,
    UniqueId,
    Enum,
    Object,
    List,
    /// No constraint (representation overrides)
    Any,
}

impl From<&FieldType> for ValueShape {
    fn from(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::String => Self::String,
            FieldType::Number => Self::Number,
            FieldType::PositiveNumber => Self::PositiveNumber,
            FieldType::Boolean => Self::Boolean,
            FieldType::Date => Self::Date,
            FieldType::UniqueId => Self::UniqueId,
            FieldType::Enum { .. } => Self::Enum,
            FieldType::Object { .. } => Self::Object,
            FieldType::List { .. } => Self::List,
        }
    }
}

impl ValueShape {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::PositiveNumber => "positiveNumber",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::UniqueId => "uniqueId",
            Self::Enum => "enum",
            Self::Object => "object",
            Self::List => "list",
            Self::Any => "any",
        }
    }

    /// Check `value`; absent values satisfy every shape
    ///
    /// `options` are the enum's currently resolved options, when resolved.
    pub fn validate(&self, value: &Value, options: Option<&Value>) -> Result<(), ExpressionError> {
        let ok = match (self, value) {
            (_, Value::Null) | (Self::Any, _) => true,
            (Self::String | Self::UniqueId, Value::String(_)) => true,
            (Self::Number, Value::Number(_)) => true,
            (Self::PositiveNumber, Value::Number(n)) => n.as_f64().map_or(false, |f| f >= 0.0),
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Date, Value::String(s)) => is_iso_date(s),
            (Self::Object, Value::Object(_)) => true,
            (Self::List, Value::Array(_)) => true,
            (Self::Enum, v) => match options {
                Some(Value::Array(allowed)) => allowed.iter().any(|o| option_matches(o, v)),
                _ => true,
            },
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(ExpressionError::field_type_violation(self.name(), value))
        }
    }
}

/// Options are either plain values or `{"value": ..., "label": ...}` objects
fn option_matches(option: &Value, value: &Value) -> bool {
    match option.get("value") {
        Some(inner) if option.is_object() => values_equal(inner, value),
        _ => values_equal(option, value),
    }
}

fn is_iso_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_shapes() {
        assert!(ValueShape::String.validate(&json!("x"), None).is_ok());
        assert!(ValueShape::String.validate(&json!(1), None).is_err());
        assert!(ValueShape::Number.validate(&json!(-2.5), None).is_ok());
        assert!(ValueShape::PositiveNumber.validate(&json!(0), None).is_ok());
        assert!(ValueShape::PositiveNumber.validate(&json!(-1), None).is_err());
        assert!(ValueShape::Boolean.validate(&json!("true"), None).is_err());
    }

    #[test]
    fn test_absent_is_always_valid() {
        for shape in [ValueShape::Date, ValueShape::Object, ValueShape::Enum] {
            assert!(shape.validate(&Value::Null, None).is_ok());
        }
    }

    #[test]
    fn test_dates() {
        assert!(ValueShape::Date.validate(&json!("2024-02-29"), None).is_ok());
        assert!(ValueShape::Date
            .validate(&json!("2024-02-29T10:00:00Z"), None)
            .is_ok());
        assert!(ValueShape::Date.validate(&json!("2023-02-29"), None).is_err());
    }

    #[test]
    fn test_enum_options() {
        let options = json!(["open", {"value": "closed", "label": "Closed"}]);
        assert!(ValueShape::Enum.validate(&json!("open"), Some(&options)).is_ok());
        assert!(ValueShape::Enum.validate(&json!("closed"), Some(&options)).is_ok());
        assert!(ValueShape::Enum.validate(&json!("lost"), Some(&options)).is_err());
        // Unresolved options do not constrain
        assert!(ValueShape::Enum.validate(&json!("lost"), None).is_ok());
    }
}
