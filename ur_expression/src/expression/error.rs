use crate::logging::codes::{self, Code};

/// Failure of a single expression evaluation
///
/// These are always local to the node that owns the expression: the node is
/// put in ERROR, its previous committed value is retained, and the generation
/// continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        context: String,
    },

    #[error("Symbol '{name}' is not bound")]
    MissingSymbol { name: String },

    #[error("No rule matched and no else branch was declared")]
    NoMatchingRule,

    #[error("Invalid invocation of '{function}': {reason}")]
    InvalidInvocation { function: String, reason: String },

    #[error("Query '{name}' failed: {reason}")]
    QueryFailed { name: String, reason: String },

    #[error("Expression nesting exceeds the limit of {limit}")]
    DepthExceeded { limit: usize },

    #[error("Invalid reference '{path}': {reason}")]
    InvalidReference { path: String, reason: String },

    #[error("Value {value} does not satisfy field type {expected}")]
    FieldTypeViolation { expected: String, value: String },
}

impl ExpressionError {
    pub fn type_mismatch(expected: &str, found: &str, context: &str) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            context: context.to_string(),
        }
    }

    pub fn missing_symbol(name: &str) -> Self {
        Self::MissingSymbol {
            name: name.to_string(),
        }
    }

    pub fn invalid_invocation(function: &str, reason: &str) -> Self {
        Self::InvalidInvocation {
            function: function.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn query_failed(name: &str, reason: &str) -> Self {
        Self::QueryFailed {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_reference(path: &str, reason: &str) -> Self {
        Self::InvalidReference {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn field_type_violation(expected: &str, value: &serde_json::Value) -> Self {
        Self::FieldTypeViolation {
            expected: expected.to_string(),
            value: value.to_string(),
        }
    }

    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        match self {
            Self::TypeMismatch { .. } => codes::expression::TYPE_MISMATCH,
            Self::MissingSymbol { .. } => codes::expression::MISSING_SYMBOL,
            Self::NoMatchingRule => codes::expression::NO_MATCHING_RULE,
            Self::InvalidInvocation { .. } => codes::expression::INVALID_INVOCATION,
            Self::QueryFailed { .. } => codes::expression::QUERY_FAILED,
            Self::DepthExceeded { .. } => codes::expression::DEPTH_EXCEEDED,
            Self::InvalidReference { .. } => codes::expression::INVALID_REFERENCE,
            Self::FieldTypeViolation { .. } => codes::expression::FIELD_TYPE_VIOLATION,
        }
    }

    /// Expression failures never halt a generation
    pub fn requires_halt(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_registered() {
        let errors = [
            ExpressionError::type_mismatch("number", "string", "sumOperator"),
            ExpressionError::missing_symbol("current"),
            ExpressionError::NoMatchingRule,
            ExpressionError::query_failed("owners", "no port"),
            ExpressionError::DepthExceeded { limit: 64 },
        ];

        for error in &errors {
            assert!(codes::get_code_metadata(error.error_code().as_str()).is_some());
            assert!(!error.requires_halt());
        }
    }

    #[test]
    fn test_display() {
        let error = ExpressionError::type_mismatch("number", "string", "sumOperator");
        assert_eq!(
            error.to_string(),
            "Type mismatch in sumOperator: expected number, found string"
        );
    }
}
