use crate::target::TargetError;
use ur_expression::logging::codes::{self, Code};

/// Errors raised while building or re-expanding the dependency graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphBuildError {
    #[error(transparent)]
    InvalidTarget(#[from] TargetError),

    #[error("Field '{name}' is declared more than once")]
    DuplicateField { name: String },

    #[error("Representation '{representation}' binds '{path}', which is not a declared field")]
    UnboundRepresentation {
        representation: String,
        path: String,
    },

    #[error("Field definitions declare {} dependency cycle(s): {}", cycles.len(), format_cycles(cycles))]
    CyclicDeclaration { cycles: Vec<Vec<String>> },

    #[error("Too many {what}: limit is {limit}")]
    LimitExceeded { what: String, limit: usize },

    #[error("Dependency graph corrupted: {details}")]
    Corrupted { details: String },
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| cycle.join(" -> "))
        .collect::<Vec<_>>()
        .join("; ")
}

impl GraphBuildError {
    pub fn duplicate_field(name: &str) -> Self {
        Self::DuplicateField {
            name: name.to_string(),
        }
    }

    pub fn unbound_representation(representation: &str, path: &str) -> Self {
        Self::UnboundRepresentation {
            representation: representation.to_string(),
            path: path.to_string(),
        }
    }

    pub fn limit_exceeded(what: &str, limit: usize) -> Self {
        Self::LimitExceeded {
            what: what.to_string(),
            limit,
        }
    }

    pub fn corrupted(details: &str) -> Self {
        Self::Corrupted {
            details: details.to_string(),
        }
    }

    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        match self {
            Self::InvalidTarget(e) => e.error_code(),
            Self::DuplicateField { .. } => codes::graph::DUPLICATE_FIELD,
            Self::UnboundRepresentation { .. } => codes::graph::UNBOUND_REPRESENTATION,
            Self::CyclicDeclaration { .. } => codes::graph::CYCLIC_DECLARATION,
            Self::LimitExceeded { .. } => codes::graph::LIMIT_EXCEEDED,
            Self::Corrupted { .. } => codes::graph::GRAPH_CORRUPTED,
        }
    }

    /// Every build error invalidates the whole graph
    pub fn requires_halt(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_paths() {
        let error = GraphBuildError::CyclicDeclaration {
            cycles: vec![vec!["data.a".to_string(), "data.b".to_string()]],
        };
        assert_eq!(
            error.to_string(),
            "Field definitions declare 1 dependency cycle(s): data.a -> data.b"
        );
        assert_eq!(error.error_code(), codes::graph::CYCLIC_DECLARATION);
    }

    #[test]
    fn test_target_errors_keep_their_code() {
        let error: GraphBuildError = TargetError::invalid("x", "bad").into();
        assert_eq!(error.error_code(), codes::targets::INVALID_TARGET);
        assert!(error.requires_halt());
    }
}
