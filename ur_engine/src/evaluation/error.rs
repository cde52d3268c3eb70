use crate::graph::GraphBuildError;
use crate::target::TargetError;
use ur_expression::logging::codes::{self, Code};

/// Errors that abort a whole generation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// Loop protection tripped: the field definitions oscillate or are cyclic
    #[error("Evaluation did not converge after {iterations} iterations; still dirty: {}", dirty.join(", "))]
    NonConvergence {
        iterations: usize,
        dirty: Vec<String>,
    },

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Graph(#[from] GraphBuildError),
}

impl EvaluationError {
    pub fn non_convergence(iterations: usize, dirty: Vec<String>) -> Self {
        Self::NonConvergence { iterations, dirty }
    }

    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        match self {
            Self::NonConvergence { .. } => codes::evaluation::NON_CONVERGENCE,
            Self::Target(e) => e.error_code(),
            Self::Graph(e) => e.error_code(),
        }
    }

    /// Generation errors are never retried
    pub fn requires_halt(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_convergence_message() {
        let error = EvaluationError::non_convergence(50, vec!["data.a".into(), "data.b".into()]);
        assert_eq!(
            error.to_string(),
            "Evaluation did not converge after 50 iterations; still dirty: data.a, data.b"
        );
        assert_eq!(error.error_code(), codes::evaluation::NON_CONVERGENCE);
        assert!(error.requires_halt());
    }
}
