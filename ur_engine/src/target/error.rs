use ur_expression::logging::codes::{self, Code};

/// Errors raised while parsing or resolving target paths
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TargetError {
    #[error("Invalid target '{path}': {reason}")]
    Invalid { path: String, reason: String },

    #[error("Target '{path}' still contains a row placeholder")]
    UnresolvedPlaceholder { path: String },

    #[error("Target '{path}' has {depth} segments, limit is {limit}")]
    PathTooDeep {
        path: String,
        depth: usize,
        limit: usize,
    },

    #[error("Row '{key}' does not exist under '{path}'")]
    MissingRow { path: String, key: String },
}

impl TargetError {
    pub fn invalid(path: &str, reason: &str) -> Self {
        Self::Invalid {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unresolved_placeholder(path: &str) -> Self {
        Self::UnresolvedPlaceholder {
            path: path.to_string(),
        }
    }

    pub fn missing_row(path: &str, key: &str) -> Self {
        Self::MissingRow {
            path: path.to_string(),
            key: key.to_string(),
        }
    }

    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        match self {
            Self::Invalid { .. } => codes::targets::INVALID_TARGET,
            Self::UnresolvedPlaceholder { .. } => codes::targets::UNRESOLVED_PLACEHOLDER,
            Self::PathTooDeep { .. } => codes::targets::PATH_TOO_DEEP,
            Self::MissingRow { .. } => codes::targets::MISSING_ROW,
        }
    }

    /// Invalid targets are fatal when the graph is built
    pub fn requires_halt(&self) -> bool {
        !matches!(self, Self::MissingRow { .. })
    }
}
