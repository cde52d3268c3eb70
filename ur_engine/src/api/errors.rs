//! # Engine Errors

use crate::evaluation::EvaluationError;
use crate::graph::GraphBuildError;
use crate::query::QueryError;
use ur_expression::config::ConfigError;
use ur_expression::logging::codes::Code;

/// Any error surfaced by the [`ReportingEngine`](super::ReportingEngine) facade
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Graph build failed: {0}")]
    Graph(#[from] GraphBuildError),

    #[error("Generation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Query port error: {0}")]
    Query(#[from] QueryError),
}

impl EngineError {
    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Graph(e) => e.error_code(),
            Self::Evaluation(e) => e.error_code(),
            Self::Query(e) => e.error_code(),
        }
    }

    pub fn requires_halt(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Graph(e) => e.requires_halt(),
            Self::Evaluation(e) => e.requires_halt(),
            Self::Query(e) => e.requires_halt(),
        }
    }

    /// Whether the engine still holds a usable committed document
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Evaluation(_) | Self::Query(_))
    }
}
