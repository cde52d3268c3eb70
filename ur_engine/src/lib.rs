// Internal modules
pub mod api;
pub mod evaluation;
pub mod graph;
pub mod model;
pub mod policy;
pub mod query;
pub mod target;

// Re-export key types for library consumers
pub use api::{EngineConfig, EngineError, IdMode, ReportingEngine};
pub use evaluation::{EvaluationError, GenerationReport};
pub use graph::{DependencyGraph, GraphBuildError, NodeDiagnostic};
pub use model::{Document, Event, Field, FieldDefinition, Representation};
pub use query::{InMemoryQueryPort, QueryError, QueryPort};
pub use target::{Target, TargetError};

/// Everything a host needs to declare fields and drive an engine
pub mod prelude {
    pub use crate::api::{EngineConfig, EngineError, ReportingEngine};
    pub use crate::model::{
        Event, Field, FieldDefinition, FieldType, MergePolicies, PresentationKind, Representation,
        ViewItem,
    };
    pub use crate::query::{InMemoryQueryPort, QueryPort};
    pub use ur_expression::expression::Builtin;
    pub use ur_expression::{EnginePreferences, Expression};
}
