//! Incremental evaluation of a dependency graph against a document
//!
//! A generation applies a batch of events to the committed document and
//! re-evaluates dirty nodes until nothing is dirty. Each iteration reads an
//! immutable snapshot and writes a draft, so no node observes a write from
//! its own iteration.

pub mod context;
pub mod error;
pub mod incremental;
pub mod report;
pub mod scope;

pub use context::EvaluationContext;
pub use error::EvaluationError;
pub use incremental::{run_generation, GenerationOutcome};
pub use report::{GenerationReport, RejectedWrite};
pub use scope::NodeScope;
