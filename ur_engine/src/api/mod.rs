//! # Public API
//!
//! [`ReportingEngine`] is the entry point for hosts: it owns one form's graph
//! and committed document and turns queued events into generations.

pub mod config;
pub mod engine;
pub mod errors;

pub use crate::evaluation::{GenerationReport, RejectedWrite};
pub use crate::graph::{GraphStats, NodeDiagnostic};
pub use config::{EngineConfig, IdMode};
pub use engine::ReportingEngine;
pub use errors::EngineError;
