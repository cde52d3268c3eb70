//! The view an expression evaluates against
//!
//! The engine implements [`Scope`] per node: self paths resolve relative to
//! the node's container, targets resolve against the input snapshot of the
//! running generation, and queries go to the configured query port.

use super::error::ExpressionError;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait Scope {
    /// Resolve a container-relative path; absent values resolve to `Null`
    fn resolve_self(&self, paths: &[String]) -> Result<Value, ExpressionError>;

    /// Resolve an absolute `data.`/`fields.`/`representation.` path
    fn resolve_target(&self, target: &str) -> Result<Value, ExpressionError>;

    /// Produce a fresh identifier for a `uniqueId` literal
    fn next_unique_id(&self) -> String;

    fn execute_query(&self, name: &str, parameters: &Value) -> Result<Value, ExpressionError>;

    fn evaluate_named_expression(
        &self,
        name: &str,
        parameters: &Value,
    ) -> Result<Value, ExpressionError>;
}

/// Source of identifiers for `uniqueId` literals
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random UUID v4 identifiers
#[derive(Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `<prefix>-<n>` identifiers for reproducible runs
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}
