//! The expression language
//!
//! Field definitions and representations declare their computed values,
//! permissions and visibility as [`Expression`]s. They are evaluated against
//! a [`Scope`] supplied by the engine and never mutate it.

pub mod ast;
pub mod builtins;
pub mod dependencies;
pub mod error;
pub mod evaluator;
pub mod scope;
pub mod value;

pub use ast::{Expression, Literal, RuleClause};
pub use builtins::Builtin;
pub use dependencies::{extract_references, uses_query_port, Reference};
pub use error::ExpressionError;
pub use evaluator::{evaluate, Evaluator};
pub use scope::{IdGenerator, Scope, SequentialIdGenerator, UuidGenerator};
