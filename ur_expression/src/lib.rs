// Internal modules
pub mod config;
pub mod expression;
#[macro_use]
pub mod logging;

// Re-export key types for library consumers
pub use config::{ConfigError, EnginePreferences, LoggingPreferences, RuntimeConfig};
pub use expression::{evaluate, Expression, ExpressionError, Scope};
