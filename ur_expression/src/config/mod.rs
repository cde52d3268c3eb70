//! Configuration module
//!
//! Compile-time limits live in [`constants`]; user preferences that may be
//! tuned per deployment live in [`runtime`].

pub mod constants;
pub mod runtime;

pub use constants::compile_time;
pub use runtime::{ConfigError, EnginePreferences, LoggingPreferences, RuntimeConfig};
