// RUNTIME PREFERENCES

use super::constants::compile_time::evaluation::MAX_EVALUATION_ITERATIONS;
use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Errors raised while loading or validating runtime configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid preference '{name}': {reason}")]
    InvalidPreference { name: String, reason: String },
}

impl ConfigError {
    pub fn invalid_preference(name: &str, reason: &str) -> Self {
        Self::InvalidPreference {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Get error code for global logging system
    pub fn error_code(&self) -> crate::logging::codes::Code {
        use crate::logging::codes;
        match self {
            Self::Io { .. } => codes::config::CONFIG_IO_ERROR,
            Self::Parse(_) => codes::config::CONFIG_PARSE_ERROR,
            Self::InvalidPreference { .. } => codes::config::INVALID_PREFERENCES,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginePreferences {
    /// Whether to run strongly-connected-component analysis when the graph is built
    pub enable_cycle_detection: bool,

    /// Whether a detected declaration cycle fails the build instead of being reported
    pub reject_cycles: bool,

    /// Whether to log every node evaluation and staged write
    pub log_evaluation_details: bool,

    /// Whether computed values are checked against the declared field type
    pub validate_field_types: bool,

    /// Iteration bound for one fixpoint loop; may be lowered, never raised
    pub max_iterations: usize,
}

impl Default for EnginePreferences {
    fn default() -> Self {
        Self {
            enable_cycle_detection: env_flag(env_vars::ENGINE_ENABLE_CYCLE_DETECTION, true),
            reject_cycles: env_flag(env_vars::ENGINE_REJECT_CYCLES, false),
            log_evaluation_details: env_flag(env_vars::ENGINE_LOG_EVALUATION_DETAILS, false),
            validate_field_types: env_flag(env_vars::ENGINE_VALIDATE_FIELD_TYPES, true),
            max_iterations: MAX_EVALUATION_ITERATIONS,
        }
    }
}

impl EnginePreferences {
    /// Validate preferences against compile-time limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid_preference(
                "max_iterations",
                "must be at least 1",
            ));
        }

        if self.max_iterations > MAX_EVALUATION_ITERATIONS {
            return Err(ConfigError::invalid_preference(
                "max_iterations",
                &format!(
                    "{} exceeds the compile-time bound of {}",
                    self.max_iterations, MAX_EVALUATION_ITERATIONS
                ),
            ));
        }

        if self.reject_cycles && !self.enable_cycle_detection {
            return Err(ConfigError::invalid_preference(
                "reject_cycles",
                "requires enable_cycle_detection",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Minimum level emitted by the logging service
    pub min_log_level: LogLevel,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env_flag(env_vars::LOGGING_USE_STRUCTURED, false),
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| LogLevel::from_str(&v))
                .unwrap_or(LogLevel::Warning),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub engine: EnginePreferences,
    pub logging: LoggingPreferences,
}

impl RuntimeConfig {
    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(source)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // Engine
    pub const ENGINE_ENABLE_CYCLE_DETECTION: &str = "UR_ENGINE_ENABLE_CYCLE_DETECTION";
    pub const ENGINE_REJECT_CYCLES: &str = "UR_ENGINE_REJECT_CYCLES";
    pub const ENGINE_LOG_EVALUATION_DETAILS: &str = "UR_ENGINE_LOG_EVALUATION_DETAILS";
    pub const ENGINE_VALIDATE_FIELD_TYPES: &str = "UR_ENGINE_VALIDATE_FIELD_TYPES";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "UR_LOGGING_USE_STRUCTURED";
    pub const LOGGING_MIN_LEVEL: &str = "UR_LOG_LEVEL";
}
