//! # Engine Configuration

use ur_expression::config::ConfigError;
use ur_expression::expression::{IdGenerator, SequentialIdGenerator, UuidGenerator};
use ur_expression::{EnginePreferences, RuntimeConfig};

/// How `uniqueId` literals are generated
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdMode {
    /// Random UUID v4
    #[default]
    Random,
    /// `<prefix>-1`, `<prefix>-2`, ... for reproducible runs
    Sequential { prefix: String },
}

/// Configuration for a [`ReportingEngine`](super::ReportingEngine)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Graph and evaluation preferences
    pub preferences: EnginePreferences,

    /// Identifier generation for `uniqueId` literals
    pub id_mode: IdMode,

    /// Tenant whose events this engine accepts; `None` accepts all
    pub tenant_id: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(EnginePreferences::default())
    }
}

impl EngineConfig {
    pub fn new(preferences: EnginePreferences) -> Self {
        Self {
            preferences,
            id_mode: IdMode::Random,
            tenant_id: None,
        }
    }

    /// Engine section of a loaded runtime configuration
    pub fn from_runtime(config: &RuntimeConfig) -> Self {
        Self::new(config.engine.clone())
    }

    /// Lower the fixpoint iteration bound
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.preferences.max_iterations = max_iterations;
        self
    }

    pub fn with_sequential_ids(mut self, prefix: impl Into<String>) -> Self {
        self.id_mode = IdMode::Sequential {
            prefix: prefix.into(),
        };
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Fail the build on declaration cycles instead of reporting them
    pub fn with_reject_cycles(mut self, reject: bool) -> Self {
        self.preferences.reject_cycles = reject;
        if reject {
            self.preferences.enable_cycle_detection = true;
        }
        self
    }

    pub fn with_type_validation(mut self, enabled: bool) -> Self {
        self.preferences.validate_field_types = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.preferences.validate()?;
        if let IdMode::Sequential { prefix } = &self.id_mode {
            if prefix.is_empty() {
                return Err(ConfigError::invalid_preference(
                    "id_mode",
                    "sequential prefix must not be empty",
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn id_generator(&self) -> Box<dyn IdGenerator> {
        match &self.id_mode {
            IdMode::Random => Box::new(UuidGenerator),
            IdMode::Sequential { prefix } => Box::new(SequentialIdGenerator::new(prefix)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new(EnginePreferences::default())
            .with_max_iterations(10)
            .with_sequential_ids("row")
            .with_tenant("acme")
            .with_reject_cycles(true);

        assert_eq!(config.preferences.max_iterations, 10);
        assert_eq!(
            config.id_mode,
            IdMode::Sequential {
                prefix: "row".to_string()
            }
        );
        assert_eq!(config.tenant_id.as_deref(), Some("acme"));
        assert!(config.preferences.reject_cycles);
        assert!(config.preferences.enable_cycle_detection);
        assert!(config.validate().is_ok());
        assert_eq!(config.id_generator().next_id(), "row-1");
    }

    #[test]
    fn test_iteration_bound_cannot_be_raised() {
        let config = EngineConfig::default().with_max_iterations(500);
        assert_matches!(
            config.validate(),
            Err(ConfigError::InvalidPreference { ref name, .. }) if name == "max_iterations"
        );
    }

    #[test]
    fn test_empty_sequential_prefix() {
        let config = EngineConfig::default().with_sequential_ids("");
        assert_matches!(config.validate(), Err(ConfigError::InvalidPreference { .. }));
    }

    #[test]
    fn test_from_runtime() {
        let runtime = RuntimeConfig::from_toml_str(
            r#"
            [engine]
            max_iterations = 7
            validate_field_types = false
            "#,
        )
        .unwrap();
        let config = EngineConfig::from_runtime(&runtime);
        assert_eq!(config.preferences.max_iterations, 7);
        assert!(!config.preferences.validate_field_types);
        assert_eq!(config.id_mode, IdMode::Random);
    }
}
