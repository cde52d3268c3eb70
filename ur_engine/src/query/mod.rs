//! Query port: persisted-data-backed lookups used by option-list builtins
//!
//! The engine only consumes this trait. [`InMemoryQueryPort`] serves fixed
//! or computed answers for tests and the inspector.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use ur_expression::logging::codes::{self, Code};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Unknown query '{name}'")]
    UnknownQuery { name: String },

    #[error("Query '{name}' failed: {reason}")]
    Failed { name: String, reason: String },

    #[error("Failed to read query fixtures {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid query fixtures: {0}")]
    Parse(#[from] serde_json::Error),
}

impl QueryError {
    pub fn unknown_query(name: &str) -> Self {
        Self::UnknownQuery {
            name: name.to_string(),
        }
    }

    pub fn failed(name: &str, reason: &str) -> Self {
        Self::Failed {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        match self {
            Self::UnknownQuery { .. } | Self::Failed { .. } => codes::expression::QUERY_FAILED,
            Self::Io { .. } => codes::config::CONFIG_IO_ERROR,
            Self::Parse(_) => codes::config::CONFIG_PARSE_ERROR,
        }
    }

    /// Lookup failures stay local to the node that asked
    pub fn requires_halt(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Parse(_))
    }
}

/// Synchronous lookup capability
pub trait QueryPort: Send + Sync {
    fn execute_query(&self, name: &str, parameters: &Value) -> Result<Value, QueryError>;

    fn evaluate_named_expression(&self, name: &str, parameters: &Value)
        -> Result<Value, QueryError>;
}

pub type QueryHandler = Box<dyn Fn(&Value) -> Result<Value, QueryError> + Send + Sync>;

enum Answer {
    Fixed(Value),
    Computed(QueryHandler),
}

impl Answer {
    fn answer(&self, parameters: &Value) -> Result<Value, QueryError> {
        match self {
            Self::Fixed(value) => Ok(value.clone()),
            Self::Computed(handler) => handler(parameters),
        }
    }
}

/// Query port answering from memory
///
/// Fixture files have the shape
/// `{"queries": {name: value}, "namedExpressions": {name: value}}`.
#[derive(Default)]
pub struct InMemoryQueryPort {
    queries: BTreeMap<String, Answer>,
    named_expressions: BTreeMap<String, Answer>,
}

impl std::fmt::Debug for InMemoryQueryPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryQueryPort")
            .field("queries", &self.queries.keys().collect::<Vec<_>>())
            .field(
                "named_expressions",
                &self.named_expressions.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl InMemoryQueryPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, name: &str, value: Value) -> Self {
        self.queries.insert(name.to_string(), Answer::Fixed(value));
        self
    }

    pub fn with_query_handler(
        mut self,
        name: &str,
        handler: impl Fn(&Value) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        self.queries
            .insert(name.to_string(), Answer::Computed(Box::new(handler)));
        self
    }

    pub fn with_named_expression(mut self, name: &str, value: Value) -> Self {
        self.named_expressions
            .insert(name.to_string(), Answer::Fixed(value));
        self
    }

    pub fn from_json(fixtures: &Value) -> Result<Self, QueryError> {
        let section = |key: &str| -> BTreeMap<String, Answer> {
            fixtures
                .get(key)
                .and_then(Value::as_object)
                .map(Map::iter)
                .into_iter()
                .flatten()
                .map(|(name, value)| (name.clone(), Answer::Fixed(value.clone())))
                .collect()
        };
        if !fixtures.is_object() {
            return Err(QueryError::failed("fixtures", "expected a JSON object"));
        }
        Ok(Self {
            queries: section("queries"),
            named_expressions: section("namedExpressions"),
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, QueryError> {
        let content = std::fs::read_to_string(path).map_err(|source| QueryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fixtures: Value = serde_json::from_str(&content)?;
        Self::from_json(&fixtures)
    }
}

impl QueryPort for InMemoryQueryPort {
    fn execute_query(&self, name: &str, parameters: &Value) -> Result<Value, QueryError> {
        self.queries
            .get(name)
            .ok_or_else(|| QueryError::unknown_query(name))?
            .answer(parameters)
    }

    fn evaluate_named_expression(
        &self,
        name: &str,
        parameters: &Value,
    ) -> Result<Value, QueryError> {
        self.named_expressions
            .get(name)
            .ok_or_else(|| QueryError::unknown_query(name))?
            .answer(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_fixed_and_computed_answers() {
        let port = InMemoryQueryPort::new()
            .with_query("statuses", json!(["open", "closed"]))
            .with_query_handler("echo", |params| Ok(params.clone()))
            .with_named_expression("vat", json!(0.21));

        assert_eq!(
            port.execute_query("statuses", &Value::Null).unwrap(),
            json!(["open", "closed"])
        );
        assert_eq!(
            port.execute_query("echo", &json!({"x": 1})).unwrap(),
            json!({"x": 1})
        );
        assert_eq!(
            port.evaluate_named_expression("vat", &Value::Null).unwrap(),
            json!(0.21)
        );
        assert_matches!(
            port.execute_query("missing", &Value::Null),
            Err(QueryError::UnknownQuery { .. })
        );
    }

    #[test]
    fn test_load_fixtures_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"queries": {{"countries": ["BE", "NL"]}}, "namedExpressions": {{"limit": 3}}}}"#
        )
        .unwrap();

        let port = InMemoryQueryPort::load_from_file(file.path()).unwrap();
        assert_eq!(
            port.execute_query("countries", &Value::Null).unwrap(),
            json!(["BE", "NL"])
        );
        assert_eq!(
            port.evaluate_named_expression("limit", &Value::Null).unwrap(),
            json!(3)
        );
    }

    #[test]
    fn test_load_errors() {
        let missing = InMemoryQueryPort::load_from_file(Path::new("/nonexistent/queries.json"));
        assert_matches!(missing, Err(QueryError::Io { .. }));
        assert!(missing.unwrap_err().requires_halt());

        assert_matches!(
            InMemoryQueryPort::from_json(&json!([1, 2])),
            Err(QueryError::Failed { .. })
        );
    }
}
