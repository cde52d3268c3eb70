//! Engine codes and their classification
//!
//! Every error, warning and milestone the engine logs carries a [`Code`].
//! `E0xx` covers configuration, `E1xx` expression evaluation, `E2xx` target
//! addressing, `E3xx` graph construction and `E4xx` generations. `I0xx` codes
//! mark completed milestones. Codes missing from the registry classify as
//! recoverable with medium severity.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Registered metadata, `None` for ad-hoc codes such as `W000`
    pub fn metadata(&self) -> Option<&'static CodeMetadata> {
        get_code_metadata(self.0)
    }

    pub fn category(&self) -> &'static str {
        self.metadata().map_or("Unknown", |m| m.category)
    }

    pub fn severity(&self) -> Severity {
        self.metadata().map_or(Severity::Medium, |m| m.severity)
    }

    pub fn is_recoverable(&self) -> bool {
        self.metadata().map_or(true, |m| m.recoverable)
    }

    /// Unrecoverable codes stop the current build or generation
    pub fn requires_halt(&self) -> bool {
        !self.is_recoverable()
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CodeMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// Preferences and configuration files
pub mod config {
    use super::Code;

    pub const INVALID_PREFERENCES: Code = Code::new("E010");
    pub const CONFIG_IO_ERROR: Code = Code::new("E011");
    pub const CONFIG_PARSE_ERROR: Code = Code::new("E012");
}

/// Per-node expression failures; the node keeps its previous value
pub mod expression {
    use super::Code;

    pub const TYPE_MISMATCH: Code = Code::new("E100");
    pub const MISSING_SYMBOL: Code = Code::new("E101");
    pub const NO_MATCHING_RULE: Code = Code::new("E102");
    pub const INVALID_INVOCATION: Code = Code::new("E103");
    pub const QUERY_FAILED: Code = Code::new("E104");
    pub const DEPTH_EXCEEDED: Code = Code::new("E105");
    pub const INVALID_REFERENCE: Code = Code::new("E106");
    pub const FIELD_TYPE_VIOLATION: Code = Code::new("E107");
}

pub mod targets {
    use super::Code;

    pub const INVALID_TARGET: Code = Code::new("E200");
    pub const UNRESOLVED_PLACEHOLDER: Code = Code::new("E201");
    pub const PATH_TOO_DEEP: Code = Code::new("E202");
    pub const MISSING_ROW: Code = Code::new("E203");
}

pub mod graph {
    use super::Code;

    pub const DUPLICATE_FIELD: Code = Code::new("E300");
    pub const UNBOUND_REPRESENTATION: Code = Code::new("E301");
    pub const CYCLIC_DECLARATION: Code = Code::new("E302");
    pub const LIMIT_EXCEEDED: Code = Code::new("E303");
    pub const GRAPH_CORRUPTED: Code = Code::new("E304");
}

pub mod evaluation {
    use super::Code;

    pub const NON_CONVERGENCE: Code = Code::new("E400");
    pub const WRITE_REJECTED: Code = Code::new("E401");
    pub const NODE_EVALUATION_FAILED: Code = Code::new("E402");
}

/// Milestones logged at info level
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I001");
    pub const GRAPH_BUILD_COMPLETE: Code = Code::new("I010");
    pub const STRUCTURE_SYNC_COMPLETE: Code = Code::new("I011");
    pub const GENERATION_COMMITTED: Code = Code::new("I020");
    pub const CYCLE_ANALYSIS_COMPLETE: Code = Code::new("I030");
}

const fn halts(
    code: &'static str,
    category: &'static str,
    severity: Severity,
    description: &'static str,
    recommended_action: &'static str,
) -> CodeMetadata {
    CodeMetadata {
        code,
        category,
        severity,
        recoverable: false,
        description,
        recommended_action,
    }
}

const fn local(
    code: &'static str,
    category: &'static str,
    severity: Severity,
    description: &'static str,
    recommended_action: &'static str,
) -> CodeMetadata {
    CodeMetadata {
        code,
        category,
        severity,
        recoverable: true,
        description,
        recommended_action,
    }
}

const fn milestone(code: &'static str, category: &'static str, description: &'static str) -> CodeMetadata {
    local(code, category, Severity::Low, description, "None")
}

use Severity::{Critical, High, Medium};

#[rustfmt::skip]
const REGISTERED_CODES: &[CodeMetadata] = &[
    halts("ERR001", "System", Critical, "Internal engine error", "Report the failing field set and data snapshot"),
    halts("ERR002", "System", Critical, "Logging or engine initialization failed", "Check preferences and environment variables"),
    halts("E010", "Configuration", High, "Runtime preferences violate compile-time limits", "Keep preference values inside the documented limits"),
    halts("E011", "Configuration", High, "Configuration file could not be read", "Verify the configuration path and permissions"),
    halts("E012", "Configuration", High, "Configuration file could not be parsed", "Fix the TOML syntax of the configuration file"),
    local("E100", "Expression", Medium, "Expression operand has an unexpected type", "Check the referenced values and operand types"),
    local("E101", "Expression", Medium, "Symbol is not bound in the current scope", "Symbols are only bound inside lambda callbacks"),
    local("E102", "Expression", Medium, "No rule matched and no else branch was declared", "Add an else branch or a catch-all rule"),
    local("E103", "Expression", Medium, "Function invocation is malformed", "Check the builtin name and its named parameters"),
    local("E104", "Expression", Medium, "Query port lookup failed", "Check the query port and the query name"),
    local("E105", "Expression", High, "Expression nesting exceeds the evaluation depth limit", "Flatten the expression"),
    local("E106", "Expression", Medium, "Expression references an invalid target", "Check the target path of the operator"),
    local("E107", "Expression", Medium, "Computed value does not satisfy the declared field type", "Align the automatic value with the field type"),
    halts("E200", "Target", High, "Path cannot be parsed into a target", "Paths start with data, fields or representation"),
    halts("E201", "Target", High, "Row placeholder could not be resolved", "Concrete paths must not contain placeholders"),
    halts("E202", "Target", High, "Path depth exceeds limit", "Reduce field nesting depth"),
    local("E203", "Target", Medium, "Path addresses a list row that does not exist", "Rows are only created by data changes"),
    halts("E300", "Graph", High, "Field declared more than once", "Field names must be unique per field set"),
    halts("E301", "Graph", High, "View item is bound to an undeclared field", "Bind view items to declared field paths"),
    halts("E302", "Graph", High, "Field definitions declare a dependency cycle", "Break the cycle between the listed targets"),
    halts("E303", "Graph", High, "Graph size limit exceeded", "Reduce the number of fields or list rows"),
    halts("E304", "Graph", Critical, "Dependency graph is internally inconsistent", "Rebuild the graph from field definitions"),
    halts("E400", "Evaluation", Critical, "Evaluation did not converge within the iteration bound", "Look for oscillating or cyclic declarations"),
    local("E401", "Evaluation", Medium, "Write was rejected and not applied", "Only user-editable data fields accept edits"),
    local("E402", "Evaluation", Medium, "Node evaluation failed, previous value retained", "Inspect the node expression errors"),
    milestone("I001", "System", "Logging system initialized"),
    milestone("I010", "Graph", "Dependency graph built"),
    milestone("I011", "Graph", "List rows synchronized with data"),
    milestone("I020", "Evaluation", "Generation committed"),
    milestone("I030", "Graph", "Cycle analysis completed"),
];

static CODE_REGISTRY: OnceLock<HashMap<&'static str, CodeMetadata>> = OnceLock::new();

/// Look up registered metadata by code string
pub fn get_code_metadata(code: &str) -> Option<&'static CodeMetadata> {
    CODE_REGISTRY
        .get_or_init(|| REGISTERED_CODES.iter().map(|m| (m.code, *m)).collect())
        .get(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_registered_code_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for metadata in REGISTERED_CODES {
            assert!(seen.insert(metadata.code), "{} registered twice", metadata.code);
        }
    }

    #[test]
    fn test_non_convergence_is_fatal() {
        let code = evaluation::NON_CONVERGENCE;
        assert!(code.requires_halt());
        assert!(!code.is_recoverable());
        assert_eq!(code.severity(), Severity::Critical);
    }

    #[test]
    fn test_expression_errors_are_local() {
        for code in [
            expression::TYPE_MISMATCH,
            expression::MISSING_SYMBOL,
            expression::NO_MATCHING_RULE,
            expression::QUERY_FAILED,
        ] {
            assert!(code.is_recoverable(), "{} should be recoverable", code);
            assert!(!code.requires_halt());
            assert_eq!(code.category(), "Expression");
        }
    }

    #[test]
    fn test_unregistered_code_fallbacks() {
        let code = Code::new("X999");
        assert!(code.metadata().is_none());
        assert_eq!(code.category(), "Unknown");
        assert!(code.is_recoverable());
    }
}
