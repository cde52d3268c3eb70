//! Dependency graph nodes
//!
//! One node per addressable target. Nodes under list rows exist twice: once
//! as a definition (template) whose target still carries `{uniqueId}`, and
//! once per current row with the row key substituted.

use crate::model::{MergePolicies, ValueShape};
use crate::target::{Target, TargetType};
use serde::{Deserialize, Serialize};
use ur_expression::config::compile_time::evaluation::MAX_ERRORS_PER_NODE;
use ur_expression::{Expression, ExpressionError};

/// What a node computes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// `data.<path>` from `automaticValue`
    Value,
    /// `fields.<path>.readable`
    Readable,
    /// `fields.<path>.writable`
    Writable,
    /// `fields.<path>.options` of an enum field
    Options,
    /// `representation.<name>.<path>.hide`
    Hide,
    /// `representation.<name>.<path>.required`
    Required,
    /// `representation.<name>.<path>.override`
    Override,
}

impl NodeKind {
    /// Attribute segment appended to the field path, if any
    pub fn attribute(&self) -> Option<&'static str> {
        match self {
            Self::Value => None,
            Self::Readable => Some("readable"),
            Self::Writable => Some("writable"),
            Self::Options => Some("options"),
            Self::Hide => Some("hide"),
            Self::Required => Some("required"),
            Self::Override => Some("override"),
        }
    }

    pub fn tree(&self) -> TargetType {
        match self {
            Self::Value => TargetType::Data,
            Self::Readable | Self::Writable | Self::Options => TargetType::Fields,
            Self::Hide | Self::Required | Self::Override => TargetType::Representation,
        }
    }

    /// Shape a computed attribute must have; value nodes use their field type
    pub fn attribute_shape(&self) -> ValueShape {
        match self {
            Self::Readable | Self::Writable | Self::Hide | Self::Required => ValueShape::Boolean,
            Self::Options => ValueShape::List,
            Self::Value | Self::Override => ValueShape::Any,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    #[default]
    Clean,
    Dirty,
    Error,
}

/// Why a node was last marked dirty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum DirtyReason {
    /// Graph (re)build
    Initial,
    /// A submitted event changed `source`
    ExternalEvent { source: Target },
    /// An engine write to `source` during this generation
    FollowOnEvent { source: Target },
    /// The node was created for a new list row
    RowMaterialized,
    /// A `PARENT` member of this container was dirtied
    MemberDirtied { member: Target },
}

/// An expression error recorded on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeError {
    pub code: String,
    pub message: String,
}

impl From<&ExpressionError> for NodeError {
    fn from(error: &ExpressionError) -> Self {
        Self {
            code: error.error_code().as_str().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub target: Target,
    /// Top-level field name
    pub entity: String,
    pub kind: NodeKind,
    pub expression: Option<Expression>,
    pub expression_deps: Vec<Target>,
    pub child_deps: Vec<Target>,
    pub policy: MergePolicies,
    pub shape: ValueShape,
    /// The `data.<path>` this node describes
    pub binding: Target,
    /// Self paths resolve from here; keeps its placeholders
    pub container: Target,
    /// Concrete keys for the placeholders of `container`, outermost first
    pub row_keys: Vec<String>,
    /// Definition node this node was materialized from
    pub template: Option<Target>,
    /// Value node of the enclosing object field, for vertical policy
    pub owner: Option<Target>,
    pub sub_nodes_definitions: Vec<Target>,
    pub sub_nodes: Vec<Target>,
    pub is_list: bool,
    pub status: NodeStatus,
    pub dirty_reason: Option<DirtyReason>,
    pub expression_errors: Vec<NodeError>,
}

impl Node {
    pub fn new(target: Target, entity: &str, kind: NodeKind, binding: Target) -> Self {
        let container = binding
            .climb()
            .unwrap_or_else(|| Target::root(TargetType::Data));
        Self {
            target,
            entity: entity.to_string(),
            kind,
            expression: None,
            expression_deps: Vec::new(),
            child_deps: Vec::new(),
            policy: MergePolicies::default(),
            shape: kind.attribute_shape(),
            binding,
            container,
            row_keys: Vec::new(),
            template: None,
            owner: None,
            sub_nodes_definitions: Vec::new(),
            sub_nodes: Vec::new(),
            is_list: false,
            status: NodeStatus::Clean,
            dirty_reason: None,
            expression_errors: Vec::new(),
        }
    }

    /// Definition node still carrying placeholders
    pub fn is_template(&self) -> bool {
        self.target.is_pattern()
    }

    pub fn is_materialized(&self) -> bool {
        self.template.is_some()
    }

    /// Whether the node takes part in value recomputation
    pub fn is_evaluable(&self) -> bool {
        self.expression.is_some() && !self.is_template()
    }

    pub fn is_dirty(&self) -> bool {
        self.status == NodeStatus::Dirty
    }

    /// Dirty an evaluable node; the first recorded reason is kept
    pub fn mark_dirty(&mut self, reason: DirtyReason) -> bool {
        if !self.is_evaluable() || self.is_dirty() {
            return false;
        }
        self.status = NodeStatus::Dirty;
        self.dirty_reason = Some(reason);
        true
    }

    pub fn mark_clean(&mut self) {
        self.status = NodeStatus::Clean;
        self.dirty_reason = None;
        self.expression_errors.clear();
    }

    pub fn record_error(&mut self, error: NodeError) {
        if self.expression_errors.len() >= MAX_ERRORS_PER_NODE {
            self.expression_errors.remove(0);
        }
        self.expression_errors.push(error);
        self.status = NodeStatus::Error;
        self.dirty_reason = None;
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &Target> {
        self.expression_deps.iter().chain(&self.child_deps)
    }

    pub fn diagnostic(&self) -> NodeDiagnostic {
        NodeDiagnostic {
            target: self.target.to_string(),
            entity: self.entity.clone(),
            kind: self.kind,
            status: self.status,
            has_expression: self.expression.is_some(),
            template: self.template.as_ref().map(Target::to_string),
            expression_deps: self.expression_deps.iter().map(Target::to_string).collect(),
            child_deps: self.child_deps.iter().map(Target::to_string).collect(),
            sub_nodes: self.sub_nodes.iter().map(Target::to_string).collect(),
            policy: self.policy,
            dirty_reason: self.dirty_reason.clone(),
            expression_errors: self.expression_errors.clone(),
        }
    }
}

/// Serializable per-node view for tooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDiagnostic {
    pub target: String,
    pub entity: String,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub has_expression: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub expression_deps: Vec<String>,
    pub child_deps: Vec<String>,
    pub sub_nodes: Vec<String>,
    pub policy: MergePolicies,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirty_reason: Option<DirtyReason>,
    pub expression_errors: Vec<NodeError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(path: &str) -> Target {
        Target::parse(path).unwrap()
    }

    #[test]
    fn test_container_of_row_member_is_row() {
        let node = Node::new(
            t("data.lines.{uniqueId}.qty"),
            "lines",
            NodeKind::Value,
            t("data.lines.{uniqueId}.qty"),
        );
        assert_eq!(node.container, t("data.lines.{uniqueId}"));
        assert!(node.is_template());
        assert!(!node.is_evaluable());
    }

    #[test]
    fn test_mark_dirty_requires_expression() {
        let mut node = Node::new(t("data.a"), "a", NodeKind::Value, t("data.a"));
        assert!(!node.mark_dirty(DirtyReason::Initial));

        node.expression = Some(Expression::string("x"));
        assert!(node.mark_dirty(DirtyReason::Initial));
        assert!(!node.mark_dirty(DirtyReason::RowMaterialized));
        assert_eq!(node.dirty_reason, Some(DirtyReason::Initial));
    }

    #[test]
    fn test_error_history_is_capped() {
        let mut node = Node::new(t("data.a"), "a", NodeKind::Value, t("data.a"));
        for i in 0..MAX_ERRORS_PER_NODE + 3 {
            node.record_error(NodeError {
                code: "E100".to_string(),
                message: format!("failure {}", i),
            });
        }
        assert_eq!(node.expression_errors.len(), MAX_ERRORS_PER_NODE);
        assert_eq!(node.expression_errors[0].message, "failure 3");
        assert_eq!(node.status, NodeStatus::Error);

        node.mark_clean();
        assert!(node.expression_errors.is_empty());
    }
}
