//! The [`Scope`] a node's expression evaluates against

use super::context::EvaluationContext;
use crate::graph::Node;
use crate::model::Document;
use crate::target::{resolve_self_path, RowKeys, Target};
use serde_json::Value;
use ur_expression::{ExpressionError, Scope};

/// Resolves self paths from the node's container and targets from the
/// iteration's input snapshot
pub struct NodeScope<'a> {
    node: &'a Node,
    document: &'a Document,
    rows: &'a RowKeys,
    context: &'a EvaluationContext<'a>,
}

impl<'a> NodeScope<'a> {
    pub fn new(
        node: &'a Node,
        document: &'a Document,
        rows: &'a RowKeys,
        context: &'a EvaluationContext<'a>,
    ) -> Self {
        Self {
            node,
            document,
            rows,
            context,
        }
    }

    fn read(&self, target: Target) -> Result<Value, ExpressionError> {
        if target.is_pattern() {
            return Err(ExpressionError::invalid_reference(
                &target.to_string(),
                "no row key for placeholder",
            ));
        }
        Ok(self.document.get_or_null(&target, self.rows))
    }
}

impl Scope for NodeScope<'_> {
    fn resolve_self(&self, paths: &[String]) -> Result<Value, ExpressionError> {
        let target = resolve_self_path(&self.node.container, &self.node.row_keys, paths)
            .map_err(|e| ExpressionError::invalid_reference(&paths.join("."), &e.to_string()))?;
        self.read(target)
    }

    fn resolve_target(&self, target: &str) -> Result<Value, ExpressionError> {
        let parsed = Target::parse(target)
            .map_err(|e| ExpressionError::invalid_reference(target, &e.to_string()))?;
        self.read(parsed.substitute(&self.node.row_keys))
    }

    fn next_unique_id(&self) -> String {
        self.context.id_generator.next_id()
    }

    fn execute_query(&self, name: &str, parameters: &Value) -> Result<Value, ExpressionError> {
        let port = self
            .context
            .query_port
            .ok_or_else(|| ExpressionError::query_failed(name, "no query port configured"))?;
        port.execute_query(name, parameters)
            .map_err(|e| ExpressionError::query_failed(name, &e.to_string()))
    }

    fn evaluate_named_expression(
        &self,
        name: &str,
        parameters: &Value,
    ) -> Result<Value, ExpressionError> {
        let port = self
            .context
            .query_port
            .ok_or_else(|| ExpressionError::query_failed(name, "no query port configured"))?;
        port.evaluate_named_expression(name, parameters)
            .map_err(|e| ExpressionError::query_failed(name, &e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::query::InMemoryQueryPort;
    use assert_matches::assert_matches;
    use serde_json::json;
    use ur_expression::expression::SequentialIdGenerator;
    use ur_expression::EnginePreferences;

    fn t(path: &str) -> Target {
        Target::parse(path).unwrap()
    }

    fn row_node() -> Node {
        let mut node = Node::new(
            t("data.lines.r2.amount"),
            "lines",
            NodeKind::Value,
            t("data.lines.r2.amount"),
        );
        node.container = t("data.lines.{uniqueId}");
        node.row_keys = vec!["r2".to_string()];
        node
    }

    fn rows() -> RowKeys {
        let mut rows = RowKeys::new();
        rows.insert(t("data.lines"), "id");
        rows
    }

    fn document() -> Document {
        Document::new(json!({
            "currency": "EUR",
            "lines": [{"id": "r1", "qty": 1}, {"id": "r2", "qty": 4}]
        }))
    }

    #[test]
    fn test_self_paths_resolve_inside_the_row() {
        let preferences = EnginePreferences::default();
        let ids = SequentialIdGenerator::new("id");
        let context = EvaluationContext::new(&preferences, &ids);
        let (node, doc, rows) = (row_node(), document(), rows());
        let scope = NodeScope::new(&node, &doc, &rows, &context);

        assert_eq!(scope.resolve_self(&["qty".to_string()]).unwrap(), json!(4));
        assert_eq!(
            scope
                .resolve_self(&["..".to_string(), "currency".to_string()])
                .unwrap(),
            json!("EUR")
        );
        assert_eq!(
            scope.resolve_self(&["missing".to_string()]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_targets_take_the_row_key() {
        let preferences = EnginePreferences::default();
        let ids = SequentialIdGenerator::new("id");
        let context = EvaluationContext::new(&preferences, &ids);
        let (node, doc, rows) = (row_node(), document(), rows());
        let scope = NodeScope::new(&node, &doc, &rows, &context);

        assert_eq!(
            scope.resolve_target("data.lines.{uniqueId}.qty").unwrap(),
            json!(4)
        );
        assert_eq!(scope.resolve_target("data.lines.r1.qty").unwrap(), json!(1));
        assert_matches!(
            scope.resolve_target("data.orders.{uniqueId}.{uniqueId}"),
            Err(ExpressionError::InvalidReference { .. })
        );
        assert_matches!(
            scope.resolve_target("nowhere.x"),
            Err(ExpressionError::InvalidReference { .. })
        );
    }

    #[test]
    fn test_query_port_is_optional() {
        let preferences = EnginePreferences::default();
        let ids = SequentialIdGenerator::new("id");
        let (node, doc, rows) = (row_node(), document(), rows());

        let bare = EvaluationContext::new(&preferences, &ids);
        let scope = NodeScope::new(&node, &doc, &rows, &bare);
        assert_matches!(
            scope.execute_query("statuses", &Value::Null),
            Err(ExpressionError::QueryFailed { .. })
        );
        assert_eq!(scope.next_unique_id(), "id-1");

        let port = InMemoryQueryPort::new().with_query("statuses", json!(["open"]));
        let wired = EvaluationContext::new(&preferences, &ids).with_query_port(&port);
        let scope = NodeScope::new(&node, &doc, &rows, &wired);
        assert_eq!(
            scope.execute_query("statuses", &Value::Null).unwrap(),
            json!(["open"])
        );
    }
}
