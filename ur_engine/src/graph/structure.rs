//! Keeping materialized row nodes in step with the data arrays
//!
//! Every template is expanded once per existing row-key tuple. Rows that
//! appeared get fresh dirty nodes; rows that disappeared lose theirs. A
//! list node's `sub_nodes` always lists exactly the rows of its array.

use super::{DependencyGraph, DirtyReason, GraphBuildError, Node};
use crate::model::Document;
use crate::target::{enumerate_rows, Target, ROW_PLACEHOLDER};
use serde_json::Value;
use std::collections::BTreeMap;
use ur_expression::config::compile_time::graph::{MAX_GRAPH_NODES, MAX_LIST_ROWS};

/// Nodes created and removed by one structure sync
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureChange {
    pub materialized: Vec<Target>,
    pub removed: Vec<Target>,
}

impl StructureChange {
    pub fn is_empty(&self) -> bool {
        self.materialized.is_empty() && self.removed.is_empty()
    }
}

impl DependencyGraph {
    /// Re-expand templates against the current data rows
    pub fn sync_structure(
        &mut self,
        document: &Document,
    ) -> Result<StructureChange, GraphBuildError> {
        self.check_list_sizes(document)?;

        let mut wanted: BTreeMap<Target, (Target, Vec<String>)> = BTreeMap::new();
        for template in self.templates() {
            for keys in enumerate_rows(&document.data, &template.binding, self.rows()) {
                wanted.insert(
                    template.target.substitute(&keys),
                    (template.target.clone(), keys),
                );
            }
        }

        let stale: Vec<Target> = self
            .nodes()
            .filter(|n| n.is_materialized() && !wanted.contains_key(&n.target))
            .map(|n| n.target.clone())
            .collect();
        for target in &stale {
            self.remove(target);
        }

        let mut change = StructureChange {
            removed: stale,
            ..StructureChange::default()
        };
        for (target, (template, keys)) in wanted {
            if self.node(&target).is_some() {
                continue;
            }
            let node = self
                .node(&template)
                .map(|t| materialize(t, &keys))
                .ok_or_else(|| GraphBuildError::corrupted("template vanished during sync"))?;
            self.insert(node);
            self.mark(&target, DirtyReason::RowMaterialized);
            change.materialized.push(target);
        }

        if self.len() > MAX_GRAPH_NODES {
            return Err(GraphBuildError::limit_exceeded("graph nodes", MAX_GRAPH_NODES));
        }
        if !change.is_empty() {
            self.refresh_sub_nodes();
            self.rebuild_index();
        }
        Ok(change)
    }

    fn check_list_sizes(&self, document: &Document) -> Result<(), GraphBuildError> {
        for (list, _) in self.rows().lists() {
            for keys in enumerate_rows(&document.data, list, self.rows()) {
                let concrete = list.substitute(&keys);
                if let Some(Value::Array(items)) = document.get(&concrete, self.rows()) {
                    if items.len() > MAX_LIST_ROWS {
                        return Err(GraphBuildError::limit_exceeded(
                            &format!("rows in {}", concrete),
                            MAX_LIST_ROWS,
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Point every concrete list node at its current row nodes
    fn refresh_sub_nodes(&mut self) {
        let lists: Vec<Target> = self
            .nodes()
            .filter(|n| n.is_list && !n.is_template())
            .map(|n| n.target.clone())
            .collect();

        for list in lists {
            let rows: Vec<Target> = self
                .nodes
                .range(list.clone()..)
                .take_while(|(target, _)| target.starts_with(&list))
                .filter(|(target, node)| {
                    target.len() == list.len() + 1
                        && node.template.as_ref().map_or(false, |t| {
                            t.last_segment() == Some(ROW_PLACEHOLDER)
                        })
                })
                .map(|(target, _)| target.clone())
                .collect();
            if let Some(node) = self.node_mut(&list) {
                node.sub_nodes = rows;
            }
        }
    }
}

/// Instantiate a template for one row-key tuple
fn materialize(template: &Node, keys: &[String]) -> Node {
    let substitute = |targets: &[Target]| -> Vec<Target> {
        targets.iter().map(|t| t.substitute(keys)).collect()
    };

    let mut node = template.clone();
    node.target = template.target.substitute(keys);
    node.binding = template.binding.substitute(keys);
    node.row_keys = keys.to_vec();
    node.template = Some(template.target.clone());
    node.owner = template.owner.as_ref().map(|o| o.substitute(keys));
    node.expression_deps = substitute(&template.expression_deps);
    node.child_deps = substitute(&template.child_deps);
    node.sub_nodes = Vec::new();
    node.status = Default::default();
    node.dirty_reason = None;
    node.expression_errors = Vec::new();
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build, NodeKind, NodeStatus};
    use crate::model::{Field, FieldDefinition};
    use serde_json::json;
    use ur_expression::{EnginePreferences, Expression};

    fn t(path: &str) -> Target {
        Target::parse(path).unwrap()
    }

    fn lines_field() -> Field {
        let item = FieldDefinition::object(vec![
            ("id", FieldDefinition::string()),
            (
                "amount",
                FieldDefinition::number().with_automatic_value(Expression::self_path("qty")),
            ),
            ("qty", FieldDefinition::number()),
        ]);
        Field::new("lines", FieldDefinition::list(item, "id"))
    }

    fn doc(rows: Value) -> Document {
        Document::new(json!({ "lines": rows }))
    }

    #[test]
    fn test_rows_follow_the_data_array() {
        let start = doc(json!([{"id": "r1"}, {"id": "r2"}, {"id": "r3"}]));
        let mut graph =
            build(&[lines_field()], &[], &start, &EnginePreferences::default()).unwrap();
        assert_eq!(graph.node(&t("data.lines")).unwrap().sub_nodes.len(), 3);

        let grown = doc(json!([{"id": "r1"}, {"id": "r2"}, {"id": "r3"}, {"id": "r4"}]));
        let change = graph.sync_structure(&grown).unwrap();
        assert!(change.materialized.contains(&t("data.lines.r4.amount")));
        assert!(change.removed.is_empty());

        let list = graph.node(&t("data.lines")).unwrap();
        assert_eq!(list.sub_nodes.len(), 4);

        let new_row = graph.node(&t("data.lines.r4.amount")).unwrap();
        assert_eq!(new_row.status, NodeStatus::Dirty);
        assert_eq!(new_row.dirty_reason, Some(DirtyReason::RowMaterialized));
        assert_eq!(new_row.expression_deps, vec![t("data.lines.r4.qty")]);
        assert_eq!(new_row.row_keys, vec!["r4".to_string()]);
    }

    #[test]
    fn test_removed_rows_drop_their_nodes() {
        let start = doc(json!([{"id": "r1"}, {"id": "r2"}]));
        let mut graph =
            build(&[lines_field()], &[], &start, &EnginePreferences::default()).unwrap();

        let change = graph.sync_structure(&doc(json!([{"id": "r2"}]))).unwrap();
        assert!(change.removed.contains(&t("data.lines.r1.amount")));
        assert!(change.removed.contains(&t("fields.lines.r1.qty.writable")));
        assert!(graph.node(&t("data.lines.r1")).is_none());
        assert_eq!(
            graph.node(&t("data.lines")).unwrap().sub_nodes,
            vec![t("data.lines.r2")]
        );
        assert_eq!(
            graph
                .node(&t("data.lines.r2"))
                .map(|n| n.kind),
            Some(NodeKind::Value)
        );
    }

    #[test]
    fn test_duplicate_row_ids_keep_one_node_per_row() {
        let start = doc(json!([{"id": "r1"}, {"id": "r1"}, {"id": "r3"}]));
        let graph = build(&[lines_field()], &[], &start, &EnginePreferences::default()).unwrap();

        assert_eq!(
            graph.node(&t("data.lines")).unwrap().sub_nodes,
            vec![t("data.lines.1"), t("data.lines.r1"), t("data.lines.r3")]
        );
        assert_eq!(
            graph.node(&t("data.lines.1.amount")).unwrap().expression_deps,
            vec![t("data.lines.1.qty")]
        );
    }

    #[test]
    fn test_unchanged_rows_keep_their_state() {
        let start = doc(json!([{"id": "r1"}]));
        let mut graph =
            build(&[lines_field()], &[], &start, &EnginePreferences::default()).unwrap();
        if let Some(node) = graph.node_mut(&t("data.lines.r1.amount")) {
            node.mark_clean();
        }

        let change = graph.sync_structure(&start).unwrap();
        assert!(change.is_empty());
        assert_eq!(
            graph.node(&t("data.lines.r1.amount")).unwrap().status,
            NodeStatus::Clean
        );
    }
}
