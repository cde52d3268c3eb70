//! Flattening field and representation declarations into graph nodes

use super::analysis::{definition_edges, find_cycles};
use super::{DependencyGraph, DirtyReason, GraphBuildError, Node, NodeKind};
use crate::model::{Document, Field, FieldDefinition, FieldType, Representation, ValueShape, ViewItem};
use crate::target::{resolve_self_path, Target, TargetType, ROW_PLACEHOLDER};
use std::collections::BTreeSet;
use ur_expression::config::compile_time::graph::MAX_GRAPH_NODES;
use ur_expression::expression::{extract_references, Reference};
use ur_expression::logging::codes;
use ur_expression::{log_debug, log_success, log_warning};
use ur_expression::{EnginePreferences, Expression};

/// Build the dependency graph for a field set and expand it against the
/// current data
///
/// Every computed node starts dirty, so the first generation evaluates the
/// whole graph.
pub fn build(
    fields: &[Field],
    representations: &[Representation],
    document: &Document,
    preferences: &EnginePreferences,
) -> Result<DependencyGraph, GraphBuildError> {
    let mut builder = Builder {
        graph: DependencyGraph::new(),
    };

    let mut names = BTreeSet::new();
    for field in fields {
        if !names.insert(field.name.as_str()) {
            return Err(GraphBuildError::duplicate_field(&field.name));
        }
        let target = Target::root(TargetType::Data).child(&field.name)?;
        builder.declare_field(&field.name, target, &field.definition, None)?;
    }

    for representation in representations {
        for item in &representation.items {
            builder.declare_view_item(representation, item)?;
        }
    }

    let mut graph = builder.graph;
    if preferences.enable_cycle_detection {
        let cycles = find_cycles(&definition_edges(&graph));
        log_success!(
            codes::success::CYCLE_ANALYSIS_COMPLETE,
            "Cycle analysis completed",
            "cycles" => cycles.len()
        );
        for cycle in &cycles {
            log_warning!("Field definitions contain a dependency cycle", "cycle" => cycle.join(" -> "));
        }
        if preferences.reject_cycles && !cycles.is_empty() {
            return Err(GraphBuildError::CyclicDeclaration { cycles });
        }
        graph.set_cycles(cycles);
    }

    graph.mark_all_dirty(DirtyReason::Initial);
    graph.rebuild_index();
    graph.sync_structure(document)?;

    let stats = graph.stats();
    log_success!(
        codes::success::GRAPH_BUILD_COMPLETE,
        "Dependency graph built",
        "nodes" => stats.total_nodes,
        "templates" => stats.templates,
        "query_nodes" => stats.query_nodes,
        "edges" => stats.total_edges
    );
    Ok(graph)
}

struct Builder {
    graph: DependencyGraph,
}

impl Builder {
    fn declare_field(
        &mut self,
        entity: &str,
        data: Target,
        definition: &FieldDefinition,
        owner: Option<Target>,
    ) -> Result<(), GraphBuildError> {
        let mut value = Node::new(data.clone(), entity, NodeKind::Value, data.clone());
        value.shape = ValueShape::from(&definition.field_type);
        value.policy = definition.merge_policies;
        value.owner = owner;
        value.expression = definition.automatic_value.clone();
        if let Some(expression) = &value.expression {
            value.expression_deps = dependencies(expression, &value.container)?;
        }

        self.declare_attribute(NodeKind::Readable, entity, &data, &definition.readable)?;
        self.declare_attribute(NodeKind::Writable, entity, &data, &definition.writable)?;

        match &definition.field_type {
            FieldType::Enum { options } => {
                let options_target = self.declare_attribute(NodeKind::Options, entity, &data, options)?;
                // Enum values are validated against their resolved options
                if value.expression.is_some() {
                    value.expression_deps.push(options_target);
                }
            }
            FieldType::Object { members } => {
                for (name, member) in members {
                    let child = data.child(name)?;
                    value.sub_nodes_definitions.push(child.clone());
                    self.declare_field(entity, child, member, Some(data.clone()))?;
                }
            }
            FieldType::List { item, row_id } => {
                let row = data.child(ROW_PLACEHOLDER)?;
                self.graph.rows_mut().insert(data.clone(), row_id);
                value.is_list = true;
                value.child_deps.push(data.clone());
                value.sub_nodes_definitions.push(row.clone());
                self.declare_field(entity, row, item, None)?;
            }
            _ => {}
        }

        self.insert(value)
    }

    /// Declare a `fields.<path>.<attribute>` node and return its target
    fn declare_attribute(
        &mut self,
        kind: NodeKind,
        entity: &str,
        data: &Target,
        expression: &Expression,
    ) -> Result<Target, GraphBuildError> {
        let target = attribute_target(data.with_tree(TargetType::Fields), kind)?;
        let mut node = Node::new(target.clone(), entity, kind, data.clone());
        node.expression_deps = dependencies(expression, &node.container)?;
        node.expression = Some(expression.clone());
        self.insert(node)?;
        Ok(target)
    }

    fn declare_view_item(
        &mut self,
        representation: &Representation,
        item: &ViewItem,
    ) -> Result<(), GraphBuildError> {
        let segments: Vec<String> = item.path.split('.').map(str::to_string).collect();
        let binding = Target::new(TargetType::Data, segments)?;
        let entity = match self.graph.node(&binding) {
            Some(node) if node.kind == NodeKind::Value => node.entity.clone(),
            _ => {
                return Err(GraphBuildError::unbound_representation(
                    &representation.name,
                    &item.path,
                ))
            }
        };

        let base = Target::root(TargetType::Representation)
            .child(&representation.name)?
            .join(binding.segments())?;
        let attributes = [
            (NodeKind::Hide, &item.hide),
            (NodeKind::Required, &item.required),
            (NodeKind::Override, &item.override_value),
        ];
        for (kind, expression) in attributes {
            let Some(expression) = expression else {
                continue;
            };
            let target = attribute_target(base.clone(), kind)?;
            let mut node = Node::new(target, &entity, kind, binding.clone());
            node.expression_deps = dependencies(expression, &node.container)?;
            node.expression = Some(expression.clone());
            self.insert(node)?;
        }

        for child in &item.children {
            self.declare_view_item(representation, child)?;
        }
        Ok(())
    }

    fn insert(&mut self, node: Node) -> Result<(), GraphBuildError> {
        if self.graph.len() >= MAX_GRAPH_NODES {
            return Err(GraphBuildError::limit_exceeded("graph nodes", MAX_GRAPH_NODES));
        }
        log_debug!("Declared node", "target" => node.target, "kind" => format!("{:?}", node.kind));
        let target = node.target.clone();
        match self.graph.insert(node) {
            Some(_) => Err(GraphBuildError::corrupted(&format!(
                "target '{}' declared twice",
                target
            ))),
            None => Ok(()),
        }
    }
}

fn attribute_target(base: Target, kind: NodeKind) -> Result<Target, GraphBuildError> {
    match kind.attribute() {
        Some(attribute) => Ok(base.child(attribute)?),
        None => Ok(base),
    }
}

/// Targets an expression reads, resolved against its node's container
///
/// Definition nodes keep placeholders here; materialized nodes substitute
/// their row keys into these patterns.
pub fn dependencies(
    expression: &Expression,
    container: &Target,
) -> Result<Vec<Target>, GraphBuildError> {
    let mut deps = Vec::new();
    for reference in extract_references(expression) {
        let target = match reference {
            Reference::SelfPath(paths) => resolve_self_path(container, &[], &paths)?,
            Reference::Target(path) => Target::parse(&path)?,
        };
        if !deps.contains(&target) {
            deps.push(target);
        }
    }
    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MergePolicies, PresentationKind};
    use assert_matches::assert_matches;
    use serde_json::json;
    use ur_expression::expression::Builtin;

    fn t(path: &str) -> Target {
        Target::parse(path).unwrap()
    }

    fn prefs() -> EnginePreferences {
        EnginePreferences {
            enable_cycle_detection: true,
            reject_cycles: false,
            ..EnginePreferences::default()
        }
    }

    fn label_field() -> Field {
        Field::new(
            "label",
            FieldDefinition::string().with_automatic_value(Expression::call(
                Builtin::Concat,
                vec![(
                    "values",
                    Expression::list(vec![
                        Expression::self_path("a"),
                        Expression::string("-"),
                        Expression::self_path("b"),
                    ]),
                )],
            )),
        )
    }

    #[test]
    fn test_scalar_field_nodes() {
        let graph = build(&[label_field()], &[], &Document::default(), &prefs()).unwrap();

        let label = graph.node(&t("data.label")).unwrap();
        assert_eq!(label.expression_deps, vec![t("data.a"), t("data.b")]);
        assert!(label.is_dirty());
        assert_eq!(label.dirty_reason, Some(DirtyReason::Initial));

        assert!(graph.node(&t("fields.label.readable")).is_some());
        assert!(graph.node(&t("fields.label.writable")).is_some());
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_object_members_and_owner() {
        let field = Field::new(
            "address",
            FieldDefinition::object(vec![
                ("city", FieldDefinition::string().with_policies(MergePolicies::parent())),
                ("zip", FieldDefinition::string()),
            ])
            .with_automatic_value(Expression::object(vec![("city", Expression::string("Ghent"))])),
        );
        let graph = build(&[field], &[], &Document::default(), &prefs()).unwrap();

        let address = graph.node(&t("data.address")).unwrap();
        assert_eq!(
            address.sub_nodes_definitions,
            vec![t("data.address.city"), t("data.address.zip")]
        );
        let city = graph.node(&t("data.address.city")).unwrap();
        assert_eq!(city.owner, Some(t("data.address")));
        assert_eq!(city.container, t("data.address"));
        assert!(!city.is_evaluable());
    }

    #[test]
    fn test_list_templates_and_rows() {
        let item = FieldDefinition::object(vec![(
            "total",
            FieldDefinition::number().with_automatic_value(Expression::self_segments(&[".."])),
        )]);
        let field = Field::new("lines", FieldDefinition::list(item, "lineId"));
        let document = Document::new(json!({"lines": [{"lineId": "a"}, {"lineId": "b"}]}));
        let graph = build(&[field], &[], &document, &prefs()).unwrap();

        let template = graph.node(&t("data.lines.{uniqueId}.total")).unwrap();
        assert!(template.is_template());
        assert_eq!(template.expression_deps, vec![t("data.lines")]);

        let row = graph.node(&t("data.lines.b.total")).unwrap();
        assert_eq!(row.template, Some(t("data.lines.{uniqueId}.total")));
        assert_eq!(graph.rows().row_id_for(&t("data.lines")), Some("lineId"));

        let list = graph.node(&t("data.lines")).unwrap();
        assert!(list.is_list);
        assert_eq!(list.child_deps, vec![t("data.lines")]);
    }

    #[test]
    fn test_representation_nodes() {
        let representation = Representation::new(
            "main",
            vec![ViewItem::new("label", PresentationKind::String)
                .with_hide(Expression::equals(Expression::self_path("a"), Expression::string("")))],
        );
        let graph =
            build(&[label_field()], &[representation], &Document::default(), &prefs()).unwrap();

        let hide = graph.node(&t("representation.main.label.hide")).unwrap();
        assert_eq!(hide.kind, NodeKind::Hide);
        assert_eq!(hide.binding, t("data.label"));
        assert_eq!(hide.expression_deps, vec![t("data.a")]);
        assert_eq!(hide.entity, "label");
    }

    #[test]
    fn test_unbound_representation() {
        let representation =
            Representation::new("main", vec![ViewItem::new("missing", PresentationKind::String)]);
        let result = build(&[label_field()], &[representation], &Document::default(), &prefs());
        assert_matches!(result, Err(GraphBuildError::UnboundRepresentation { ref path, .. }) if path == "missing");
    }

    #[test]
    fn test_duplicate_field() {
        let result = build(
            &[label_field(), label_field()],
            &[],
            &Document::default(),
            &prefs(),
        );
        assert_matches!(result, Err(GraphBuildError::DuplicateField { ref name }) if name == "label");
    }

    #[test]
    fn test_invalid_target_reference_is_fatal() {
        let field = Field::new(
            "x",
            FieldDefinition::string().with_automatic_value(Expression::target("elsewhere.y")),
        );
        let result = build(&[field], &[], &Document::default(), &prefs());
        assert_matches!(result, Err(GraphBuildError::InvalidTarget(_)));
    }

    #[test]
    fn test_cycles_warn_or_reject() {
        let fields = vec![
            Field::new(
                "a",
                FieldDefinition::number().with_automatic_value(Expression::self_path("b")),
            ),
            Field::new(
                "b",
                FieldDefinition::number().with_automatic_value(Expression::self_path("a")),
            ),
        ];

        let graph = build(&fields, &[], &Document::default(), &prefs()).unwrap();
        assert_eq!(graph.cycles(), &[vec!["data.a".to_string(), "data.b".to_string()]]);

        let strict = EnginePreferences {
            enable_cycle_detection: true,
            reject_cycles: true,
            ..prefs()
        };
        let result = build(&fields, &[], &Document::default(), &strict);
        assert_matches!(result, Err(GraphBuildError::CyclicDeclaration { ref cycles }) if cycles.len() == 1);
    }
}
