//! Structural analysis: build-time cycle detection, evaluation batching and
//! graph statistics

use super::{DependencyGraph, Node};
use crate::model::VerticalPolicy;
use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use ur_expression::config::compile_time::graph::{MAX_CYCLE_PATH_LENGTH, MAX_REPORTED_CYCLES};
use ur_expression::expression::uses_query_port;

/// Dependency edges between definition nodes (templates and plain nodes)
///
/// `A -> B` when one of A's expression dependencies overlaps B's target,
/// comparing placeholders as wildcards.
pub fn definition_edges(graph: &DependencyGraph) -> BTreeMap<Target, Vec<Target>> {
    let definitions: Vec<&Node> = graph
        .nodes()
        .filter(|n| !n.is_materialized() && n.expression.is_some())
        .collect();

    definitions
        .iter()
        .map(|from| {
            let to = definitions
                .iter()
                .filter(|candidate| {
                    from.expression_deps
                        .iter()
                        .any(|dep| dep.overlaps(&candidate.target))
                })
                .map(|candidate| candidate.target.clone())
                .collect();
            (from.target.clone(), to)
        })
        .collect()
}

/// Strongly connected components that form cycles, via Tarjan's algorithm
///
/// A single node is reported only when it depends on itself. Reported
/// cycles and their lengths are capped.
pub fn find_cycles(edges: &BTreeMap<Target, Vec<Target>>) -> Vec<Vec<String>> {
    let mut tarjan = Tarjan {
        edges,
        index: 0,
        indices: BTreeMap::new(),
        lowlinks: BTreeMap::new(),
        stack: Vec::new(),
        on_stack: BTreeSet::new(),
        components: Vec::new(),
    };
    for target in edges.keys() {
        if !tarjan.indices.contains_key(target) {
            tarjan.connect(target);
        }
    }

    tarjan
        .components
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => edges.get(single).map_or(false, |to| to.contains(single)),
            _ => true,
        })
        .take(MAX_REPORTED_CYCLES)
        .map(|mut component| {
            component.sort();
            component
                .iter()
                .take(MAX_CYCLE_PATH_LENGTH)
                .map(Target::to_string)
                .collect()
        })
        .collect()
}

struct Tarjan<'g> {
    edges: &'g BTreeMap<Target, Vec<Target>>,
    index: usize,
    indices: BTreeMap<&'g Target, usize>,
    lowlinks: BTreeMap<&'g Target, usize>,
    stack: Vec<&'g Target>,
    on_stack: BTreeSet<&'g Target>,
    components: Vec<Vec<Target>>,
}

impl<'g> Tarjan<'g> {
    fn connect(&mut self, node: &'g Target) {
        self.indices.insert(node, self.index);
        self.lowlinks.insert(node, self.index);
        self.index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        let edges = self.edges;
        let successors = edges.get(node).map(Vec::as_slice).unwrap_or_default();
        for next in successors {
            if !self.indices.contains_key(next) {
                self.connect(next);
                let low = self.lowlinks[next].min(self.lowlinks[node]);
                self.lowlinks.insert(node, low);
            } else if self.on_stack.contains(next) {
                let low = self.indices[next].min(self.lowlinks[node]);
                self.lowlinks.insert(node, low);
            }
        }

        if self.lowlinks[node] == self.indices[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(member);
                component.push(member.clone());
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

/// Dirty nodes to evaluate this iteration
///
/// This is one layer of Kahn's algorithm over the dirty subgraph: nodes with
/// no dirty upstream node go first, the rest wait for a later iteration.
/// A `PARENT` member also waits for its dirty container. When every dirty
/// node waits (a cycle), all of them are evaluated in target order.
pub fn evaluation_batch(graph: &DependencyGraph, dirty: &BTreeSet<Target>) -> Vec<Target> {
    let waits_on_upstream = |node: &Node| {
        node.expression_deps.iter().any(|dep| {
            graph
                .nodes_overlapping(dep)
                .into_iter()
                .any(|upstream| upstream != &node.target && dirty.contains(upstream))
        })
    };

    let ready: BTreeSet<&Target> = dirty
        .iter()
        .filter(|target| graph.node(target).map_or(false, |n| !waits_on_upstream(n)))
        .collect();

    let batch: Vec<Target> = ready
        .iter()
        .filter(|target| {
            let Some(node) = graph.node(target) else {
                return false;
            };
            match (&node.owner, node.policy.vertical) {
                (Some(owner), VerticalPolicy::Parent) => {
                    !dirty.contains(owner) || ready.contains(owner)
                }
                _ => true,
            }
        })
        .map(|target| (*target).clone())
        .collect();

    if batch.is_empty() {
        dirty.iter().cloned().collect()
    } else {
        batch
    }
}

/// Graph statistics for monitoring and debugging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub templates: usize,
    pub materialized: usize,
    pub evaluable: usize,
    /// Evaluable nodes whose expression may call the query port
    pub query_nodes: usize,
    pub total_edges: usize,
    pub lists: usize,
    pub cycles: usize,
    pub max_dependencies: usize,
}

impl GraphStats {
    pub fn average_dependencies(&self) -> f64 {
        if self.total_nodes == 0 {
            0.0
        } else {
            self.total_edges as f64 / self.total_nodes as f64
        }
    }
}

pub(super) fn stats(graph: &DependencyGraph) -> GraphStats {
    let mut stats = GraphStats {
        cycles: graph.cycles().len(),
        ..GraphStats::default()
    };
    for node in graph.nodes() {
        let deps = node.dependencies().count();
        stats.total_nodes += 1;
        stats.total_edges += deps;
        stats.max_dependencies = stats.max_dependencies.max(deps);
        if node.is_template() {
            stats.templates += 1;
        }
        if node.is_materialized() {
            stats.materialized += 1;
        }
        if node.is_evaluable() {
            stats.evaluable += 1;
            if node.expression.as_ref().map_or(false, uses_query_port) {
                stats.query_nodes += 1;
            }
        }
        if node.is_list && !node.is_template() {
            stats.lists += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, NodeStatus};
    use crate::model::MergePolicies;
    use ur_expression::expression::Builtin;
    use ur_expression::Expression;

    fn t(path: &str) -> Target {
        Target::parse(path).unwrap()
    }

    fn computed(path: &str, deps: &[&str]) -> Node {
        let mut node = Node::new(t(path), "f", NodeKind::Value, t(path));
        node.expression = Some(Expression::string("x"));
        node.expression_deps = deps.iter().map(|d| t(d)).collect();
        node
    }

    fn graph(nodes: Vec<Node>) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for node in nodes {
            graph.insert(node);
        }
        graph.rebuild_index();
        graph
    }

    #[test]
    fn test_mutual_references_form_a_cycle() {
        let graph = graph(vec![
            computed("data.a", &["data.b"]),
            computed("data.b", &["data.a"]),
            computed("data.c", &["data.a"]),
        ]);
        let cycles = find_cycles(&definition_edges(&graph));
        assert_eq!(cycles, vec![vec!["data.a".to_string(), "data.b".to_string()]]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let graph = graph(vec![computed("data.a", &["data.a"]), computed("data.b", &[])]);
        let cycles = find_cycles(&definition_edges(&graph));
        assert_eq!(cycles, vec![vec!["data.a".to_string()]]);
    }

    #[test]
    fn test_template_edges_use_placeholders() {
        let graph = graph(vec![
            computed("data.lines.{uniqueId}.amount", &["data.lines.{uniqueId}.qty"]),
            computed("data.lines.{uniqueId}.qty", &["data.lines.{uniqueId}.amount"]),
        ]);
        assert_eq!(find_cycles(&definition_edges(&graph)).len(), 1);
    }

    #[test]
    fn test_batch_defers_downstream_nodes() {
        let mut graph = graph(vec![
            computed("data.a", &[]),
            computed("data.b", &["data.a"]),
            computed("data.c", &["data.b"]),
        ]);
        graph.mark_all_dirty(crate::graph::DirtyReason::Initial);
        let dirty = graph.dirty_targets();
        assert_eq!(evaluation_batch(&graph, &dirty), vec![t("data.a")]);
    }

    #[test]
    fn test_batch_falls_back_to_all_on_cycle() {
        let mut graph = graph(vec![
            computed("data.a", &["data.b"]),
            computed("data.b", &["data.a"]),
        ]);
        graph.mark_all_dirty(crate::graph::DirtyReason::Initial);
        let dirty = graph.dirty_targets();
        assert_eq!(evaluation_batch(&graph, &dirty).len(), 2);
    }

    #[test]
    fn test_parent_member_waits_for_container() {
        let container = computed("data.address", &["data.source"]);
        let mut member = computed("data.address.city", &[]);
        member.owner = Some(t("data.address"));
        member.policy = MergePolicies::parent();
        let mut graph = graph(vec![computed("data.source", &[]), container, member]);
        graph.mark_all_dirty(crate::graph::DirtyReason::Initial);

        let dirty = graph.dirty_targets();
        assert_eq!(evaluation_batch(&graph, &dirty), vec![t("data.source")]);
    }

    #[test]
    fn test_stats() {
        let mut list = computed("data.lines", &[]);
        list.is_list = true;
        list.child_deps = vec![t("data.lines")];
        list.expression = Some(Expression::call(
            Builtin::ExecuteQuery,
            vec![("query", Expression::string("lines"))],
        ));
        let graph = graph(vec![list, computed("data.lines.{uniqueId}.qty", &[])]);
        let stats = graph.stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.templates, 1);
        assert_eq!(stats.lists, 1);
        assert_eq!(stats.evaluable, 1);
        assert_eq!(stats.query_nodes, 1);
        assert!(graph.nodes().all(|n| n.status == NodeStatus::Clean));
    }
}
