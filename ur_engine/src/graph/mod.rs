//! Dependency graph over field, fields-attribute and representation targets
//!
//! Nodes live in one map keyed by target. List rows are plain inserts and
//! removals in that map (see [`structure`]), never changes to node ownership.

pub mod analysis;
pub mod builder;
pub mod error;
pub mod node;
pub mod structure;

pub use analysis::GraphStats;
pub use builder::build;
pub use error::GraphBuildError;
pub use node::{DirtyReason, Node, NodeDiagnostic, NodeError, NodeKind, NodeStatus};
pub use structure::StructureChange;

use crate::model::VerticalPolicy;
use crate::target::{RowKeys, Target};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<Target, Node>,
    rows: RowKeys,
    /// Concrete dependency target -> nodes depending on it
    dependents: BTreeMap<Target, BTreeSet<Target>>,
    /// Dependencies still carrying placeholders, matched by scanning
    pattern_dependents: Vec<(Target, Target)>,
    cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, target: &Target) -> Option<&Node> {
        self.nodes.get(target)
    }

    pub(crate) fn node_mut(&mut self, target: &Target) -> Option<&mut Node> {
        self.nodes.get_mut(target)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn rows(&self) -> &RowKeys {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut RowKeys {
        &mut self.rows
    }

    /// Cycles found among definition nodes when the graph was built
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    pub(crate) fn set_cycles(&mut self, cycles: Vec<Vec<String>>) {
        self.cycles = cycles;
    }

    pub(crate) fn insert(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.target.clone(), node)
    }

    pub(crate) fn remove(&mut self, target: &Target) -> Option<Node> {
        self.nodes.remove(target)
    }

    pub fn templates(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_template())
    }

    pub fn diagnostics(&self) -> Vec<NodeDiagnostic> {
        self.nodes.values().map(Node::diagnostic).collect()
    }

    pub fn dirty_targets(&self) -> BTreeSet<Target> {
        self.nodes
            .values()
            .filter(|n| n.is_dirty())
            .map(|n| n.target.clone())
            .collect()
    }

    /// Rebuild the reverse dependency index from every materialized or
    /// plain node
    pub(crate) fn rebuild_index(&mut self) {
        self.dependents.clear();
        self.pattern_dependents.clear();
        for node in self.nodes.values().filter(|n| !n.is_template()) {
            for dep in node.dependencies() {
                if dep.is_pattern() {
                    self.pattern_dependents
                        .push((dep.clone(), node.target.clone()));
                } else {
                    self.dependents
                        .entry(dep.clone())
                        .or_default()
                        .insert(node.target.clone());
                }
            }
        }
    }

    /// Nodes with a dependency overlapping `changed`
    pub fn dependents_of(&self, changed: &Target) -> BTreeSet<Target> {
        let mut found = BTreeSet::new();

        // Dependencies on `changed` or one of its ancestors
        let mut current = Some(changed.clone());
        while let Some(target) = current {
            if let Some(set) = self.dependents.get(&target) {
                found.extend(set.iter().cloned());
            }
            current = target.parent();
        }

        // Dependencies below `changed`
        for (dep, set) in self.dependents.range(changed.clone()..) {
            if !dep.starts_with(changed) {
                break;
            }
            found.extend(set.iter().cloned());
        }

        for (dep, node) in &self.pattern_dependents {
            if dep.overlaps(changed) {
                found.insert(node.clone());
            }
        }
        found
    }

    /// Non-template nodes whose target overlaps `dep`
    pub fn nodes_overlapping(&self, dep: &Target) -> Vec<&Target> {
        if dep.is_pattern() {
            return self
                .nodes
                .values()
                .filter(|n| !n.is_template() && n.target.overlaps(dep))
                .map(|n| &n.target)
                .collect();
        }

        let mut found = Vec::new();
        let mut current = dep.parent();
        while let Some(target) = current {
            if let Some((key, _)) = self.nodes.get_key_value(&target) {
                found.push(key);
            }
            current = target.parent();
        }
        for (target, node) in self.nodes.range(dep.clone()..) {
            if !target.starts_with(dep) {
                break;
            }
            if !node.is_template() {
                found.push(target);
            }
        }
        found
    }

    /// Mark one node dirty, pulling in its container when the node takes
    /// its value from it
    pub fn mark(&mut self, target: &Target, reason: DirtyReason) -> bool {
        let Some(node) = self.nodes.get_mut(target) else {
            return false;
        };
        if !node.mark_dirty(reason) {
            return false;
        }

        if node.policy.vertical == VerticalPolicy::Parent {
            if let Some(owner) = node.owner.clone() {
                let member = node.target.clone();
                if let Some(container) = self.nodes.get_mut(&owner) {
                    container.mark_dirty(DirtyReason::MemberDirtied { member });
                }
            }
        }
        true
    }

    /// Mark every node depending on `changed`; returns how many became dirty
    pub fn mark_dependents(
        &mut self,
        changed: &Target,
        reason: impl Fn() -> DirtyReason,
    ) -> usize {
        self.dependents_of(changed)
            .into_iter()
            .filter(|target| self.mark(target, reason()))
            .count()
    }

    pub fn mark_all_dirty(&mut self, reason: DirtyReason) {
        let targets: Vec<Target> = self
            .nodes
            .values()
            .filter(|n| n.is_evaluable())
            .map(|n| n.target.clone())
            .collect();
        for target in targets {
            self.mark(&target, reason.clone());
        }
    }

    pub fn stats(&self) -> GraphStats {
        analysis::stats(self)
    }
}
