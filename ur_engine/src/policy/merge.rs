//! Turning computed node values into writes
//!
//! Horizontal policy decides between a computed value and the value already
//! present. Vertical policy decides, per member slot, whether a container's
//! computed value or the member's own computation owns it. List values are
//! planned row by row, matched by row key.

use crate::graph::{DependencyGraph, Node, NodeKind};
use crate::model::{Document, HorizontalPolicy, VerticalPolicy};
use crate::target::rows::assign_keys;
use crate::target::{find_row, RowKeys, Target};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use ur_expression::expression::value::is_absent;
use ur_expression::log_warning;

/// A node's successfully computed value, awaiting policy
#[derive(Debug, Clone, PartialEq)]
pub struct StagedValue {
    pub node: Target,
    pub value: Value,
}

/// A write to apply to the draft document
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    pub target: Target,
    pub value: Value,
    pub horizontal: HorizontalPolicy,
    /// Node whose computation produced the value
    pub origin: Target,
}

/// Final value for a slot under a horizontal policy
///
/// `OVERWRITE` always takes the computed value. `SHY` keeps any present
/// value and only fills an absent one.
pub fn resolve_horizontal(
    horizontal: HorizontalPolicy,
    computed: &Value,
    existing: Option<&Value>,
) -> Value {
    match (horizontal, existing) {
        (HorizontalPolicy::Shy, Some(present)) if !is_absent(Some(present)) => present.clone(),
        _ => computed.clone(),
    }
}

/// Final value for a node's own slot
pub fn resolve(node: &Node, computed: &Value, existing: Option<&Value>) -> Value {
    resolve_horizontal(horizontal_for(node), computed, existing)
}

fn horizontal_for(node: &Node) -> HorizontalPolicy {
    match node.kind {
        NodeKind::Value => node.policy.horizontal,
        _ => HorizontalPolicy::Overwrite,
    }
}

/// Plan the writes for one iteration's staged values, shallowest first
///
/// `input` is the iteration's immutable snapshot; `SHY` decisions for object
/// containers are taken against it.
pub fn plan_writes(
    graph: &DependencyGraph,
    input: &Document,
    staged: &[StagedValue],
) -> Vec<PlannedWrite> {
    let by_target: BTreeMap<&Target, &Value> =
        staged.iter().map(|s| (&s.node, &s.value)).collect();
    let mut planner = Planner {
        graph,
        input,
        rows: graph.rows(),
        writes: Vec::new(),
    };

    for entry in staged {
        let Some(node) = graph.node(&entry.node) else {
            continue;
        };
        if node.kind != NodeKind::Value {
            planner.push(&node.target, &entry.value, HorizontalPolicy::Overwrite, &node.target);
            continue;
        }
        if supplied_by_container(node, &by_target) {
            continue;
        }
        planner.plan_value(&node.target, &entry.value, node.policy.horizontal, &node.target);
    }

    let mut writes = planner.writes;
    writes.sort_by(|a, b| {
        a.target
            .len()
            .cmp(&b.target.len())
            .then_with(|| a.target.cmp(&b.target))
    });
    writes
}

/// A `PARENT` member yields to its container when the container's staged
/// object carries the member's slot
fn supplied_by_container(node: &Node, staged: &BTreeMap<&Target, &Value>) -> bool {
    if node.policy.vertical != VerticalPolicy::Parent {
        return false;
    }
    let (Some(owner), Some(slot)) = (&node.owner, node.target.last_segment()) else {
        return false;
    };
    matches!(staged.get(owner), Some(Value::Object(map)) if map.contains_key(slot))
}

struct Planner<'a> {
    graph: &'a DependencyGraph,
    input: &'a Document,
    rows: &'a RowKeys,
    writes: Vec<PlannedWrite>,
}

impl Planner<'_> {
    fn push(&mut self, target: &Target, value: &Value, horizontal: HorizontalPolicy, origin: &Target) {
        self.writes.push(PlannedWrite {
            target: target.clone(),
            value: value.clone(),
            horizontal,
            origin: origin.clone(),
        });
    }

    fn plan_value(
        &mut self,
        target: &Target,
        value: &Value,
        horizontal: HorizontalPolicy,
        origin: &Target,
    ) {
        let graph = self.graph;
        let Some(node) = graph.node(target) else {
            return self.push(target, value, horizontal, origin);
        };
        match value {
            Value::Array(items) if node.is_list => self.plan_rows(node, items, horizontal, origin),
            Value::Object(members) if !node.is_list && !node.sub_nodes_definitions.is_empty() => {
                self.plan_members(target, members, horizontal, origin)
            }
            _ => self.push(target, value, horizontal, origin),
        }
    }

    fn plan_members(
        &mut self,
        target: &Target,
        members: &Map<String, Value>,
        horizontal: HorizontalPolicy,
        origin: &Target,
    ) {
        let container_present = !is_absent(self.input.get(target, self.rows));
        let blocked = horizontal == HorizontalPolicy::Shy && container_present;

        for (key, member_value) in members {
            let member = match target.child(key) {
                Ok(member) => member,
                Err(e) => {
                    log_warning!("Skipping unaddressable member of computed object",
                        "target" => target, "error" => e);
                    continue;
                }
            };
            let (computes, vertical, own_horizontal) = match self.graph.node(&member) {
                Some(m) => (m.expression.is_some(), m.policy.vertical, m.policy.horizontal),
                None => (false, VerticalPolicy::Child, horizontal),
            };

            match (computes, vertical) {
                (true, VerticalPolicy::Parent) => {
                    self.push(&member, member_value, own_horizontal, origin)
                }
                (true, VerticalPolicy::Child) => {}
                (false, _) if blocked => {}
                (false, _) => self.plan_value(&member, member_value, horizontal, origin),
            }
        }
    }

    /// Computed rows are matched to present rows by key
    ///
    /// When the keys line up every row is planned like an object, so row
    /// members keep their own policies. Otherwise the list is written whole,
    /// carrying over the slots of matched rows that `CHILD` members own.
    fn plan_rows(
        &mut self,
        list: &Node,
        items: &[Value],
        horizontal: HorizontalPolicy,
        origin: &Target,
    ) {
        let (input, rows) = (self.input, self.rows);
        let pattern = list.template.as_ref().unwrap_or(&list.target);
        let row_id = rows.row_id_for(pattern);
        let Some(Value::Array(present)) = input.get(&list.target, rows) else {
            return self.push(&list.target, &Value::Array(items.to_vec()), horizontal, origin);
        };

        let keys = assign_keys(items, row_id, false);
        if keys != assign_keys(present, row_id, false) {
            let merged = self.carry_owned_slots(list, items, present, &keys, row_id);
            return self.push(&list.target, &Value::Array(merged), horizontal, origin);
        }

        for (key, item) in keys.iter().zip(items) {
            match list.target.child(key) {
                Ok(row) => self.plan_value(&row, item, horizontal, origin),
                Err(e) => log_warning!("Skipping unaddressable row of computed list",
                    "target" => &list.target, "error" => e),
            }
        }
    }

    fn carry_owned_slots(
        &self,
        list: &Node,
        items: &[Value],
        present: &[Value],
        keys: &[String],
        row_id: Option<&str>,
    ) -> Vec<Value> {
        items
            .iter()
            .zip(keys)
            .map(|(item, key)| {
                let mut item = item.clone();
                let Some(index) = find_row(present, key, row_id) else {
                    return item;
                };
                let Some(row) = list.target.child(key).ok().and_then(|r| self.graph.node(&r)) else {
                    return item;
                };
                if let Value::Object(slots) = &mut item {
                    for member in &row.sub_nodes_definitions {
                        let owned = self.graph.node(member).map_or(false, |m| {
                            m.expression.is_some() && m.policy.vertical == VerticalPolicy::Child
                        });
                        let current = member
                            .last_segment()
                            .and_then(|slot| Some((slot, present[index].get(slot)?)));
                        if let (true, Some((slot, value))) = (owned, current) {
                            slots.insert(slot.to_string(), value.clone());
                        }
                    }
                }
                item
            })
            .collect()
    }
}
