//! One generation: apply events, then run the bounded fixpoint loop
//!
//! Each iteration evaluates a batch of dirty nodes against an immutable
//! input snapshot, resolves merge policy, applies the writes to a draft and
//! dirties whatever depends on the changed targets. The draft of the last
//! iteration is the generation's committed document.

use super::context::EvaluationContext;
use super::error::EvaluationError;
use super::report::GenerationReport;
use super::scope::NodeScope;
use crate::graph::analysis::evaluation_batch;
use crate::graph::{DependencyGraph, DirtyReason, Node, NodeError, NodeStatus, StructureChange};
use crate::model::{Document, Event, ValueShape};
use crate::policy::{plan_writes, resolve, resolve_horizontal, PlannedWrite, StagedValue};
use crate::target::{RowKeys, Target, TargetError, TargetType};
use serde_json::Value;
use ur_expression::expression::value::values_equal;
use ur_expression::logging::{self, codes, LogEvent};
use ur_expression::{evaluate, log_error, log_info, log_success, log_warning, ExpressionError};

/// The document a generation produced, with its report
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub document: Document,
    pub report: GenerationReport,
}

#[derive(Debug, Clone, PartialEq)]
struct Change {
    target: Target,
    previous: Value,
    current: Value,
}

/// Run one generation over `committed` with the given events
///
/// The generation works on a copy of `graph` that replaces it only on
/// success. On `NonConvergence` nothing is committed: node statuses and rows
/// stay as they were before the generation, except that the nodes still
/// dirty are put in `ERROR`.
pub fn run_generation(
    graph: &mut DependencyGraph,
    committed: &Document,
    events: &[Event],
    context: &mut EvaluationContext<'_>,
) -> Result<GenerationOutcome, EvaluationError> {
    let mut working = graph.clone();
    match generate(&mut working, committed, events, context) {
        Ok(outcome) => {
            *graph = working;
            Ok(outcome)
        }
        Err(error) => {
            if let EvaluationError::NonConvergence { dirty, .. } = &error {
                keep_non_convergence_marks(graph, &working, dirty);
            }
            Err(error)
        }
    }
}

fn generate(
    graph: &mut DependencyGraph,
    committed: &Document,
    events: &[Event],
    context: &mut EvaluationContext<'_>,
) -> Result<GenerationOutcome, EvaluationError> {
    let mut report = GenerationReport::new(context.generation);
    let mut snapshot = committed.clone();

    let mut changed = Vec::new();
    for event in events {
        if !context.accepts_tenant(event.tenant_id.as_deref()) {
            log_warning!("Ignoring event for another tenant",
                "source" => event.source,
                "tenant" => event.tenant_id.as_deref().unwrap_or_default());
            report.events_ignored += 1;
            continue;
        }
        match apply_event(&mut snapshot, graph.rows(), event, &mut report) {
            Ok(targets) => {
                report.events_applied += 1;
                changed.extend(targets);
            }
            Err(e) => {
                log_warning!("Ignoring event with an invalid target",
                    "source" => event.source, "error" => e);
                report.events_ignored += 1;
            }
        }
    }

    sync(graph, &mut snapshot, &mut report)?;
    for target in &changed {
        graph.mark_dependents(target, || DirtyReason::ExternalEvent {
            source: target.clone(),
        });
    }

    loop {
        let dirty = graph.dirty_targets();
        if dirty.is_empty() {
            break;
        }
        if !context.next_iteration() {
            return Err(non_convergence(graph, dirty.into_iter().collect(), context));
        }
        report.iterations = context.iteration();

        let batch = evaluation_batch(graph, &dirty);
        let staged = evaluate_batch(graph, &snapshot, &batch, context, &mut report);
        let writes = plan_writes(graph, &snapshot, &staged);

        let mut draft = snapshot.clone();
        let changes = apply_writes(&mut draft, graph, &snapshot, &writes, &mut report);
        snapshot = draft;

        sync(graph, &mut snapshot, &mut report)?;
        for change in changes {
            graph.mark_dependents(&change.target, || DirtyReason::FollowOnEvent {
                source: change.target.clone(),
            });
            report.follow_on.push(Event::follow_on(
                &change.target,
                &change.previous,
                &change.current,
            ));
        }
    }

    report.nodes_in_error = graph
        .nodes()
        .filter(|n| n.status == NodeStatus::Error)
        .map(|n| n.target.to_string())
        .collect();

    log_success!(
        codes::success::GENERATION_COMMITTED,
        "Generation committed",
        "generation" => report.generation,
        "iterations" => report.iterations,
        "writes" => report.writes_committed,
        "errors" => report.nodes_in_error.len()
    );
    Ok(GenerationOutcome {
        document: snapshot,
        report,
    })
}

/// Apply an event's edits; returns the targets it reports as changed
fn apply_event(
    snapshot: &mut Document,
    rows: &RowKeys,
    event: &Event,
    report: &mut GenerationReport,
) -> Result<Vec<Target>, TargetError> {
    let edits = event.edits()?;
    if edits.is_empty() {
        return event.changed_targets();
    }

    let mut applied = Vec::new();
    for (target, value) in edits {
        let path = target.to_string();
        if target.tree() != TargetType::Data {
            reject_edit(report, &path, "only data values can be edited");
            continue;
        }
        if !is_writable(snapshot, rows, &target) {
            reject_edit(report, &path, "field is not writable");
            continue;
        }
        match snapshot.set(&target, value, rows) {
            Ok(()) => applied.push(target),
            Err(e) => reject_edit(report, &path, &e.to_string()),
        }
    }
    Ok(applied)
}

/// An edit is refused when the field or any enclosing field resolved
/// `writable` to `false`
fn is_writable(snapshot: &Document, rows: &RowKeys, target: &Target) -> bool {
    let mut current = Some(target.with_tree(TargetType::Fields));
    while let Some(path) = current {
        if path.is_root() {
            break;
        }
        if let Ok(attribute) = path.child("writable") {
            if snapshot.get(&attribute, rows) == Some(&Value::Bool(false)) {
                return false;
            }
        }
        current = path.parent();
    }
    true
}

fn reject_edit(report: &mut GenerationReport, target: &str, reason: &str) {
    logging::dispatch(
        LogEvent::warning_with_code(codes::evaluation::WRITE_REJECTED, "Write rejected")
            .with_context("target", target)
            .with_context("reason", reason),
    );
    report.reject(target, reason);
}

fn sync(
    graph: &mut DependencyGraph,
    snapshot: &mut Document,
    report: &mut GenerationReport,
) -> Result<(), EvaluationError> {
    let change: StructureChange = graph.sync_structure(snapshot)?;
    if change.is_empty() {
        return Ok(());
    }
    for target in change.removed.iter().filter(|t| t.tree() != TargetType::Data) {
        snapshot.remove_pruned(target);
    }
    log_success!(
        codes::success::STRUCTURE_SYNC_COMPLETE,
        "List rows synchronized with data",
        "materialized" => change.materialized.len(),
        "removed" => change.removed.len()
    );
    report.record_structure(&change);
    Ok(())
}

fn evaluate_batch(
    graph: &mut DependencyGraph,
    input: &Document,
    batch: &[Target],
    context: &EvaluationContext<'_>,
    report: &mut GenerationReport,
) -> Vec<StagedValue> {
    let mut staged = Vec::new();
    for target in batch {
        let Some(node) = graph.node(target) else {
            continue;
        };
        let result = logging::with_target_context(&target.to_string(), || {
            evaluate_node(node, input, graph.rows(), context)
        });
        report.nodes_evaluated += 1;

        let Some(node) = graph.node_mut(target) else {
            continue;
        };
        match result {
            Ok(value) => {
                node.mark_clean();
                staged.push(StagedValue {
                    node: target.clone(),
                    value,
                });
            }
            Err(error) => {
                logging::dispatch(
                    LogEvent::warning_with_code(
                        codes::evaluation::NODE_EVALUATION_FAILED,
                        "Node evaluation failed, previous value retained",
                    )
                    .with_target(&target.to_string())
                    .with_context("error", &error.to_string()),
                );
                node.record_error(NodeError::from(&error));
            }
        }
    }
    staged
}

fn evaluate_node(
    node: &Node,
    input: &Document,
    rows: &RowKeys,
    context: &EvaluationContext<'_>,
) -> Result<Value, ExpressionError> {
    let Some(expression) = &node.expression else {
        return Ok(Value::Null);
    };
    let scope = NodeScope::new(node, input, rows, context);
    let value = evaluate(expression, &scope)?;

    if context.preferences.validate_field_types {
        let options = match node.shape {
            ValueShape::Enum => node
                .target
                .with_tree(TargetType::Fields)
                .child("options")
                .ok()
                .and_then(|options| input.get(&options, rows)),
            _ => None,
        };
        node.shape.validate(&value, options)?;
    }

    if context.preferences.log_evaluation_details {
        log_info!("Node evaluated", "target" => node.target, "value" => value);
    }
    Ok(value)
}

fn apply_writes(
    draft: &mut Document,
    graph: &DependencyGraph,
    input: &Document,
    writes: &[PlannedWrite],
    report: &mut GenerationReport,
) -> Vec<Change> {
    let rows = graph.rows();
    let mut changes = Vec::new();
    for write in writes {
        let existing = input.get(&write.target, rows);
        // A node writing its own slot is resolved by that node's policy
        let value = match graph.node(&write.target) {
            Some(node) if write.origin == write.target => resolve(node, &write.value, existing),
            _ => resolve_horizontal(write.horizontal, &write.value, existing),
        };
        let previous = draft.get_or_null(&write.target, rows);
        if values_equal(&previous, &value) {
            continue;
        }
        match draft.set(&write.target, value.clone(), rows) {
            Ok(()) => {
                report.writes_committed += 1;
                changes.push(Change {
                    target: write.target.clone(),
                    previous,
                    current: value,
                });
            }
            Err(e) => reject_edit(report, &write.target.to_string(), &e.to_string()),
        }
    }
    changes
}

/// Carry the `ERROR` marks of a failed generation back to the graph it
/// started from; rows materialized by that generation are not carried over
fn keep_non_convergence_marks(graph: &mut DependencyGraph, failed: &DependencyGraph, dirty: &[String]) {
    let failed_nodes = failed
        .nodes()
        .filter(|n| dirty.contains(&n.target.to_string()));
    for failed_node in failed_nodes {
        let (Some(node), Some(error)) = (
            graph.node_mut(&failed_node.target),
            failed_node.expression_errors.last(),
        ) else {
            continue;
        };
        node.record_error(error.clone());
    }
}

fn non_convergence(
    graph: &mut DependencyGraph,
    dirty: Vec<Target>,
    context: &EvaluationContext<'_>,
) -> EvaluationError {
    let error = EvaluationError::non_convergence(
        context.iteration() - 1,
        dirty.iter().map(Target::to_string).collect(),
    );
    for target in &dirty {
        if let Some(node) = graph.node_mut(target) {
            node.record_error(NodeError {
                code: codes::evaluation::NON_CONVERGENCE.as_str().to_string(),
                message: error.to_string(),
            });
        }
    }
    log_error!(
        error.error_code(),
        "Evaluation did not converge",
        "iterations" => context.iteration() - 1,
        "dirty" => dirty.len()
    );
    error
}
