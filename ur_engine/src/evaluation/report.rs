use crate::graph::StructureChange;
use crate::model::Event;
use serde::{Deserialize, Serialize};

/// A write or edit that was not applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedWrite {
    pub target: String,
    pub reason: String,
}

/// Summary of one committed generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub generation: u64,
    pub iterations: usize,
    pub events_applied: usize,
    pub events_ignored: usize,
    pub nodes_evaluated: usize,
    pub writes_committed: usize,
    pub nodes_materialized: usize,
    pub nodes_removed: usize,
    pub nodes_in_error: Vec<String>,
    pub rejected_writes: Vec<RejectedWrite>,
    pub follow_on: Vec<Event>,
}

impl GenerationReport {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub(crate) fn record_structure(&mut self, change: &StructureChange) {
        self.nodes_materialized += change.materialized.len();
        self.nodes_removed += change.removed.len();
    }

    pub(crate) fn reject(&mut self, target: &str, reason: &str) {
        self.rejected_writes.push(RejectedWrite {
            target: target.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Whether the generation changed nothing
    pub fn is_quiet(&self) -> bool {
        self.writes_committed == 0 && self.events_applied == 0
    }
}
