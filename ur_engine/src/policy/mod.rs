//! Merge policy resolution between computed and existing values

pub mod merge;

pub use merge::{plan_writes, resolve, resolve_horizontal, PlannedWrite, StagedValue};
