//! Declarative inputs and the document they describe

pub mod document;
pub mod event;
pub mod field;
pub mod representation;
pub mod types;

pub use document::Document;
pub use event::Event;
pub use field::{
    Field, FieldDefinition, FieldType, HorizontalPolicy, MergePolicies, VerticalPolicy,
};
pub use representation::{PresentationKind, Representation, ViewItem};
pub use types::ValueShape;
