//! Field definitions
//!
//! A field's `readable`, `writable` and `automaticValue` are expressions,
//! evaluated by the same machinery as every other node.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ur_expression::Expression;

fn always() -> Expression {
    Expression::boolean(true)
}

fn default_row_id() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerticalPolicy {
    /// The container's computed value is written down into this member
    Parent,
    /// This member computes and writes independently of its container
    #[default]
    Child,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HorizontalPolicy {
    /// Always replace the existing value
    #[default]
    Overwrite,
    /// Only fill an absent value
    Shy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergePolicies {
    #[serde(default)]
    pub vertical: VerticalPolicy,
    #[serde(default)]
    pub horizontal: HorizontalPolicy,
}

impl MergePolicies {
    pub fn new(vertical: VerticalPolicy, horizontal: HorizontalPolicy) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }

    pub fn shy() -> Self {
        Self::new(VerticalPolicy::Child, HorizontalPolicy::Shy)
    }

    pub fn parent() -> Self {
        Self::new(VerticalPolicy::Parent, HorizontalPolicy::Overwrite)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldType {
    String,
    Number,
    PositiveNumber,
    Boolean,
    Date,
    UniqueId,
    /// The option list is itself an expression
    Enum {
        options: Expression,
    },
    Object {
        members: BTreeMap<String, FieldDefinition>,
    },
    List {
        item: Box<FieldDefinition>,
        #[serde(default = "default_row_id", rename = "rowId")]
        row_id: String,
    },
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::PositiveNumber => "positiveNumber",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::UniqueId => "uniqueId",
            Self::Enum { .. } => "enum",
            Self::Object { .. } => "object",
            Self::List { .. } => "list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "always")]
    pub readable: Expression,
    #[serde(default = "always")]
    pub writable: Expression,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_value: Option<Expression>,
    #[serde(default)]
    pub merge_policies: MergePolicies,
}

impl FieldDefinition {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            readable: always(),
            writable: always(),
            automatic_value: None,
            merge_policies: MergePolicies::default(),
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn object(members: Vec<(&str, FieldDefinition)>) -> Self {
        Self::new(FieldType::Object {
            members: members
                .into_iter()
                .map(|(name, def)| (name.to_string(), def))
                .collect(),
        })
    }

    pub fn list(item: FieldDefinition, row_id: &str) -> Self {
        Self::new(FieldType::List {
            item: Box::new(item),
            row_id: row_id.to_string(),
        })
    }

    pub fn with_automatic_value(mut self, expression: Expression) -> Self {
        self.automatic_value = Some(expression);
        self
    }

    pub fn with_policies(mut self, policies: MergePolicies) -> Self {
        self.merge_policies = policies;
        self
    }

    pub fn with_readable(mut self, expression: Expression) -> Self {
        self.readable = expression;
        self
    }

    pub fn with_writable(mut self, expression: Expression) -> Self {
        self.writable = expression;
        self
    }
}

/// A named top-level field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub definition: FieldDefinition,
    /// Locale to label; carried for the rendering layer
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub version: String,
}

impl Field {
    pub fn new(name: &str, definition: FieldDefinition) -> Self {
        Self {
            name: name.to_string(),
            definition,
            labels: BTreeMap::new(),
            version: String::new(),
        }
    }
}
