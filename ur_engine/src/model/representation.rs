use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ur_expression::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PresentationKind {
    String,
    Number,
    Date,
    Enum,
    Object,
    List,
    Table,
}

/// Binds a field path to a presentation
///
/// `path` is the field path below `data.`, with `{uniqueId}` for list rows
/// (e.g. `lines.{uniqueId}.amount`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewItem {
    pub path: String,
    pub kind: PresentationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Expression>,
    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub override_value: Option<Expression>,
    /// Layout hints; carried for the rendering layer
    #[serde(default)]
    pub layout: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<ViewItem>,
}

impl ViewItem {
    pub fn new(path: &str, kind: PresentationKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
            hide: None,
            required: None,
            override_value: None,
            layout: Map::new(),
            children: Vec::new(),
        }
    }

    pub fn with_hide(mut self, expression: Expression) -> Self {
        self.hide = Some(expression);
        self
    }

    pub fn with_required(mut self, expression: Expression) -> Self {
        self.required = Some(expression);
        self
    }

    pub fn with_override(mut self, expression: Expression) -> Self {
        self.override_value = Some(expression);
        self
    }

    pub fn with_children(mut self, children: Vec<ViewItem>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    pub name: String,
    #[serde(default)]
    pub items: Vec<ViewItem>,
    #[serde(default)]
    pub version: String,
}

impl Representation {
    pub fn new(name: &str, items: Vec<ViewItem>) -> Self {
        Self {
            name: name.to_string(),
            items,
            version: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_view_item_with_override() {
        let item: ViewItem = serde_json::from_value(json!({
            "path": "total",
            "kind": "number",
            "override": {"kind": "literal", "literal": {"type": "number", "value": 0}},
            "layout": {"width": 4}
        }))
        .unwrap();

        assert_eq!(item.kind, PresentationKind::Number);
        assert!(item.override_value.is_some());
        assert!(item.hide.is_none());
        assert_eq!(item.layout["width"], json!(4));
    }
}
