//! Change events, the unit of invalidation input

use crate::target::{Target, TargetError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source recorded on events the engine synthesizes for its own writes
pub const FOLLOW_ON_SOURCE: &str = "ur_engine";

/// A change notification
///
/// `sourceDocId` is the changed target path. When `currentValues` is present
/// its keys are paths relative to `sourceDocId` and the event is applied as a
/// user edit before dirty marking; without it the event only notifies that
/// `sourceDocId` already changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub source: String,
    pub source_doc_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_values: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_values: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Event {
    /// A user edit setting `values` below `source_doc_id`
    pub fn edit(source: &str, source_doc_id: &str, values: Map<String, Value>) -> Self {
        Self {
            source: source.to_string(),
            source_doc_id: source_doc_id.to_string(),
            previous_values: None,
            current_values: Some(values),
            tenant_id: None,
            metadata: Map::new(),
        }
    }

    /// Notification that `source_doc_id` changed outside the engine
    pub fn notification(source: &str, source_doc_id: &str) -> Self {
        Self {
            source: source.to_string(),
            source_doc_id: source_doc_id.to_string(),
            previous_values: None,
            current_values: None,
            tenant_id: None,
            metadata: Map::new(),
        }
    }

    /// Event synthesized for a committed engine write
    pub fn follow_on(changed: &Target, previous: &Value, current: &Value) -> Self {
        match (changed.parent(), changed.last_segment()) {
            (Some(parent), Some(key)) => Self {
                source: FOLLOW_ON_SOURCE.to_string(),
                source_doc_id: parent.to_string(),
                previous_values: Some(Map::from_iter([(key.to_string(), previous.clone())])),
                current_values: Some(Map::from_iter([(key.to_string(), current.clone())])),
                tenant_id: None,
                metadata: Map::new(),
            },
            _ => Self::notification(FOLLOW_ON_SOURCE, &changed.to_string()),
        }
    }

    pub fn with_tenant(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(tenant_id.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn is_follow_on(&self) -> bool {
        self.source == FOLLOW_ON_SOURCE
    }

    /// Targets this event reports as changed
    pub fn changed_targets(&self) -> Result<Vec<Target>, TargetError> {
        let base = Target::parse(&self.source_doc_id)?;
        match &self.current_values {
            Some(values) if !values.is_empty() => values
                .keys()
                .map(|key| {
                    let rest: Vec<String> = key.split('.').map(str::to_string).collect();
                    base.join(&rest)
                })
                .collect(),
            _ => Ok(vec![base]),
        }
    }

    /// Edits carried by this event as `(target, value)` pairs
    pub fn edits(&self) -> Result<Vec<(Target, Value)>, TargetError> {
        let Some(values) = &self.current_values else {
            return Ok(Vec::new());
        };
        let base = Target::parse(&self.source_doc_id)?;
        values
            .iter()
            .map(|(key, value)| {
                let rest: Vec<String> = key.split('.').map(str::to_string).collect();
                Ok((base.join(&rest)?, value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_edit_targets() {
        let event = Event::edit("ui", "data.lines.r1", values(json!({"qty": 3, "meta.note": "x"})));
        let targets: Vec<String> = event
            .changed_targets()
            .unwrap()
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(targets, vec!["data.lines.r1.meta.note", "data.lines.r1.qty"]);
        assert_eq!(event.edits().unwrap().len(), 2);
    }

    #[test]
    fn test_notification_targets_source() {
        let event = Event::notification("import", "data.customer");
        let targets = event.changed_targets().unwrap();
        assert_eq!(targets, vec![Target::parse("data.customer").unwrap()]);
        assert!(event.edits().unwrap().is_empty());
    }

    #[test]
    fn test_follow_on_shape() {
        let target = Target::parse("data.summary.label").unwrap();
        let event = Event::follow_on(&target, &json!("x-y"), &json!("z-y"));
        assert!(event.is_follow_on());
        assert_eq!(event.source_doc_id, "data.summary");
        assert_eq!(event.current_values.unwrap()["label"], json!("z-y"));
        assert_eq!(event.previous_values.unwrap()["label"], json!("x-y"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let event: Event = serde_json::from_value(json!({
            "source": "ui",
            "sourceDocId": "data",
            "currentValues": {"a": "z"},
            "tenantId": "acme"
        }))
        .unwrap();
        assert_eq!(event.tenant_id.as_deref(), Some("acme"));
        assert!(event.metadata.is_empty());
    }

    #[test]
    fn test_invalid_source_doc_id() {
        let event = Event::notification("ui", "nowhere.a");
        assert!(event.changed_targets().is_err());
    }
}
