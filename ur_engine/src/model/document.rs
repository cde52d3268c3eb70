//! The three addressable trees
//!
//! `data` holds field values. `fields` holds each field path's resolved
//! `readable`, `writable` and `options`. `representation` holds each view
//! item's resolved `hide`, `required` and `override`. Only `data` contains
//! arrays; the other two trees key rows by their row key.

use crate::target::rows::PatternCursor;
use crate::target::{find_row, RowKeys, Target, TargetError, TargetType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub data: Value,
    #[serde(default = "empty_object")]
    pub fields: Value,
    #[serde(default = "empty_object")]
    pub representation: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Default for Document {
    fn default() -> Self {
        Self::new(empty_object())
    }
}

impl Document {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            fields: empty_object(),
            representation: empty_object(),
        }
    }

    pub fn tree(&self, tree: TargetType) -> Option<&Value> {
        match tree {
            TargetType::Data => Some(&self.data),
            TargetType::Fields => Some(&self.fields),
            TargetType::Representation => Some(&self.representation),
            TargetType::NotValid => None,
        }
    }

    fn tree_mut(&mut self, tree: TargetType) -> Option<&mut Value> {
        match tree {
            TargetType::Data => Some(&mut self.data),
            TargetType::Fields => Some(&mut self.fields),
            TargetType::Representation => Some(&mut self.representation),
            TargetType::NotValid => None,
        }
    }

    /// Value at `target`, or `None` when any segment is missing
    pub fn get(&self, target: &Target, rows: &RowKeys) -> Option<&Value> {
        let mut current = self.tree(target.tree())?;
        let mut cursor = PatternCursor::new();

        for segment in target.segments() {
            current = match current {
                Value::Object(map) => {
                    cursor.push_key(segment);
                    map.get(segment)?
                }
                Value::Array(items) => {
                    let row_id = rows.row_id_for(&cursor.current());
                    let index = find_row(items, segment, row_id)?;
                    cursor.push_row();
                    &items[index]
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Value at `target` with absent normalized to `Null`
    pub fn get_or_null(&self, target: &Target, rows: &RowKeys) -> Value {
        self.get(target, rows).cloned().unwrap_or(Value::Null)
    }

    /// Write `value` at `target`, creating intermediate objects
    ///
    /// Rows are never created here: addressing a missing row is an error.
    pub fn set(&mut self, target: &Target, value: Value, rows: &RowKeys) -> Result<(), TargetError> {
        if target.is_pattern() {
            return Err(TargetError::unresolved_placeholder(&target.to_string()));
        }
        let path = target.to_string();
        let Some((last, init)) = target.segments().split_last() else {
            return Err(TargetError::invalid(&path, "cannot replace a whole tree"));
        };
        let root = self
            .tree_mut(target.tree())
            .ok_or_else(|| TargetError::invalid(&path, "no tree"))?;

        let mut cursor = PatternCursor::new();
        let mut current = root;
        for segment in init {
            current = step_mut(current, segment, &mut cursor, rows, &path)?;
        }

        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        match current {
            Value::Object(map) => {
                map.insert(last.clone(), value);
                Ok(())
            }
            Value::Array(items) => {
                let row_id = rows.row_id_for(&cursor.current());
                let index = find_row(items, last, row_id)
                    .ok_or_else(|| TargetError::missing_row(&path, last))?;
                items[index] = value;
                Ok(())
            }
            _ => Err(TargetError::invalid(&path, "parent is not a container")),
        }
    }

    /// Remove the value at `target`; missing paths are ignored
    pub fn remove(&mut self, target: &Target) {
        let Some((last, init)) = target.segments().split_last() else {
            return;
        };
        let Some(mut current) = self.tree_mut(target.tree()) else {
            return;
        };
        for segment in init {
            match current {
                Value::Object(map) => match map.get_mut(segment) {
                    Some(next) => current = next,
                    None => return,
                },
                _ => return,
            }
        }
        if let Value::Object(map) = current {
            map.remove(last);
        }
    }

    /// Remove the value at `target`, then every ancestor object left empty
    pub fn remove_pruned(&mut self, target: &Target) {
        self.remove(target);
        let mut current = target.parent();
        while let Some(parent) = current {
            if parent.is_root() {
                break;
            }
            let empty = matches!(
                self.get(&parent, &RowKeys::new()),
                Some(Value::Object(map)) if map.is_empty()
            );
            if !empty {
                break;
            }
            self.remove(&parent);
            current = parent.parent();
        }
    }
}

fn step_mut<'v>(
    current: &'v mut Value,
    segment: &str,
    cursor: &mut PatternCursor,
    rows: &RowKeys,
    path: &str,
) -> Result<&'v mut Value, TargetError> {
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            cursor.push_key(segment);
            Ok(map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())))
        }
        Value::Array(items) => {
            let row_id = rows.row_id_for(&cursor.current());
            let index = find_row(items, segment, row_id)
                .ok_or_else(|| TargetError::missing_row(path, segment))?;
            cursor.push_row();
            Ok(&mut items[index])
        }
        _ => Err(TargetError::invalid(path, "parent is not a container")),
    }
}
