//! Row addressing inside data arrays
//!
//! A list row is addressed by the value of the list's declared `rowId`
//! member. Keys are unique within one array and are always valid path
//! segments: the first row carrying a given valid id owns it, and every
//! other row (no id, a duplicate id, or an id such as `a.b` that cannot be a
//! segment) is addressed by its index, or by `_<index>` when an id already
//! took that index.

use super::path::{is_placeholder, is_valid_row_key, Target, TargetType, ROW_PLACEHOLDER};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use ur_expression::expression::value::display_string;
use ur_expression::log_warning;

/// Declared `rowId` member per list pattern (e.g. `data.orders.{uniqueId}.lines`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowKeys {
    row_ids: BTreeMap<Target, String>,
}

impl RowKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, list_pattern: Target, row_id: &str) {
        self.row_ids.insert(list_pattern, row_id.to_string());
    }

    pub fn row_id_for(&self, list_pattern: &Target) -> Option<&str> {
        self.row_ids.get(list_pattern).map(String::as_str)
    }

    pub fn is_list(&self, pattern: &Target) -> bool {
        self.row_ids.contains_key(pattern)
    }

    pub fn lists(&self) -> impl Iterator<Item = (&Target, &str)> {
        self.row_ids.iter().map(|(t, id)| (t, id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }
}

fn declared_id(item: &Value, row_id: Option<&str>) -> Option<String> {
    row_id
        .and_then(|member| item.get(member))
        .filter(|v| !v.is_null())
        .map(display_string)
}

/// Keys of every row of `items`, in order
pub fn row_keys(items: &[Value], row_id: Option<&str>) -> Vec<String> {
    assign_keys(items, row_id, true)
}

pub(crate) fn assign_keys(items: &[Value], row_id: Option<&str>, warn: bool) -> Vec<String> {
    let mut taken = BTreeSet::new();
    let mut keys: Vec<Option<String>> = items
        .iter()
        .map(|item| {
            let id = declared_id(item, row_id)?;
            if is_valid_row_key(&id) && taken.insert(id.clone()) {
                return Some(id);
            }
            if warn {
                log_warning!("Row id cannot address its row, using the index",
                    "id" => id,
                    "member" => row_id.unwrap_or_default());
            }
            None
        })
        .collect();

    for (index, key) in keys.iter_mut().enumerate() {
        if key.is_some() {
            continue;
        }
        let mut fallback = index.to_string();
        while !taken.insert(fallback.clone()) {
            fallback.insert(0, '_');
        }
        *key = Some(fallback);
    }
    keys.into_iter().flatten().collect()
}

/// Position of the row addressed by `key`
pub fn find_row(items: &[Value], key: &str, row_id: Option<&str>) -> Option<usize> {
    // The first row declaring a valid id owns it
    if is_valid_row_key(key) {
        let by_id = items
            .iter()
            .position(|item| declared_id(item, row_id).as_deref() == Some(key));
        if by_id.is_some() {
            return by_id;
        }
    }
    assign_keys(items, row_id, false)
        .iter()
        .position(|candidate| candidate == key)
}

/// Tracks the list pattern of the position reached while walking a data tree
pub(crate) struct PatternCursor {
    pattern: Vec<String>,
}

impl PatternCursor {
    pub(crate) fn new() -> Self {
        Self {
            pattern: Vec::new(),
        }
    }

    pub(crate) fn current(&self) -> Target {
        // Segments were validated when the walked target was built
        Target::root(TargetType::Data).join_unchecked(&self.pattern)
    }

    pub(crate) fn push_key(&mut self, segment: &str) {
        self.pattern.push(segment.to_string());
    }

    pub(crate) fn push_row(&mut self) {
        self.pattern.push(ROW_PLACEHOLDER.to_string());
    }

    pub(crate) fn pop(&mut self) {
        self.pattern.pop();
    }
}

/// Enumerate the row-key tuples a data pattern expands to
///
/// One tuple is produced per combination of existing rows for the
/// placeholders in `pattern`. Missing or non-array lists produce no rows.
pub fn enumerate_rows(data: &Value, pattern: &Target, rows: &RowKeys) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    let mut keys = Vec::new();
    let mut cursor = PatternCursor::new();
    walk_rows(Some(data), pattern.segments(), rows, &mut cursor, &mut keys, &mut out);
    out
}

fn walk_rows(
    value: Option<&Value>,
    segments: &[String],
    rows: &RowKeys,
    cursor: &mut PatternCursor,
    keys: &mut Vec<String>,
    out: &mut Vec<Vec<String>>,
) {
    if !segments.iter().any(|s| is_placeholder(s)) {
        out.push(keys.clone());
        return;
    }
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };

    if is_placeholder(segment) {
        let Some(Value::Array(items)) = value else {
            return;
        };
        let row_id = rows.row_id_for(&cursor.current()).map(str::to_string);
        cursor.push_row();
        for (item, key) in items.iter().zip(row_keys(items, row_id.as_deref())) {
            keys.push(key);
            walk_rows(Some(item), rest, rows, cursor, keys, out);
            keys.pop();
        }
        cursor.pop();
    } else {
        cursor.push_key(segment);
        walk_rows(
            value.and_then(|v| v.get(segment.as_str())),
            rest,
            rows,
            cursor,
            keys,
            out,
        );
        cursor.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t(path: &str) -> Target {
        Target::parse(path).unwrap()
    }

    fn rows() -> RowKeys {
        let mut rows = RowKeys::new();
        rows.insert(t("data.orders"), "id");
        rows.insert(t("data.orders.{uniqueId}.lines"), "sku");
        rows
    }

    #[test]
    fn test_row_keys_prefer_declared_member() {
        let items = vec![
            json!({"id": "r9", "name": "x"}),
            json!({"name": "x"}),
            json!({"id": 42}),
        ];
        assert_eq!(row_keys(&items, Some("id")), vec!["r9", "1", "42"]);
        assert_eq!(row_keys(&items, None), vec!["0", "1", "2"]);
    }

    #[test]
    fn test_duplicate_ids_fall_back_to_the_index() {
        let items = vec![json!({"id": "r1"}), json!({"id": "r1"}), json!({"id": "r3"})];
        assert_eq!(row_keys(&items, Some("id")), vec!["r1", "1", "r3"]);
        assert_eq!(find_row(&items, "r1", Some("id")), Some(0));
        assert_eq!(find_row(&items, "1", Some("id")), Some(1));
        assert_eq!(find_row(&items, "r3", Some("id")), Some(2));
    }

    #[test]
    fn test_unaddressable_ids_fall_back_to_the_index() {
        let items = vec![
            json!({"id": "a.b"}),
            json!({"id": ""}),
            json!({"id": "{uniqueId}"}),
            json!({"id": "ok"}),
        ];
        let keys = row_keys(&items, Some("id"));
        assert_eq!(keys, vec!["0", "1", "2", "ok"]);
        assert!(keys.iter().all(|k| is_valid_row_key(k)));
        assert_eq!(find_row(&items, "a.b", Some("id")), None);
        assert_eq!(find_row(&items, "0", Some("id")), Some(0));
    }

    #[test]
    fn test_index_keys_never_shadow_ids() {
        let items = vec![json!({}), json!({"id": "0"})];
        assert_eq!(row_keys(&items, Some("id")), vec!["_0", "0"]);
        assert_eq!(find_row(&items, "0", Some("id")), Some(1));
        assert_eq!(find_row(&items, "_0", Some("id")), Some(0));
    }

    #[test]
    fn test_find_row_falls_back_to_index() {
        let items = vec![json!({"id": "a"}), json!({"name": "no id"})];
        assert_eq!(find_row(&items, "a", Some("id")), Some(0));
        assert_eq!(find_row(&items, "1", Some("id")), Some(1));
        assert_eq!(find_row(&items, "7", Some("id")), None);
        assert_eq!(find_row(&items, "b", Some("id")), None);
    }

    #[test]
    fn test_enumerate_nested_rows() {
        let data = json!({
            "orders": [
                {"id": "o1", "lines": [{"sku": "A"}, {"sku": "B"}]},
                {"id": "o2", "lines": []},
                {"id": "o3"}
            ]
        });
        let keys = enumerate_rows(&data, &t("data.orders.{uniqueId}.lines.{uniqueId}.qty"), &rows());
        assert_eq!(
            keys,
            vec![
                vec!["o1".to_string(), "A".to_string()],
                vec!["o1".to_string(), "B".to_string()],
            ]
        );

        let outer = enumerate_rows(&data, &t("data.orders.{uniqueId}"), &rows());
        assert_eq!(outer.len(), 3);
    }

    #[test]
    fn test_enumerate_missing_list_yields_nothing() {
        let keys = enumerate_rows(&json!({}), &t("data.orders.{uniqueId}.total"), &rows());
        assert!(keys.is_empty());

        let plain = enumerate_rows(&json!({}), &t("data.total"), &rows());
        assert_eq!(plain, vec![Vec::<String>::new()]);
    }
}
