//! Target addressing over the data, fields and representation trees

pub mod error;
pub mod path;
pub mod rows;

pub use error::TargetError;
pub use path::{
    format, is_placeholder, is_valid_row_key, parse, path_matches_pattern, ParsedTarget, Target,
    TargetType, ROW_PLACEHOLDER,
};
pub use rows::{enumerate_rows, find_row, row_keys, RowKeys};

/// Resolve a container-relative self path
///
/// `container_pattern` is the owning node's container with placeholders and
/// `row_keys` its concrete row keys. `..` climbs one entity level, so leaving
/// a row also leaves its list. Placeholders still present after climbing are
/// filled from `row_keys` in order.
pub fn resolve_self_path(
    container_pattern: &Target,
    row_keys: &[String],
    paths: &[String],
) -> Result<Target, TargetError> {
    let mut current = container_pattern.clone();
    let mut appended: Vec<String> = Vec::new();

    for segment in paths {
        if segment == ".." {
            if appended.pop().is_some() {
                continue;
            }
            current = current.climb().ok_or_else(|| {
                TargetError::invalid(&paths.join("."), "climbs above the tree root")
            })?;
        } else {
            appended.push(segment.clone());
        }
    }

    let resolved = current.join(&appended)?;
    let keys = &row_keys[..row_keys.len().min(current.placeholder_count())];
    Ok(resolved.substitute(keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn t(path: &str) -> Target {
        Target::parse(path).unwrap()
    }

    fn segs(path: &[&str]) -> Vec<String> {
        path.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_self_path_within_row() {
        let resolved = resolve_self_path(
            &t("data.lines.{uniqueId}"),
            &segs(&["r1"]),
            &segs(&["qty"]),
        )
        .unwrap();
        assert_eq!(resolved, t("data.lines.r1.qty"));
    }

    #[test]
    fn test_self_path_climbs_out_of_row() {
        let resolved = resolve_self_path(
            &t("data.lines.{uniqueId}"),
            &segs(&["r1"]),
            &segs(&["..", "currency"]),
        )
        .unwrap();
        assert_eq!(resolved, t("data.currency"));
    }

    #[test]
    fn test_self_path_nested_rows_keep_outer_key() {
        let resolved = resolve_self_path(
            &t("data.orders.{uniqueId}.lines.{uniqueId}"),
            &segs(&["o1", "l1"]),
            &segs(&["..", "discount"]),
        )
        .unwrap();
        assert_eq!(resolved, t("data.orders.o1.discount"));
    }

    #[test]
    fn test_self_path_above_root_fails() {
        let result = resolve_self_path(&t("data"), &[], &segs(&["..", "x"]));
        assert_matches!(result, Err(TargetError::Invalid { .. }));
    }

    #[test]
    fn test_self_path_dotdot_cancels_appended_segment() {
        let resolved =
            resolve_self_path(&t("data.customer"), &[], &segs(&["address", "..", "name"]))
                .unwrap();
        assert_eq!(resolved, t("data.customer.name"));
    }
}
