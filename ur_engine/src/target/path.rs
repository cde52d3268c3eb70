//! Target paths
//!
//! A target is `<tree>.<segment>...` where the tree is `data`, `fields` or
//! `representation`. Paths under list rows carry the `{uniqueId}` placeholder
//! until a concrete row key is substituted.

use super::error::TargetError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use ur_expression::config::compile_time::targets::{MAX_PATH_DEPTH, MAX_SEGMENT_LENGTH};

/// Segment standing for a concrete row key
pub const ROW_PLACEHOLDER: &str = "{uniqueId}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Data,
    Fields,
    Representation,
    NotValid,
}

impl TargetType {
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "data" => Self::Data,
            "fields" => Self::Fields,
            "representation" => Self::Representation,
            _ => Self::NotValid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Fields => "fields",
            Self::Representation => "representation",
            Self::NotValid => "invalid",
        }
    }
}

/// Result of the lenient [`parse`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTarget {
    pub target_type: TargetType,
    pub entity: Option<String>,
    pub id: Option<String>,
    pub rest: Vec<String>,
}

/// Split a path into its tree, entity (first segment), id (second segment)
/// and the remaining segments. Unknown trees yield `NotValid`.
pub fn parse(path: &str) -> ParsedTarget {
    let mut parts = path.split('.');
    let target_type = TargetType::from_prefix(parts.next().unwrap_or_default());
    let mut rest: Vec<String> = parts.map(str::to_string).collect();

    if target_type == TargetType::NotValid || rest.iter().any(|s| s.is_empty()) {
        return ParsedTarget {
            target_type: TargetType::NotValid,
            entity: None,
            id: None,
            rest: Vec::new(),
        };
    }

    let entity = if rest.is_empty() {
        None
    } else {
        Some(rest.remove(0))
    };
    let id = if rest.is_empty() {
        None
    } else {
        Some(rest.remove(0))
    };

    ParsedTarget {
        target_type,
        entity,
        id,
        rest,
    }
}

pub fn format(target: &Target) -> String {
    target.to_string()
}

/// Whether a concrete path matches a declared pattern segment by segment,
/// where a concrete row key matches `{uniqueId}`
pub fn path_matches_pattern(concrete_path: &str, declared_pattern: &str) -> bool {
    match (Target::parse(concrete_path), Target::parse(declared_pattern)) {
        (Ok(concrete), Ok(pattern)) => concrete.matches_pattern(&pattern),
        _ => false,
    }
}

pub fn is_placeholder(segment: &str) -> bool {
    segment == ROW_PLACEHOLDER
}

/// Whether a value taken from data can stand as a concrete row key
pub fn is_valid_row_key(key: &str) -> bool {
    !key.contains(&['.', '{', '}'][..]) && validate_segment(key, key).is_ok()
}

fn segments_match(a: &str, b: &str) -> bool {
    a == b || is_placeholder(a) || is_placeholder(b)
}

fn validate_segment(path: &str, segment: &str) -> Result<(), TargetError> {
    if segment.is_empty() {
        return Err(TargetError::invalid(path, "empty segment"));
    }
    if segment.len() > MAX_SEGMENT_LENGTH {
        return Err(TargetError::invalid(
            path,
            &format!("segment longer than {} bytes", MAX_SEGMENT_LENGTH),
        ));
    }
    if segment == ".." {
        return Err(TargetError::invalid(path, "'..' is only valid in self paths"));
    }
    if (segment.contains('{') || segment.contains('}')) && !is_placeholder(segment) {
        return Err(TargetError::invalid(
            path,
            &format!("unknown placeholder '{}'", segment),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    tree: TargetType,
    segments: Vec<String>,
}

impl Target {
    /// Strictly parse a target path
    pub fn parse(path: &str) -> Result<Self, TargetError> {
        let mut parts = path.split('.');
        let tree = TargetType::from_prefix(parts.next().unwrap_or_default());
        if tree == TargetType::NotValid {
            return Err(TargetError::invalid(
                path,
                "must start with 'data', 'fields' or 'representation'",
            ));
        }
        Self::new(tree, parts.map(str::to_string).collect())
    }

    pub fn new(tree: TargetType, segments: Vec<String>) -> Result<Self, TargetError> {
        let target = Self { tree, segments };
        target.validate()?;
        Ok(target)
    }

    pub fn root(tree: TargetType) -> Self {
        Self {
            tree,
            segments: Vec::new(),
        }
    }

    fn validate(&self) -> Result<(), TargetError> {
        if self.tree == TargetType::NotValid {
            return Err(TargetError::invalid(&self.to_string(), "no tree"));
        }
        if self.segments.len() > MAX_PATH_DEPTH {
            return Err(TargetError::PathTooDeep {
                path: self.to_string(),
                depth: self.segments.len(),
                limit: MAX_PATH_DEPTH,
            });
        }
        for segment in &self.segments {
            validate_segment(&self.to_string(), segment)?;
        }
        Ok(())
    }

    pub fn tree(&self) -> TargetType {
        self.tree
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether the path still carries row placeholders
    pub fn is_pattern(&self) -> bool {
        self.segments.iter().any(|s| is_placeholder(s))
    }

    pub fn placeholder_count(&self) -> usize {
        self.segments.iter().filter(|s| is_placeholder(s)).count()
    }

    pub fn child(&self, segment: &str) -> Result<Self, TargetError> {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self::new(self.tree, segments)
    }

    pub fn join(&self, rest: &[String]) -> Result<Self, TargetError> {
        let mut segments = self.segments.clone();
        segments.extend(rest.iter().cloned());
        Self::new(self.tree, segments)
    }

    pub(crate) fn join_unchecked(&self, rest: &[String]) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(rest.iter().cloned());
        Self {
            tree: self.tree,
            segments,
        }
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            tree: self.tree,
            segments: init.to_vec(),
        })
    }

    /// Move one entity level up: a row key is popped together with its list
    pub fn climb(&self) -> Option<Self> {
        let mut segments = self.segments.clone();
        let popped = segments.pop()?;
        if is_placeholder(&popped) {
            segments.pop();
        }
        Some(Self {
            tree: self.tree,
            segments,
        })
    }

    /// The same segments addressed in another tree
    pub fn with_tree(&self, tree: TargetType) -> Self {
        Self {
            tree,
            segments: self.segments.clone(),
        }
    }

    pub fn starts_with(&self, prefix: &Target) -> bool {
        self.tree == prefix.tree && self.segments.starts_with(&prefix.segments)
    }

    /// Replace placeholders left to right with the given row keys; extra
    /// placeholders stay in place
    pub fn substitute(&self, row_keys: &[String]) -> Self {
        let mut keys = row_keys.iter();
        let segments = self
            .segments
            .iter()
            .map(|segment| {
                if is_placeholder(segment) {
                    keys.next().cloned().unwrap_or_else(|| segment.clone())
                } else {
                    segment.clone()
                }
            })
            .collect();
        Self {
            tree: self.tree,
            segments,
        }
    }

    /// Same shape, with placeholders in `pattern` accepting any row key
    pub fn matches_pattern(&self, pattern: &Target) -> bool {
        self.tree == pattern.tree
            && self.segments.len() == pattern.segments.len()
            && self
                .segments
                .iter()
                .zip(&pattern.segments)
                .all(|(c, p)| c == p || is_placeholder(p))
    }

    /// Whether a change at one target can affect the other: one is a prefix
    /// of the other, comparing placeholders as wildcards on either side
    pub fn overlaps(&self, other: &Target) -> bool {
        self.tree == other.tree
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| segments_match(a, b))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tree.as_str())?;
        for segment in &self.segments {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let path = String::deserialize(deserializer)?;
        Target::parse(&path).map_err(serde::de::Error::custom)
    }
}
