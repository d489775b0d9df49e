//! Addressing into the threaded value.
//!
//! A [`Path`] names a sub-location inside a nested JSON object. Steps use
//! paths to extract their input and to write their output back without
//! seeing the rest of the value.

use serde::{Deserialize, Serialize};

use crate::Value;

/// An ordered list of object keys into a nested [`Value`].
///
/// The empty path addresses the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Path(Vec<String>);

impl Path {
    /// The root path, addressing the whole value.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A single-segment path.
    #[must_use]
    pub fn key(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Builds a path from segments.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parses a dotted path, e.g. `"a.b.c"`. An empty string is the root.
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            Self::root()
        } else {
            Self(dotted.split('.').map(str::to_string).collect())
        }
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The path's segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Reads the addressed location. `None` when any segment is missing or
    /// an intermediate is not an object.
    #[must_use]
    pub fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(value, |acc, segment| acc.get(segment))
    }

    /// Writes `leaf` at the addressed location, returning the new value.
    ///
    /// Missing intermediates are created as objects; non-object
    /// intermediates are replaced by objects.
    #[must_use]
    pub fn put(&self, root: Value, leaf: Value) -> Value {
        fn assoc(segments: &[String], target: Value, leaf: Value) -> Value {
            let Some((head, rest)) = segments.split_first() else {
                return leaf;
            };
            let mut map = match target {
                Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            let child = map.remove(head.as_str()).unwrap_or(Value::Null);
            map.insert(head.clone(), assoc(rest, child, leaf));
            Value::Object(map)
        }
        assoc(&self.0, root, leaf)
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
