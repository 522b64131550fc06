//! Attribute values attached to nodes and relations.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tagged attribute value over a closed set of scalar kinds.
///
/// `Other` carries anything a graph driver returns that is not one of the
/// known kinds, already rendered to text so serialization stays deterministic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum AttrValue {
    /// UTF-8 string.
    Str(String),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
    /// Delimited list of strings.
    List(Vec<String>),
    /// Unknown kind rendered as text.
    Other(String),
}

/// Attribute map with deterministic key order.
pub type AttributeMap = BTreeMap<String, AttrValue>;

impl AttrValue {
    /// Returns true when the value carries no content (empty string or list).
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Str(s) | AttrValue::Other(s) => s.is_empty(),
            AttrValue::List(items) => items.iter().all(|item| item.is_empty()),
            AttrValue::Int(_) | AttrValue::Float(_) | AttrValue::Bool(_) => false,
        }
    }

    /// Returns the string payload for `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload for `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) | AttrValue::Other(s) => f.write_str(s),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::List(items) => f.write_str(&items.join(";")),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::List(value)
    }
}

/// Fluent helper for building attribute maps that skips absent values.
#[derive(Debug, Default)]
pub struct Attrs {
    map: AttributeMap,
}

impl Attrs {
    /// Starts an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `name` unless it is `None` or empty.
    pub fn with<V: Into<AttrValue>>(mut self, name: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            let value = value.into();
            if !value.is_empty() {
                self.map.insert(name.to_owned(), value);
            }
        }
        self
    }

    /// Finishes the map.
    pub fn build(self) -> AttributeMap {
        self.map
    }
}
