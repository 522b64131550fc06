#![allow(missing_docs)]

//! Driver-level records, as a graph database client hands them over.

use std::collections::{BTreeMap, VecDeque};

use super::errors::Result;
use super::request::Query;

/// Property map of a driver entity.
pub type Properties = BTreeMap<String, DriverValue>;

/// Value inside a driver record.
#[derive(Clone, Debug, PartialEq)]
pub enum DriverValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<DriverValue>),
    Node(DriverNode),
    Relationship(DriverRelationship),
    Path(DriverPath),
}

/// Node as returned by a driver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DriverNode {
    /// Driver-internal element id.
    pub element_id: String,
    pub labels: Vec<String>,
    pub properties: Properties,
}

/// Relationship as returned by a driver; endpoints are element ids.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DriverRelationship {
    pub element_id: String,
    pub start: String,
    pub end: String,
    pub rel_type: String,
    pub properties: Properties,
}

/// Path as returned by a driver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DriverPath {
    pub nodes: Vec<DriverNode>,
    pub relationships: Vec<DriverRelationship>,
    /// Element id of the start node.
    pub start: String,
    /// Element id of the end node.
    pub end: String,
}

/// One result record: parallel keys and values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DriverRecord {
    pub keys: Vec<String>,
    pub values: Vec<DriverValue>,
}

impl DriverRecord {
    /// Single-column record.
    pub fn single(key: impl Into<String>, value: DriverValue) -> Self {
        Self {
            keys: vec![key.into()],
            values: vec![value],
        }
    }

    /// Value of column `key`.
    pub fn get(&self, key: &str) -> Option<&DriverValue> {
        self.keys
            .iter()
            .position(|k| k == key)
            .and_then(|idx| self.values.get(idx))
    }

    /// Iterates `(key, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DriverValue)> {
        self.keys.iter().map(String::as_str).zip(self.values.iter())
    }
}

/// Forward-only cursor over driver records. Not safe for concurrent
/// advancement; there is no rewind.
pub trait RecordCursor {
    /// Next record, `Ok(None)` once exhausted.
    fn try_next(&mut self) -> Result<Option<DriverRecord>>;
}

/// Boxed cursor handed out by drivers.
pub type BoxCursor = Box<dyn RecordCursor>;

/// Cursor over records already in memory.
#[derive(Debug, Default)]
pub struct VecCursor {
    records: VecDeque<DriverRecord>,
}

impl VecCursor {
    /// Cursor yielding `records` in order.
    pub fn new(records: Vec<DriverRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl RecordCursor for VecCursor {
    fn try_next(&mut self) -> Result<Option<DriverRecord>> {
        Ok(self.records.pop_front())
    }
}

/// Something that can run a [`Query`] and stream its records.
pub trait GraphDriver {
    /// Name used in errors.
    fn name(&self) -> &str;

    /// Starts a query.
    fn run(&mut self, query: &Query) -> Result<BoxCursor>;
}
