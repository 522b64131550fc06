//! Attribute-column schemas and header rendering.

use std::collections::BTreeMap;

use crate::model::{EntityType, RelationKind};

use super::options::CsvOptions;

/// Column layout of one node stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSchema {
    /// Identity space written into the `uid:ID(...)` header.
    pub identity_space: String,
    /// Attribute columns in emission order.
    pub columns: Vec<String>,
}

impl NodeSchema {
    /// Header row for these options.
    pub fn header(&self, opts: &CsvOptions) -> Vec<String> {
        let mut header = Vec::with_capacity(3 + self.columns.len());
        header.push(format!("uid:ID({})", self.identity_space));
        header.push("id".to_owned());
        header.push("name".to_owned());
        header.extend(self.columns.iter().map(|col| opts.attribute_header(col)));
        header
    }
}

/// Header row of a relation stream.
pub fn relation_header(kind: RelationKind, opts: &CsvOptions) -> Vec<String> {
    let columns = kind.attribute_columns();
    let mut header = Vec::with_capacity(2 + columns.len());
    header.push(format!(":START_ID({})", kind.origin));
    header.push(format!(":END_ID({})", kind.dest));
    header.extend(columns.iter().map(|col| opts.attribute_header(col)));
    header
}

/// Node schemas keyed by primary label.
///
/// Populated with the built-in entity catalogue; extra labels can be
/// registered before the first record of that label is written.
#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    nodes: BTreeMap<String, NodeSchema>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::catalogue()
    }
}

impl SchemaRegistry {
    /// Registry with no schemas at all.
    pub fn empty() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in entity type.
    pub fn catalogue() -> Self {
        let mut registry = Self::empty();
        for ty in EntityType::ALL {
            registry.register(
                ty.as_str(),
                ty.attribute_columns().iter().map(|c| (*c).to_owned()).collect(),
            );
        }
        registry
    }

    /// Registers (or replaces) the schema of `label`; the identity space is the label itself.
    pub fn register(&mut self, label: &str, columns: Vec<String>) {
        self.nodes.insert(
            label.to_owned(),
            NodeSchema {
                identity_space: label.to_owned(),
                columns,
            },
        );
    }

    /// Schema of `label`, if registered.
    pub fn node(&self, label: &str) -> Option<&NodeSchema> {
        self.nodes.get(label)
    }

    /// Registered labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}
