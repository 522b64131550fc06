//! Node, relation and path value types shared by the build and query halves.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::{EntityType, RelationKind};
use super::value::{AttrValue, AttributeMap};
use crate::types::Uid;

/// Graph node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identity assigned by the identity cache (or read back from the graph).
    pub uid: Uid,
    /// Stable external id; may be empty.
    pub external_id: String,
    /// Display name; may be empty.
    pub display_name: String,
    /// Type tags; the first one selects the CSV stream and schema.
    pub labels: Vec<String>,
    /// Attribute values keyed by column name.
    pub attributes: AttributeMap,
}

impl Node {
    /// Creates a node of a single catalogued type.
    pub fn new(
        uid: Uid,
        entity: EntityType,
        external_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            uid,
            external_id: external_id.into(),
            display_name: display_name.into(),
            labels: vec![entity.as_str().to_owned()],
            attributes: AttributeMap::new(),
        }
    }

    /// Replaces the attribute map.
    pub fn with_attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes = attributes;
        self
    }

    /// Primary label, if any.
    pub fn primary_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// Looks up a single attribute.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }
}

/// Relation type: a catalogued triple or a free label read back from a graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationLabel {
    /// Structured `(verb, origin, dest)` triple.
    Known(RelationKind),
    /// Label that does not decode to a triple, with the endpoint types observed.
    Other {
        /// Raw relation type.
        label: String,
        /// Primary label of the start node.
        origin: String,
        /// Primary label of the end node.
        dest: String,
    },
}

impl RelationLabel {
    /// Origin identity space.
    pub fn origin_type(&self) -> &str {
        match self {
            RelationLabel::Known(kind) => kind.origin.as_str(),
            RelationLabel::Other { origin, .. } => origin,
        }
    }

    /// Destination identity space.
    pub fn dest_type(&self) -> &str {
        match self {
            RelationLabel::Known(kind) => kind.dest.as_str(),
            RelationLabel::Other { dest, .. } => dest,
        }
    }

    /// Structured kind when the label is catalogued.
    pub fn kind(&self) -> Option<RelationKind> {
        match self {
            RelationLabel::Known(kind) => Some(*kind),
            RelationLabel::Other { .. } => None,
        }
    }
}

impl fmt::Display for RelationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationLabel::Known(kind) => kind.fmt(f),
            RelationLabel::Other { label, .. } => f.write_str(label),
        }
    }
}

/// Directed relation between two already-identified nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Identity when read back from a graph; relations written to CSV carry none.
    pub uid: Option<Uid>,
    /// Relation type.
    pub label: RelationLabel,
    /// Start node identity.
    pub origin_uid: Uid,
    /// End node identity.
    pub dest_uid: Uid,
    /// Attribute values keyed by column name.
    pub attributes: AttributeMap,
}

impl Relation {
    /// Creates a catalogued relation without attributes.
    pub fn new(kind: RelationKind, origin_uid: Uid, dest_uid: Uid) -> Self {
        Self {
            uid: None,
            label: RelationLabel::Known(kind),
            origin_uid,
            dest_uid,
            attributes: AttributeMap::new(),
        }
    }

    /// Replaces the attribute map.
    pub fn with_attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes = attributes;
        self
    }

    /// Origin identity space.
    pub fn origin_type(&self) -> &str {
        self.label.origin_type()
    }

    /// Destination identity space.
    pub fn dest_type(&self) -> &str {
        self.label.dest_type()
    }
}

/// Materialized path: nodes in traversal order plus the relations joining them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Distinct nodes along the path.
    pub nodes: Vec<Node>,
    /// Relations along the path.
    pub relations: Vec<Relation>,
    /// Position of the start node in `nodes`.
    pub start: usize,
    /// Position of the end node in `nodes`.
    pub end: usize,
}

impl Path {
    /// Start node.
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes.get(self.start)
    }

    /// End node.
    pub fn end_node(&self) -> Option<&Node> {
        self.nodes.get(self.end)
    }

    /// Number of relations traversed.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// True for a single-node path.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}
