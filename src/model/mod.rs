#![forbid(unsafe_code)]

//! Graph record model.
//!
//! Nodes carry a numeric identity, an external id, a display name, ordered
//! type labels and an attribute map. Relations join two identities under a
//! structured `(verb, origin, dest)` kind whose textual label is only derived
//! when a CSV stream is named or a header is written.

/// Node types, relation verbs and relation kinds.
pub mod entity;
/// Node, relation and path records.
pub mod record;
/// Attribute values.
pub mod value;

pub use entity::{EntityType, RelationKind, Verb, LABEL_SEPARATOR};
pub use record::{Node, Path, Relation, RelationLabel};
pub use value::{AttrValue, AttributeMap, Attrs};
