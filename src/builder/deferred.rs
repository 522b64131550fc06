//! Typed queue of relations whose far endpoint was not yet known.

use std::collections::VecDeque;

use serde::Serialize;

use crate::model::{AttributeMap, EntityType, Relation, RelationKind};
use crate::types::Uid;

/// Which endpoint of a pending relation is still unresolved.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PendingSide {
    /// The start node.
    Origin,
    /// The end node.
    Dest,
}

/// Relation with one identified endpoint and one endpoint known only by key.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingReference {
    /// Identity of the endpoint already written.
    pub known: Uid,
    /// External key of the endpoint still to resolve.
    pub pending_key: String,
    /// Side of the relation the pending key sits on.
    pub side: PendingSide,
    /// Relation kind to emit once linked.
    pub kind: RelationKind,
    /// Relation attributes.
    pub attributes: AttributeMap,
}

impl PendingReference {
    /// Pending end node: `known -> ?key`.
    pub fn dest(kind: RelationKind, origin: Uid, dest_key: impl Into<String>) -> Self {
        Self {
            known: origin,
            pending_key: dest_key.into(),
            side: PendingSide::Dest,
            kind,
            attributes: AttributeMap::new(),
        }
    }

    /// Pending start node: `?key -> known`.
    pub fn origin(kind: RelationKind, origin_key: impl Into<String>, dest: Uid) -> Self {
        Self {
            known: dest,
            pending_key: origin_key.into(),
            side: PendingSide::Origin,
            kind,
            attributes: AttributeMap::new(),
        }
    }

    /// Attaches relation attributes.
    pub fn with_attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes = attributes;
        self
    }

    /// Identity space the pending key is resolved in.
    pub fn pending_type(&self) -> EntityType {
        match self.side {
            PendingSide::Origin => self.kind.origin,
            PendingSide::Dest => self.kind.dest,
        }
    }

    /// Relation joining the known endpoint to `resolved`.
    pub fn into_relation(self, resolved: Uid) -> Relation {
        let (origin, dest) = match self.side {
            PendingSide::Origin => (resolved, self.known),
            PendingSide::Dest => (self.known, resolved),
        };
        Relation::new(self.kind, origin, dest).with_attributes(self.attributes)
    }
}

/// Post-processing outcome.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct DeferredReport {
    /// References connected after the index stages.
    pub linked: u64,
    /// References whose target never appeared; their known node stays unlinked.
    pub isolated: u64,
}

/// FIFO of pending references, drained once after all index stages.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    items: VecDeque<PendingReference>,
}

impl DeferredQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a reference.
    pub fn push(&mut self, pending: PendingReference) {
        self.items.push_back(pending);
    }

    /// Removes every entry in insertion order.
    pub fn drain(&mut self) -> impl Iterator<Item = PendingReference> + '_ {
        self.items.drain(..)
    }

    /// Entries waiting.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing waits.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
