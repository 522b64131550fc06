use rustc_hash::FxHashSet;

use crate::model::RelationKind;
use crate::types::Uid;

/// Set of `(origin, dest, kind)` triples already written.
///
/// The same pair is often reached from several traversal paths (an exon
/// shared by transcripts, a gene named by two panels); only the first
/// relation line is kept.
#[derive(Debug, Default)]
pub struct RelationDedup {
    seen: FxHashSet<(Uid, Uid, RelationKind)>,
    suppressed: u64,
}

impl RelationDedup {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the triple; returns false when it was already present.
    pub fn insert(&mut self, origin: Uid, dest: Uid, kind: RelationKind) -> bool {
        let fresh = self.seen.insert((origin, dest, kind));
        if !fresh {
            self.suppressed += 1;
        }
        fresh
    }

    /// Whether the triple was written.
    pub fn contains(&self, origin: Uid, dest: Uid, kind: RelationKind) -> bool {
        self.seen.contains(&(origin, dest, kind))
    }

    /// Number of duplicates rejected.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Distinct triples recorded.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
