//! Shared mutable state threaded through every builder.

use serde::Serialize;
use tracing::{debug, warn};

use crate::emit::{CsvEmitter, EmitStats};
use crate::identity::{IdentityCache, IdentityStats, RelationDedup, Resolved, UidAllocator};
use crate::model::{AttributeMap, EntityType, Node, Relation, RelationKind};
use crate::types::{BuildError, Result, Uid};

use super::deferred::{DeferredQueue, DeferredReport, PendingReference};

/// Running totals, diffed by the orchestrator to attribute work to stages.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Counters {
    /// Node lines written.
    pub nodes: u64,
    /// Relation lines written.
    pub relations: u64,
    /// Recoverable problems inside otherwise valid records.
    pub issues: u64,
}

/// Everything a build produces once its streams are closed.
#[derive(Clone, Debug, Serialize)]
pub struct FinishedBuild {
    /// Line counts per file.
    pub emitted: EmitStats,
    /// Identity cache counters.
    pub identity: IdentityStats,
    /// Bindings held at the end.
    pub bindings: u64,
    /// Duplicate relations suppressed.
    pub duplicates_suppressed: u64,
    /// Final totals.
    pub counters: Counters,
}

/// Allocator, identity cache, emitter, dedup set and deferred queue of one build.
///
/// Builders only see the graph through this type, which enforces that a
/// relation is written only between identities the cache handed out.
pub struct BuildContext {
    allocator: UidAllocator,
    identity: IdentityCache,
    emitter: CsvEmitter,
    dedup: RelationDedup,
    deferred: DeferredQueue,
    counters: Counters,
}

impl BuildContext {
    /// Starts a build.
    pub fn new(identity: IdentityCache, emitter: CsvEmitter) -> Self {
        Self {
            allocator: UidAllocator::new(),
            identity,
            emitter,
            dedup: RelationDedup::new(),
            deferred: DeferredQueue::new(),
            counters: Counters::default(),
        }
    }

    /// Pure identity lookup.
    pub fn resolve(&mut self, key: &str, entity: EntityType) -> Result<Option<Uid>> {
        if key.is_empty() {
            return Ok(None);
        }
        self.identity.resolve(key, entity)
    }

    /// Looks `key` up and, on a miss, allocates an identity, builds the node
    /// with `make`, writes its line and binds the key.
    pub fn resolve_or_create<F>(&mut self, key: &str, entity: EntityType, make: F) -> Result<Resolved>
    where
        F: FnOnce(Uid) -> Node,
    {
        if key.is_empty() {
            return Err(BuildError::source_record(
                "<empty>",
                format!("{entity} record without an identifying key"),
            ));
        }
        let emitter = &mut self.emitter;
        let resolved = self
            .identity
            .resolve_or_create(key, entity, &mut self.allocator, |uid| {
                emitter.write_node(&make(uid)).map(|_| ())
            })?;
        if resolved.created {
            self.counters.nodes += 1;
        }
        Ok(resolved)
    }

    /// Binds an extra key to an existing node. The first binding of a key
    /// wins; a later clash is logged and ignored.
    pub fn bind_alias(&mut self, key: &str, entity: EntityType, uid: Uid) -> Result<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        match self.identity.resolve(key, entity)? {
            None => {
                self.identity.bind(key, entity, uid)?;
                Ok(true)
            }
            Some(existing) if existing == uid => Ok(true),
            Some(existing) => {
                debug!(key, entity = %entity, %existing, alias_for = %uid, "alias already bound");
                Ok(false)
            }
        }
    }

    /// Writes a relation unless the same `(origin, dest, kind)` was written before.
    pub fn relate(
        &mut self,
        kind: RelationKind,
        origin: Uid,
        dest: Uid,
        attributes: AttributeMap,
    ) -> Result<bool> {
        debug_assert!(origin < self.allocator.peek() && dest < self.allocator.peek());
        if !self.dedup.insert(origin, dest, kind) {
            return Ok(false);
        }
        let written = self
            .emitter
            .write_relation(&Relation::new(kind, origin, dest).with_attributes(attributes))?;
        if written {
            self.counters.relations += 1;
        }
        Ok(written)
    }

    /// Emits the relation now if its pending endpoint resolves, otherwise
    /// queues it for post-processing. Returns true when emitted.
    pub fn link_or_defer(&mut self, pending: PendingReference) -> Result<bool> {
        match self.resolve(&pending.pending_key, pending.pending_type())? {
            Some(uid) => {
                self.relate_pending(pending, uid)?;
                Ok(true)
            }
            None if pending.pending_key.is_empty() => Ok(false),
            None => {
                self.deferred.push(pending);
                Ok(false)
            }
        }
    }

    fn relate_pending(&mut self, pending: PendingReference, resolved: Uid) -> Result<bool> {
        let kind = pending.kind;
        let rel = pending.into_relation(resolved);
        self.relate(kind, rel.origin_uid, rel.dest_uid, rel.attributes)
    }

    /// Drains the deferred queue in insertion order.
    pub fn resolve_deferred(&mut self) -> Result<DeferredReport> {
        let pending: Vec<_> = self.deferred.drain().collect();
        let mut report = DeferredReport::default();
        for item in pending {
            match self.resolve(&item.pending_key, item.pending_type())? {
                Some(uid) => {
                    self.relate_pending(item, uid)?;
                    report.linked += 1;
                }
                None => {
                    debug!(
                        key = %item.pending_key,
                        kind = %item.kind,
                        known = %item.known,
                        "reference left isolated"
                    );
                    report.isolated += 1;
                }
            }
        }
        Ok(report)
    }

    /// Converts a recoverable error inside a record into a counted warning;
    /// fatal errors pass through.
    pub fn tolerate<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_recoverable() => {
                warn!(%err, "skipping part of record");
                self.counters.issues += 1;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// References waiting for post-processing.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Current totals.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Emitter line counts so far.
    pub fn emit_stats(&self) -> EmitStats {
        self.emitter.stats()
    }

    /// Flushes the identity store and closes every stream.
    pub fn finish(mut self) -> Result<FinishedBuild> {
        self.identity.flush()?;
        let emitted = self.emitter.close()?;
        Ok(FinishedBuild {
            emitted,
            identity: self.identity.stats(),
            bindings: self.identity.len(),
            duplicates_suppressed: self.dedup.suppressed(),
            counters: self.counters,
        })
    }
}
