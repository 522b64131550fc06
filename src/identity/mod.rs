#![forbid(unsafe_code)]

//! Identity allocation and resolution.
//!
//! The [`IdentityCache`] maps `(external key, entity type)` to a [`Uid`].
//! Bindings live in an [`IdentityStore`] (memory or SQLite) with an optional
//! LRU hot tier in front of the disk store. Identities come from a single
//! [`UidAllocator`] owned by the build context.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::model::EntityType;
use crate::types::{BuildError, Result, Uid};

/// Relation deduplication.
pub mod dedup;
/// Backing stores.
pub mod store;

pub use dedup::RelationDedup;
pub use store::{IdentityStore, MemoryStore, SqliteStore};

/// Monotonic identity allocator. Starts at 1; identities are never reused.
#[derive(Debug)]
pub struct UidAllocator {
    next: u64,
}

impl Default for UidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl UidAllocator {
    /// Allocator whose first identity is 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next unused identity.
    pub fn allocate(&mut self) -> Uid {
        debug_assert!(self.next <= Uid::MAX.0, "identity space exhausted");
        let uid = Uid(self.next);
        self.next += 1;
        uid
    }

    /// Identity the next call to [`UidAllocator::allocate`] returns.
    pub fn peek(&self) -> Uid {
        Uid(self.next)
    }
}

/// Where bindings are kept.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backing {
    /// Resident hash map.
    #[default]
    Memory,
    /// SQLite database file.
    Disk,
}

/// Options for [`IdentityCache::open`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityOptions {
    /// Store kind.
    pub backing: Backing,
    /// SQLite file for disk backing; a scratch directory is used when absent.
    pub path: Option<PathBuf>,
    /// Entries kept in the LRU tier in front of a disk store (0 disables it).
    pub hot_capacity: usize,
    /// Inserts per SQLite transaction.
    pub commit_every: usize,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            backing: Backing::Memory,
            path: None,
            hot_capacity: 100_000,
            commit_every: 10_000,
        }
    }
}

/// Counters exposed for build summaries.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct IdentityStats {
    /// Lookups answered by the LRU tier.
    pub hot_hits: u64,
    /// Lookups answered by the store.
    pub store_hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// New bindings written.
    pub binds: u64,
}

/// Outcome of [`IdentityCache::resolve_or_create`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Resolved {
    /// Identity bound to the key.
    pub uid: Uid,
    /// True only for the call that created the binding.
    pub created: bool,
}

type HotKey = (EntityType, String);

/// Persistent `(external key, entity type) -> Uid` map.
///
/// All methods take `&mut self`, so a key can only be created once per cache:
/// concurrent creation is ruled out by ownership rather than locking.
pub struct IdentityCache {
    store: Box<dyn IdentityStore>,
    hot: Option<LruCache<HotKey, Uid>>,
    stats: IdentityStats,
}

impl IdentityCache {
    /// In-memory cache.
    pub fn in_memory() -> Self {
        Self::with_store(Box::new(MemoryStore::new()), 0)
    }

    /// Wraps an arbitrary store.
    pub fn with_store(store: Box<dyn IdentityStore>, hot_capacity: usize) -> Self {
        Self {
            store,
            hot: NonZeroUsize::new(hot_capacity).map(LruCache::new),
            stats: IdentityStats::default(),
        }
    }

    /// Creates an empty cache for a new build according to `opts`. A disk
    /// store at an existing path is truncated first.
    pub fn open(opts: &IdentityOptions) -> Result<Self> {
        match opts.backing {
            Backing::Memory => Ok(Self::in_memory()),
            Backing::Disk => {
                let store = match &opts.path {
                    Some(path) => SqliteStore::create(path, opts.commit_every)?,
                    None => SqliteStore::scratch(opts.commit_every)?,
                };
                Ok(Self::with_store(Box::new(store), opts.hot_capacity))
            }
        }
    }

    /// Pure lookup.
    pub fn resolve(&mut self, key: &str, entity: EntityType) -> Result<Option<Uid>> {
        if let Some(hot) = self.hot.as_mut() {
            if let Some(uid) = hot.get(&(entity, key.to_owned())).copied() {
                self.stats.hot_hits += 1;
                return Ok(Some(uid));
            }
        }
        match self.store.get(key, entity)? {
            Some(uid) => {
                self.stats.store_hits += 1;
                if let Some(hot) = self.hot.as_mut() {
                    hot.put((entity, key.to_owned()), uid);
                }
                Ok(Some(uid))
            }
            None => {
                self.stats.misses += 1;
                Ok(None)
            }
        }
    }

    /// Binds `key` to `uid`. Rebinding to the same identity is a no-op;
    /// rebinding to a different one is an [`BuildError::IdentityConflict`].
    pub fn bind(&mut self, key: &str, entity: EntityType, uid: Uid) -> Result<()> {
        match self.resolve(key, entity)? {
            Some(existing) if existing == uid => Ok(()),
            Some(existing) => {
                error!(key, entity = %entity, %existing, attempted = %uid, "identity conflict");
                Err(BuildError::IdentityConflict {
                    key: key.to_owned(),
                    entity: entity.as_str().to_owned(),
                    existing,
                    attempted: uid,
                })
            }
            None => {
                self.store.put(key, entity, uid)?;
                if let Some(hot) = self.hot.as_mut() {
                    hot.put((entity, key.to_owned()), uid);
                }
                self.stats.binds += 1;
                Ok(())
            }
        }
    }

    /// Looks `key` up; on a miss allocates an identity, runs `factory` with
    /// it, then records the binding. `factory` runs at most once per key and
    /// a failing factory leaves the key unbound.
    pub fn resolve_or_create<F>(
        &mut self,
        key: &str,
        entity: EntityType,
        allocator: &mut UidAllocator,
        factory: F,
    ) -> Result<Resolved>
    where
        F: FnOnce(Uid) -> Result<()>,
    {
        if let Some(uid) = self.resolve(key, entity)? {
            return Ok(Resolved {
                uid,
                created: false,
            });
        }
        let uid = allocator.allocate();
        factory(uid)?;
        self.bind(key, entity, uid)?;
        Ok(Resolved { uid, created: true })
    }

    /// Number of bindings.
    pub fn len(&self) -> u64 {
        self.store.len()
    }

    /// True when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Lookup counters.
    pub fn stats(&self) -> IdentityStats {
        self.stats
    }

    /// Flushes the backing store.
    pub fn flush(&mut self) -> Result<()> {
        self.store.flush()
    }
}
