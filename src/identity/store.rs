//! Backing stores for identity bindings.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use rustc_hash::FxHashMap;
use tempfile::TempDir;
use tracing::debug;

use crate::model::EntityType;
use crate::types::{BuildError, Result, Uid};

/// Key-value store mapping `(external key, entity type)` to an identity.
pub trait IdentityStore {
    /// Looks up a binding.
    fn get(&self, key: &str, entity: EntityType) -> Result<Option<Uid>>;
    /// Inserts a binding the caller has checked is absent.
    fn put(&mut self, key: &str, entity: EntityType, uid: Uid) -> Result<()>;
    /// Number of bindings held.
    fn len(&self) -> u64;
    /// True when nothing is bound.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Makes pending writes durable.
    fn flush(&mut self) -> Result<()>;
}

/// Purely in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: FxHashMap<EntityType, FxHashMap<String, Uid>>,
    len: u64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryStore {
    fn get(&self, key: &str, entity: EntityType) -> Result<Option<Uid>> {
        Ok(self
            .map
            .get(&entity)
            .and_then(|space| space.get(key))
            .copied())
    }

    fn put(&mut self, key: &str, entity: EntityType, uid: Uid) -> Result<()> {
        if self
            .map
            .entry(entity)
            .or_default()
            .insert(key.to_owned(), uid)
            .is_none()
        {
            self.len += 1;
        }
        Ok(())
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// SQLite-backed store for inputs too large to keep resident.
///
/// Writes are grouped into transactions of `commit_every` inserts. Lookups go
/// through the same connection and therefore see uncommitted bindings.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
    pending: usize,
    commit_every: usize,
    len: u64,
    _scratch: Option<TempDir>,
}

impl SqliteStore {
    /// Opens (or creates) the store at `path`. Existing bindings are kept.
    pub fn open(path: &Path, commit_every: usize) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                BuildError::resource(format!(
                    "cannot create identity cache directory {}: {err}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path).map_err(|err| {
            BuildError::resource(format!(
                "cannot open identity cache {}: {err}",
                path.display()
            ))
        })?;
        Self::init(conn, path.to_path_buf(), commit_every, None)
    }

    /// Creates an empty store at `path`, removing any previous file.
    pub fn create(path: &Path, commit_every: usize) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(path).map_err(|err| {
                BuildError::resource(format!(
                    "cannot reset identity cache {}: {err}",
                    path.display()
                ))
            })?;
        }
        Self::open(path, commit_every)
    }

    /// Opens a store inside a scratch directory removed on drop.
    pub fn scratch(commit_every: usize) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("biograph-identity")
            .tempdir()
            .map_err(|err| BuildError::resource(format!("cannot create identity scratch dir: {err}")))?;
        let path = dir.path().join("identity.db");
        let conn = Connection::open(&path)?;
        Self::init(conn, path, commit_every, Some(dir))
    }

    fn init(
        conn: Connection,
        path: PathBuf,
        commit_every: usize,
        scratch: Option<TempDir>,
    ) -> Result<Self> {
        // The cache is rebuilt from scratch on failure, so durability is not needed.
        conn.pragma_update(None, "journal_mode", "OFF")?;
        conn.pragma_update(None, "synchronous", "OFF")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS identity (
                key TEXT NOT NULL,
                entity TEXT NOT NULL,
                uid INTEGER NOT NULL,
                PRIMARY KEY (key, entity)
            ) WITHOUT ROWID",
            [],
        )?;
        let len: i64 = conn.query_row("SELECT COUNT(*) FROM identity", [], |row| row.get(0))?;
        conn.execute_batch("BEGIN")?;
        debug!(path = %path.display(), bindings = len, "identity store opened");
        Ok(Self {
            conn,
            path,
            pending: 0,
            commit_every: commit_every.max(1),
            len: len as u64,
            _scratch: scratch,
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for SqliteStore {
    fn get(&self, key: &str, entity: EntityType) -> Result<Option<Uid>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT uid FROM identity WHERE key = ?1 AND entity = ?2")?;
        let uid: Option<i64> = stmt
            .query_row(params![key, entity.as_str()], |row| row.get(0))
            .optional()?;
        Ok(uid.map(|v| Uid(v as u64)))
    }

    fn put(&mut self, key: &str, entity: EntityType, uid: Uid) -> Result<()> {
        {
            let mut stmt = self
                .conn
                .prepare_cached("INSERT INTO identity (key, entity, uid) VALUES (?1, ?2, ?3)")?;
            stmt.execute(params![key, entity.as_str(), uid.0 as i64])?;
        }
        self.len += 1;
        self.pending += 1;
        if self.pending >= self.commit_every {
            self.conn.execute_batch("COMMIT; BEGIN")?;
            self.pending = 0;
        }
        Ok(())
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT; BEGIN")?;
        self.pending = 0;
        Ok(())
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        let _ = self.conn.execute_batch("COMMIT");
    }
}
