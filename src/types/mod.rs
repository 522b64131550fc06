#![forbid(unsafe_code)]

//! Identity newtype and the build error taxonomy shared by every module.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::errors::QueryError;

/// Process-unique identity assigned once per logical entity.
///
/// Values start at 1 and never exceed `i64::MAX` so they survive round trips
/// through SQLite integers and bulk-loader `ID` columns.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u64);

impl Uid {
    /// Largest identity the allocator hands out (63 bits).
    pub const MAX: Uid = Uid(i64::MAX as u64);
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Uid {
    fn from(value: u64) -> Self {
        Uid(value)
    }
}

impl From<Uid> for u64 {
    fn from(value: Uid) -> Self {
        value.0
    }
}

/// Errors raised while building or reading a graph.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    /// A single malformed or incomplete input record.
    #[error("skipping source record '{key}': {reason}")]
    SourceRecord {
        /// Identifying key of the record (or line number when no key parsed).
        key: String,
        /// What was wrong with it.
        reason: String,
    },
    /// Record primary label has no registered attribute schema.
    #[error("no attribute schema registered for label '{label}'")]
    SchemaMismatch {
        /// The unregistered label.
        label: String,
    },
    /// The same external key was bound to two different identities.
    #[error("identity conflict for {entity} '{key}': bound to {existing}, attempted {attempted}")]
    IdentityConflict {
        /// External key.
        key: String,
        /// Entity type namespace.
        entity: String,
        /// Identity already bound.
        existing: Uid,
        /// Identity that was rejected.
        attempted: Uid,
    },
    /// Missing input, unwritable output or unavailable cache.
    #[error("{context}")]
    Resource {
        /// Human readable description of the failing resource.
        context: String,
    },
    /// I/O failure on an input or output file.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// CSV writer or reader failure.
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),
    /// Persistent identity store failure.
    #[error("identity store: {0}")]
    Store(#[from] rusqlite::Error),
    /// Malformed JSON payload in a source feed.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Query surface failure.
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl BuildError {
    /// Builds a [`BuildError::SourceRecord`].
    pub fn source_record(key: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildError::SourceRecord {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`BuildError::Resource`].
    pub fn resource(context: impl Into<String>) -> Self {
        BuildError::Resource {
            context: context.into(),
        }
    }

    /// Returns true when the orchestrator may skip the record and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BuildError::SourceRecord { .. } | BuildError::SchemaMismatch { .. }
        )
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BuildError>;
