//! Capped result collection.

use std::time::{Duration, Instant};

use serde::Serialize;

use super::errors::{QueryError, Result};
use crate::pipeline::stage::as_millis;

/// Collected records plus the bookkeeping a caller needs to tell a full
/// result from a truncated one.
#[derive(Clone, Debug, Serialize)]
pub struct QueryResult<T> {
    /// Records in cursor order.
    pub records: Vec<T>,
    /// `records.len()`.
    pub count: usize,
    /// Wall time spent collecting.
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    /// Cap the collection ran under.
    pub max_results: usize,
    /// The cap was reached; more records may exist.
    pub truncated: bool,
}

impl<T> QueryResult<T> {
    /// True when no record matched.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pulls at most `max` items from `iter`, stopping at the first error.
///
/// Items past the cap are never requested from the underlying cursor.
pub fn collect_capped<T, I>(iter: &mut I, max: usize) -> Result<QueryResult<T>>
where
    I: Iterator<Item = Result<T>>,
{
    if max == 0 {
        return Err(QueryError::InvalidCap);
    }
    let started = Instant::now();
    let records = iter.by_ref().take(max).collect::<Result<Vec<T>>>()?;
    let count = records.len();
    Ok(QueryResult {
        records,
        count,
        elapsed: started.elapsed(),
        max_results: max,
        truncated: count == max,
    })
}
