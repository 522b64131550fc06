#![forbid(unsafe_code)]

//! Query surface over a built graph.
//!
//! A [`GraphDriver`] turns a [`Query`] into a forward-only record cursor; the
//! materializer converts records into [`Node`](crate::model::Node),
//! [`Path`](crate::model::Path) or [`Row`] values lazily, and
//! [`collect_capped`] bounds how many are pulled.

/// Driver-level record model and driver traits.
pub mod driver;
/// Query error type.
pub mod errors;
/// Graph loaded from bulk-import CSV files.
pub mod memory;
/// Record conversion and lazy iterators.
pub mod materialize;
/// Structured and raw requests.
pub mod request;
/// Capped collection.
pub mod result;

use tracing::debug;

pub use driver::{
    BoxCursor, DriverNode, DriverPath, DriverRecord, DriverRelationship, DriverValue, GraphDriver,
    Properties, RecordCursor, VecCursor,
};
pub use errors::{QueryError, Result};
pub use materialize::{CursorState, NodeIterator, PathIterator, RecordIterator, Row, RowIterator};
pub use memory::MemoryGraph;
pub use request::{Constraint, NodeQuery, PathQuery, Query, DEFAULT_ATTRIBUTE_PREFIX};
pub use result::{collect_capped, QueryResult};

use crate::config::DEFAULT_MAX_RESULTS;
use crate::model::{Node, Path};

/// Driver plus the defaults applied to every query run through it.
pub struct GraphSession<D: GraphDriver> {
    driver: D,
    max_results: usize,
    prefix: String,
}

impl<D: GraphDriver> GraphSession<D> {
    /// Session with the default cap and attribute prefix.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            max_results: DEFAULT_MAX_RESULTS,
            prefix: DEFAULT_ATTRIBUTE_PREFIX.to_owned(),
        }
    }

    /// Overrides the result cap.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Overrides the attribute prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Cap applied by the collecting helpers.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Underlying driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    fn open(&mut self, query: &Query) -> Result<BoxCursor> {
        if self.max_results == 0 {
            return Err(QueryError::InvalidCap);
        }
        query.validate()?;
        debug!(driver = self.driver.name(), query = %query.to_cypher_with_prefix(&self.prefix), "query.run");
        self.driver.run(query)
    }

    /// Lazy node iterator over the first node-valued column.
    pub fn stream_nodes(&mut self, query: &Query) -> Result<NodeIterator> {
        let cursor = self.open(query)?;
        Ok(NodeIterator::nodes(cursor, None, self.prefix.clone()))
    }

    /// Lazy path iterator over the first path-valued column.
    pub fn stream_paths(&mut self, query: &Query) -> Result<PathIterator> {
        let cursor = self.open(query)?;
        Ok(PathIterator::paths(cursor, None, self.prefix.clone()))
    }

    /// Lazy scalar rows.
    pub fn stream_rows(&mut self, query: &Query) -> Result<RowIterator> {
        let cursor = self.open(query)?;
        Ok(RowIterator::rows(cursor))
    }

    /// Up to the session cap of nodes.
    pub fn nodes(&mut self, query: &Query) -> Result<QueryResult<Node>> {
        let mut iter = self.stream_nodes(query)?;
        collect_capped(&mut iter, self.max_results)
    }

    /// Up to the session cap of paths.
    pub fn paths(&mut self, query: &Query) -> Result<QueryResult<Path>> {
        let mut iter = self.stream_paths(query)?;
        collect_capped(&mut iter, self.max_results)
    }

    /// Up to the session cap of rows.
    pub fn rows(&mut self, query: &Query) -> Result<QueryResult<Row>> {
        let mut iter = self.stream_rows(query)?;
        collect_capped(&mut iter, self.max_results)
    }
}
