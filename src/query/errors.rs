#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors raised by the query surface and the result materializer.
///
/// None of them touch build state; callers receive them as typed failures
/// and can branch on [`QueryError::code`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Raw query text was empty or whitespace.
    #[error("raw query text is empty")]
    EmptyQuery,
    /// A constraint named no field.
    #[error("constraint '{constraint}' has an empty field name")]
    EmptyField {
        /// The constraint as given.
        constraint: String,
    },
    /// A result cap of zero was requested.
    #[error("result cap must be at least 1")]
    InvalidCap,
    /// A path query allowed zero hops.
    #[error("path queries need max_hops >= 1")]
    InvalidHops,
    /// The driver cannot answer this kind of query.
    #[error("{driver} driver does not support {query} queries")]
    Unsupported {
        /// Driver name.
        driver: String,
        /// Query kind.
        query: &'static str,
    },
    /// A record lacked the requested column.
    #[error("record has no column '{column}'")]
    MissingColumn {
        /// Column name, or a description of the expected value.
        column: String,
    },
    /// A node carried no usable `uid` property.
    #[error("node {element} has no integer uid property")]
    MissingUid {
        /// Driver element id of the node.
        element: String,
    },
    /// A relationship endpoint was not materialized before the relationship.
    #[error("relationship {element} references node {endpoint} absent from the result")]
    DanglingRelationship {
        /// Driver element id of the relationship.
        element: String,
        /// Driver element id of the missing endpoint.
        endpoint: String,
    },
    /// A path's start or end node is not among its nodes.
    #[error("path {which} node {element} is not part of the path")]
    PathEndpointMissing {
        /// `start` or `end`.
        which: &'static str,
        /// Driver element id that was looked up.
        element: String,
    },
    /// The underlying driver failed.
    #[error("graph driver failure: {message}")]
    Driver {
        /// Driver-provided description.
        message: String,
    },
}

impl QueryError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::EmptyQuery => "EmptyQuery",
            QueryError::EmptyField { .. } => "EmptyField",
            QueryError::InvalidCap => "InvalidCap",
            QueryError::InvalidHops => "InvalidHops",
            QueryError::Unsupported { .. } => "Unsupported",
            QueryError::MissingColumn { .. } => "MissingColumn",
            QueryError::MissingUid { .. } => "MissingUid",
            QueryError::DanglingRelationship { .. } => "DanglingRelationship",
            QueryError::PathEndpointMissing { .. } => "PathEndpointMissing",
            QueryError::Driver { .. } => "Driver",
        }
    }
}

/// Result alias for the query surface.
pub type Result<T> = std::result::Result<T, QueryError>;
