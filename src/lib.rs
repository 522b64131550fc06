//! Biological property-graph builder.
//!
//! Source feeds of genes, proteins, miRNAs, panels, pathway elements and
//! variants are turned into bulk-import CSV files: one node file per entity
//! label, one relation file per relation type. Every node receives a stable
//! integer identity from the [`identity`] cache, so any entity reachable
//! through several feeds is written once. Built graphs can be read back and
//! queried through [`query`].

#![warn(missing_docs)]

pub mod builder;
pub mod config;
pub mod emit;
pub mod identity;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod source;
pub mod types;

pub use config::BuildConfig;
pub use pipeline::{BuildSummary, Pipeline};
pub use types::{BuildError, Result, Uid};
