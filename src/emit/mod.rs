#![forbid(unsafe_code)]

//! Bulk-load CSV emission.
//!
//! One append-only stream per node type and per relation kind. Each stream
//! writes its header when first opened; afterwards every line carries exactly
//! the header's column count because values are sanitised and absent
//! attributes are replaced by a placeholder.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{Node, Relation, RelationKind, RelationLabel};
use crate::types::{BuildError, Result};

/// Formatting options.
pub mod options;
/// Column schemas and headers.
pub mod schema;

pub use options::CsvOptions;
pub use schema::{relation_header, NodeSchema, SchemaRegistry};

/// File extension of every emitted stream.
pub const FILE_EXTENSION: &str = "csv";

/// Line counts per stream, reported at close.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EmitStats {
    /// Node lines per primary label.
    pub nodes: BTreeMap<String, u64>,
    /// Relation lines per rendered relation label.
    pub relations: BTreeMap<String, u64>,
    /// Records dropped because their label had no schema.
    pub dropped: u64,
}

impl EmitStats {
    /// Total node lines.
    pub fn node_total(&self) -> u64 {
        self.nodes.values().sum()
    }

    /// Total relation lines.
    pub fn relation_total(&self) -> u64 {
        self.relations.values().sum()
    }
}

struct Stream {
    writer: Writer<File>,
    width: usize,
    lines: u64,
}

impl Stream {
    fn create(path: &Path, opts: &CsvOptions, header: &[String]) -> Result<Self> {
        let mut writer = WriterBuilder::new()
            .delimiter(opts.separator_byte())
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(header)?;
        debug!(path = %path.display(), columns = header.len(), "stream opened");
        Ok(Self {
            writer,
            width: header.len(),
            lines: 0,
        })
    }

    fn write(&mut self, row: &[String]) -> Result<()> {
        debug_assert_eq!(row.len(), self.width);
        self.writer.write_record(row)?;
        self.lines += 1;
        Ok(())
    }
}

/// Writer set for one build's output directory.
pub struct CsvEmitter {
    dir: PathBuf,
    options: CsvOptions,
    schemas: SchemaRegistry,
    nodes: BTreeMap<String, Stream>,
    relations: BTreeMap<RelationKind, Stream>,
    warned: BTreeSet<String>,
    dropped: u64,
}

impl CsvEmitter {
    /// Creates the output directory (if needed) with the built-in catalogue.
    pub fn create(dir: impl Into<PathBuf>, options: CsvOptions) -> Result<Self> {
        Self::with_schemas(dir, options, SchemaRegistry::catalogue())
    }

    /// Creates the output directory with an explicit schema registry.
    pub fn with_schemas(
        dir: impl Into<PathBuf>,
        options: CsvOptions,
        schemas: SchemaRegistry,
    ) -> Result<Self> {
        options.validate()?;
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|err| {
            BuildError::resource(format!(
                "output directory {} is not writable: {err}",
                dir.display()
            ))
        })?;
        Ok(Self {
            dir,
            options,
            schemas,
            nodes: BTreeMap::new(),
            relations: BTreeMap::new(),
            warned: BTreeSet::new(),
            dropped: 0,
        })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Formatting options in effect.
    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    /// Path of the node file for `label`.
    pub fn node_path(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}.{FILE_EXTENSION}"))
    }

    /// Path of the relation file for `kind`.
    pub fn relation_path(&self, kind: RelationKind) -> PathBuf {
        self.dir.join(format!("{kind}.{FILE_EXTENSION}"))
    }

    /// Opens the stream of `label`, writing its header on first use.
    pub fn open_node_stream(&mut self, label: &str) -> Result<()> {
        if self.nodes.contains_key(label) {
            return Ok(());
        }
        let schema = self
            .schemas
            .node(label)
            .ok_or_else(|| BuildError::SchemaMismatch {
                label: label.to_owned(),
            })?;
        let header = schema.header(&self.options);
        let stream = Stream::create(&self.node_path(label), &self.options, &header)?;
        self.nodes.insert(label.to_owned(), stream);
        Ok(())
    }

    /// Opens the stream of `kind`, writing its header on first use.
    pub fn open_relation_stream(&mut self, kind: RelationKind) -> Result<()> {
        if self.relations.contains_key(&kind) {
            return Ok(());
        }
        let header = relation_header(kind, &self.options);
        let stream = Stream::create(&self.relation_path(kind), &self.options, &header)?;
        self.relations.insert(kind, stream);
        Ok(())
    }

    /// Writes one node line. Returns `Ok(false)` when the node was dropped
    /// because its primary label has no schema.
    pub fn write_node(&mut self, node: &Node) -> Result<bool> {
        let label = node.primary_label().unwrap_or_default().to_owned();
        let columns = match self.schemas.node(&label) {
            Some(schema) => schema.columns.clone(),
            None => {
                self.drop_record(&label);
                return Ok(false);
            }
        };
        self.open_node_stream(&label)?;

        let opts = &self.options;
        let mut row = Vec::with_capacity(3 + columns.len());
        row.push(node.uid.to_string());
        row.push(opts.sanitize(&node.external_id));
        row.push(opts.sanitize(&node.display_name));
        for col in &columns {
            row.push(opts.format_value(node.attributes.get(col)));
        }
        match self.nodes.get_mut(&label) {
            Some(stream) => stream.write(&row)?,
            None => return Err(BuildError::resource(format!("node stream {label} not open"))),
        }
        Ok(true)
    }

    /// Writes one relation line. Relations whose label is not a catalogued
    /// triple are dropped like unregistered node labels.
    pub fn write_relation(&mut self, relation: &Relation) -> Result<bool> {
        let kind = match &relation.label {
            RelationLabel::Known(kind) => *kind,
            RelationLabel::Other { label, .. } => {
                let label = label.clone();
                self.drop_record(&label);
                return Ok(false);
            }
        };
        self.open_relation_stream(kind)?;

        let columns = kind.attribute_columns();
        let mut row = Vec::with_capacity(2 + columns.len());
        row.push(relation.origin_uid.to_string());
        row.push(relation.dest_uid.to_string());
        for col in columns {
            row.push(self.options.format_value(relation.attributes.get(*col)));
        }
        match self.relations.get_mut(&kind) {
            Some(stream) => stream.write(&row)?,
            None => return Err(BuildError::resource(format!("relation stream {kind} not open"))),
        }
        Ok(true)
    }

    fn drop_record(&mut self, label: &str) {
        self.dropped += 1;
        if self.warned.insert(label.to_owned()) {
            let err = BuildError::SchemaMismatch {
                label: label.to_owned(),
            };
            warn!(%err, "dropping records with unregistered label");
        }
    }

    /// Current line counts.
    pub fn stats(&self) -> EmitStats {
        EmitStats {
            nodes: self
                .nodes
                .iter()
                .map(|(label, s)| (label.clone(), s.lines))
                .collect(),
            relations: self
                .relations
                .iter()
                .map(|(kind, s)| (kind.to_string(), s.lines))
                .collect(),
            dropped: self.dropped,
        }
    }

    /// Flushes and closes every stream. Consumes the emitter, so streams
    /// are closed exactly once.
    pub fn close(mut self) -> Result<EmitStats> {
        let stats = self.stats();
        for stream in self.nodes.values_mut() {
            stream.writer.flush()?;
        }
        for stream in self.relations.values_mut() {
            stream.writer.flush()?;
        }
        debug!(
            dir = %self.dir.display(),
            nodes = stats.node_total(),
            relations = stats.relation_total(),
            "streams closed"
        );
        Ok(stats)
    }
}
