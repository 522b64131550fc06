//! In-process graph loaded from a bulk-import directory.
//!
//! Answers structured node and path queries the way a graph database would,
//! so built output can be inspected without an external server.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use super::driver::{
    BoxCursor, DriverNode, DriverPath, DriverRecord, DriverRelationship, DriverValue, GraphDriver,
    Properties, RecordCursor,
};
use super::errors::{QueryError, Result as QueryResult};
use super::request::{Constraint, NodeQuery, PathQuery, Query};
use crate::emit::{CsvOptions, FILE_EXTENSION};
use crate::types::{BuildError, Result};

const NODE_HEADER: &str = "uid:ID(";
const START_HEADER: &str = ":START_ID(";

#[derive(Debug, Default)]
struct GraphData {
    nodes: Vec<DriverNode>,
    by_element: FxHashMap<String, usize>,
    relationships: Vec<DriverRelationship>,
    outgoing: Vec<Vec<usize>>,
}

/// Read-only graph over the CSV files of one build.
#[derive(Clone, Debug)]
pub struct MemoryGraph {
    data: Arc<GraphData>,
    prefix: String,
}

impl MemoryGraph {
    /// Loads every node file, then every relation file, under `dir`.
    ///
    /// Relation rows whose endpoints are unknown are skipped with a warning.
    pub fn load(dir: impl AsRef<Path>, opts: &CsvOptions) -> Result<Self> {
        let dir = dir.as_ref();
        opts.validate()?;
        let files = csv_files(dir)?;
        let mut data = GraphData::default();
        let mut relation_files = Vec::new();
        for path in files {
            let mut reader = reader(&path, opts)?;
            let header = reader.headers()?.clone();
            match header.get(0) {
                Some(first) if first.starts_with(NODE_HEADER) => {
                    load_nodes(&mut data, &mut reader, &header, opts, &path)?
                }
                Some(first) if first.starts_with(START_HEADER) => relation_files.push(path),
                _ => warn!(file = %path.display(), "ignoring file without a bulk-import header"),
            }
        }
        for path in relation_files {
            load_relations(&mut data, &path, opts)?;
        }
        debug!(
            nodes = data.nodes.len(),
            relationships = data.relationships.len(),
            "graph.loaded"
        );
        Ok(Self {
            data: Arc::new(data),
            prefix: opts.attribute_prefix.clone(),
        })
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.data.nodes.len()
    }

    /// Number of relationships.
    pub fn relationship_count(&self) -> usize {
        self.data.relationships.len()
    }

    /// Attribute prefix the files were written with.
    pub fn attribute_prefix(&self) -> &str {
        &self.prefix
    }
}

impl GraphDriver for MemoryGraph {
    fn name(&self) -> &str {
        "memory"
    }

    fn run(&mut self, query: &Query) -> QueryResult<BoxCursor> {
        query.validate()?;
        match query {
            Query::Nodes(q) => Ok(Box::new(NodeScan {
                data: Arc::clone(&self.data),
                query: q.clone(),
                prefix: self.prefix.clone(),
                next: 0,
            })),
            Query::Paths(q) => Ok(Box::new(PathScan {
                data: Arc::clone(&self.data),
                query: q.clone(),
                prefix: self.prefix.clone(),
                next_start: 0,
                pending: VecDeque::new(),
            })),
            Query::Raw(_) => Err(QueryError::Unsupported {
                driver: self.name().to_owned(),
                query: query.kind(),
            }),
        }
    }
}

fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|err| {
        BuildError::resource(format!("cannot read graph directory {}: {err}", dir.display()))
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn reader(path: &Path, opts: &CsvOptions) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(opts.separator_byte())
        .quoting(false)
        .has_headers(true)
        .from_path(path)
        .map_err(BuildError::from)
}

fn space(header: &str, prefix: &str) -> String {
    header
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or_default()
        .to_owned()
}

fn load_nodes(
    data: &mut GraphData,
    reader: &mut csv::Reader<std::fs::File>,
    header: &csv::StringRecord,
    opts: &CsvOptions,
    path: &Path,
) -> Result<()> {
    let label = space(header.get(0).unwrap_or_default(), NODE_HEADER);
    for row in reader.records() {
        let row = row?;
        let Some(uid) = row.get(0).and_then(|raw| raw.parse::<i64>().ok()) else {
            warn!(file = %path.display(), line = ?row.position().map(|p| p.line()), "node row without integer uid");
            continue;
        };
        let mut properties = Properties::new();
        properties.insert("uid".into(), DriverValue::Int(uid));
        for (column, raw) in header.iter().zip(row.iter()).skip(1) {
            if raw.is_empty() || raw == opts.missing_value {
                continue;
            }
            let value = if opts.strip_attribute_prefix(column).is_some() {
                opts.parse_field(raw).map(driver_value)
            } else {
                Some(DriverValue::Str(raw.to_owned()))
            };
            if let Some(value) = value {
                properties.insert(column.to_owned(), value);
            }
        }
        let element_id = uid.to_string();
        if data.by_element.contains_key(&element_id) {
            warn!(uid, file = %path.display(), "duplicate node uid, keeping the first");
            continue;
        }
        data.by_element.insert(element_id.clone(), data.nodes.len());
        data.nodes.push(DriverNode {
            element_id,
            labels: vec![label.clone()],
            properties,
        });
        data.outgoing.push(Vec::new());
    }
    Ok(())
}

fn load_relations(data: &mut GraphData, path: &Path, opts: &CsvOptions) -> Result<()> {
    let rel_type = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_owned();
    let mut reader = reader(path, opts)?;
    let header = reader.headers()?.clone();
    let mut skipped = 0u64;
    for row in reader.records() {
        let row = row?;
        let (Some(start), Some(end)) = (row.get(0), row.get(1)) else {
            skipped += 1;
            continue;
        };
        let Some(&origin) = data.by_element.get(start) else {
            skipped += 1;
            continue;
        };
        if !data.by_element.contains_key(end) {
            skipped += 1;
            continue;
        }
        let properties = header
            .iter()
            .zip(row.iter())
            .skip(2)
            .filter_map(|(column, raw)| {
                opts.parse_field(raw)
                    .map(|value| (column.to_owned(), driver_value(value)))
            })
            .collect();
        let idx = data.relationships.len();
        data.relationships.push(DriverRelationship {
            element_id: format!("r{idx}"),
            start: start.to_owned(),
            end: end.to_owned(),
            rel_type: rel_type.clone(),
            properties,
        });
        data.outgoing[origin].push(idx);
    }
    if skipped > 0 {
        warn!(file = %path.display(), skipped, "relation rows with unknown endpoints skipped");
    }
    Ok(())
}

fn driver_value(value: crate::model::AttrValue) -> DriverValue {
    use crate::model::AttrValue;
    match value {
        AttrValue::Str(s) | AttrValue::Other(s) => DriverValue::Str(s),
        AttrValue::Int(v) => DriverValue::Int(v),
        AttrValue::Float(v) => DriverValue::Float(v),
        AttrValue::Bool(v) => DriverValue::Bool(v),
        AttrValue::List(items) => DriverValue::List(items.into_iter().map(DriverValue::Str).collect()),
    }
}

fn value_matches(value: &DriverValue, expected: &str) -> bool {
    match value {
        DriverValue::Str(s) => s == expected,
        DriverValue::Int(v) => expected.parse::<i64>().is_ok_and(|e| e == *v),
        DriverValue::Float(v) => expected.parse::<f64>().is_ok_and(|e| e == *v),
        DriverValue::Bool(v) => expected.parse::<bool>().is_ok_and(|e| e == *v),
        DriverValue::List(items) => items.iter().any(|item| value_matches(item, expected)),
        _ => false,
    }
}

fn satisfies(node: &DriverNode, constraint: &Constraint, prefix: &str) -> bool {
    let key = if constraint.is_core() {
        constraint.field.clone()
    } else {
        format!("{prefix}{}", constraint.field)
    };
    node.properties
        .get(&key)
        .is_some_and(|value| value_matches(value, &constraint.value))
}

fn matches(node: &DriverNode, query: &NodeQuery, prefix: &str) -> bool {
    if let Some(label) = &query.label {
        if node.labels.first() != Some(label) {
            return false;
        }
    }
    query.constraints.iter().all(|c| satisfies(node, c, prefix))
}

struct NodeScan {
    data: Arc<GraphData>,
    query: NodeQuery,
    prefix: String,
    next: usize,
}

impl RecordCursor for NodeScan {
    fn try_next(&mut self) -> QueryResult<Option<DriverRecord>> {
        while let Some(node) = self.data.nodes.get(self.next) {
            self.next += 1;
            if matches(node, &self.query, &self.prefix) {
                return Ok(Some(DriverRecord::single("n", DriverValue::Node(node.clone()))));
            }
        }
        Ok(None)
    }
}

/// Breadth-first search from each matching start node; one shortest path per
/// reached end node, produced one start node at a time.
struct PathScan {
    data: Arc<GraphData>,
    query: PathQuery,
    prefix: String,
    next_start: usize,
    pending: VecDeque<DriverPath>,
}

impl PathScan {
    fn expand(&mut self, start: usize) {
        let data = &self.data;
        let mut parent: FxHashMap<usize, (usize, usize)> = FxHashMap::default();
        let mut seen = FxHashSet::default();
        seen.insert(start);
        let mut frontier = vec![start];
        for _ in 0..self.query.max_hops {
            let mut next = Vec::new();
            for &node in &frontier {
                for &rel_idx in &data.outgoing[node] {
                    let rel = &data.relationships[rel_idx];
                    let Some(&target) = data.by_element.get(&rel.end) else {
                        continue;
                    };
                    if !seen.insert(target) {
                        continue;
                    }
                    parent.insert(target, (node, rel_idx));
                    next.push(target);
                    if matches(&data.nodes[target], &self.query.to, &self.prefix) {
                        self.pending.push_back(trace(data, start, target, &parent));
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
    }
}

fn trace(
    data: &GraphData,
    start: usize,
    end: usize,
    parent: &FxHashMap<usize, (usize, usize)>,
) -> DriverPath {
    let mut nodes = vec![data.nodes[end].clone()];
    let mut relationships = Vec::new();
    let mut cursor = end;
    while cursor != start {
        let Some(&(prev, rel_idx)) = parent.get(&cursor) else {
            break;
        };
        relationships.push(data.relationships[rel_idx].clone());
        nodes.push(data.nodes[prev].clone());
        cursor = prev;
    }
    nodes.reverse();
    relationships.reverse();
    DriverPath {
        start: data.nodes[start].element_id.clone(),
        end: data.nodes[end].element_id.clone(),
        nodes,
        relationships,
    }
}

impl RecordCursor for PathScan {
    fn try_next(&mut self) -> QueryResult<Option<DriverRecord>> {
        loop {
            if let Some(path) = self.pending.pop_front() {
                return Ok(Some(DriverRecord::single("p", DriverValue::Path(path))));
            }
            let Some(node) = self.data.nodes.get(self.next_start) else {
                return Ok(None);
            };
            let start = self.next_start;
            self.next_start += 1;
            if matches(node, &self.query.from, &self.prefix) {
                self.expand(start);
            }
        }
    }
}
