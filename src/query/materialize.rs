//! Conversion of driver records into the graph record model.

use std::collections::HashMap;

use crate::model::{AttrValue, AttributeMap, Node, Path, Relation, RelationKind, RelationLabel};
use crate::types::Uid;

use super::driver::{BoxCursor, DriverNode, DriverPath, DriverRecord, DriverRelationship, DriverValue, Properties};
use super::errors::{QueryError, Result};

/// Converts a scalar driver value; graph values are rendered as text.
pub fn attr_value(value: &DriverValue) -> Option<AttrValue> {
    match value {
        DriverValue::Null => None,
        DriverValue::Bool(v) => Some(AttrValue::Bool(*v)),
        DriverValue::Int(v) => Some(AttrValue::Int(*v)),
        DriverValue::Float(v) => Some(AttrValue::Float(*v)),
        DriverValue::Str(v) => Some(AttrValue::Str(v.clone())),
        DriverValue::List(items) => Some(AttrValue::List(
            items
                .iter()
                .filter_map(attr_value)
                .map(|v| v.to_string())
                .collect(),
        )),
        DriverValue::Node(node) => Some(AttrValue::Other(format!("node:{}", node.element_id))),
        DriverValue::Relationship(rel) => Some(AttrValue::Other(format!(
            "relationship:{}:{}",
            rel.rel_type, rel.element_id
        ))),
        DriverValue::Path(path) => Some(AttrValue::Other(format!(
            "path:{}->{}",
            path.start, path.end
        ))),
    }
}

fn text(props: &Properties, key: &str) -> String {
    match props.get(key) {
        Some(DriverValue::Str(s)) => s.clone(),
        Some(DriverValue::Null) | None => String::new(),
        Some(other) => attr_value(other).map(|v| v.to_string()).unwrap_or_default(),
    }
}

fn prefixed_attributes(props: &Properties, prefix: &str) -> AttributeMap {
    props
        .iter()
        .filter_map(|(key, value)| {
            let name = key.strip_prefix(prefix)?;
            Some((name.to_owned(), attr_value(value)?))
        })
        .collect()
}

/// Node conversion: `uid` is required, `id` and `name` are optional, every
/// prefixed property becomes an attribute with the prefix stripped.
pub fn node(raw: &DriverNode, prefix: &str) -> Result<Node> {
    let uid = match raw.properties.get("uid") {
        Some(DriverValue::Int(v)) if *v >= 0 => Uid(*v as u64),
        Some(DriverValue::Str(s)) => s.parse().map(Uid).map_err(|_| QueryError::MissingUid {
            element: raw.element_id.clone(),
        })?,
        _ => {
            return Err(QueryError::MissingUid {
                element: raw.element_id.clone(),
            })
        }
    };
    Ok(Node {
        uid,
        external_id: text(&raw.properties, "id"),
        display_name: text(&raw.properties, "name"),
        labels: raw.labels.clone(),
        attributes: prefixed_attributes(&raw.properties, prefix),
    })
}

/// Nodes already materialized in the current result, keyed by element id.
pub type NodeMap = HashMap<String, Node>;

/// Relation conversion. Both endpoints must already be in `nodes`.
pub fn relation(raw: &DriverRelationship, nodes: &NodeMap, prefix: &str) -> Result<Relation> {
    let endpoint = |element: &str| {
        nodes
            .get(element)
            .ok_or_else(|| QueryError::DanglingRelationship {
                element: raw.element_id.clone(),
                endpoint: element.to_owned(),
            })
    };
    let origin = endpoint(&raw.start)?;
    let dest = endpoint(&raw.end)?;
    let label = match RelationKind::parse(&raw.rel_type) {
        Some(kind) => RelationLabel::Known(kind),
        None => RelationLabel::Other {
            label: raw.rel_type.clone(),
            origin: origin.primary_label().unwrap_or_default().to_owned(),
            dest: dest.primary_label().unwrap_or_default().to_owned(),
        },
    };
    let uid = match raw.properties.get("uid") {
        Some(DriverValue::Int(v)) if *v >= 0 => Some(Uid(*v as u64)),
        _ => None,
    };
    Ok(Relation {
        uid,
        label,
        origin_uid: origin.uid,
        dest_uid: dest.uid,
        attributes: prefixed_attributes(&raw.properties, prefix),
    })
}

/// Path conversion: nodes first, then relations, then endpoint positions.
pub fn path(raw: &DriverPath, prefix: &str) -> Result<Path> {
    let mut nodes = Vec::with_capacity(raw.nodes.len());
    let mut by_element = NodeMap::with_capacity(raw.nodes.len());
    let mut position = HashMap::with_capacity(raw.nodes.len());
    for driver_node in &raw.nodes {
        if by_element.contains_key(&driver_node.element_id) {
            continue;
        }
        let node = node(driver_node, prefix)?;
        position.insert(driver_node.element_id.clone(), nodes.len());
        by_element.insert(driver_node.element_id.clone(), node.clone());
        nodes.push(node);
    }
    let relations = raw
        .relationships
        .iter()
        .map(|rel| relation(rel, &by_element, prefix))
        .collect::<Result<Vec<_>>>()?;
    let locate = |which: &'static str, element: &str| {
        position
            .get(element)
            .copied()
            .ok_or_else(|| QueryError::PathEndpointMissing {
                which,
                element: element.to_owned(),
            })
    };
    Ok(Path {
        start: locate("start", &raw.start)?,
        end: locate("end", &raw.end)?,
        nodes,
        relations,
    })
}

/// Nodes and relations of one record, nodes materialized first so every
/// relation finds its endpoints.
pub fn subgraph(record: &DriverRecord, prefix: &str) -> Result<(Vec<Node>, Vec<Relation>)> {
    let mut map = NodeMap::new();
    let mut nodes = Vec::new();
    for (_, value) in record.iter() {
        if let DriverValue::Node(raw) = value {
            let node = node(raw, prefix)?;
            map.insert(raw.element_id.clone(), node.clone());
            nodes.push(node);
        }
    }
    let relations = record
        .iter()
        .filter_map(|(_, value)| match value {
            DriverValue::Relationship(rel) => Some(relation(rel, &map, prefix)),
            _ => None,
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((nodes, relations))
}

/// One scalar row.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    /// Column names in record order.
    pub columns: Vec<String>,
    /// Values; `None` for nulls.
    pub values: Vec<Option<AttrValue>>,
}

impl Row {
    /// Value of `column`.
    pub fn get(&self, column: &str) -> Option<&AttrValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
            .and_then(Option::as_ref)
    }

    fn from_record(record: DriverRecord) -> Self {
        let values = record.values.iter().map(attr_value).collect();
        Self {
            columns: record.keys,
            values,
        }
    }
}

fn pick<'r>(record: &'r DriverRecord, column: Option<&str>, wanted: &str) -> Result<&'r DriverValue> {
    let found = match column {
        Some(column) => record.get(column),
        None => record.values.iter().find(|v| match wanted {
            "node" => matches!(v, DriverValue::Node(_)),
            _ => matches!(v, DriverValue::Path(_)),
        }),
    };
    found.ok_or_else(|| QueryError::MissingColumn {
        column: column.unwrap_or(wanted).to_owned(),
    })
}

/// Lifecycle of a materializing iterator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CursorState {
    /// Created; the cursor has not been advanced.
    Opened,
    /// At least one record pulled, more may follow.
    Advancing,
    /// The cursor reported its end or failed; no further pulls.
    Exhausted,
}

type Convert<T> = Box<dyn FnMut(DriverRecord) -> Result<T>>;

/// Forward-only iterator converting driver records on demand.
///
/// [`RecordIterator::has_next`] pulls at most one record ahead; iteration
/// itself pulls exactly one record per item, so a consumer that stops early
/// leaves the cursor where it stopped.
pub struct RecordIterator<T> {
    cursor: BoxCursor,
    convert: Convert<T>,
    state: CursorState,
    peeked: Option<Result<T>>,
    pulled: u64,
}

/// Iterator over materialized nodes.
pub type NodeIterator = RecordIterator<Node>;
/// Iterator over scalar rows.
pub type RowIterator = RecordIterator<Row>;
/// Iterator over materialized paths.
pub type PathIterator = RecordIterator<Path>;

impl<T> RecordIterator<T> {
    fn with_converter(cursor: BoxCursor, convert: Convert<T>) -> Self {
        Self {
            cursor,
            convert,
            state: CursorState::Opened,
            peeked: None,
            pulled: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Records pulled from the cursor so far.
    pub fn pulled(&self) -> u64 {
        self.pulled
    }

    /// True when another item is available.
    pub fn has_next(&mut self) -> bool {
        if self.peeked.is_some() {
            return true;
        }
        if self.state == CursorState::Exhausted {
            return false;
        }
        match self.cursor.try_next() {
            Ok(Some(record)) => {
                self.pulled += 1;
                self.state = CursorState::Advancing;
                self.peeked = Some((self.convert)(record));
                true
            }
            Ok(None) => {
                self.state = CursorState::Exhausted;
                false
            }
            Err(err) => {
                self.state = CursorState::Exhausted;
                self.peeked = Some(Err(err));
                true
            }
        }
    }
}

impl NodeIterator {
    /// Nodes from `column`, or from the first node-valued column.
    pub fn nodes(cursor: BoxCursor, column: Option<String>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::with_converter(
            cursor,
            Box::new(move |record| match pick(&record, column.as_deref(), "node")? {
                DriverValue::Node(raw) => node(raw, &prefix),
                _ => Err(QueryError::MissingColumn {
                    column: column.clone().unwrap_or_else(|| "node".to_owned()),
                }),
            }),
        )
    }
}

impl RowIterator {
    /// Every record as a scalar row.
    pub fn rows(cursor: BoxCursor) -> Self {
        Self::with_converter(cursor, Box::new(|record| Ok(Row::from_record(record))))
    }
}

impl PathIterator {
    /// Paths from `column`, or from the first path-valued column.
    pub fn paths(cursor: BoxCursor, column: Option<String>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::with_converter(
            cursor,
            Box::new(move |record| match pick(&record, column.as_deref(), "path")? {
                DriverValue::Path(raw) => path(raw, &prefix),
                _ => Err(QueryError::MissingColumn {
                    column: column.clone().unwrap_or_else(|| "path".to_owned()),
                }),
            }),
        )
    }
}

impl<T> Iterator for RecordIterator<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_next() {
            self.peeked.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::driver::VecCursor;

    fn driver_node(element: &str, uid: i64, label: &str) -> DriverNode {
        let mut properties = Properties::new();
        properties.insert("uid".into(), DriverValue::Int(uid));
        properties.insert("id".into(), DriverValue::Str(format!("ext-{uid}")));
        properties.insert("attr_biotype".into(), DriverValue::Str("lncRNA".into()));
        properties.insert("score".into(), DriverValue::Float(1.0));
        DriverNode {
            element_id: element.into(),
            labels: vec![label.into(), "EXTRA".into()],
            properties,
        }
    }

    fn rel(element: &str, start: &str, end: &str, ty: &str) -> DriverRelationship {
        DriverRelationship {
            element_id: element.into(),
            start: start.into(),
            end: end.into(),
            rel_type: ty.into(),
            properties: Properties::new(),
        }
    }

    #[test]
    fn node_strips_prefix_and_keeps_label_order() {
        let n = node(&driver_node("e1", 7, "GENE"), "attr_").unwrap();
        assert_eq!(n.uid, Uid(7));
        assert_eq!(n.external_id, "ext-7");
        assert_eq!(n.display_name, "");
        assert_eq!(n.primary_label(), Some("GENE"));
        assert_eq!(n.attributes.len(), 1);
        assert_eq!(n.attribute("biotype"), Some(&AttrValue::Str("lncRNA".into())));
    }

    #[test]
    fn node_without_uid_is_rejected() {
        let mut raw = driver_node("e1", 1, "GENE");
        raw.properties.remove("uid");
        assert_eq!(node(&raw, "attr_").unwrap_err().code(), "MissingUid");
    }

    #[test]
    fn relation_needs_both_endpoints() {
        let mut map = NodeMap::new();
        map.insert("a".into(), node(&driver_node("a", 1, "DNA"), "attr_").unwrap());
        let err = relation(&rel("r", "a", "b", "IS___DNA___GENE"), &map, "attr_").unwrap_err();
        assert!(matches!(err, QueryError::DanglingRelationship { ref endpoint, .. } if endpoint == "b"));

        map.insert("b".into(), node(&driver_node("b", 2, "GENE"), "attr_").unwrap());
        let ok = relation(&rel("r", "a", "b", "IS___DNA___GENE"), &map, "attr_").unwrap();
        assert!(matches!(ok.label, RelationLabel::Known(_)));
        let other = relation(&rel("r", "a", "b", "LIKES"), &map, "attr_").unwrap();
        assert_eq!(other.origin_type(), "DNA");
        assert_eq!(other.dest_type(), "GENE");
    }

    #[test]
    fn path_records_endpoint_positions() {
        let raw = DriverPath {
            nodes: vec![driver_node("a", 1, "PANEL"), driver_node("b", 2, "GENE")],
            relationships: vec![rel("r", "a", "b", "HAS___PANEL___GENE")],
            start: "a".into(),
            end: "b".into(),
        };
        let p = path(&raw, "attr_").unwrap();
        assert_eq!((p.start, p.end, p.len()), (0, 1, 1));
        assert_eq!(p.end_node().map(|n| n.uid), Some(Uid(2)));

        let broken = DriverPath {
            end: "zz".into(),
            ..raw
        };
        assert_eq!(path(&broken, "attr_").unwrap_err().code(), "PathEndpointMissing");
    }

    #[test]
    fn iterator_walks_states() {
        let records = vec![
            DriverRecord::single("n", DriverValue::Node(driver_node("a", 1, "GENE"))),
            DriverRecord::single("n", DriverValue::Int(3)),
        ];
        let mut it = NodeIterator::nodes(Box::new(VecCursor::new(records)), None, "attr_");
        assert_eq!(it.state(), CursorState::Opened);
        assert!(it.next().unwrap().is_ok());
        assert_eq!(it.state(), CursorState::Advancing);
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());
        assert_eq!(it.state(), CursorState::Exhausted);
        assert_eq!(it.pulled(), 2);
    }

    #[test]
    fn rows_convert_scalars() {
        let record = DriverRecord {
            keys: vec!["label".into(), "count".into(), "missing".into()],
            values: vec![DriverValue::Str("GENE".into()), DriverValue::Int(3), DriverValue::Null],
        };
        let mut it = RowIterator::rows(Box::new(VecCursor::new(vec![record])));
        let row = it.next().unwrap().unwrap();
        assert_eq!(row.get("count"), Some(&AttrValue::Int(3)));
        assert_eq!(row.get("missing"), None);
    }
}
