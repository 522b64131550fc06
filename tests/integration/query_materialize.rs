#![allow(missing_docs)]

use std::cell::Cell;
use std::rc::Rc;

use biograph::{
    builder::{BuildContext, GeneBuilder, PanelBuilder},
    emit::{CsvEmitter, CsvOptions},
    identity::IdentityCache,
    model::{AttrValue, RelationLabel},
    pipeline::{FeedStage, Pipeline},
    query::{
        collect_capped, materialize, BoxCursor, CursorState, DriverNode, DriverPath, DriverRecord,
        DriverRelationship, DriverValue, GraphDriver, GraphSession, MemoryGraph, NodeIterator,
        NodeQuery, PathQuery, Properties, Query, QueryError, RecordCursor,
    },
    source::{Gene, MemoryFeed, Panel, PanelGene, Transcript},
    types::Uid,
};
use tempfile::TempDir;

/// Cursor that fabricates nodes forever and counts how many were pulled.
struct Counting {
    pulled: Rc<Cell<u64>>,
}

impl RecordCursor for Counting {
    fn try_next(&mut self) -> Result<Option<DriverRecord>, QueryError> {
        let n = self.pulled.get() + 1;
        self.pulled.set(n);
        Ok(Some(DriverRecord::single("n", DriverValue::Node(node(&n.to_string(), n as i64, "GENE")))))
    }
}

fn node(element: &str, uid: i64, label: &str) -> DriverNode {
    let mut properties = Properties::new();
    properties.insert("uid".into(), DriverValue::Int(uid));
    properties.insert("id".into(), DriverValue::Str(format!("{label}-{uid}")));
    DriverNode {
        element_id: element.into(),
        labels: vec![label.into()],
        properties,
    }
}

fn rel(element: &str, start: &str, end: &str, rel_type: &str) -> DriverRelationship {
    let mut properties = Properties::new();
    properties.insert("attr_confidence".into(), DriverValue::Int(3));
    DriverRelationship {
        element_id: element.into(),
        start: start.into(),
        end: end.into(),
        rel_type: rel_type.into(),
        properties,
    }
}

#[test]
fn capped_collection_never_pulls_past_the_cap() {
    let pulled = Rc::new(Cell::new(0));
    let cursor: BoxCursor = Box::new(Counting {
        pulled: Rc::clone(&pulled),
    });
    let mut nodes = NodeIterator::nodes(cursor, Some("n".into()), "attr_");
    let result = collect_capped(&mut nodes, 5).unwrap();
    assert_eq!(result.count, 5);
    assert!(result.truncated);
    assert_eq!(result.max_results, 5);
    assert_eq!(pulled.get(), 5);
    assert_eq!(nodes.state(), CursorState::Advancing);
    assert_eq!(result.records[4].uid, Uid(5));
}

#[test]
fn has_next_looks_ahead_by_one_record_only() {
    let pulled = Rc::new(Cell::new(0));
    let mut nodes = NodeIterator::nodes(
        Box::new(Counting {
            pulled: Rc::clone(&pulled),
        }),
        None,
        "attr_",
    );
    assert!(nodes.has_next());
    assert!(nodes.has_next());
    assert_eq!(pulled.get(), 1);
    nodes.next().unwrap().unwrap();
    assert_eq!(pulled.get(), 1);
}

#[test]
fn subgraph_records_resolve_relationship_endpoints() {
    let record = DriverRecord {
        keys: vec!["a".into(), "r".into(), "b".into()],
        values: vec![
            DriverValue::Node(node("e1", 1, "PANEL")),
            DriverValue::Relationship(rel("r1", "e1", "e2", "HAS___PANEL___GENE")),
            DriverValue::Node(node("e2", 2, "GENE")),
        ],
    };
    let (nodes, relations) = materialize::subgraph(&record, "attr_").unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(relations.len(), 1);
    let relation = &relations[0];
    assert!(matches!(relation.label, RelationLabel::Known(_)));
    assert_eq!((relation.origin_uid, relation.dest_uid), (Uid(1), Uid(2)));
    assert_eq!(relation.attributes.get("confidence"), Some(&AttrValue::Int(3)));

    let dangling = DriverRecord {
        keys: vec!["r".into()],
        values: vec![DriverValue::Relationship(rel("r9", "e1", "e2", "HAS___PANEL___GENE"))],
    };
    let err = materialize::subgraph(&dangling, "attr_").unwrap_err();
    assert_eq!(err.code(), "DanglingRelationship");
}

#[test]
fn path_endpoints_map_to_positions() {
    let path = DriverPath {
        nodes: vec![node("e1", 1, "PANEL"), node("e2", 2, "GENE"), node("e3", 3, "TRANSCRIPT")],
        relationships: vec![
            rel("r1", "e1", "e2", "HAS___PANEL___GENE"),
            rel("r2", "e2", "e3", "HAS___GENE___TRANSCRIPT"),
        ],
        start: "e1".into(),
        end: "e3".into(),
    };
    let converted = materialize::path(&path, "attr_").unwrap();
    assert_eq!(converted.len(), 2);
    assert_eq!(converted.start_node().map(|n| n.uid), Some(Uid(1)));
    assert_eq!(converted.end_node().map(|n| n.uid), Some(Uid(3)));
}

struct Empty;

impl GraphDriver for Empty {
    fn name(&self) -> &str {
        "empty"
    }

    fn run(&mut self, _query: &Query) -> Result<BoxCursor, QueryError> {
        Ok(Box::new(biograph::query::VecCursor::new(Vec::new())))
    }
}

#[test]
fn missing_node_yields_an_empty_result_not_an_error() {
    let mut session = GraphSession::new(Empty);
    let result = session
        .nodes(&Query::Nodes(NodeQuery::label("GENE").with("id", "ENSG_DOES_NOT_EXIST")))
        .unwrap();
    assert_eq!(result.count, 0);
    assert!(result.is_empty());
    assert!(!result.truncated);
}

fn built_graph(dir: &TempDir) -> MemoryGraph {
    let out = dir.path().join("graph");
    let ctx = BuildContext::new(
        IdentityCache::in_memory(),
        CsvEmitter::create(&out, CsvOptions::default()).unwrap(),
    );
    let genes = vec![
        Gene {
            id: "ENSG00000141510".into(),
            name: Some("TP53".into()),
            biotype: Some("protein_coding".into()),
            transcripts: vec![Transcript {
                id: "ENST00000269305".into(),
                ..Default::default()
            }],
            ..Default::default()
        },
        Gene {
            id: "ENSG00000012048".into(),
            name: Some("BRCA1".into()),
            ..Default::default()
        },
    ];
    let panels = vec![Panel {
        id: "245".into(),
        name: Some("Hereditary cancer".into()),
        genes: vec![PanelGene {
            gene: "TP53".into(),
            confidence: Some("3".into()),
            ..Default::default()
        }],
        ..Default::default()
    }];
    Pipeline::new(ctx, &out)
        .with_stage(FeedStage::new("gene", GeneBuilder, MemoryFeed::new("genes", genes)))
        .with_stage(FeedStage::new("panel", PanelBuilder, MemoryFeed::new("panels", panels)))
        .run()
        .unwrap();
    MemoryGraph::load(&out, &CsvOptions::default()).unwrap()
}

#[test]
fn built_output_can_be_queried_back() {
    let dir = TempDir::new().expect("tempdir");
    let mut session = GraphSession::new(built_graph(&dir));

    let genes = session.nodes(&Query::Nodes(NodeQuery::label("GENE"))).unwrap();
    assert_eq!(genes.count, 2);

    let tp53 = session
        .nodes(&Query::Nodes(
            NodeQuery::label("GENE").with("name", "TP53").with("biotype", "protein_coding"),
        ))
        .unwrap();
    assert_eq!(tp53.count, 1);
    assert_eq!(tp53.records[0].external_id, "ENSG00000141510");
    assert_eq!(
        tp53.records[0].attribute("biotype"),
        Some(&AttrValue::Str("protein_coding".into()))
    );

    let missing = session
        .nodes(&Query::Nodes(NodeQuery::label("GENE").with("id", "ENSG_NONE")))
        .unwrap();
    assert_eq!(missing.count, 0);

    let paths = session
        .paths(&Query::Paths(PathQuery {
            from: NodeQuery::label("PANEL").with("id", "245"),
            to: NodeQuery::label("TRANSCRIPT"),
            max_hops: 2,
        }))
        .unwrap();
    assert_eq!(paths.count, 1);
    let path = &paths.records[0];
    assert_eq!(path.len(), 2);
    assert_eq!(path.relations[0].label.to_string(), "HAS___PANEL___GENE");
    assert_eq!(path.relations[0].attributes.get("confidence"), Some(&AttrValue::Int(3)));
    assert_eq!(path.end_node().map(|n| n.external_id.as_str()), Some("ENST00000269305"));
}

#[test]
fn raw_queries_and_bad_caps_are_typed_errors() {
    let dir = TempDir::new().expect("tempdir");
    let mut session = GraphSession::new(built_graph(&dir));
    let err = session.rows(&Query::Raw("MATCH (n) RETURN n".into())).err().unwrap();
    assert_eq!(err.code(), "Unsupported");

    let mut capless = GraphSession::new(built_graph(&dir)).with_max_results(0);
    let err = capless.nodes(&Query::Nodes(NodeQuery::default())).err().unwrap();
    assert_eq!(err, QueryError::InvalidCap);
}
