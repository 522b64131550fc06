#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use biograph::{
    emit::{CsvEmitter, CsvOptions, SchemaRegistry},
    model::{AttrValue, Attrs, EntityType, Node, Relation, RelationKind, Verb},
    types::{BuildError, Uid},
};
use tempfile::TempDir;

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read csv")
        .lines()
        .map(str::to_owned)
        .collect()
}

fn assert_aligned(path: &Path, separator: char) {
    let lines = lines(path);
    let width = lines[0].split(separator).count();
    for line in &lines[1..] {
        assert_eq!(
            line.split(separator).count(),
            width,
            "misaligned line in {}: {line}",
            path.display()
        );
    }
}

#[test]
fn delimiter_inside_a_value_never_adds_a_column() {
    let dir = TempDir::new().expect("tempdir");
    let opts = CsvOptions::comma();
    let mut emitter = CsvEmitter::create(dir.path(), opts).unwrap();

    let drug = Node::new(Uid(1), EntityType::Drug, "CHEMBL25", "a,b").with_attributes(
        Attrs::new()
            .with("source", Some("DGIdb, curated"))
            .build(),
    );
    assert!(emitter.write_node(&drug).unwrap());
    let stats = emitter.close().unwrap();
    assert_eq!(stats.nodes["DRUG"], 1);

    let path = dir.path().join("DRUG.csv");
    let body = lines(&path);
    assert_eq!(body[0], "uid:ID(DRUG),id,name,attr_source,attr_chembl_id");
    assert_eq!(body[1], "1,CHEMBL25,a;b,DGIdb; curated,-");
    assert_aligned(&path, ',');
}

#[test]
fn every_catalogued_stream_stays_aligned() {
    let dir = TempDir::new().expect("tempdir");
    let opts = CsvOptions::default();
    let mut emitter = CsvEmitter::create(dir.path(), opts).unwrap();

    let gene = Node::new(Uid(1), EntityType::Gene, "ENSG00000141510", "TP53").with_attributes(
        Attrs::new()
            .with("biotype", Some("protein_coding"))
            .with("description", Some("tumor\tprotein \"p53\"\nline two"))
            .with("start", Some(7_661_779i64))
            .build(),
    );
    let disease = Node::new(Uid(2), EntityType::Disease, "MONDO:0007254", "breast cancer");
    emitter.write_node(&gene).unwrap();
    emitter.write_node(&disease).unwrap();

    let kind = RelationKind::new(Verb::Annotation, EntityType::Gene, EntityType::Disease);
    let rel = Relation::new(kind, Uid(1), Uid(2)).with_attributes(
        Attrs::new()
            .with("score", Some(0.75f64))
            .with("source", Some("OpenTargets"))
            .build(),
    );
    emitter.write_relation(&rel).unwrap();
    let stats = emitter.close().unwrap();
    assert_eq!(stats.relation_total(), 1);

    for entry in fs::read_dir(dir.path()).unwrap() {
        assert_aligned(&entry.unwrap().path(), '\t');
    }
    let rel_lines = lines(&dir.path().join("ANNOTATION___GENE___DISEASE.csv"));
    assert_eq!(rel_lines[0], ":START_ID(GENE)\t:END_ID(DISEASE)\tattr_score\tattr_source");
    assert_eq!(rel_lines[1], "1\t2\t0.75\tOpenTargets");
    let gene_lines = lines(&dir.path().join("GENE.csv"));
    assert!(!gene_lines[1].contains('"'));
    assert_eq!(gene_lines.len(), 2);
}

#[test]
fn list_values_use_the_list_separator() {
    let dir = TempDir::new().expect("tempdir");
    let mut emitter = CsvEmitter::create(dir.path(), CsvOptions::default()).unwrap();
    let panel = Node::new(Uid(3), EntityType::Panel, "P1", "Cardiac").with_attributes(
        Attrs::new()
            .with(
                "phenotypes",
                Some(vec!["long QT".to_owned(), "arrhythmia;syncope".to_owned()]),
            )
            .build(),
    );
    emitter.write_node(&panel).unwrap();
    emitter.close().unwrap();
    let body = lines(&dir.path().join("PANEL.csv"));
    let header: Vec<&str> = body[0].split('\t').collect();
    let row: Vec<&str> = body[1].split('\t').collect();
    let idx = header.iter().position(|h| *h == "attr_phenotypes").unwrap();
    assert_eq!(row[idx], "long QT;arrhythmia syncope");
    assert_eq!(
        CsvOptions::default().parse_field(row[idx]),
        Some(AttrValue::List(vec!["long QT".into(), "arrhythmia syncope".into()]))
    );
}

#[test]
fn unregistered_labels_are_dropped_not_written() {
    let dir = TempDir::new().expect("tempdir");
    let mut emitter =
        CsvEmitter::with_schemas(dir.path(), CsvOptions::default(), SchemaRegistry::empty()).unwrap();
    let gene = Node::new(Uid(1), EntityType::Gene, "ENSG1", "A");
    assert!(!emitter.write_node(&gene).unwrap());
    assert!(!emitter.write_node(&gene).unwrap());
    let err = emitter.open_node_stream("GENE").unwrap_err();
    assert!(matches!(err, BuildError::SchemaMismatch { ref label } if label == "GENE"));
    let stats = emitter.close().unwrap();
    assert_eq!(stats.dropped, 2);
    assert!(!dir.path().join("GENE.csv").exists());
}
