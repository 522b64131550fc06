#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use biograph::{
    builder::{BuildContext, GeneBuilder, PanelBuilder, PendingReference},
    emit::{CsvEmitter, CsvOptions},
    identity::IdentityCache,
    model::{EntityType, Node, RelationKind, Verb},
    pipeline::{FeedStage, OntologyStage, Pipeline},
    source::{ElementKind, Gene, MemoryFeed, OntologyElement, Panel, PanelGene},
};
use tempfile::TempDir;

fn context(out: &Path) -> BuildContext {
    BuildContext::new(
        IdentityCache::in_memory(),
        CsvEmitter::create(out, CsvOptions::default()).expect("emitter"),
    )
}

fn uid_of(out: &Path, file: &str, external_id: &str) -> String {
    fs::read_to_string(out.join(file))
        .expect("node file")
        .lines()
        .skip(1)
        .find(|line| line.split('\t').nth(1) == Some(external_id))
        .and_then(|line| line.split('\t').next().map(str::to_owned))
        .expect("node line")
}

#[test]
fn dna_element_seen_before_its_gene_is_linked_once() {
    let dir = TempDir::new().expect("tempdir");
    let out = dir.path().join("graph");

    let dna = OntologyElement {
        id: "R-HSA-DNA-7157".into(),
        kind: ElementKind::Dna,
        entity_reference: Some("TP53".into()),
        ..Default::default()
    };
    let gene = Gene {
        id: "ENSG00000141510".into(),
        name: Some("TP53".into()),
        ..Default::default()
    };

    let summary = Pipeline::new(context(&out), &out)
        .with_stage(OntologyStage::new("pathway", MemoryFeed::new("elements", vec![dna])))
        .with_stage(FeedStage::new("gene", GeneBuilder, MemoryFeed::new("genes", vec![gene])))
        .run()
        .unwrap();

    assert_eq!(summary.deferred.linked, 1);
    assert_eq!(summary.deferred.isolated, 0);

    let body = fs::read_to_string(out.join("IS___DNA___GENE.csv")).unwrap();
    let rows: Vec<&str> = body.lines().skip(1).collect();
    let gene_uid = uid_of(&out, "GENE.csv", "ENSG00000141510");
    let dna_uid = uid_of(&out, "DNA.csv", "R-HSA-DNA-7157");
    assert_eq!(rows, vec![format!("{dna_uid}\t{gene_uid}")]);
}

#[test]
fn repeated_reference_to_the_same_pair_collapses() {
    let dir = TempDir::new().expect("tempdir");
    let mut ctx = context(dir.path());
    let dna = ctx
        .resolve_or_create("D1", EntityType::Dna, |uid| Node::new(uid, EntityType::Dna, "D1", ""))
        .unwrap()
        .uid;
    let kind = RelationKind::new(Verb::Is, EntityType::Dna, EntityType::Gene);
    for _ in 0..3 {
        assert!(!ctx.link_or_defer(PendingReference::dest(kind, dna, "TP53")).unwrap());
    }
    assert_eq!(ctx.deferred_len(), 3);
    ctx.resolve_or_create("TP53", EntityType::Gene, |uid| {
        Node::new(uid, EntityType::Gene, "TP53", "TP53")
    })
    .unwrap();
    let report = ctx.resolve_deferred().unwrap();
    assert_eq!(report.linked, 3);
    let finished = ctx.finish().unwrap();
    assert_eq!(finished.emitted.relations["IS___DNA___GENE"], 1);
    assert_eq!(finished.duplicates_suppressed, 2);
}

#[test]
fn references_to_absent_entities_stay_isolated() {
    let dir = TempDir::new().expect("tempdir");
    let out = dir.path().join("graph");
    let panel = Panel {
        id: "245".into(),
        genes: vec![
            PanelGene {
                gene: "GHOST1".into(),
                ..Default::default()
            },
            PanelGene {
                gene: "GHOST2".into(),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let summary = Pipeline::new(context(&out), &out)
        .with_stage(FeedStage::new("panel", PanelBuilder, MemoryFeed::new("panels", vec![panel])))
        .run()
        .unwrap();

    assert_eq!(summary.deferred.linked, 0);
    assert_eq!(summary.deferred.isolated, 2);
    assert_eq!(summary.relations, 0);
    assert!(!out.join("HAS___PANEL___GENE.csv").exists());
    assert_eq!(summary.files.nodes["PANEL"], 1);
}
