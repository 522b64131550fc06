#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use biograph::{
    config::BuildConfig,
    pipeline::{Pipeline, StageName, DEFERRED_STAGE},
    types::BuildError,
};
use tempfile::TempDir;

const GENES: &str = r#"{"id":"ENSG00000141510","name":"TP53","biotype":"protein_coding","chromosome":"17","start":7661779,"end":7687538,"strand":-1,"transcripts":[{"id":"ENST00000269305","biotype":"protein_coding","protein_id":"P04637","exons":[{"id":"ENSE00001146308","exon_number":1},{"id":"ENSE00003625790","exon_number":2}]},{"id":"ENST00000413465","exons":[{"id":"ENSE00003625790","exon_number":2}]}],"drugs":[{"name":"nutlin-3","chembl_id":"CHEMBL191334","interaction_type":"inhibitor"}],"diseases":[{"id":"MONDO:0007254","name":"breast cancer","score":0.82}],"xrefs":[{"db":"HGNC","id":"11998"}],"mirna_targets":[{"mirna":"hsa-mir-21","evidence":"reporter assay"}]}
{"id":"ENSG00000012048","name":"BRCA1","transcripts":[{"id":"ENST00000357654","protein_id":"P38398"}]}
"#;

const PROTEINS: &str = r#"{"accession":"P04637","name":"P53_HUMAN","full_name":"Cellular tumor antigen p53","gene_names":["TP53"],"keywords":["Apoptosis","DNA-binding"]}
{"accession":"P38398","name":"BRCA1_HUMAN","gene_names":["BRCA1"]}
"#;

const MIRNAS: &str = r#"{"accession":"MI0000077","name":"hsa-mir-21","matures":[{"accession":"MIMAT0000076","name":"hsa-miR-21-5p"}]}
"#;

const PANELS: &str = r#"{"id":"245","name":"Hereditary cancer","version":"1.3","phenotypes":["Li-Fraumeni syndrome"],"genes":[{"gene":"TP53","confidence":"3"},{"gene":"BRCA1"},{"gene":"NOPE1"}]}
"#;

const PATHWAYS: &str = r#"{"id":"R-HSA-1","kind":"pathway","name":"p53 signalling","components":[{"id":"R-HSA-2","kind":"reaction"}]}
{"id":"R-HSA-2","kind":"reaction","inputs":[{"id":"R-PROT-1","kind":"protein"}],"outputs":[{"id":"R-CPLX-1","kind":"complex"}],"cellular_location":"nucleoplasm"}
{"id":"R-PROT-1","kind":"protein","entity_reference":"P04637"}
{"id":"R-CPLX-1","kind":"complex","components":[{"id":"R-DNA-1","kind":"dna"}]}
{"id":"R-DNA-1","kind":"dna","entity_reference":"TP53"}
"#;

const VARIANTS: &str = r#"{"chromosome":"17","start":7675088,"reference":"C","alternate":"T","consequences":[{"gene_id":"ENSG00000141510","transcript_id":"ENST00000269305","so_terms":["missense_variant"]}]}
"#;

fn write_sources(dir: &Path, genes: &str) -> BuildConfig {
    let write = |name: &str, body: &str| -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("write source");
        path
    };
    let mut config = BuildConfig::new(dir.join("out"));
    config.sources.genes = Some(write("genes.jsonl", genes));
    config.sources.proteins = Some(write("proteins.jsonl", PROTEINS));
    config.sources.mirnas = Some(write("mirnas.jsonl", MIRNAS));
    config.sources.panels = Some(write("panels.jsonl", PANELS));
    config.sources.pathways = Some(write("pathways.jsonl", PATHWAYS));
    config.sources.variants = Some(write("variants.jsonl", VARIANTS));
    config
}

fn read_output(dir: &Path) -> BTreeMap<String, String> {
    fs::read_dir(dir)
        .expect("output dir")
        .map(|entry| {
            let path = entry.expect("entry").path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read_to_string(&path).expect("read"))
        })
        .collect()
}

fn space(header_field: &str) -> &str {
    let open = header_field.find('(').unwrap();
    &header_field[open + 1..header_field.len() - 1]
}

#[test]
fn every_relation_endpoint_is_a_written_node_of_the_declared_space() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_sources(dir.path(), GENES);
    let summary = Pipeline::from_config(&config).unwrap().run().unwrap();
    assert_eq!(summary.skipped, 0);

    let files = read_output(&config.output_dir);
    let mut nodes: HashMap<String, String> = HashMap::new();
    for body in files.values() {
        let mut lines = body.lines();
        let header = lines.next().unwrap();
        let first = header.split('\t').next().unwrap();
        if first.starts_with("uid:ID(") {
            for line in lines {
                let uid = line.split('\t').next().unwrap().to_owned();
                assert!(
                    nodes.insert(uid.clone(), space(first).to_owned()).is_none(),
                    "uid {uid} written twice"
                );
            }
        }
    }
    let mut relation_lines = 0;
    for (name, body) in &files {
        let mut lines = body.lines();
        let header: Vec<&str> = lines.next().unwrap().split('\t').collect();
        if !header[0].starts_with(":START_ID(") {
            continue;
        }
        for line in lines {
            relation_lines += 1;
            let fields: Vec<&str> = line.split('\t').collect();
            assert_eq!(fields.len(), header.len(), "{name}: {line}");
            assert_eq!(nodes.get(fields[0]).map(String::as_str), Some(space(header[0])), "{name}: {line}");
            assert_eq!(nodes.get(fields[1]).map(String::as_str), Some(space(header[1])), "{name}: {line}");
        }
    }
    assert_eq!(relation_lines as u64, summary.relations);
    assert_eq!(nodes.len() as u64, summary.nodes);

    assert!(files.contains_key("IS___TRANSCRIPT___PROTEIN.csv"));
    assert!(files.contains_key("ENCODES___GENE___PROTEIN.csv"));
    assert!(files.contains_key("TARGET___MIRNA___GENE.csv"));
    assert!(files.contains_key("IS___DNA___GENE.csv"));
    assert!(files.contains_key("INPUT___REACTION___PROTEIN.csv"));
    assert_eq!(files["HAS___PANEL___GENE.csv"].lines().count(), 3);
    assert_eq!(summary.deferred.isolated, 1);
}

#[test]
fn shared_exon_and_duplicate_links_are_written_once() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_sources(dir.path(), GENES);
    let summary = Pipeline::from_config(&config).unwrap().run().unwrap();
    let files = read_output(&config.output_dir);
    assert_eq!(files["EXON.csv"].lines().count(), 3);
    assert_eq!(files["HAS___TRANSCRIPT___EXON.csv"].lines().count(), 4);
    assert_eq!(summary.files.nodes["EXON"], 2);
}

#[test]
fn rebuilding_the_same_inputs_reproduces_the_output() {
    let first = TempDir::new().expect("tempdir");
    let second = TempDir::new().expect("tempdir");
    let a = write_sources(first.path(), GENES);
    let b = write_sources(second.path(), GENES);
    Pipeline::from_config(&a).unwrap().run().unwrap();
    Pipeline::from_config(&b).unwrap().run().unwrap();
    assert_eq!(read_output(&a.output_dir), read_output(&b.output_dir));
}

#[test]
fn missing_source_aborts_before_any_output() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = write_sources(dir.path(), GENES);
    config.sources.variants = Some(dir.path().join("absent.jsonl"));
    let err = Pipeline::from_config(&config)
        .and_then(|p| p.run())
        .unwrap_err();
    assert!(matches!(err, BuildError::Resource { .. }), "{err}");
    assert!(!err.is_recoverable());
    assert!(!config.output_dir.exists());
}

#[test]
fn malformed_line_is_skipped_and_the_build_completes() {
    let dir = TempDir::new().expect("tempdir");
    let genes = format!("{GENES}{{\"id\": oops\n{{\"name\":\"NOID\"}}\n");
    let config = write_sources(dir.path(), &genes);
    let summary = Pipeline::from_config(&config).unwrap().run().unwrap();

    let gene_stage = summary.stages.iter().find(|s| s.name == "gene").unwrap();
    assert_eq!(gene_stage.records, 4);
    assert_eq!(gene_stage.skipped, 2);
    assert_eq!(summary.files.nodes["GENE"], 2);
    assert_eq!(summary.stages.last().map(|s| s.name.as_str()), Some(DEFERRED_STAGE));
}

#[test]
fn invalid_utf8_line_is_skipped_and_the_build_completes() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_sources(dir.path(), GENES);
    let mut bytes = Vec::new();
    bytes.extend_from_slice(br#"{"id":"ENSG00000141510","name":"TP53"}"#);
    bytes.extend_from_slice(b"\n{\"id\":\"ENSG\xff2\"}\n");
    bytes.extend_from_slice(br#"{"id":"ENSG00000012048","name":"BRCA1"}"#);
    bytes.push(b'\n');
    fs::write(config.sources.genes.as_ref().unwrap(), bytes).unwrap();

    let summary = Pipeline::from_config(&config).unwrap().run().unwrap();
    let gene_stage = summary.stages.iter().find(|s| s.name == "gene").unwrap();
    assert_eq!(gene_stage.records, 3);
    assert_eq!(gene_stage.skipped, 1);
    assert_eq!(summary.files.nodes["GENE"], 2);
}

#[test]
fn configured_stage_order_is_respected() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = write_sources(dir.path(), GENES);
    config.stages = Some(vec![StageName::Pathway, StageName::Gene]);
    config.validate().unwrap();
    let pipeline = Pipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.stage_names(), vec!["pathway", "gene"]);
    let summary = pipeline.run().unwrap();
    let names: Vec<&str> = summary.stages.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["pathway", "gene", DEFERRED_STAGE]);
}

#[test]
fn protein_records_keep_their_attributes_when_pathways_reference_them() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_sources(dir.path(), GENES);
    Pipeline::from_config(&config).unwrap().run().unwrap();
    let proteins = fs::read_to_string(config.output_dir.join("PROTEIN.csv")).unwrap();
    let p53 = proteins
        .lines()
        .find(|line| line.split('\t').nth(1) == Some("P04637"))
        .unwrap();
    assert!(p53.contains("Cellular tumor antigen p53"), "{p53}");
    assert_eq!(proteins.lines().filter(|l| l.contains("P04637")).count(), 1);
}

#[test]
fn pathway_stage_before_protein_stage_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = write_sources(dir.path(), GENES);
    config.stages = Some(vec![StageName::Pathway, StageName::Protein]);
    assert!(config.validate().is_err());
    let err = Pipeline::from_config(&config).map(|_| ()).unwrap_err();
    assert!(err.to_string().contains("must run after 'protein'"), "{err}");
    assert!(!config.output_dir.exists());
}
