#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

fn write_project(dir: &Path) -> PathBuf {
    fs::write(
        dir.join("genes.jsonl"),
        concat!(
            r#"{"id":"ENSG00000141510","name":"TP53","biotype":"protein_coding","transcripts":[{"id":"ENST00000269305"}]}"#,
            "\n",
            r#"{"id":"ENSG00000012048","name":"BRCA1"}"#,
            "\n",
        ),
    )
    .expect("genes");
    fs::write(
        dir.join("panels.jsonl"),
        r#"{"id":"245","name":"Hereditary cancer","genes":[{"gene":"TP53"},{"gene":"MISSING1"}]}"#,
    )
    .expect("panels");
    let config = dir.join("build.toml");
    fs::write(
        &config,
        "output_dir = \"graph\"\n[sources]\ngenes = \"genes.jsonl\"\npanels = \"panels.jsonl\"\n",
    )
    .expect("config");
    config
}

fn json_stdout(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("json stdout")
}

#[test]
fn build_then_query_round_trip() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_project(dir.path());

    let output = cargo_bin_cmd!("biograph")
        .args(["--format", "json", "build", "--config"])
        .arg(&config)
        .assert()
        .success()
        .get_output()
        .clone();
    let summary = json_stdout(&output);
    assert_eq!(summary["nodes"].as_u64(), Some(4));
    assert_eq!(summary["deferred"]["isolated"].as_u64(), Some(1));
    assert!(summary["elapsed_ms"].is_u64());
    let graph = dir.path().join("graph");
    assert!(graph.join("GENE.csv").exists());

    let output = cargo_bin_cmd!("biograph")
        .args(["--format", "json", "query", "--output"])
        .arg(&graph)
        .args(["--label", "GENE", "--where", "name=TP53"])
        .assert()
        .success()
        .get_output()
        .clone();
    let result = json_stdout(&output);
    assert_eq!(result["count"].as_u64(), Some(1));
    assert_eq!(result["truncated"].as_bool(), Some(false));
    assert_eq!(result["records"][0]["external_id"], "ENSG00000141510");

    let output = cargo_bin_cmd!("biograph")
        .args(["--format", "json", "query", "--output"])
        .arg(&graph)
        .args(["--label", "PANEL", "--path-to-label", "TRANSCRIPT", "--hops", "2"])
        .assert()
        .success()
        .get_output()
        .clone();
    let result = json_stdout(&output);
    assert_eq!(result["count"].as_u64(), Some(1));
}

#[test]
fn output_override_and_text_format() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_project(dir.path());
    let elsewhere = dir.path().join("elsewhere");

    let output = cargo_bin_cmd!("biograph")
        .args(["--theme", "plain", "build", "--config"])
        .arg(&config)
        .arg("--output")
        .arg(&elsewhere)
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nodes"), "{stdout}");
    assert!(elsewhere.join("PANEL.csv").exists());
    assert!(!dir.path().join("graph").exists());
}

#[test]
fn query_cap_truncates() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_project(dir.path());
    cargo_bin_cmd!("biograph")
        .args(["build", "--config"])
        .arg(&config)
        .assert()
        .success();

    let output = cargo_bin_cmd!("biograph")
        .args(["--format", "json", "query", "--output"])
        .arg(dir.path().join("graph"))
        .args(["--label", "GENE", "--max", "1"])
        .assert()
        .success()
        .get_output()
        .clone();
    let result = json_stdout(&output);
    assert_eq!(result["count"].as_u64(), Some(1));
    assert_eq!(result["truncated"].as_bool(), Some(true));
}

#[test]
fn schema_lists_every_node_header() {
    let output = cargo_bin_cmd!("biograph")
        .args(["--format", "json", "schema"])
        .assert()
        .success()
        .get_output()
        .clone();
    let report = json_stdout(&output);
    let nodes = report["nodes"].as_array().expect("nodes");
    assert_eq!(nodes.len(), 18);
    assert!(nodes
        .iter()
        .any(|h| h[0] == "uid:ID(GENE)" && h[3] == "attr_biotype"));
    assert!(report["relations"]
        .as_array()
        .expect("relations")
        .iter()
        .any(|h| h[0] == "HAS___PANEL___GENE"));
}

#[test]
fn failures_print_error_and_exit_non_zero() {
    let dir = TempDir::new().expect("tempdir");
    let output = cargo_bin_cmd!("biograph")
        .args(["build", "--config"])
        .arg(dir.path().join("absent.toml"))
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "{stderr}");

    let config = write_project(dir.path());
    fs::remove_file(dir.path().join("panels.jsonl")).unwrap();
    let output = cargo_bin_cmd!("biograph")
        .args(["build", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "{stderr}");
    assert!(!dir.path().join("graph").exists());

    cargo_bin_cmd!("biograph")
        .args(["query", "--output"])
        .arg(dir.path().join("graph"))
        .args(["--where", "=x"])
        .assert()
        .failure();
}
