//! Binary entry point for the biograph command-line tool.
#![forbid(unsafe_code)]

#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use biograph::{
    config::BuildConfig,
    emit::{relation_header, CsvOptions, SchemaRegistry},
    logging::init_logging,
    model::{EntityType, Node, Path, RelationKind},
    pipeline::{BuildSummary, Pipeline},
    query::{Constraint, GraphSession, MemoryGraph, NodeQuery, PathQuery, Query, QueryResult},
};
use serde::Serialize;

use ui::{format_duration, Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "biograph",
    version,
    about = "Builds bulk-import graph CSV from biological source feeds",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        default_value = "warn",
        help = "Log filter used when RUST_LOG is unset"
    )]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = Theme::Auto)]
    theme: Theme,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct BuildCmd {
    #[arg(long, value_name = "FILE", help = "Build config (defaults to the user config dir)")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Override the configured output directory")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct QueryCmd {
    #[arg(long, value_name = "DIR", help = "Directory produced by `build`")]
    output: PathBuf,

    #[arg(long, value_name = "FILE", help = "Build config supplying CSV options and the result cap")]
    config: Option<PathBuf>,

    #[arg(long, help = "Primary label of the matched nodes")]
    label: Option<String>,

    #[arg(
        long = "where",
        value_name = "FIELD=VALUE",
        action = ArgAction::Append,
        help = "Equality constraint (repeatable)"
    )]
    constraints: Vec<String>,

    #[arg(long, value_name = "N", help = "Maximum records to return")]
    max: Option<usize>,

    #[arg(long, value_name = "LABEL", help = "Return paths ending at nodes with this label")]
    path_to_label: Option<String>,

    #[arg(
        long = "path-to-where",
        value_name = "FIELD=VALUE",
        action = ArgAction::Append,
        help = "Constraint on path end nodes (repeatable)"
    )]
    path_to_constraints: Vec<String>,

    #[arg(long, default_value_t = 3, help = "Longest path considered, in relations")]
    hops: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Run the configured build stages and write CSV output")]
    Build(BuildCmd),
    #[command(about = "Query a built output directory")]
    Query(QueryCmd),
    #[command(about = "Print every node header and the attributed relation headers")]
    Schema,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let ui = Ui::new(cli.theme);
    match cli.command {
        Command::Build(cmd) => {
            let mut config = BuildConfig::discover(cmd.config)?;
            if let Some(output) = cmd.output {
                config.output_dir = output;
            }
            let pipeline = Pipeline::from_config(&config)?;
            let summary = if cli.format == OutputFormat::Text {
                let mut task = ui.task();
                let summary = pipeline.run_with(|stage| task.step(stage))?;
                task.finish();
                summary
            } else {
                pipeline.run()?
            };
            emit(cli.format, &summary, || print_build_text(&ui, &summary))?;
        }
        Command::Query(cmd) => run_query(cmd, cli.format, &ui)?,
        Command::Schema => {
            let report = schema_report(&CsvOptions::default());
            emit(cli.format, &report, || {
                ui.list("Nodes", report.nodes.iter().map(|h| h.join(" ")));
                ui.list("Relations", report.relations.iter().map(|h| h.join(" ")));
            })?;
        }
    }
    Ok(())
}

fn run_query(cmd: QueryCmd, format: OutputFormat, ui: &Ui) -> Result<(), Box<dyn Error>> {
    let (csv, default_max) = match &cmd.config {
        Some(path) => {
            let config = BuildConfig::load(path)?;
            (config.csv, config.query.max_results)
        }
        None => (CsvOptions::default(), biograph::config::DEFAULT_MAX_RESULTS),
    };
    let graph = MemoryGraph::load(&cmd.output, &csv)?;
    let mut session = GraphSession::new(graph)
        .with_prefix(csv.attribute_prefix.clone())
        .with_max_results(cmd.max.unwrap_or(default_max));

    let from = NodeQuery {
        label: cmd.label,
        constraints: parse_constraints(&cmd.constraints)?,
    };
    if cmd.path_to_label.is_some() || !cmd.path_to_constraints.is_empty() {
        let query = Query::Paths(PathQuery {
            from,
            to: NodeQuery {
                label: cmd.path_to_label,
                constraints: parse_constraints(&cmd.path_to_constraints)?,
            },
            max_hops: cmd.hops,
        });
        let result = session.paths(&query)?;
        emit(format, &result, || print_paths_text(ui, &result))?;
    } else {
        let result = session.nodes(&Query::Nodes(from))?;
        emit(format, &result, || print_nodes_text(ui, &result))?;
    }
    Ok(())
}

fn parse_constraints(raw: &[String]) -> Result<Vec<Constraint>, Box<dyn Error>> {
    raw.iter()
        .map(|entry| entry.parse::<Constraint>().map_err(Into::into))
        .collect()
}

#[derive(Serialize)]
struct SchemaReport {
    nodes: Vec<Vec<String>>,
    relations: Vec<Vec<String>>,
}

fn schema_report(opts: &CsvOptions) -> SchemaReport {
    let registry = SchemaRegistry::catalogue();
    let nodes = EntityType::ALL
        .iter()
        .filter_map(|ty| registry.node(ty.as_str()))
        .map(|schema| schema.header(opts))
        .collect();
    let relations = RelationKind::ATTRIBUTED
        .iter()
        .map(|kind| {
            let mut header = vec![kind.to_string()];
            header.extend(relation_header(*kind, opts));
            header
        })
        .collect();
    SchemaReport { nodes, relations }
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_build_text(ui: &Ui, summary: &BuildSummary) {
    ui.section(
        "Build",
        [
            ("output", summary.output_dir.display().to_string()),
            ("nodes", summary.nodes.to_string()),
            ("relations", summary.relations.to_string()),
            ("skipped records", summary.skipped.to_string()),
            ("issues", summary.issues.to_string()),
            ("dropped lines", summary.dropped.to_string()),
            ("duplicate relations", summary.duplicates_suppressed.to_string()),
            ("deferred linked", summary.deferred.linked.to_string()),
            ("deferred isolated", summary.deferred.isolated.to_string()),
        ],
    );
    ui.list(
        "Stages",
        summary.stages.iter().map(|s| {
            format!(
                "{}: records={} skipped={} nodes={} relations={} ({})",
                s.name,
                s.records,
                s.skipped,
                s.nodes,
                s.relations,
                format_duration(s.elapsed)
            )
        }),
    );
    ui.success(&format!("build finished in {}", format_duration(summary.elapsed)));
}

fn describe(node: &Node) -> String {
    let label = node.primary_label().unwrap_or("?");
    if node.display_name.is_empty() {
        format!("{label}:{}", node.external_id)
    } else {
        format!("{label}:{} ({})", node.external_id, node.display_name)
    }
}

fn print_nodes_text(ui: &Ui, result: &QueryResult<Node>) {
    ui.list(
        "Nodes",
        result.records.iter().map(|node| {
            let attrs = node
                .attributes
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" ");
            format!("#{} {} {attrs}", node.uid, describe(node)).trim_end().to_owned()
        }),
    );
    print_footer(ui, result.count, result.truncated);
}

fn print_paths_text(ui: &Ui, result: &QueryResult<Path>) {
    ui.list(
        "Paths",
        result.records.iter().map(|path| {
            let mut text = path.start_node().map(describe).unwrap_or_default();
            for (rel, node) in path.relations.iter().zip(path.nodes.iter().skip(1)) {
                text.push_str(&format!(" -[{}]-> {}", rel.label, describe(node)));
            }
            text
        }),
    );
    print_footer(ui, result.count, result.truncated);
}

fn print_footer(ui: &Ui, count: usize, truncated: bool) {
    if truncated {
        ui.warn(&format!("{count} records shown; result cap reached"));
    } else {
        ui.success(&format!("{count} records"));
    }
}
