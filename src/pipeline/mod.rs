#![forbid(unsafe_code)]

//! Build orchestration.
//!
//! Stages run sequentially against one [`BuildContext`]. After the last
//! configured stage the deferred queue is drained, then the identity store is
//! flushed and every stream closed exactly once.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::builder::{
    BuildContext, DeferredReport, GeneBuilder, MirnaBuilder, PanelBuilder, ProteinBuilder,
    VariantBuilder,
};
use crate::config::BuildConfig;
use crate::emit::{CsvEmitter, EmitStats};
use crate::identity::{IdentityCache, IdentityStats};
use crate::source::{Gene, JsonLinesFeed, Mirna, OntologyElement, Panel, Protein, Variant};
use crate::types::{BuildError, Result};

pub(crate) mod stage;

pub use stage::{FeedStage, OntologyStage, Stage, StageReport};

/// Name of the post-processing step in reports.
pub const DEFERRED_STAGE: &str = "deferred";

/// Configurable stage names.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    /// Genes with transcripts, exons and annotations.
    Gene,
    /// UniProt proteins.
    Protein,
    /// miRBase precursors.
    Mirna,
    /// Gene panels.
    Panel,
    /// Pathway ontology (two passes).
    Pathway,
    /// Annotated variants.
    Variant,
}

impl StageName {
    /// Order used when the configuration does not list stages.
    pub const DEFAULT_ORDER: [StageName; 6] = [
        StageName::Gene,
        StageName::Protein,
        StageName::Mirna,
        StageName::Panel,
        StageName::Pathway,
        StageName::Variant,
    ];

    /// Lower-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            StageName::Gene => "gene",
            StageName::Protein => "protein",
            StageName::Mirna => "mirna",
            StageName::Panel => "panel",
            StageName::Pathway => "pathway",
            StageName::Variant => "variant",
        }
    }

    /// Stages that must already have run when `self` starts.
    ///
    /// Protein elements in the pathway ontology reuse the PROTEIN node of
    /// their accession, and nodes are written once, so UniProt records go
    /// first or their attributes are lost.
    pub const fn prerequisites(self) -> &'static [StageName] {
        match self {
            StageName::Pathway => &[StageName::Protein],
            _ => &[],
        }
    }

    /// Describes the first stage in `order` that runs before one of its
    /// prerequisites.
    pub fn order_violation(order: &[StageName]) -> Option<String> {
        order.iter().enumerate().find_map(|(idx, stage)| {
            stage
                .prerequisites()
                .iter()
                .find(|before| order[idx + 1..].contains(before))
                .map(|before| format!("stage '{stage}' must run after '{before}'"))
        })
    }

    /// Stage reading the JSON-lines file at `path`.
    pub fn stage(self, path: &Path) -> Box<dyn Stage> {
        let name = self.as_str();
        match self {
            StageName::Gene => Box::new(FeedStage::new(
                name,
                GeneBuilder,
                JsonLinesFeed::<Gene>::new(path),
            )),
            StageName::Protein => Box::new(FeedStage::new(
                name,
                ProteinBuilder,
                JsonLinesFeed::<Protein>::new(path),
            )),
            StageName::Mirna => Box::new(FeedStage::new(
                name,
                MirnaBuilder,
                JsonLinesFeed::<Mirna>::new(path),
            )),
            StageName::Panel => Box::new(FeedStage::new(
                name,
                PanelBuilder,
                JsonLinesFeed::<Panel>::new(path),
            )),
            StageName::Pathway => Box::new(OntologyStage::new(
                name,
                JsonLinesFeed::<OntologyElement>::new(path),
            )),
            StageName::Variant => Box::new(FeedStage::new(
                name,
                VariantBuilder,
                JsonLinesFeed::<Variant>::new(path),
            )),
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`Pipeline::run`].
#[derive(Clone, Debug, Serialize)]
pub struct BuildSummary {
    /// Directory holding the CSV files.
    pub output_dir: PathBuf,
    /// Reports in execution order, post-processing last.
    pub stages: Vec<StageReport>,
    /// Post-processing outcome.
    pub deferred: DeferredReport,
    /// Total node lines.
    pub nodes: u64,
    /// Total relation lines.
    pub relations: u64,
    /// Records skipped across all stages.
    pub skipped: u64,
    /// Recoverable problems inside built records.
    pub issues: u64,
    /// Records dropped for lack of a schema.
    pub dropped: u64,
    /// Relation lines suppressed as duplicates.
    pub duplicates_suppressed: u64,
    /// Identity bindings (keys and aliases).
    pub bindings: u64,
    /// Identity lookup counters.
    pub identity: IdentityStats,
    /// Per-file line counts.
    pub files: EmitStats,
    /// Wall time, serialized in milliseconds.
    #[serde(rename = "elapsed_ms", serialize_with = "stage::as_millis")]
    pub elapsed: Duration,
}

/// Ordered stages plus the build state they share.
pub struct Pipeline {
    ctx: BuildContext,
    output_dir: PathBuf,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Pipeline over an existing context with no stages.
    pub fn new(ctx: BuildContext, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            ctx,
            output_dir: output_dir.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Appends a boxed stage.
    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    /// Assembles stages from `config`. Every configured source is checked
    /// before the identity cache or the output directory is touched.
    pub fn from_config(config: &BuildConfig) -> Result<Self> {
        let order = config.stage_order();
        if let Some(reason) = StageName::order_violation(&order) {
            return Err(BuildError::resource(reason));
        }
        let mut stages = Vec::new();
        for name in order {
            let path = config.sources.for_stage(name).ok_or_else(|| {
                BuildError::resource(format!("stage '{name}' has no configured source"))
            })?;
            let stage = name.stage(path);
            stage.check()?;
            stages.push(stage);
        }
        let identity = IdentityCache::open(&config.identity)?;
        let emitter = CsvEmitter::create(&config.output_dir, config.csv.clone())?;
        Ok(Self {
            ctx: BuildContext::new(identity, emitter),
            output_dir: config.output_dir.clone(),
            stages,
        })
    }

    /// Names of the configured stages.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage, resolves deferred references and closes the output.
    pub fn run(self) -> Result<BuildSummary> {
        self.run_with(|_| {})
    }

    /// Like [`Pipeline::run`], calling `on_stage` before each stage starts.
    pub fn run_with<F>(self, mut on_stage: F) -> Result<BuildSummary>
    where
        F: FnMut(&str),
    {
        let Pipeline {
            mut ctx,
            output_dir,
            mut stages,
        } = self;
        let started = Instant::now();
        for stage in &stages {
            stage.check()?;
        }

        let mut reports = Vec::with_capacity(stages.len() + 1);
        for stage in stages.iter_mut() {
            on_stage(stage.name());
            let report = stage.run(&mut ctx).map_err(|err| {
                error!(stage = stage.name(), %err, "build aborted");
                err
            })?;
            reports.push(report);
        }

        on_stage(DEFERRED_STAGE);
        let post_started = Instant::now();
        let before = ctx.counters();
        let waiting = ctx.deferred_len();
        let deferred = ctx.resolve_deferred()?;
        let mut post = StageReport {
            name: DEFERRED_STAGE.to_owned(),
            records: waiting as u64,
            ..StageReport::default()
        };
        post.close(before, ctx.counters(), post_started);
        info!(
            linked = deferred.linked,
            isolated = deferred.isolated,
            "deferred references resolved"
        );
        reports.push(post);

        let finished = ctx.finish()?;
        let summary = BuildSummary {
            output_dir,
            deferred,
            nodes: finished.emitted.node_total(),
            relations: finished.emitted.relation_total(),
            skipped: reports.iter().map(|r| r.skipped).sum(),
            issues: finished.counters.issues,
            dropped: finished.emitted.dropped,
            duplicates_suppressed: finished.duplicates_suppressed,
            bindings: finished.bindings,
            identity: finished.identity,
            files: finished.emitted,
            stages: reports,
            elapsed: started.elapsed(),
        };
        info!(
            nodes = summary.nodes,
            relations = summary.relations,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "build finished"
        );
        Ok(summary)
    }
}
