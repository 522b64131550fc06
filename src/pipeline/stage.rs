//! Stage implementations.

use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tracing::{error, info, warn};

use crate::builder::{BuildContext, Counters, EntityBuilder, PathwayBuilder};
use crate::source::{OntologyElement, RecordIter, SourceFeed};
use crate::types::Result;

pub(crate) fn as_millis<S: Serializer>(elapsed: &Duration, ser: S) -> std::result::Result<S::Ok, S::Error> {
    ser.serialize_u64(elapsed.as_millis() as u64)
}

/// What one stage did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// Stage name.
    pub name: String,
    /// Source records read (first pass only for multi-pass stages).
    pub records: u64,
    /// Records skipped after a recoverable error.
    pub skipped: u64,
    /// Recoverable problems inside records that were otherwise built.
    pub issues: u64,
    /// Node lines written.
    pub nodes: u64,
    /// Relation lines written.
    pub relations: u64,
    /// Wall time, serialized in milliseconds.
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl StageReport {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    pub(crate) fn close(&mut self, before: Counters, after: Counters, started: Instant) {
        self.nodes = after.nodes - before.nodes;
        self.relations = after.relations - before.relations;
        self.issues = after.issues - before.issues;
        self.elapsed = started.elapsed();
    }
}

/// One step of the build.
pub trait Stage {
    /// Name used in reports and logs.
    fn name(&self) -> &str;

    /// Verifies required inputs exist; called for every stage before any runs.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Streams the stage's input through its builder.
    fn run(&mut self, ctx: &mut BuildContext) -> Result<StageReport>;
}

/// Feeds every record through `f`, skipping recoverable failures.
fn drive<T, F>(
    ctx: &mut BuildContext,
    stage: &str,
    records: RecordIter<'_, T>,
    report: &mut StageReport,
    count: bool,
    mut f: F,
) -> Result<()>
where
    F: FnMut(&mut BuildContext, &T) -> Result<()>,
{
    for record in records {
        if count {
            report.records += 1;
        }
        match record.and_then(|record| f(ctx, &record)) {
            Ok(()) => {}
            Err(err) if err.is_recoverable() => {
                warn!(stage, %err, "record skipped");
                report.skipped += 1;
            }
            Err(err) => {
                error!(stage, %err, "stage failed");
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Single-pass stage: one builder over one feed.
pub struct FeedStage<B, F> {
    name: String,
    builder: B,
    feed: F,
}

impl<B, F> FeedStage<B, F> {
    /// Pairs `builder` with `feed`.
    pub fn new(name: impl Into<String>, builder: B, feed: F) -> Self {
        Self {
            name: name.into(),
            builder,
            feed,
        }
    }
}

impl<B, F> Stage for FeedStage<B, F>
where
    B: EntityBuilder,
    F: SourceFeed<Item = B::Source>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> Result<()> {
        self.feed.check()
    }

    fn run(&mut self, ctx: &mut BuildContext) -> Result<StageReport> {
        let started = Instant::now();
        let before = ctx.counters();
        let mut report = StageReport::new(&self.name);
        info!(stage = %self.name, feed = self.feed.name(), "stage started");

        let builder = &self.builder;
        drive(ctx, &self.name, self.feed.open()?, &mut report, true, |ctx, record| {
            builder.build(ctx, record).map(|_| ())
        })?;

        report.close(before, ctx.counters(), started);
        info!(
            stage = %self.name,
            records = report.records,
            skipped = report.skipped,
            nodes = report.nodes,
            relations = report.relations,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "stage finished"
        );
        Ok(report)
    }
}

/// Two-pass pathway-ontology stage: index every element, then link them.
pub struct OntologyStage<F> {
    name: String,
    builder: PathwayBuilder,
    feed: F,
}

impl<F> OntologyStage<F> {
    /// Wraps an ontology feed.
    pub fn new(name: impl Into<String>, feed: F) -> Self {
        Self {
            name: name.into(),
            builder: PathwayBuilder,
            feed,
        }
    }
}

impl<F> Stage for OntologyStage<F>
where
    F: SourceFeed<Item = OntologyElement>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> Result<()> {
        self.feed.check()
    }

    fn run(&mut self, ctx: &mut BuildContext) -> Result<StageReport> {
        let started = Instant::now();
        let before = ctx.counters();
        let mut report = StageReport::new(&self.name);
        let builder = self.builder;

        info!(stage = %self.name, feed = self.feed.name(), pass = 1, "indexing elements");
        drive(ctx, &self.name, self.feed.open()?, &mut report, true, |ctx, el| {
            builder.build(ctx, el).map(|_| ())
        })?;
        let indexed = ctx.counters().nodes - before.nodes;

        info!(stage = %self.name, pass = 2, indexed, "linking elements");
        let mut links = StageReport::new(&self.name);
        drive(ctx, &self.name, self.feed.open()?, &mut links, false, |ctx, el| {
            builder.link(ctx, el)
        })?;
        // A record that failed to index fails again when linked; count it once.
        report.skipped = report.skipped.max(links.skipped);

        report.close(before, ctx.counters(), started);
        info!(
            stage = %self.name,
            records = report.records,
            skipped = report.skipped,
            nodes = report.nodes,
            relations = report.relations,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "stage finished"
        );
        Ok(report)
    }
}
