#![forbid(unsafe_code)]

//! Source feeds: lazily streamed, already-parsed domain objects.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::types::{BuildError, Result};

/// Domain object types.
pub mod records;

pub use records::{
    Consequence, DiseaseAssociation, DrugInteraction, ElementKind, ElementRef, Exon, Gene,
    MatureMirna, Mirna, MirnaTarget, OntologyElement, Panel, PanelGene, Protein, Transcript,
    Variant, Xref,
};

/// Boxed record stream returned by [`SourceFeed::open`].
pub type RecordIter<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

/// Re-openable stream of domain objects.
///
/// Multi-pass stages call [`SourceFeed::open`] once per pass; a feed never
/// holds the full source in memory unless it was constructed that way.
pub trait SourceFeed {
    /// Object type yielded.
    type Item;

    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Fails with [`BuildError::Resource`] when the underlying input is gone.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Starts a fresh pass over the records.
    fn open(&self) -> Result<RecordIter<'_, Self::Item>>;
}

/// Feed over a JSON-lines file: one object per line, blank lines ignored.
///
/// A line that does not parse yields [`BuildError::SourceRecord`] keyed by
/// `file:line`; the stream continues with the next line.
#[derive(Debug, Clone)]
pub struct JsonLinesFeed<T> {
    path: PathBuf,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonLinesFeed<T> {
    /// Creates a feed over `path`; the file is only checked when opened.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            _marker: PhantomData,
        }
    }

    /// Input file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: DeserializeOwned + 'static> SourceFeed for JsonLinesFeed<T> {
    type Item = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> Result<()> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(BuildError::resource(format!(
                "required source file {} does not exist",
                self.path.display()
            )))
        }
    }

    fn open(&self) -> Result<RecordIter<'_, T>> {
        let file = File::open(&self.path).map_err(|err| {
            BuildError::resource(format!(
                "cannot open source file {}: {err}",
                self.path.display()
            ))
        })?;
        let name = self.name.clone();
        let lines = BufReader::new(file).lines().enumerate();
        Ok(Box::new(lines.filter_map(move |(idx, line)| {
            let line = match line {
                Ok(line) => line,
                Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                    return Some(Err(BuildError::source_record(
                        format!("{name}:{}", idx + 1),
                        err.to_string(),
                    )));
                }
                Err(err) => return Some(Err(BuildError::Io(err))),
            };
            if line.trim().is_empty() {
                return None;
            }
            Some(serde_json::from_str(&line).map_err(|err| {
                BuildError::source_record(format!("{name}:{}", idx + 1), err.to_string())
            }))
        })))
    }
}

/// Feed over records already in memory; each pass clones them.
#[derive(Debug, Clone)]
pub struct MemoryFeed<T> {
    name: String,
    records: Vec<T>,
}

impl<T> MemoryFeed<T> {
    /// Wraps `records` under `name`.
    pub fn new(name: impl Into<String>, records: Vec<T>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

impl<T: Clone> SourceFeed for MemoryFeed<T> {
    type Item = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<RecordIter<'_, T>> {
        Ok(Box::new(self.records.iter().cloned().map(Ok)))
    }
}
