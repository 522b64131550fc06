//! TOML build configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emit::CsvOptions;
use crate::identity::IdentityOptions;
use crate::pipeline::StageName;

/// Default cap on records retained by a query.
pub const DEFAULT_MAX_RESULTS: usize = 10_000;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read build config {path}: {source}")]
    Read {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse build config {path}: {source}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// The values parsed but are inconsistent.
    #[error("invalid build config: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
    /// Neither `--config` nor a default config file exists.
    #[error("no build config found; pass --config or create {}", default_hint())]
    NoConfigPath,
}

fn default_hint() -> String {
    default_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "biograph/build.toml in your config directory".to_owned())
}

/// Default config location: `<config_dir>/biograph/build.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("biograph").join("build.toml"))
}

/// JSON-lines inputs, one per source domain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcePaths {
    /// Ensembl-style gene records.
    pub genes: Option<PathBuf>,
    /// UniProt entries.
    pub proteins: Option<PathBuf>,
    /// miRBase precursors.
    pub mirnas: Option<PathBuf>,
    /// Gene panels.
    pub panels: Option<PathBuf>,
    /// Pathway ontology elements.
    pub pathways: Option<PathBuf>,
    /// Annotated variants.
    pub variants: Option<PathBuf>,
}

impl SourcePaths {
    /// Input configured for `stage`.
    pub fn for_stage(&self, stage: StageName) -> Option<&Path> {
        match stage {
            StageName::Gene => self.genes.as_deref(),
            StageName::Protein => self.proteins.as_deref(),
            StageName::Mirna => self.mirnas.as_deref(),
            StageName::Panel => self.panels.as_deref(),
            StageName::Pathway => self.pathways.as_deref(),
            StageName::Variant => self.variants.as_deref(),
        }
    }

    fn paths_mut(&mut self) -> [&mut Option<PathBuf>; 6] {
        [
            &mut self.genes,
            &mut self.proteins,
            &mut self.mirnas,
            &mut self.panels,
            &mut self.pathways,
            &mut self.variants,
        ]
    }
}

/// Query-side settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryOptions {
    /// Records retained per query result.
    pub max_results: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Complete build configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory receiving the CSV files.
    pub output_dir: PathBuf,
    /// Line formatting.
    #[serde(default)]
    pub csv: CsvOptions,
    /// Identity cache backing.
    #[serde(default)]
    pub identity: IdentityOptions,
    /// Input feeds.
    #[serde(default)]
    pub sources: SourcePaths,
    /// Explicit stage order; defaults to every stage with a configured source.
    #[serde(default)]
    pub stages: Option<Vec<StageName>>,
    /// Query settings.
    #[serde(default)]
    pub query: QueryOptions,
}

impl BuildConfig {
    /// Minimal configuration writing to `output_dir` with no sources.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            csv: CsvOptions::default(),
            identity: IdentityOptions::default(),
            sources: SourcePaths::default(),
            stages: None,
            query: QueryOptions::default(),
        }
    }

    /// Loads `explicit`, or the default config path when `None`.
    pub fn discover(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        match explicit.or_else(default_config_path) {
            Some(path) if path.exists() => Self::load(&path),
            _ => Err(ConfigError::NoConfigPath),
        }
    }

    /// Reads and validates a config file. Relative paths inside it are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: BuildConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses a config from TOML text without path rebasing.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: BuildConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.output_dir);
        if let Some(path) = self.identity.path.as_mut() {
            join(path);
        }
        for path in self.sources.paths_mut().into_iter().flatten() {
            join(path);
        }
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.csv.validate().map_err(|err| ConfigError::Invalid {
            reason: err.to_string(),
        })?;
        if self.query.max_results == 0 {
            return Err(ConfigError::Invalid {
                reason: "query.max_results must be at least 1".to_owned(),
            });
        }
        if let Some(stages) = &self.stages {
            for (idx, stage) in stages.iter().enumerate() {
                if stages[..idx].contains(stage) {
                    return Err(ConfigError::Invalid {
                        reason: format!("stage '{stage}' listed twice"),
                    });
                }
                if self.sources.for_stage(*stage).is_none() {
                    return Err(ConfigError::Invalid {
                        reason: format!("stage '{stage}' has no configured source"),
                    });
                }
            }
            if let Some(reason) = StageName::order_violation(stages) {
                return Err(ConfigError::Invalid { reason });
            }
        }
        Ok(())
    }

    /// Stages to run, in order.
    pub fn stage_order(&self) -> Vec<StageName> {
        match &self.stages {
            Some(stages) => stages.clone(),
            None => StageName::DEFAULT_ORDER
                .into_iter()
                .filter(|stage| self.sources.for_stage(*stage).is_some())
                .collect(),
        }
    }
}
