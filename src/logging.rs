//! Tracing subscriber setup for the binary and tests.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{BuildError, Result};

/// Installs the global `fmt` subscriber. `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| BuildError::resource(format!("invalid log level '{level}': {e}")))?,
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| BuildError::resource("logging already initialized"))
}
