//! Log subscriber setup
//!
//! Logs go to stderr so that `--format json` reports on stdout stay parseable.
//! `RUST_LOG` takes precedence over the `-v`/`-q` flags.

use crate::config::{CliConfig, LogFormat};
use crate::error::{CliError, CliResult};
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to the verbosity flags
#[must_use]
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()))
}

/// Install the global subscriber
pub fn init_logging(config: &CliConfig) -> CliResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr)
        .with_target(config.verbosity.is_verbose());

    let installed = match config.log_format {
        LogFormat::Text => builder.with_ansi(config.color.should_color()).try_init(),
        LogFormat::Json => builder.json().with_ansi(false).try_init(),
    };
    installed.map_err(|e| CliError::config(format!("failed to install logger: {e}")))
}
