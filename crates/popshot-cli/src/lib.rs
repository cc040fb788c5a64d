//! Popshot CLI Library
//!
//! Command-line interface for running popup screenshot scenarios.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;

pub use commands::{
    BuiltinArgs, Cli, ColorArg, Commands, FakeScriptArgs, LaunchArgs, LogFormatArg,
    ReportFormatArg, RunArgs, ValidateArgs,
};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::{env_filter, init_logging};
pub use output::{
    render_builtin_list, render_report_json, render_report_text, render_scenario_outline,
    OutputFormat, ProgressReporter,
};
