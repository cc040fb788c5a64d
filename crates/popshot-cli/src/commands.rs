//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Popshot: screenshot verification for browser extension popups
#[derive(Parser, Debug)]
#[command(name = "popshot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario file
    Run(RunArgs),

    /// Run a built-in popup scenario
    Builtin(BuiltinArgs),

    /// Check scenario files without launching a browser
    Validate(ValidateArgs),

    /// List built-in scenarios
    List,

    /// Print the fake platform API script for a storage fixture
    FakeScript(FakeScriptArgs),
}

/// Browser and artifact overrides shared by `run` and `builtin`
#[derive(Args, Debug, Clone, Default)]
pub struct LaunchArgs {
    /// Run headless (default: headless for static, headed for live targets)
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Run with a visible window
    #[arg(long)]
    pub headed: bool,

    /// Directory for checkpoint screenshots
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Idle delay before screenshots, in milliseconds
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Default timeout for wait steps, in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Chromium executable
    #[arg(long, env = "POPSHOT_CHROMIUM")]
    pub chromium: Option<PathBuf>,

    /// Disable the chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: ReportFormatArg,
}

impl LaunchArgs {
    /// Headless override, if one was given
    #[must_use]
    pub const fn headless_override(&self) -> Option<bool> {
        if self.headless {
            Some(true)
        } else if self.headed {
            Some(false)
        } else {
            None
        }
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario file (YAML)
    pub scenario: PathBuf,

    /// Replace the scenario's fake storage with a JSON file
    #[arg(long)]
    pub data: Option<PathBuf>,

    #[command(flatten)]
    pub launch: LaunchArgs,
}

/// Arguments for the builtin command
#[derive(Parser, Debug)]
pub struct BuiltinArgs {
    /// Built-in scenario name (see `popshot list`)
    pub name: String,

    /// Popup document for static runs (file path or URL)
    #[arg(long, default_value = "popup/popup.html")]
    pub popup: String,

    /// Unpacked extension directory; runs against the live extension
    #[arg(short, long)]
    pub extension: Option<PathBuf>,

    /// Profile directory for live runs (temporary when omitted)
    #[arg(long, requires = "extension")]
    pub profile: Option<PathBuf>,

    /// Fake storage contents (JSON file); defaults to the usage fixture
    #[arg(long)]
    pub data: Option<PathBuf>,

    #[command(flatten)]
    pub launch: LaunchArgs,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Scenario files to check
    #[arg(required = true)]
    pub scenarios: Vec<PathBuf>,
}

/// Arguments for the fake-script command
#[derive(Parser, Debug)]
pub struct FakeScriptArgs {
    /// Storage contents (JSON object)
    #[arg(long)]
    pub data: PathBuf,

    /// Let set/remove/clear mutate the fake state
    #[arg(long)]
    pub mutable: bool,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ReportFormatArg {
    /// Human-readable summary
    #[default]
    Text,
    /// Run report as JSON on stdout
    Json,
}

impl From<ReportFormatArg> for crate::output::OutputFormat {
    fn from(arg: ReportFormatArg) -> Self {
        match arg {
            ReportFormatArg::Text => Self::Text,
            ReportFormatArg::Json => Self::Json,
        }
    }
}
