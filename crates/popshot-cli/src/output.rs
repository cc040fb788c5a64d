//! Output formatting and progress reporting

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use popshot::{BuiltinScenario, RunReport, Scenario};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output format for run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Progress reporter for scenario runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner while a scenario runs
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Remove the spinner
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }
}

/// Render a run report as text lines
#[must_use]
pub fn render_report_text(report: &RunReport) -> String {
    let mut out = String::new();
    if let Some(id) = &report.extension_id {
        out.push_str(&format!("extension id: {id}\n"));
    }
    for checkpoint in &report.checkpoints {
        let digest = checkpoint.sha256.get(..12).unwrap_or(&checkpoint.sha256);
        out.push_str(&format!(
            "checkpoint {} -> {} ({}x{}, sha256 {digest})\n",
            checkpoint.name,
            checkpoint.path.display(),
            checkpoint.width,
            checkpoint.height,
        ));
    }
    let secs = Duration::from_millis(report.elapsed_ms).as_secs_f64();
    out.push_str(&format!(
        "{} steps, {} checkpoints in {secs:.2}s",
        report.steps_executed,
        report.checkpoints.len()
    ));
    out
}

/// Render a run report as pretty JSON
pub fn render_report_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Render a scenario's steps for `validate`
#[must_use]
pub fn render_scenario_outline(scenario: &Scenario) -> String {
    let mut out = format!(
        "{} ({} target, {} steps, output {})\n",
        scenario.name,
        if scenario.target.is_live() { "live" } else { "static" },
        scenario.steps.len(),
        scenario.output_dir().display()
    );
    for (index, step) in scenario.steps.iter().enumerate() {
        out.push_str(&format!("  {index:>2}. {step}\n"));
    }
    out
}

/// Render the built-in scenario table
#[must_use]
pub fn render_builtin_list() -> String {
    BuiltinScenario::ALL
        .iter()
        .map(|b| {
            let live = if b.requires_live() { " [live]" } else { "" };
            format!("{:<24} {}{live}", b.name(), b.description())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
