//! Validate command handler

use crate::commands::ValidateArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_scenario_outline, ProgressReporter};
use popshot::{PopshotResult, Scenario};
use std::path::Path;

/// Load and check one scenario file
pub fn check_scenario_file(path: &Path) -> PopshotResult<Scenario> {
    let scenario = Scenario::from_file(path)?;
    scenario.validate()?;
    Ok(scenario)
}

/// Execute the validate command
pub fn execute_validate(config: &CliConfig, args: &ValidateArgs) -> CliResult<()> {
    let reporter =
        ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());

    let mut failed = 0usize;
    for path in &args.scenarios {
        match check_scenario_file(path) {
            Ok(scenario) => {
                reporter.success(&path.display().to_string());
                if !config.verbosity.is_quiet() {
                    print!("{}", render_scenario_outline(&scenario));
                    let names = scenario.checkpoint_names();
                    if !names.is_empty() {
                        println!("  checkpoints: {}", names.join(", "));
                    }
                }
            }
            Err(e) => {
                failed += 1;
                reporter.failure(&format!("{}: {e}", path.display()));
            }
        }
    }

    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::config(format!(
            "{failed} of {} scenario files are invalid",
            args.scenarios.len()
        )))
    }
}
