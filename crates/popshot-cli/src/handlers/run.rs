//! Run and builtin command handlers

use crate::commands::{BuiltinArgs, LaunchArgs, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;
use popshot::{BuiltinOptions, BuiltinScenario, FakeStorageState, LaunchConfig, Scenario, Target};

/// Apply command-line overrides on top of a loaded scenario
pub fn apply_overrides(scenario: &mut Scenario, launch: &LaunchArgs) -> CliResult<()> {
    if let Some(headless) = launch.headless_override() {
        scenario.headless = Some(headless);
    }
    if let Some(dir) = &launch.output_dir {
        scenario.output_dir = Some(dir.clone());
    }
    if let Some(idle_ms) = launch.settle_ms {
        scenario.settle = scenario.settle.with_idle_ms(idle_ms);
    }
    if let Some(timeout) = launch.timeout {
        if timeout == 0 {
            return Err(CliError::invalid_argument("--timeout must be positive"));
        }
        scenario.default_timeout_ms = timeout;
    }
    Ok(())
}

/// Browser settings for a scenario plus the launch flags
#[must_use]
pub fn launch_config(scenario: &Scenario, launch: &LaunchArgs) -> LaunchConfig {
    let mut config = LaunchConfig::for_scenario(scenario);
    if let Some(path) = &launch.chromium {
        config = config.with_chromium_path(path);
    }
    if launch.no_sandbox {
        config = config.with_no_sandbox();
    }
    config
}

/// Build the scenario a `builtin` invocation describes, without launching anything
pub fn builtin_scenario(args: &BuiltinArgs) -> CliResult<Scenario> {
    let builtin: BuiltinScenario = args.name.parse()?;

    let mut options = BuiltinOptions::default().with_popup_url(&args.popup);
    if let Some(dir) = &args.extension {
        options = options.with_extension_dir(dir);
    }
    if let Some(data) = &args.data {
        options.fake_data = FakeStorageState::from_json_file(data)?;
    }

    let mut scenario = builtin.build(&options)?;
    if let (Some(profile), Target::LiveExtension { profile_dir, .. }) =
        (&args.profile, &mut scenario.target)
    {
        *profile_dir = Some(profile.clone());
    }
    apply_overrides(&mut scenario, &args.launch)?;
    Ok(scenario)
}

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let mut scenario = Scenario::from_file(&args.scenario)?;
    if let Some(data) = &args.data {
        scenario.fake_data = FakeStorageState::from_json_file(data)?;
    }
    apply_overrides(&mut scenario, &args.launch)?;
    scenario.validate()?;

    let launch = launch_config(&scenario, &args.launch);
    execute_scenario(config, &scenario, launch, args.launch.format.into())
}

/// Execute the builtin command
pub fn execute_builtin(config: &CliConfig, args: &BuiltinArgs) -> CliResult<()> {
    let scenario = builtin_scenario(args)?;
    scenario.validate()?;

    let launch = launch_config(&scenario, &args.launch);
    execute_scenario(config, &scenario, launch, args.launch.format.into())
}

#[cfg(feature = "browser")]
fn execute_scenario(
    config: &CliConfig,
    scenario: &Scenario,
    launch: LaunchConfig,
    format: OutputFormat,
) -> CliResult<()> {
    use crate::output::ProgressReporter;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::runtime(format!("failed to start async runtime: {e}")))?;

    let mut reporter =
        ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    reporter.info(&format!(
        "{}: {} target, {}, checkpoints in {}",
        scenario.name,
        if scenario.target.is_live() { "live" } else { "static" },
        if launch.headless { "headless" } else { "headed" },
        scenario.output_dir().display()
    ));
    reporter.start_spinner(&format!("Running {}", scenario.name));
    let outcome = runtime.block_on(popshot::run_scenario(scenario, launch));
    reporter.finish();

    match outcome {
        Ok(report) => {
            match format {
                OutputFormat::Json => {
                    println!("{}", crate::output::render_report_json(&report)?);
                }
                OutputFormat::Text => {
                    reporter.header(&report.scenario);
                    println!("{}", crate::output::render_report_text(&report));
                }
            }
            reporter.success(&format!("{} passed", report.scenario));
            Ok(())
        }
        Err(e) => {
            reporter.failure(&format!("{} failed", scenario.name));
            Err(e.into())
        }
    }
}

#[cfg(not(feature = "browser"))]
fn execute_scenario(
    _config: &CliConfig,
    _scenario: &Scenario,
    _launch: LaunchConfig,
    _format: OutputFormat,
) -> CliResult<()> {
    Err(CliError::runtime(
        "browser support not enabled. Rebuild with --features browser",
    ))
}
