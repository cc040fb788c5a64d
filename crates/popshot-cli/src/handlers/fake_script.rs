//! Fake-script command handler

use crate::commands::FakeScriptArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::ProgressReporter;
use popshot::{FakePlatformApi, FakeStorageState, PopshotResult};

/// Render the script a page would receive for `data`
pub fn render_fake_script(data: FakeStorageState, mutable: bool) -> PopshotResult<String> {
    FakePlatformApi::new(data).mutable(mutable).to_script()
}

/// Execute the fake-script command
pub fn execute_fake_script(config: &CliConfig, args: &FakeScriptArgs) -> CliResult<()> {
    let data = FakeStorageState::from_json_file(&args.data)?;
    let keys = data.len();
    let script = render_fake_script(data, args.mutable)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &script)?;
            let reporter =
                ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
            reporter.info(&format!(
                "Wrote fake script ({keys} keys) to {}",
                path.display()
            ));
        }
        None => println!("{script}"),
    }
    Ok(())
}
