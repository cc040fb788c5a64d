//! Popshot CLI: screenshot verification for browser extension popups
//!
//! ## Usage
//!
//! ```bash
//! popshot run scenarios/popup.yaml            # Run a scenario file
//! popshot builtin popup-toggle                # Static popup with fake data
//! popshot builtin settings-centered -e ./ext  # Live extension
//! popshot validate scenarios/*.yaml           # Check without a browser
//! ```

use clap::Parser;
use popshot_cli::{handlers, init_logging, Cli, CliConfig, CliResult, Commands, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    init_logging(&config)?;

    match cli.command {
        Commands::Run(args) => handlers::execute_run(&config, &args),
        Commands::Builtin(args) => handlers::execute_builtin(&config, &args),
        Commands::Validate(args) => handlers::execute_validate(&config, &args),
        Commands::List => {
            handlers::execute_list(&config);
            Ok(())
        }
        Commands::FakeScript(args) => handlers::execute_fake_script(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}
