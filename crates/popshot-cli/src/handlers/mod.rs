//! Command handlers
//!
//! Each handler module contains the execution logic for one CLI command
//! plus the pure helpers it is built from, tested in place.

pub mod fake_script;
pub mod run;
pub mod validate;

pub use fake_script::{execute_fake_script, render_fake_script};
pub use run::{apply_overrides, builtin_scenario, execute_builtin, execute_run, launch_config};
pub use validate::{check_scenario_file, execute_validate};

use crate::config::CliConfig;
use crate::output::render_builtin_list;

/// Print the built-in scenario table
pub fn execute_list(_config: &CliConfig) {
    println!("{}", render_builtin_list());
}
