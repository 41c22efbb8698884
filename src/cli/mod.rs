pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

use anyhow::Result;

/// Parse the command line, set up logging and return the action to run.
///
/// # Errors
///
/// Returns an error if telemetry cannot be initialised or the arguments are invalid.
pub fn start() -> Result<actions::Action> {
    let matches = commands::new().get_matches();

    let verbosity = matches.get_count("verbosity");
    telemetry::init(verbosity)?;

    dispatch::handler(&matches)
}
