use crate::{
    cli::actions::Action,
    collectors::{COLLECTOR_NAMES, Collector, all_factories},
    exporter::validate_telemetry_path,
};
use anyhow::{Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::time::Duration;
use tracing::debug;

/// # Errors
///
/// Returns an error if the DSN is missing or the telemetry path is invalid
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let dsn = matches
        .get_one::<String>("dsn")
        .filter(|dsn| !dsn.trim().is_empty())
        .cloned()
        .map(SecretString::from)
        .ok_or_else(|| anyhow!("couldn't find environment variable DATA_SOURCE_NAME"))?;

    let listen_address = matches
        .get_one::<String>("listen-address")
        .cloned()
        .ok_or_else(|| anyhow!("listen address is required"))?;

    let telemetry_path = matches
        .get_one::<String>("telemetry-path")
        .cloned()
        .ok_or_else(|| anyhow!("telemetry path is required"))?;
    validate_telemetry_path(&telemetry_path)?;

    let scrape_timeout = matches
        .get_one::<u64>("scrape-timeout")
        .copied()
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs);

    let collectors = get_enabled_collectors(matches);
    debug!(?collectors, ?scrape_timeout, "parsed arguments");

    Ok(Action::Run {
        listen_address,
        telemetry_path,
        dsn,
        collectors,
        scrape_timeout,
    })
}

#[must_use]
pub fn get_enabled_collectors(matches: &ArgMatches) -> Vec<String> {
    let factories = all_factories();

    COLLECTOR_NAMES
        .iter()
        .filter(|&name| {
            if matches.get_flag(&format!("no-collector.{name}")) {
                return false;
            }

            if matches.get_flag(&format!("collector.{name}")) {
                return true;
            }

            factories
                .get(name)
                .is_some_and(|factory| factory().enabled_by_default())
        })
        .map(|&name| name.to_string())
        .collect()
}
