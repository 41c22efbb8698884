use crate::cli::actions::Action;
use crate::exporter::{ExporterOptions, new};
use anyhow::Result;

/// Handle the run action
///
/// # Errors
///
/// Returns an error if the exporter fails to start
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Run {
            listen_address,
            telemetry_path,
            dsn,
            collectors,
            scrape_timeout,
        } => {
            new(ExporterOptions {
                listen_address,
                telemetry_path,
                dsn,
                collectors,
                scrape_timeout,
            })
            .await?;
        }
    }

    Ok(())
}
