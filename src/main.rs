use mysqld_exporter::cli::{actions, start, telemetry};
use tracing::error;

#[tokio::main]
async fn main() {
    let result = async {
        let action = start()?;
        actions::run::handle(action).await
    }
    .await;

    telemetry::shutdown_tracer();

    if let Err(e) = result {
        if tracing::dispatcher::has_been_set() {
            error!("{e:#}");
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}
