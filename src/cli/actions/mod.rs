pub mod run;

use secrecy::SecretString;
use std::time::Duration;

#[derive(Debug)]
pub enum Action {
    Run {
        listen_address: String,
        telemetry_path: String,
        dsn: SecretString,
        collectors: Vec<String>,
        scrape_timeout: Option<Duration>,
    },
}
