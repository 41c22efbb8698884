use crate::collectors::config::CollectorConfig;
use crate::collectors::source::DataSource;
use crate::collectors::{Collector, CollectorType, all_factories};
use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use prometheus::core::Desc;
use prometheus::{Encoder as _, TextEncoder};
use tracing::{debug, info, info_span, instrument, warn};
use tracing_futures::Instrument as _;

/// The enabled collectors, created once and shared by every HTTP request.
#[derive(Clone)]
pub struct CollectorRegistry {
    collectors: Vec<CollectorType>,
}

impl CollectorRegistry {
    /// Instantiate every enabled collector. Unknown names are skipped with a warning;
    /// call [`CollectorConfig::validate`] first to reject them instead.
    #[must_use]
    pub fn new(config: &CollectorConfig) -> Self {
        let factories = all_factories();
        let mut collectors = Vec::with_capacity(config.enabled().len());

        for name in config.enabled() {
            match factories.get(name.as_str()) {
                Some(factory) => {
                    collectors.push(factory());
                    info!(collector = %name, "enabled collector");
                }
                None => warn!(collector = %name, "unknown collector, skipping"),
            }
        }

        Self { collectors }
    }

    /// Names of the instantiated collectors, in order.
    #[must_use]
    pub fn enabled(&self) -> Vec<&'static str> {
        self.collectors.iter().map(Collector::name).collect()
    }

    /// Descriptors of every metric the enabled collectors can export, without scraping.
    ///
    /// Generic status metrics appear only after the first scrape and are not listed.
    #[must_use]
    pub fn describe(&self) -> Vec<Desc> {
        self.collectors
            .iter()
            .flat_map(Collector::describe)
            .collect()
    }

    /// Run all collectors concurrently and encode their merged output in the text format.
    ///
    /// A failing collector is logged and left out of the response.
    ///
    /// # Errors
    ///
    /// Returns an error only if encoding fails.
    #[instrument(skip_all, level = "info", fields(otel.kind = "internal"))]
    pub async fn collect_all(&self, source: &DataSource) -> Result<String> {
        let mut tasks = FuturesUnordered::new();

        for collector in &self.collectors {
            let name = collector.name();
            let span = info_span!("collector.collect", collector = %name, otel.kind = "internal");
            tasks.push(
                async move { (name, collector.collect(source).await) }.instrument(span),
            );
        }

        let mut families = Vec::new();
        while let Some((name, result)) = tasks.next().await {
            match result {
                Ok(mut collected) => {
                    debug!(collector = name, families = collected.len(), "collected");
                    families.append(&mut collected);
                }
                Err(e) => warn!(collector = name, error = %e, "collector failed"),
            }
        }

        families.sort_by(|a, b| a.name().cmp(b.name()));

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .context("failed to encode metrics")?;

        String::from_utf8(buffer).context("metrics output is not valid UTF-8")
    }
}
