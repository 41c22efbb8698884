//! `SHOW GLOBAL STATUS` / `SHOW SLAVE STATUS` pipeline.
//!
//! One scrape cycle streams `name → value` rows out of the database, converts and classifies
//! them without holding any lock, then applies everything it staged to the [`MetricRegistry`]
//! and snapshots the registry inside a single exclusive section. Concurrent scrapes may
//! overlap their query phases but never their apply/snapshot phases.

pub mod classifier;
pub mod parser;
pub mod registry;

pub use classifier::{StatusFamily, classify};
pub use parser::parse_status;
pub use registry::{MetricRegistry, ScrapeOutcome, StagedValue};

use crate::collectors::Collector;
use crate::collectors::source::DataSource;
use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::IntCounter;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tracing::{debug, instrument, warn};

/// One `(name, raw value)` pair as returned by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusRow {
    pub name: String,
    pub value: String,
}

impl StatusRow {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Producer side of a scrape: pushes status rows, in server order, until done or failed.
///
/// Dropping the sender (returning) ends the cycle's row stream. Rows sent before an error
/// are still applied.
pub trait StatusSource: Send + Sync {
    fn stream<'a>(&'a self, rows: UnboundedSender<StatusRow>) -> BoxFuture<'a, Result<()>>;
}

/// Convert one row into a staged value; non-numeric values are dropped.
#[must_use]
pub fn stage(row: &StatusRow) -> Option<StagedValue> {
    let name = row.name.to_lowercase();

    let Ok(value) = row.value.parse::<f64>() else {
        debug!(status = %row.name, value = %row.value, "skipping non-numeric status value");
        return None;
    };

    let (family, label) = classify(&name);
    Some(StagedValue {
        family,
        label: label.to_string(),
        value,
    })
}

struct CollectorState {
    registry: MetricRegistry,
    outcome: ScrapeOutcome,
}

/// Collects server status counters into a registry that only ever grows.
#[derive(Clone)]
pub struct StatusCollector {
    state: Arc<Mutex<CollectorState>>,
    scrapes_total: IntCounter,
}

impl Default for StatusCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCollector {
    #[must_use]
    pub fn new() -> Self {
        let registry = MetricRegistry::new();
        let scrapes_total = registry.scrapes_total().clone();

        Self {
            state: Arc::new(Mutex::new(CollectorState {
                registry,
                outcome: ScrapeOutcome::default(),
            })),
            scrapes_total,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("status collector mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Query phase: stream rows from `source` and stage them. Holds no lock.
    async fn query<S>(&self, source: &S) -> (Vec<StagedValue>, ScrapeOutcome)
    where
        S: StatusSource + ?Sized,
    {
        let started = Instant::now();
        self.scrapes_total.inc();

        let (tx, mut rx) = unbounded_channel::<StatusRow>();

        let consume = async {
            let mut staged = Vec::new();
            while let Some(row) = rx.recv().await {
                if let Some(value) = stage(&row) {
                    staged.push(value);
                }
            }
            staged
        };

        let (result, staged) = tokio::join!(source.stream(tx), consume);

        let errored = match result {
            Ok(()) => false,
            Err(e) => {
                warn!("scrape failed: {e:#}");
                true
            }
        };

        let outcome = ScrapeOutcome {
            duration: started.elapsed(),
            errored,
        };

        debug!(
            staged = staged.len(),
            errored,
            duration_seconds = outcome.duration.as_secs_f64(),
            "scrape query phase finished"
        );

        (staged, outcome)
    }

    fn apply(state: &mut CollectorState, staged: &[StagedValue], outcome: ScrapeOutcome) {
        state.registry.apply(staged);
        state.registry.record_outcome(&outcome);
        state.outcome = outcome;
    }

    /// Run one full scrape cycle and return its outcome.
    #[instrument(skip_all, level = "debug", fields(collector = "status"))]
    pub async fn scrape<S>(&self, source: &S) -> ScrapeOutcome
    where
        S: StatusSource + ?Sized,
    {
        let (staged, outcome) = self.query(source).await;
        let mut state = self.lock();
        Self::apply(&mut state, &staged, outcome);
        outcome
    }

    /// Run one full scrape cycle and snapshot every metric within the same exclusive section.
    #[instrument(skip_all, level = "debug", fields(collector = "status"))]
    pub async fn collect_from<S>(&self, source: &S) -> Vec<MetricFamily>
    where
        S: StatusSource + ?Sized,
    {
        let (staged, outcome) = self.query(source).await;
        let mut state = self.lock();
        Self::apply(&mut state, &staged, outcome);
        state.registry.gather()
    }

    /// Outcome of the last completed scrape.
    #[must_use]
    pub fn last_outcome(&self) -> ScrapeOutcome {
        self.lock().outcome
    }

    #[must_use]
    pub fn scrapes_total(&self) -> u64 {
        self.scrapes_total.get()
    }

    /// Snapshot without scraping.
    #[must_use]
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.lock().registry.gather()
    }
}

impl Collector for StatusCollector {
    fn name(&self) -> &'static str {
        "status"
    }

    fn describe(&self) -> Vec<Desc> {
        self.lock().registry.describe()
    }

    fn collect<'a>(&'a self, source: &'a DataSource) -> BoxFuture<'a, Result<Vec<MetricFamily>>> {
        Box::pin(async move { Ok(self.collect_from(source).await) })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}
