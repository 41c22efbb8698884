use super::classifier::StatusFamily;
use anyhow::{Result, anyhow};
use prometheus::core::{Collector as _, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Gauge, IntCounter, Opts, Registry};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{debug, warn};

pub const NAMESPACE: &str = "mysql";

/// A classified numeric status value, waiting for the exclusive apply step.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedValue {
    pub family: StatusFamily,
    pub label: String,
    pub value: f64,
}

/// Result of the last completed scrape cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrapeOutcome {
    pub duration: Duration,
    pub errored: bool,
}

/// Metric handles owned by the status collector.
///
/// The four labeled families exist from construction on. Generic metrics are created on
/// first sight of a status name and live for the rest of the process, so a name that stops
/// showing up keeps reporting its last value.
pub struct MetricRegistry {
    registry: Registry,
    commands: CounterVec,
    connection_errors: CounterVec,
    innodb_rows: CounterVec,
    performance_schema: CounterVec,
    generic: BTreeMap<String, Gauge>,
    rejected: HashSet<String>,
    last_scrape_duration: Gauge,
    last_scrape_error: Gauge,
    scrapes_total: IntCounter,
}

impl MetricRegistry {
    #[must_use]
    #[allow(clippy::expect_used)]
    /// Create the registry with the fixed families and scrape bookkeeping metrics.
    ///
    /// # Panics
    ///
    /// Panics if the static metric definitions are invalid (should never happen).
    pub fn new() -> Self {
        let family = |family: StatusFamily| {
            let name = family.metric_name().expect("labeled family has a metric name");
            let label = family.label_name().expect("labeled family has a label");
            CounterVec::new(Opts::new(name, family.help()).namespace(NAMESPACE), &[label])
                .expect("valid labeled family")
        };

        let last_scrape_duration = Gauge::with_opts(
            Opts::new(
                "exporter_last_scrape_duration_seconds",
                "The last scrape duration.",
            )
            .namespace(NAMESPACE),
        )
        .expect("mysql_exporter_last_scrape_duration_seconds");

        let last_scrape_error = Gauge::with_opts(
            Opts::new("exporter_last_scrape_error", "The last scrape error status.")
                .namespace(NAMESPACE),
        )
        .expect("mysql_exporter_last_scrape_error");

        let scrapes_total = IntCounter::with_opts(
            Opts::new("exporter_scrapes_total", "Current total mysqld scrapes.")
                .namespace(NAMESPACE),
        )
        .expect("mysql_exporter_scrapes_total");

        let registry = Self {
            registry: Registry::new(),
            commands: family(StatusFamily::Commands),
            connection_errors: family(StatusFamily::ConnectionErrors),
            innodb_rows: family(StatusFamily::InnodbRows),
            performance_schema: family(StatusFamily::PerformanceSchema),
            generic: BTreeMap::new(),
            rejected: HashSet::new(),
            last_scrape_duration,
            last_scrape_error,
            scrapes_total,
        };

        registry
            .register_fixed()
            .expect("fixed metrics register into an empty registry");

        registry
    }

    fn register_fixed(&self) -> Result<()> {
        for vec in [
            &self.commands,
            &self.connection_errors,
            &self.innodb_rows,
            &self.performance_schema,
        ] {
            self.registry.register(Box::new(vec.clone()))?;
        }
        self.registry
            .register(Box::new(self.last_scrape_duration.clone()))?;
        self.registry.register(Box::new(self.last_scrape_error.clone()))?;
        self.registry.register(Box::new(self.scrapes_total.clone()))?;
        Ok(())
    }

    /// Shared handle of the total scrapes counter; it is bumped outside the exclusive section.
    #[must_use]
    pub const fn scrapes_total(&self) -> &IntCounter {
        &self.scrapes_total
    }

    const fn labeled(&self, family: StatusFamily) -> Option<&CounterVec> {
        match family {
            StatusFamily::Commands => Some(&self.commands),
            StatusFamily::ConnectionErrors => Some(&self.connection_errors),
            StatusFamily::InnodbRows => Some(&self.innodb_rows),
            StatusFamily::PerformanceSchema => Some(&self.performance_schema),
            StatusFamily::Generic => None,
        }
    }

    /// Return the generic metric for `name`, creating and registering it on first use.
    ///
    /// The same handle is returned for every later call. A name that cannot be exported
    /// (invalid metric name, collision with a fixed family) is remembered and refused
    /// without another warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the metric cannot be created or registered.
    pub fn get_or_create(&mut self, name: &str) -> Result<Gauge> {
        if let Some(gauge) = self.generic.get(name) {
            return Ok(gauge.clone());
        }

        if self.rejected.contains(name) {
            return Err(anyhow!("status metric {name} cannot be exported"));
        }

        let created = Gauge::with_opts(
            Opts::new(name, StatusFamily::Generic.help()).namespace(NAMESPACE),
        )
        .map_err(anyhow::Error::from)
        .and_then(|gauge| {
            self.registry
                .register(Box::new(gauge.clone()))
                .map(|()| gauge)
                .map_err(anyhow::Error::from)
        });

        match created {
            Ok(gauge) => {
                debug!(metric = name, "registered generic status metric");
                self.generic.insert(name.to_string(), gauge.clone());
                Ok(gauge)
            }
            Err(e) => {
                warn!(metric = name, error = %e, "cannot export status metric");
                self.rejected.insert(name.to_string());
                Err(e)
            }
        }
    }

    /// Set a labeled family member to the absolute value observed on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if `family` is the generic family or the label is rejected.
    pub fn set_labeled(&self, family: StatusFamily, label: &str, value: f64) -> Result<()> {
        let vec = self
            .labeled(family)
            .ok_or_else(|| anyhow!("{family:?} is not a labeled family"))?;

        if !value.is_finite() || value < 0.0 {
            debug!(?family, label, value, "skipping value a counter cannot hold");
            return Ok(());
        }

        let counter = vec.get_metric_with_label_values(&[label])?;
        counter.reset();
        counter.inc_by(value);
        Ok(())
    }

    /// Apply one scrape's staged values in order; later values for the same series win.
    pub fn apply(&mut self, staged: &[StagedValue]) {
        for update in staged {
            let res = match update.family {
                StatusFamily::Generic => self
                    .get_or_create(&update.label)
                    .map(|gauge| gauge.set(update.value)),
                family => self.set_labeled(family, &update.label, update.value),
            };

            if let Err(e) = res {
                debug!(label = %update.label, error = %e, "status value not applied");
            }
        }
    }

    pub fn record_outcome(&self, outcome: &ScrapeOutcome) {
        self.last_scrape_duration
            .set(outcome.duration.as_secs_f64());
        self.last_scrape_error
            .set(if outcome.errored { 1.0 } else { 0.0 });
    }

    /// Visit every generic metric in name order.
    pub fn for_each(&self, mut visit: impl FnMut(&str, &Gauge)) {
        for (name, gauge) in &self.generic {
            visit(name, gauge);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.generic.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generic.is_empty()
    }

    /// Descriptors of every metric known so far.
    #[must_use]
    pub fn describe(&self) -> Vec<Desc> {
        let mut descs: Vec<Desc> = Vec::new();

        for vec in [
            &self.commands,
            &self.connection_errors,
            &self.innodb_rows,
            &self.performance_schema,
        ] {
            descs.extend(vec.desc().into_iter().cloned());
        }

        self.for_each(|_, gauge| descs.extend(gauge.desc().into_iter().cloned()));

        descs.extend(self.last_scrape_duration.desc().into_iter().cloned());
        descs.extend(self.last_scrape_error.desc().into_iter().cloned());
        descs.extend(self.scrapes_total.desc().into_iter().cloned());
        descs
    }

    #[must_use]
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::unwrap_used)]
    fn encode(registry: &MetricRegistry) -> String {
        prometheus::TextEncoder::new()
            .encode_to_string(&registry.gather())
            .unwrap()
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_get_or_create_is_idempotent() {
        let mut registry = MetricRegistry::new();

        let first = registry.get_or_create("threads_connected").unwrap();
        let second = registry.get_or_create("threads_connected").unwrap();
        first.set(5.0);
        assert!((second.get() - 5.0).abs() < f64::EPSILON);

        let third = registry.get_or_create("threads_connected").unwrap();
        assert!((third.get() - 5.0).abs() < f64::EPSILON);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_generic_metric_is_exported_with_namespace() {
        let mut registry = MetricRegistry::new();
        registry.get_or_create("uptime").unwrap().set(42.0);

        assert!(encode(&registry).contains("\nmysql_uptime 42\n"));
    }

    #[test]
    fn test_get_or_create_rejects_colliding_name() {
        let mut registry = MetricRegistry::new();

        assert!(registry.get_or_create("commands_total").is_err());
        assert!(registry.get_or_create("commands_total").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_or_create_rejects_invalid_name() {
        let mut registry = MetricRegistry::new();
        assert!(registry.get_or_create("not-a-metric").is_err());
        assert!(registry.get_or_create("").is_err());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_set_labeled_overwrites_absolute_value() {
        let registry = MetricRegistry::new();

        registry.set_labeled(StatusFamily::Commands, "select", 10.0).unwrap();
        registry.set_labeled(StatusFamily::Commands, "select", 7.0).unwrap();

        assert!(encode(&registry).contains("mysql_commands_total{command=\"select\"} 7\n"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_set_labeled_skips_negative_values() {
        let registry = MetricRegistry::new();

        registry.set_labeled(StatusFamily::InnodbRows, "read", 3.0).unwrap();
        registry.set_labeled(StatusFamily::InnodbRows, "read", -1.0).unwrap();

        assert!(encode(&registry).contains("mysql_innodb_rows_total{operation=\"read\"} 3\n"));
    }

    #[test]
    fn test_set_labeled_refuses_generic_family() {
        let registry = MetricRegistry::new();
        assert!(registry.set_labeled(StatusFamily::Generic, "x", 1.0).is_err());
    }

    #[test]
    fn test_apply_routes_values() {
        let mut registry = MetricRegistry::new();
        registry.apply(&[
            StagedValue {
                family: StatusFamily::Commands,
                label: "insert".to_string(),
                value: 3.0,
            },
            StagedValue {
                family: StatusFamily::ConnectionErrors,
                label: "internal".to_string(),
                value: 1.0,
            },
            StagedValue {
                family: StatusFamily::Generic,
                label: "threads_running".to_string(),
                value: 2.0,
            },
            StagedValue {
                family: StatusFamily::Commands,
                label: String::new(),
                value: 4.0,
            },
        ]);

        let text = encode(&registry);
        assert!(text.contains("mysql_commands_total{command=\"insert\"} 3\n"));
        assert!(text.contains("mysql_connection_errors_total{error=\"internal\"} 1\n"));
        assert!(text.contains("\nmysql_threads_running 2\n"));
        assert!(text.contains("mysql_commands_total{command=\"\"} 4\n"));
    }

    #[test]
    fn test_record_outcome() {
        let registry = MetricRegistry::new();
        registry.record_outcome(&ScrapeOutcome {
            duration: Duration::from_millis(250),
            errored: true,
        });

        let text = encode(&registry);
        assert!(text.contains("\nmysql_exporter_last_scrape_error 1\n"));
        assert!(text.contains("\nmysql_exporter_last_scrape_duration_seconds 0.25\n"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_describe_lists_fixed_and_generic_metrics() {
        let mut registry = MetricRegistry::new();
        registry.get_or_create("uptime").unwrap();

        let names: Vec<String> = registry
            .describe()
            .into_iter()
            .map(|d| d.fq_name)
            .collect();

        for expected in [
            "mysql_commands_total",
            "mysql_connection_errors_total",
            "mysql_innodb_rows_total",
            "mysql_performance_schema_total",
            "mysql_uptime",
            "mysql_exporter_last_scrape_duration_seconds",
            "mysql_exporter_last_scrape_error",
            "mysql_exporter_scrapes_total",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_for_each_visits_in_name_order() {
        let mut registry = MetricRegistry::new();
        registry.get_or_create("uptime").unwrap();
        registry.get_or_create("aborted_clients").unwrap();

        let mut seen = Vec::new();
        registry.for_each(|name, _| seen.push(name.to_string()));
        assert_eq!(seen, vec!["aborted_clients", "uptime"]);
    }
}
