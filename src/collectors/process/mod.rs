use crate::collectors::Collector;
use crate::collectors::source::DataSource;
use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::core::{Collector as _, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, IntGauge, Opts, Registry};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use sysinfo::{Pid, System};
use tracing::{debug, instrument, warn};

/// Resource usage of the exporter process itself.
#[derive(Clone)]
pub struct ProcessCollector {
    registry: Registry,
    cpu_usage_percent: Gauge,
    resident_memory_bytes: IntGauge,
    virtual_memory_bytes: IntGauge,
    open_fds: IntGauge,
    start_time_seconds: Gauge,
    system: Arc<Mutex<SystemState>>,
    pid: Pid,
}

struct SystemState {
    system: System,
    last_refresh: Option<Instant>,
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector {
    /// # Panics
    ///
    /// Panics if metric creation or registration fails; the names are constant.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let cpu_usage_percent = Gauge::with_opts(Opts::new(
            "process_cpu_usage_percent",
            "CPU usage of the exporter process in percent (can exceed 100 on multiple cores)",
        ))
        .expect("process_cpu_usage_percent");

        let resident_memory_bytes = IntGauge::with_opts(Opts::new(
            "process_resident_memory_bytes",
            "Resident memory size in bytes",
        ))
        .expect("process_resident_memory_bytes");

        let virtual_memory_bytes = IntGauge::with_opts(Opts::new(
            "process_virtual_memory_bytes",
            "Virtual memory size in bytes",
        ))
        .expect("process_virtual_memory_bytes");

        let open_fds = IntGauge::with_opts(Opts::new(
            "process_open_fds",
            "Number of open file descriptors",
        ))
        .expect("process_open_fds");

        let start_time_seconds = Gauge::with_opts(Opts::new(
            "process_start_time_seconds",
            "Start time of the process since unix epoch in seconds",
        ))
        .expect("process_start_time_seconds");

        let registry = Registry::new();
        registry
            .register(Box::new(cpu_usage_percent.clone()))
            .expect("register process_cpu_usage_percent");
        registry
            .register(Box::new(resident_memory_bytes.clone()))
            .expect("register process_resident_memory_bytes");
        registry
            .register(Box::new(virtual_memory_bytes.clone()))
            .expect("register process_virtual_memory_bytes");
        registry
            .register(Box::new(open_fds.clone()))
            .expect("register process_open_fds");
        registry
            .register(Box::new(start_time_seconds.clone()))
            .expect("register process_start_time_seconds");

        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        start_time_seconds.set(start_time);

        Self {
            registry,
            cpu_usage_percent,
            resident_memory_bytes,
            virtual_memory_bytes,
            open_fds,
            start_time_seconds,
            system: Arc::new(Mutex::new(SystemState {
                system: System::new(),
                last_refresh: None,
            })),
            pid: Pid::from(std::process::id() as usize),
        }
    }

    fn refresh(&self) {
        let now = Instant::now();

        let mut state = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("process collector mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        };

        // CPU usage is computed between two refreshes and is meaningless below this interval.
        let too_soon = state
            .last_refresh
            .is_some_and(|last| now.duration_since(last) < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

        if !too_soon {
            state.system.refresh_all();
            state.last_refresh = Some(now);
        }

        let Some(process) = state.system.process(self.pid) else {
            debug!(pid = %self.pid, "exporter process not found");
            return;
        };

        if !too_soon {
            self.cpu_usage_percent.set(f64::from(process.cpu_usage()));
        }

        let rss = process.memory();
        let vsz = process.virtual_memory();
        self.resident_memory_bytes.set(i64::try_from(rss).unwrap_or(0));
        self.virtual_memory_bytes.set(i64::try_from(vsz).unwrap_or(0));

        #[cfg(target_os = "linux")]
        {
            if let Ok(entries) = std::fs::read_dir(format!("/proc/{}/fd", self.pid)) {
                self.open_fds.set(i64::try_from(entries.count()).unwrap_or(0));
            }
        }

        debug!(
            cpu_percent = self.cpu_usage_percent.get(),
            rss_mb = rss / 1024 / 1024,
            vsz_mb = vsz / 1024 / 1024,
            fds = self.open_fds.get(),
            "collected process metrics"
        );
    }
}

impl Collector for ProcessCollector {
    fn name(&self) -> &'static str {
        "process"
    }

    fn describe(&self) -> Vec<Desc> {
        let mut descs = Vec::new();
        descs.extend(self.cpu_usage_percent.desc().into_iter().cloned());
        descs.extend(self.resident_memory_bytes.desc().into_iter().cloned());
        descs.extend(self.virtual_memory_bytes.desc().into_iter().cloned());
        descs.extend(self.open_fds.desc().into_iter().cloned());
        descs.extend(self.start_time_seconds.desc().into_iter().cloned());
        descs
    }

    #[instrument(skip(self, _source), level = "debug", fields(collector = "process"))]
    fn collect<'a>(&'a self, _source: &'a DataSource) -> BoxFuture<'a, Result<Vec<MetricFamily>>> {
        Box::pin(async move {
            self.refresh();
            Ok(self.registry.gather())
        })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}
