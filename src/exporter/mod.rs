//! HTTP side of the exporter: listener, routes and middleware.

mod handlers;

use crate::collectors::config::CollectorConfig;
use crate::collectors::registry::CollectorRegistry;
use crate::collectors::source::DataSource;
use crate::collectors::util::split_host_port;
use anyhow::{Context, Result, bail};
use axum::{
    Router,
    http::{HeaderValue, Request, header},
    routing::get,
};
use secrecy::SecretString;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, info, warn};
use ulid::Ulid;

pub const SERVER_HEADER: &str = concat!("mysqld_exporter/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct ExporterOptions {
    pub listen_address: String,
    pub telemetry_path: String,
    pub dsn: SecretString,
    pub collectors: Vec<String>,
    pub scrape_timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct AppState {
    registry: Arc<CollectorRegistry>,
    source: Arc<DataSource>,
    telemetry_path: Arc<str>,
}

impl AppState {
    #[must_use]
    pub fn new(registry: CollectorRegistry, source: DataSource, telemetry_path: &str) -> Self {
        Self {
            registry: Arc::new(registry),
            source: Arc::new(source),
            telemetry_path: Arc::from(telemetry_path),
        }
    }
}

#[derive(Clone, Copy, Default)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Ulid::new().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// # Errors
///
/// Returns an error if `path` does not start with `/` or clashes with a fixed route.
pub fn validate_telemetry_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        bail!("telemetry path must start with '/': {path}");
    }
    if path == "/" || path == "/health" {
        bail!("telemetry path {path} is reserved");
    }
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let telemetry_path = state.telemetry_path.to_string();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(&telemetry_path, get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUlid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::SERVER,
                    HeaderValue::from_static(SERVER_HEADER),
                )),
        )
        .with_state(state)
}

/// Bind `listen_address` (`host:port`, `[v6]:port` or `:port`).
///
/// An empty host listens on all interfaces, IPv6 first and IPv4 if that fails.
///
/// # Errors
///
/// Returns an error if the address is malformed or cannot be bound.
pub async fn bind(listen_address: &str) -> Result<TcpListener> {
    let (host, port) = split_host_port(listen_address, None)
        .with_context(|| format!("invalid listen address {listen_address}"))?;

    if host.is_empty() {
        match TcpListener::bind((Ipv6Addr::UNSPECIFIED, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => debug!(error = %e, "IPv6 not available, falling back to IPv4"),
        }

        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .with_context(|| format!("failed to bind to 0.0.0.0:{port}"));
    }

    TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind to {listen_address}"))
}

/// Start the exporter and serve until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error on invalid configuration or if the listener cannot be bound.
pub async fn new(options: ExporterOptions) -> Result<()> {
    validate_telemetry_path(&options.telemetry_path)?;

    let config = CollectorConfig::new().with_enabled(&options.collectors);
    config.validate()?;

    let source = DataSource::new(&options.dsn, options.scrape_timeout)?;
    let registry = CollectorRegistry::new(&config);

    info!(
        dsn = source.display(),
        collectors = ?registry.enabled(),
        descriptors = registry.describe().len(),
        scrape_timeout = ?options.scrape_timeout,
        "starting mysqld_exporter"
    );

    let listener = bind(&options.listen_address).await?;
    let local_addr = listener.local_addr()?;

    info!(
        "listening on {local_addr}, metrics at {}",
        options.telemetry_path
    );

    let app = router(AppState::new(registry, source, &options.telemetry_path));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("exporter stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
