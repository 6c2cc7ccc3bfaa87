//! language-detector: batch language detection over HTTP.
//! Main library: logging setup, startup sequence, listener wiring.

pub mod codes;
pub mod config;
pub mod detect;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use codes::LanguageTable;
use config::{LogFormat, ServiceConfig};
use detect::WhatlangDetector;
use error::StartupError;
use metrics::{MetricsRegistry, MetricsSink, ThroughputLog};
use normalize::TextNormalizer;
use pipeline::{BatchProcessor, ItemProcessor};
use server::AppState;

const DEFAULT_LOG_FILTER: &str = "language_detector=info,tower_http=info";

/// Install the global tracing subscriber. JSON lines unless asked otherwise.
pub fn init_tracing(format: LogFormat) -> Result<(), StartupError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_target(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
    };
    result.map_err(|e| StartupError::Logging(e.to_string()))
}

async fn bind(port: u16) -> Result<TcpListener, StartupError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Start the metrics listener and the main listener; run until shutdown.
///
/// The code table is loaded before the main listener binds, so a bad table
/// stops the process without ever accepting a request.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    info!(
        listen_port = config.listen_port,
        prometheus_port = config.prometheus_port,
        lang_file = %config.lang_file.display(),
        "language-detector starting"
    );

    let shutdown = CancellationToken::new();
    let registry = Arc::new(MetricsRegistry::new());

    // Metrics are additive: a failed metrics listener does not stop detection.
    let metrics_task = match bind(config.prometheus_port).await {
        Ok(listener) => {
            info!(port = config.prometheus_port, "metrics listener started");
            let app = server::build_metrics_router(Arc::clone(&registry));
            Some(tokio::spawn(server::serve(listener, app, shutdown.clone())))
        }
        Err(e) => {
            warn!(error = %e, "metrics listener not started");
            None
        }
    };

    let table = LanguageTable::load_from_file(&config.lang_file).map_err(|e| {
        error!(error = %e, path = %config.lang_file.display(), "Error loading known languages");
        e
    })?;
    info!(languages = table.len(), "known languages loaded");

    let metrics: Arc<dyn MetricsSink> = registry;
    let items = ItemProcessor::new(
        TextNormalizer::new(config.strip_prefixes.iter().cloned()),
        Arc::new(WhatlangDetector::new()),
        Arc::new(table),
        Arc::clone(&metrics),
        ThroughputLog::new(config.objects_per_log),
    );
    let state = AppState::new(BatchProcessor::new(items), metrics, config.body_limit_bytes)?;
    let app = server::build_router(state);

    let listener = bind(config.listen_port).await?;
    info!(port = config.listen_port, "language-detector listening");

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested");
        signal_token.cancel();
    });

    let served = server::serve(listener, app, shutdown.clone()).await;
    shutdown.cancel();

    if let Some(task) = metrics_task {
        match task.await {
            Ok(Err(e)) => warn!(error = %e, "metrics listener failed"),
            Err(e) => warn!(error = %e, "metrics listener task panicked"),
            Ok(Ok(())) => {}
        }
    }

    served.map_err(StartupError::Serve)?;
    info!("language-detector stopped");
    Ok(())
}
