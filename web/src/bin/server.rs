//! RSVP HTTP server.
//!
//! Loads `.env`, reads configuration from the environment, starts the
//! Prometheus exporter and serves the API until Ctrl+C or SIGTERM.

use metrics_exporter_prometheus::PrometheusBuilder;
use rsvp_core::{EntityStore, SystemClock};
use rsvp_postgres::PostgresEntityStore;
use rsvp_runtime::InMemoryEntityStore;
use rsvp_web::{AppState, Config, StoreBackend, build_router};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; the environment may already be populated
    let dotenv = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting RSVP server");
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded .env");
    }
    info!(
        backend = ?config.backend,
        bind = %config.bind_address(),
        allow_past_events = config.service.allow_past_events,
        "Configuration loaded"
    );

    // Metrics
    let metrics_host: IpAddr = config.server.metrics_host.parse()?;
    PrometheusBuilder::new()
        .with_http_listener((metrics_host, config.server.metrics_port))
        .install()?;
    rsvp_runtime::metrics::register_metrics();
    info!(
        address = %format!("{}:{}", config.server.metrics_host, config.server.metrics_port),
        "Prometheus exporter listening"
    );

    // Entity store
    let store: Arc<dyn EntityStore> = match config.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store; state is lost on restart");
            Arc::new(InMemoryEntityStore::new())
        }
        StoreBackend::Postgres => {
            info!("Connecting to PostgreSQL...");
            let store = PostgresEntityStore::connect(&config.postgres).await?;
            store.migrate().await?;
            info!("PostgreSQL connected and migrated");
            Arc::new(store)
        }
    };

    let state = AppState::new(store, Arc::new(SystemClock), config.service.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!(address = %listener.local_addr()?, "HTTP server listening");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    };

    tokio::select! {
        result = server => result?,
        () = drain_deadline(shutdown_timeout) => {
            error!(timeout_secs = shutdown_timeout.as_secs(), "Graceful shutdown timed out");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Resolves `timeout` after a shutdown signal, bounding how long in-flight
/// requests may drain.
async fn drain_deadline(timeout: Duration) {
    shutdown_signal().await;
    tokio::time::sleep(timeout).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
