//! Timed Cache - An in-process expiring cache server
//!
//! Serves an expiring cache with alias lookup and a verification resend
//! throttle over HTTP.

use std::net::SocketAddr;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timed_cache::api::create_router;
use timed_cache::{spawn_stats_report, AppState, Config, JobHandle, Scheduler};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Start the scheduler and build the caches on it
/// 4. Schedule the recurring stats report
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timed_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Timed Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_expiration={}s, port={}, stats_report_interval={}s, resend_limit={}, resend_window={}s",
        config.default_expiration,
        config.server_port,
        config.stats_report_interval,
        config.resend_limit,
        config.resend_window
    );

    let scheduler = Scheduler::new();
    let state = AppState::from_config(&config, scheduler.clone());
    info!("Cache initialized");

    let stats_report = match config.stats_report_interval() {
        Some(interval) => {
            let report = spawn_stats_report(&scheduler, state.cache.clone(), interval)?;
            info!("Job [{}] scheduled every {:?}", report.marker(), interval);
            Some(report)
        }
        None => None,
    };

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(stats_report))
        .await?;

    state.close();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, cancels the stats report and allows graceful shutdown.
async fn shutdown_signal(stats_report: Option<JobHandle>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
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
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(report) = stats_report {
        report.cancel();
        warn!("Stats report cancelled");
    }
}
