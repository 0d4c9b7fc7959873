use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use adguardfilter_core::{ApiClient, Config, ResetScheduler, TimerRegistry};
use adguardfilter_server::{logging, router, serve};

/// How long in-flight requests may take to finish once shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::from_env().context("Failed to load configuration")?;
    let _log_guard = logging::init_tracing(&config);
    info!(port = config.port, "adguardfilter starting");

    let credentials = config.credentials.clone();
    let client = ApiClient::with_timeout(config.request_timeout)
        .context("Failed to build HTTP client")?
        .with_credentials(credentials.clone());

    // A failed startup login is not fatal: the first 401 retries it.
    match client
        .authenticate(&credentials.base_url, &credentials.username, &credentials.password)
        .await
    {
        Ok(()) => info!(base_url = %credentials.base_url, "Authenticated with AdGuard Home"),
        Err(e) => warn!(error = %e, "Initial authentication failed, will retry on first request"),
    }

    let shutdown = CancellationToken::new();
    let registry = TimerRegistry::with_shutdown(shutdown.child_token());
    let scheduler = ResetScheduler::new(client, registry, config.default_service_config());

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    info!(port = config.port, "Server started successfully. Press Ctrl+C to shutdown");

    let static_dir = config.static_dir();
    info!(dir = %static_dir.display(), "Serving web UI");

    let app = router(scheduler.clone(), static_dir);
    match serve(listener, app, shutdown_signal(), DRAIN_TIMEOUT).await {
        Ok(true) => {}
        Ok(false) => warn!("Some requests were cut off during shutdown"),
        Err(e) => error!(error = %format!("{:#}", e), "Server stopped with an error"),
    }

    info!("Initiating graceful shutdown");
    match scheduler.shutdown().await {
        Ok(true) => info!("Successfully reset blocked services to default"),
        Ok(false) => {}
        Err(e) => error!(error = %e, "Failed to reset blocked services during shutdown"),
    }
    shutdown.cancel();

    info!("adguardfilter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
