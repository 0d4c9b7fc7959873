use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Serve `app` until `signal` resolves, then give in-flight requests
/// `drain_timeout` to finish.
///
/// Returns `false` when connections were still open at the deadline and had
/// to be cut off.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    drain_timeout: Duration,
) -> anyhow::Result<bool>
where
    F: Future<Output = ()> + Send + 'static,
{
    let drain = CancellationToken::new();
    let server = axum::serve(listener, app).with_graceful_shutdown(drain.clone().cancelled_owned());
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut server => {
            result.context("Server task failed")?.context("Server error")?;
            Ok(true)
        }
        _ = signal => {
            info!("Draining connections");
            drain.cancel();
            match tokio::time::timeout(drain_timeout, &mut server).await {
                Ok(result) => {
                    result.context("Server task failed")?.context("Server error")?;
                    Ok(true)
                }
                Err(_) => {
                    warn!(
                        timeout_ms = drain_timeout.as_millis() as u64,
                        "Connections did not drain in time, closing them"
                    );
                    server.abort();
                    Ok(false)
                }
            }
        }
    }
}
