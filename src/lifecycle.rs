//! Process lifecycle: one cancellation token per command, cancelled on
//! SIGINT/SIGTERM.

use anyhow::Result;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Wait for SIGINT or SIGTERM, then cancel `token`.
pub async fn wait_for_shutdown_signal(token: CancellationToken) -> Result<(), std::io::Error> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            warn!("Signal 'interrupt' was caught. Exiting");
        }
        _ = sigterm.recv() => {
            warn!("Signal 'terminated' was caught. Exiting");
        }
        _ = token.cancelled() => return Ok(()),
    }

    token.cancel();
    Ok(())
}

/// Run `work` under a fresh cancellation token that termination signals
/// cancel, and wait for it to finish.
pub async fn run_with_cancellation<F, Fut, T>(work: F) -> Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let token = CancellationToken::new();

    let signal_token = token.clone();
    let watcher = tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal(signal_token).await {
            error!("Signal handler failed, shutdown on signal is unavailable: {}", e);
        }
    });

    let result = work(token.clone()).await;

    // Releases the watcher when `work` finished on its own.
    token.cancel();
    watcher.abort();

    match &result {
        Ok(_) => info!("Exiting."),
        Err(e) => info!("Exiting: {:#}", e),
    }
    result
}
