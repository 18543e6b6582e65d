use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::control::ControlService;
use crate::history::WindowHistory;
use crate::listener::EventListener;
use crate::remarker::Remarker;
use crate::socket_server;
use crate::sway_client::{RealSwayClient, monitor_sway_events};

/// Settings for the `run` command
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// Mark template; empty disables marking
    pub mark_format: String,
    /// Stop an already running instance instead of failing
    pub restart: bool,
}

/// Track window focus and serve the history until `token` is cancelled or a
/// client asks to stop.
pub async fn run(socket: &Path, options: DaemonOptions, token: CancellationToken) -> Result<()> {
    let (listener, _socket_guard) = socket_server::bind(socket, options.restart).await?;

    let client = Arc::new(
        RealSwayClient::new()
            .await
            .context("Failed to open the Sway command connection")?,
    );
    let history = Arc::new(WindowHistory::new());

    info!("Successfully starting main loop");

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let subscription = tokio::spawn(async move {
        if let Err(e) = monitor_sway_events(event_tx).await {
            error!("Sway event monitoring error: {:#}", e);
        }
    });

    let remarker = Remarker::new(client.clone(), options.mark_format);
    if remarker.is_none() {
        info!("Mark format is empty, windows will not be marked");
    }
    let event_listener = EventListener::new(history.clone(), remarker);
    let listener_task = tokio::spawn(event_listener.run(event_rx, token.clone()));

    let service = Arc::new(ControlService::new(history, client, token.clone()));
    socket_server::serve(listener, service, token.clone()).await;

    subscription.abort();
    if let Err(e) = listener_task.await {
        error!("Event listener task failed: {}", e);
    }

    info!("Successfully exiting main loop");
    Ok(())
}
