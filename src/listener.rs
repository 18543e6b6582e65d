//! Event listener: applies window manager events to the history.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::history::WindowHistory;
use crate::remarker::Remarker;
use crate::sway_client::{HistoryEvent, SwayCommander};

pub struct EventListener<C: SwayCommander> {
    history: Arc<WindowHistory>,
    remarker: Option<Remarker<C>>,
}

impl<C: SwayCommander> EventListener<C> {
    pub fn new(history: Arc<WindowHistory>, remarker: Option<Remarker<C>>) -> Self {
        EventListener { history, remarker }
    }

    /// Consume events until `token` is cancelled or the sender side closes.
    pub async fn run(self, mut event_rx: mpsc::UnboundedReceiver<HistoryEvent>, token: CancellationToken) {
        info!("Starting window history event loop");

        loop {
            // Events already queued are applied before a cancellation is noticed.
            tokio::select! {
                biased;
                event = event_rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        if token.is_cancelled() {
                            debug!("Event stream closed during shutdown");
                        } else {
                            warn!("Sway event stream closed unexpectedly; window history is no longer updated");
                        }
                        break;
                    }
                },
                _ = token.cancelled() => {
                    debug!("Event listener cancelled");
                    break;
                }
            }
        }

        info!("Window history event loop stopped");
    }

    /// Apply one event, remarking afterwards when the order changed.
    pub async fn handle_event(&self, event: HistoryEvent) {
        let reordered = match event {
            HistoryEvent::Focus(record) => {
                debug!(id = record.id, name = %record.name, kind = %record.kind, "Window change: focus");
                self.history.record_focus(record)
            }
            HistoryEvent::Title(record) | HistoryEvent::Mark(record) => {
                debug!(id = record.id, name = %record.name, kind = %record.kind, "Window change: update");
                self.history.record_update(record)
            }
            HistoryEvent::Close(id) => {
                debug!(id, "Window change: close");
                self.history.record_close(id);
                true
            }
            HistoryEvent::Shutdown => {
                warn!("Sway is shutting down, clearing {} windows from history", self.history.len());
                self.history.reset();
                false
            }
        };

        if reordered && let Some(remarker) = &self.remarker {
            remarker.remark(&self.history.snapshot()).await;
        }
    }
}
