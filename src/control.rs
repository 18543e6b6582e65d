//! Control service operations behind the socket routes.

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::history::{WindowHistory, WindowRecord};
use crate::sway_client::{SwayCommander, focus_command};

/// Client-facing failures; each one maps to a 400 response.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Unable to convert '{0}' to a number")]
    InvalidIndex(String),

    #[error("There is no such window number {0}")]
    NoSuchWindow(i64),

    #[error("Unable to focus window number {index}: {source:#}")]
    FocusFailed {
        index: i64,
        #[source]
        source: anyhow::Error,
    },
}

pub struct ControlService<C: SwayCommander> {
    history: Arc<WindowHistory>,
    client: Arc<C>,
    shutdown: CancellationToken,
}

impl<C: SwayCommander> ControlService<C> {
    pub fn new(history: Arc<WindowHistory>, client: Arc<C>, shutdown: CancellationToken) -> Self {
        ControlService {
            history,
            client,
            shutdown,
        }
    }

    pub fn list(&self) -> Vec<WindowRecord> {
        self.history.snapshot()
    }

    /// Focus the window at position `raw` (see [`WindowHistory::select`]).
    pub async fn focus(&self, raw: &str) -> Result<WindowRecord, ControlError> {
        let index: i64 = raw
            .parse()
            .map_err(|_| ControlError::InvalidIndex(raw.to_string()))?;

        let window = self
            .history
            .select(index)
            .ok_or(ControlError::NoSuchWindow(index))?;

        self.client
            .run_command(focus_command(window.id))
            .await
            .map_err(|source| ControlError::FocusFailed { index, source })?;

        debug!(index, id = window.id, "Focused window");
        Ok(window)
    }

    /// Ask the daemon to shut down. Repeated requests are no-ops.
    pub fn stop(&self) {
        if self.shutdown.is_cancelled() {
            debug!("Stop requested again, shutdown already in progress");
            return;
        }
        info!("Request to stop is got. Stopping.");
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sway_client::testing::RecordingBridge;

    fn make_window(id: i64) -> WindowRecord {
        WindowRecord {
            id,
            name: format!("window-{}", id),
            ..Default::default()
        }
    }

    fn service_with(ids: &[i64]) -> (ControlService<RecordingBridge>, Arc<RecordingBridge>) {
        let history = Arc::new(WindowHistory::new());
        for &id in ids.iter().rev() {
            history.record_focus(make_window(id));
        }
        let client = Arc::new(RecordingBridge::new());
        let service = ControlService::new(history, client.clone(), CancellationToken::new());
        (service, client)
    }

    #[test]
    fn test_list_empty() {
        let (service, _) = service_with(&[]);
        assert!(service.list().is_empty());
    }

    #[test]
    fn test_list_order() {
        let (service, _) = service_with(&[3, 1, 2]);
        let ids: Vec<_> = service.list().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_focus_sends_command() {
        let (service, client) = service_with(&[10, 20]);

        let window = service.focus("1").await.unwrap();

        assert_eq!(window.id, 20);
        assert_eq!(client.commands(), vec![focus_command(20)]);
    }

    #[tokio::test]
    async fn test_focus_negative() {
        let (service, _) = service_with(&[10, 20, 30]);
        assert_eq!(service.focus("-1").await.unwrap().id, 30);
        assert_eq!(service.focus("-4").await.unwrap().id, 10);
    }

    #[tokio::test]
    async fn test_focus_bad_number() {
        let (service, client) = service_with(&[10]);

        let err = service.focus("abc").await.unwrap_err();

        assert!(matches!(err, ControlError::InvalidIndex(ref s) if s == "abc"));
        assert!(err.to_string().contains("abc"));
        assert!(client.commands().is_empty());
    }

    #[tokio::test]
    async fn test_focus_number_with_padding_is_invalid() {
        let (service, client) = service_with(&[10, 20]);

        let err = service.focus(" 1").await.unwrap_err();

        assert!(matches!(err, ControlError::InvalidIndex(ref s) if s == " 1"));
        assert!(client.commands().is_empty());
    }

    #[tokio::test]
    async fn test_focus_out_of_range() {
        let (service, client) = service_with(&[10, 20]);

        let err = service.focus("99").await.unwrap_err();

        assert!(matches!(err, ControlError::NoSuchWindow(99)));
        assert!(err.to_string().contains("99"));
        assert!(client.commands().is_empty());
    }

    #[tokio::test]
    async fn test_focus_command_failure() {
        let (service, client) = service_with(&[10]);
        client.fail_on(focus_command(10));

        let err = service.focus("0").await.unwrap_err();

        assert!(matches!(err, ControlError::FocusFailed { index: 0, .. }));
        assert!(err.to_string().contains("No matching node"));
    }

    #[tokio::test]
    async fn test_focus_does_not_reorder() {
        let (service, _) = service_with(&[10, 20, 30]);
        service.focus("2").await.unwrap();
        let ids: Vec<_> = service.list().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_stop_twice() {
        let token = CancellationToken::new();
        let service = ControlService::new(
            Arc::new(WindowHistory::new()),
            Arc::new(RecordingBridge::new()),
            token.clone(),
        );

        service.stop();
        assert!(token.is_cancelled());
        service.stop();
        assert!(token.is_cancelled());
    }
}
