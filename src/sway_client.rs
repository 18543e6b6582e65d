//! Sway IPC bridge.
//!
//! Commands go through the [`SwayCommander`] trait so the remarker and the
//! control service can be exercised without a running compositor. Events are
//! read from a swayipc subscription and forwarded as [`HistoryEvent`]s.

use anyhow::{Context, Result};
use futures_lite::stream::StreamExt;
use std::future::Future;
use swayipc_async::{Connection, Event, EventType, Node, NodeType, WindowChange};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, trace};

use crate::history::{WindowProperties, WindowRecord};

/// Sends commands to the window manager.
pub trait SwayCommander: Send + Sync + 'static {
    /// Run a raw command; any failed outcome in the reply is an error.
    fn run_command(&self, command: String) -> impl Future<Output = Result<()>> + Send;
}

/// Command that focuses a container.
pub fn focus_command(id: i64) -> String {
    format!("[con_id={}] focus", id)
}

/// Command that attaches `mark` to a container, moving it off any other one.
pub fn mark_command(id: i64, mark: &str) -> String {
    let escaped = mark.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[con_id={}] mark --add \"{}\"", id, escaped)
}

/// swayipc-backed commander holding one command connection.
pub struct RealSwayClient {
    connection: Mutex<Connection>,
}

impl RealSwayClient {
    pub async fn new() -> Result<Self> {
        let connection = Connection::new()
            .await
            .context("Failed to connect to the Sway IPC socket")?;
        Ok(RealSwayClient {
            connection: Mutex::new(connection),
        })
    }
}

impl SwayCommander for RealSwayClient {
    async fn run_command(&self, command: String) -> Result<()> {
        let outcomes = {
            let mut connection = self.connection.lock().await;
            connection.run_command(&command).await
        };

        let result = outcomes
            .map_err(anyhow::Error::from)
            .and_then(|outcomes| {
                outcomes
                    .into_iter()
                    .collect::<Result<Vec<()>, _>>()
                    .map_err(anyhow::Error::from)
            })
            .map(|_| ());

        match &result {
            Ok(()) => trace!(sway_command = %command, "Successfully ran command on Sway"),
            Err(e) => error!(sway_command = %command, error = %e, "Error while running command on Sway"),
        }
        result.with_context(|| format!("Sway rejected '{}'", command))
    }
}

/// Window manager events the history cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    Focus(WindowRecord),
    Title(WindowRecord),
    Mark(WindowRecord),
    Close(i64),
    /// Window manager exit or restart
    Shutdown,
}

impl HistoryEvent {
    /// Translate a swayipc event, ignoring the kinds the history does not track.
    pub fn from_sway(event: Event) -> Option<Self> {
        match event {
            Event::Window(e) => match e.change {
                WindowChange::Focus => Some(HistoryEvent::Focus(record_from_node(&e.container))),
                WindowChange::Title => Some(HistoryEvent::Title(record_from_node(&e.container))),
                WindowChange::Mark => Some(HistoryEvent::Mark(record_from_node(&e.container))),
                WindowChange::Close => Some(HistoryEvent::Close(e.container.id)),
                _ => None,
            },
            Event::Shutdown(_) => Some(HistoryEvent::Shutdown),
            _ => None,
        }
    }
}

/// Build a history record from a tree node.
///
/// Native Wayland windows have no X11 class, so the app id stands in for it.
pub fn record_from_node(node: &Node) -> WindowRecord {
    let class = node
        .window_properties
        .as_ref()
        .and_then(|props| props.class.clone())
        .or_else(|| node.app_id.clone())
        .unwrap_or_default();

    WindowRecord {
        id: node.id,
        name: node.name.clone().unwrap_or_default(),
        kind: node_type_name(node.node_type).to_string(),
        urgent: node.urgent,
        marks: node.marks.clone(),
        handle: node.window.map(i64::from).unwrap_or_default(),
        window_properties: WindowProperties { class },
    }
}

fn node_type_name(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Root => "root",
        NodeType::Output => "output",
        NodeType::Workspace => "workspace",
        NodeType::Con => "con",
        NodeType::FloatingCon => "floating_con",
        _ => "unknown",
    }
}

/// Subscribe to window and shutdown events and forward them until the
/// subscription ends or the receiver goes away.
pub async fn monitor_sway_events(event_tx: mpsc::UnboundedSender<HistoryEvent>) -> Result<()> {
    let subs = [EventType::Window, EventType::Shutdown];
    let mut events = Connection::new()
        .await
        .context("Failed to connect to the Sway IPC socket")?
        .subscribe(&subs)
        .await
        .context("Failed to subscribe to Sway events")?;

    info!("Subscribed to Sway window and shutdown events");

    while let Some(event) = events.next().await {
        let event = event.context("Sway event stream failed")?;
        if let Some(history_event) = HistoryEvent::from_sway(event) {
            debug!("Sway event: {:?}", history_event);
            if event_tx.send(history_event).is_err() {
                debug!("Event receiver dropped, stopping subscription");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    /// Commander that records every command and fails the ones it is told to.
    #[derive(Default)]
    pub struct RecordingBridge {
        commands: StdMutex<Vec<String>>,
        failing: StdMutex<HashSet<String>>,
    }

    impl RecordingBridge {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_on(&self, command: String) {
            self.failing.lock().unwrap().insert(command);
        }

        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl SwayCommander for RecordingBridge {
        async fn run_command(&self, command: String) -> Result<()> {
            self.commands.lock().unwrap().push(command.clone());
            if self.failing.lock().unwrap().contains(&command) {
                anyhow::bail!("No matching node for '{}'", command);
            }
            Ok(())
        }
    }

    /// Commander whose every command takes `delay` to complete.
    pub struct SlowBridge {
        delay: std::time::Duration,
    }

    impl SlowBridge {
        pub fn new(delay: std::time::Duration) -> Self {
            SlowBridge { delay }
        }
    }

    impl SwayCommander for SlowBridge {
        async fn run_command(&self, _command: String) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: swayipc Node/Event are #[non_exhaustive], so translation from real
    // events is covered only against a running compositor.

    #[test]
    fn test_focus_command() {
        assert_eq!(focus_command(94), "[con_id=94] focus");
    }

    #[test]
    fn test_mark_command() {
        assert_eq!(mark_command(7, "0"), "[con_id=7] mark --add \"0\"");
    }

    #[test]
    fn test_mark_command_escapes_quotes() {
        assert_eq!(
            mark_command(7, r#"a"b\c"#),
            r#"[con_id=7] mark --add "a\"b\\c""#
        );
    }

    #[test]
    fn test_node_type_names() {
        assert_eq!(node_type_name(NodeType::Con), "con");
        assert_eq!(node_type_name(NodeType::FloatingCon), "floating_con");
        assert_eq!(node_type_name(NodeType::Workspace), "workspace");
    }

    #[tokio::test]
    async fn test_recording_bridge_failures() {
        let bridge = testing::RecordingBridge::new();
        bridge.fail_on(focus_command(1));

        assert!(bridge.run_command(focus_command(1)).await.is_err());
        assert!(bridge.run_command(focus_command(2)).await.is_ok());
        assert_eq!(bridge.commands(), vec![focus_command(1), focus_command(2)]);
    }
}
