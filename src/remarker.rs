//! Positional marks.
//!
//! After the order changes every tracked window gets a mark with its current
//! position, so users can see the number to pass to `focus`.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::history::WindowRecord;
use crate::sway_client::{SwayCommander, mark_command};

/// Render the mark for `position`: `%d` becomes the number and `%%` a literal
/// percent sign. A template without `%d` gets the number appended.
pub fn format_mark(template: &str, position: usize) -> String {
    let number = position.to_string();
    let mut mark = String::with_capacity(template.len() + number.len());
    let mut substituted = false;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.peek() {
                Some('d') => {
                    chars.next();
                    mark.push_str(&number);
                    substituted = true;
                    continue;
                }
                Some('%') => {
                    chars.next();
                }
                _ => {}
            }
        }
        mark.push(c);
    }

    if !substituted {
        mark.push_str(&number);
    }
    mark
}

pub struct Remarker<C: SwayCommander> {
    client: Arc<C>,
    template: String,
}

impl<C: SwayCommander> Remarker<C> {
    /// Returns `None` for an empty template: marking is disabled then.
    pub fn new(client: Arc<C>, template: impl Into<String>) -> Option<Self> {
        let template = template.into();
        if template.is_empty() {
            return None;
        }
        Some(Remarker { client, template })
    }

    /// Mark each window with its position, front to back.
    ///
    /// A failed command is logged and the rest are still sent. Returns the
    /// number of windows that were marked.
    pub async fn remark(&self, windows: &[WindowRecord]) -> usize {
        let mut marked = 0;
        for (position, window) in windows.iter().enumerate() {
            let mark = format_mark(&self.template, position);
            match self.client.run_command(mark_command(window.id, &mark)).await {
                Ok(()) => marked += 1,
                Err(e) => warn!(id = window.id, mark = %mark, "Unable to mark window: {:#}", e),
            }
        }
        debug!("Remarked {}/{} windows", marked, windows.len());
        marked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sway_client::testing::RecordingBridge;

    fn make_window(id: i64) -> WindowRecord {
        WindowRecord {
            id,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_mark_default() {
        assert_eq!(format_mark("%d", 0), "0");
        assert_eq!(format_mark("%d", 12), "12");
    }

    #[test]
    fn test_format_mark_embedded() {
        assert_eq!(format_mark("w%d", 3), "w3");
        assert_eq!(format_mark("[%d]", 1), "[1]");
    }

    #[test]
    fn test_format_mark_escaped_percent() {
        assert_eq!(format_mark("%%%d", 2), "%2");
        assert_eq!(format_mark("100%%", 4), "100%4");
    }

    #[test]
    fn test_format_mark_without_placeholder() {
        assert_eq!(format_mark("win", 5), "win5");
    }

    #[test]
    fn test_empty_template_disables() {
        let client = Arc::new(RecordingBridge::new());
        assert!(Remarker::new(client, "").is_none());
    }

    #[tokio::test]
    async fn test_remark_in_order() {
        let client = Arc::new(RecordingBridge::new());
        let remarker = Remarker::new(client.clone(), "%d").unwrap();

        let marked = remarker.remark(&[make_window(1), make_window(2)]).await;

        assert_eq!(marked, 2);
        assert_eq!(
            client.commands(),
            vec![mark_command(1, "0"), mark_command(2, "1")]
        );
    }

    #[tokio::test]
    async fn test_remark_continues_after_failure() {
        let client = Arc::new(RecordingBridge::new());
        client.fail_on(mark_command(1, "0"));
        let remarker = Remarker::new(client.clone(), "%d").unwrap();

        let marked = remarker.remark(&[make_window(1), make_window(2)]).await;

        assert_eq!(marked, 1);
        assert_eq!(
            client.commands(),
            vec![mark_command(1, "0"), mark_command(2, "1")]
        );
    }

    #[tokio::test]
    async fn test_remark_empty_history() {
        let client = Arc::new(RecordingBridge::new());
        let remarker = Remarker::new(client.clone(), "%d").unwrap();

        assert_eq!(remarker.remark(&[]).await, 0);
        assert!(client.commands().is_empty());
    }
}
