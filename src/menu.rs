//! rofi integration: print the history as a menu and focus the chosen line.

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use swayipc::{Connection, Node, NodeType};
use tracing::warn;

use crate::history::WindowRecord;

/// Workspace holding hidden windows; shown without a name
const SCRATCHPAD_WORKSPACE: &str = "__i3_scratch";

/// Column limits for the menu. Zero disables padding and truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuWidths {
    pub class: usize,
    pub title: usize,
}

/// Query Sway for the container id → workspace name mapping.
pub async fn fetch_workspaces() -> Result<HashMap<i64, String>> {
    let tree = tokio::task::spawn_blocking(|| -> Result<Node> {
        let mut connection = Connection::new().context("Failed to connect to the Sway IPC socket")?;
        Ok(connection.get_tree()?)
    })
    .await
    .context("Tree query task failed")??;

    let mut mapping = HashMap::new();
    collect_workspaces(&tree, Cow::Borrowed(""), &mut mapping);
    Ok(mapping)
}

/// Recursively record which workspace each container lives on.
fn collect_workspaces<'a>(node: &'a Node, workspace: Cow<'a, str>, mapping: &mut HashMap<i64, String>) {
    let workspace: Cow<'a, str> = match node.node_type {
        NodeType::Workspace => {
            let name = node.name.as_deref().unwrap_or_default();
            if !workspace.is_empty() {
                warn!("Workspace '{}' put in another '{}', using the nested one", name, workspace);
            }
            Cow::Borrowed(name)
        }
        NodeType::Con | NodeType::FloatingCon => {
            mapping.insert(node.id, workspace.clone().into_owned());
            workspace
        }
        _ => workspace,
    };

    for child in node.nodes.iter().chain(&node.floating_nodes) {
        collect_workspaces(child, Cow::Borrowed(&workspace), mapping);
    }
}

/// Pad `orig` with spaces or cut it to exactly `width` chars.
fn space_align(orig: &str, width: usize) -> Cow<'_, str> {
    if width == 0 {
        return Cow::Borrowed(orig);
    }
    let mut aligned: String = orig.chars().take(width).collect();
    let len = aligned.chars().count();
    aligned.extend(std::iter::repeat_n(' ', width - len));
    Cow::Owned(aligned)
}

fn workspace_label(name: &str) -> &str {
    if name == SCRATCHPAD_WORKSPACE { "" } else { name }
}

/// One line per window: position, workspace, class, title and marks.
pub fn format_menu(
    windows: &[WindowRecord],
    workspaces: &HashMap<i64, String>,
    widths: MenuWidths,
) -> Vec<String> {
    let workspace_of = |w: &WindowRecord| {
        workspaces
            .get(&w.id)
            .map(|name| workspace_label(name))
            .unwrap_or_default()
    };

    let workspace_width = windows
        .iter()
        .map(|w| workspace_of(w).chars().count())
        .max()
        .unwrap_or(0);

    let longest_title = windows
        .iter()
        .map(|w| w.name.trim().chars().count())
        .max()
        .unwrap_or(0);
    let title_width = if longest_title > widths.title {
        widths.title
    } else {
        longest_title
    };

    windows
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let marks: String = w.marks.iter().map(|m| format!("[{}]", m)).collect();
            format!(
                "{:>3}  {}  {} {} {}",
                i,
                space_align(workspace_of(w), workspace_width),
                space_align(w.class(), widths.class),
                space_align(w.name.trim(), title_width),
                marks
            )
        })
        .collect()
}

/// Extract the window number from a chosen menu line.
pub fn parse_selection(input: &str) -> Option<&str> {
    input.split_whitespace().next()
}
