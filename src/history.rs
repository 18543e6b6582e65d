//! Most-recently-focused window history.
//!
//! The front of the list is the window that got focus last. Entries appear on
//! the first focus event for a container and disappear when it closes.

use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// X11 properties of a window. Only the class is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowProperties {
    #[serde(default)]
    pub class: String,
}

/// One tracked window or container, serialized the way clients expect it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub id: i64,
    /// Window title, or the internal name for containers
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub marks: Vec<String>,
    /// X11 window id of the client window, 0 when there is none
    #[serde(rename = "window", default)]
    pub handle: i64,
    #[serde(default)]
    pub window_properties: WindowProperties,
}

impl WindowRecord {
    pub fn class(&self) -> &str {
        &self.window_properties.class
    }
}

/// Synchronized MRU list of windows.
///
/// Mutations take the write lock; `snapshot` and `select` share the read lock.
/// Lookups are linear, which is fine for the handful of windows a desktop has.
#[derive(Debug, Default)]
pub struct WindowHistory {
    windows: RwLock<Vec<WindowRecord>>,
}

impl WindowHistory {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation leaves the list consistent, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Vec<WindowRecord>> {
        self.windows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<WindowRecord>> {
        self.windows.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the window to the front, inserting it if it is new.
    ///
    /// Stored fields are refreshed from `record`. Always returns `true`: the
    /// order has changed as far as remarking is concerned.
    pub fn record_focus(&self, record: WindowRecord) -> bool {
        let mut windows = self.write();
        if let Some(pos) = windows.iter().position(|w| w.id == record.id) {
            windows.remove(pos);
        }
        windows.insert(0, record);
        true
    }

    /// Replace the stored fields of a known window without moving it.
    ///
    /// Unknown ids are ignored. Never changes the order, so returns `false`.
    pub fn record_update(&self, record: WindowRecord) -> bool {
        let mut windows = self.write();
        match windows.iter_mut().find(|w| w.id == record.id) {
            Some(slot) => *slot = record,
            None => debug!(id = record.id, "Container for update was not found"),
        }
        false
    }

    /// Forget a closed window. Returns `true` if it was tracked.
    pub fn record_close(&self, id: i64) -> bool {
        let mut windows = self.write();
        match windows.iter().position(|w| w.id == id) {
            Some(pos) => {
                windows.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop every entry; used when the window manager shuts down or restarts.
    pub fn reset(&self) {
        self.write().clear();
    }

    /// Independent copy of the history, most recent first.
    pub fn snapshot(&self) -> Vec<WindowRecord> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Window at position `index`.
    ///
    /// `0` is the most recent window. Negative indexes count from the back
    /// (`-1` is the least recent) and clamp to the front when they overshoot.
    /// Positive indexes past the end yield `None`.
    pub fn select(&self, index: i64) -> Option<WindowRecord> {
        let windows = self.read();
        let pos = resolve_index(index, windows.len())?;
        windows.get(pos).cloned()
    }
}

/// Map a signed position onto `0..len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if index >= 0 {
        let pos = usize::try_from(index).ok()?;
        return (pos < len).then_some(pos);
    }
    let back = usize::try_from(index.unsigned_abs()).unwrap_or(usize::MAX);
    Some(len.saturating_sub(back))
}
