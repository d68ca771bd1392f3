use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::collections::HashMap;
use crate::model::display::DisplayId;
use crate::model::virtual_workspace::WorkspaceId;
use crate::sys::geometry::Frame;

pub use nix::libc::pid_t;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u32);

impl WindowId {
    pub const fn new(id: u32) -> WindowId { WindowId(id) }

    pub fn get(self) -> u32 { self.0 }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    #[default]
    Tiled,
    Floating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub id: WindowId,
    pub pid: pid_t,
    /// The last frame the window occupied while visible. Parking a window
    /// off-screen never writes here.
    pub frame: Frame,
    pub mode: WindowMode,
    pub is_fullscreen: bool,
    pub workspace: WorkspaceId,
    pub display: DisplayId,
}

impl Window {
    pub fn new(id: WindowId, pid: pid_t, frame: Frame, workspace: WorkspaceId, display: DisplayId) -> Self {
        Window {
            id,
            pid,
            frame,
            mode: WindowMode::Tiled,
            is_fullscreen: false,
            workspace,
            display,
        }
    }

    pub fn is_tiled(&self) -> bool { self.mode == WindowMode::Tiled }
}

/// Authoritative map from window identity to its last known state.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: HashMap<WindowId, Window>,
}

impl WindowRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, window: Window) -> Option<Window> { self.windows.insert(window.id, window) }

    pub fn remove(&mut self, wid: WindowId) -> Option<Window> { self.windows.remove(&wid) }

    pub fn get(&self, wid: WindowId) -> Option<&Window> { self.windows.get(&wid) }

    pub fn get_mut(&mut self, wid: WindowId) -> Option<&mut Window> { self.windows.get_mut(&wid) }

    pub fn contains(&self, wid: WindowId) -> bool { self.windows.contains_key(&wid) }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Window> + '_ { self.windows.values() }

    /// Windows owned by `pid`, sorted by id so callers see a stable order.
    pub fn windows_for_pid(&self, pid: pid_t) -> Vec<WindowId> {
        let mut out: Vec<_> = self.windows.values().filter(|w| w.pid == pid).map(|w| w.id).collect();
        out.sort_unstable();
        out
    }

    pub fn windows_on(&self, workspace: WorkspaceId, display: DisplayId) -> Vec<WindowId> {
        let mut out: Vec<_> = self
            .windows
            .values()
            .filter(|w| w.workspace == workspace && w.display == display)
            .map(|w| w.id)
            .collect();
        out.sort_unstable();
        out
    }

    pub fn ids(&self) -> Vec<WindowId> {
        let mut out: Vec<_> = self.windows.keys().copied().collect();
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn window(id: u32, pid: pid_t, ws: u8, display: u32) -> Window {
        Window::new(
            WindowId::new(id),
            pid,
            Frame::new(0.0, 0.0, 100.0, 100.0),
            WorkspaceId::new(ws),
            DisplayId::new(display),
        )
    }

    #[test]
    fn queries_are_sorted_and_filtered() {
        let mut registry = WindowRegistry::new();
        registry.insert(window(3, 10, 1, 1));
        registry.insert(window(1, 10, 1, 1));
        registry.insert(window(2, 11, 2, 1));

        assert_eq!(registry.windows_for_pid(10), vec![WindowId::new(1), WindowId::new(3)]);
        assert_eq!(
            registry.windows_on(WorkspaceId::new(2), DisplayId::new(1)),
            vec![WindowId::new(2)]
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn new_windows_start_tiled() {
        let mut w = window(1, 1, 1, 1);
        assert!(w.is_tiled());
        assert!(!w.is_fullscreen);
        w.mode = WindowMode::Floating;
        assert!(!w.is_tiled());
    }
}
