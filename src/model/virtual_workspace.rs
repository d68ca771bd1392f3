use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, trace};

use crate::common::collections::HashMap;
use crate::model::display::DisplayId;
use crate::model::window::WindowId;

pub const MAX_WORKSPACES: usize = 10;

/// One-based workspace number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(u8);

impl WorkspaceId {
    pub const fn new(id: u8) -> WorkspaceId { WorkspaceId(id) }

    pub fn get(self) -> u8 { self.0 }

    fn index(self) -> usize { self.0 as usize - 1 }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error("workspace {0} does not exist")]
    InvalidWorkspaceId(u8),
    #[error("window {0} is not assigned to a workspace")]
    UnassignedWindow(WindowId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualWorkspace {
    pub id: WorkspaceId,
    pub name: String,
    /// Insertion ordered; the first member is the default focus candidate.
    windows: Vec<WindowId>,
    last_focused: Option<WindowId>,
}

impl VirtualWorkspace {
    fn new(id: WorkspaceId, name: String) -> Self {
        Self {
            id,
            name,
            windows: Vec::new(),
            last_focused: None,
        }
    }

    pub fn windows(&self) -> impl Iterator<Item = WindowId> + '_ { self.windows.iter().copied() }

    fn add_window(&mut self, window_id: WindowId) {
        if !self.windows.contains(&window_id) {
            self.windows.push(window_id);
        }
    }

    fn remove_window(&mut self, window_id: WindowId) -> bool {
        if self.last_focused == Some(window_id) {
            self.last_focused = None;
        }
        let before = self.windows.len();
        self.windows.retain(|&w| w != window_id);
        self.windows.len() != before
    }

    fn replace_window(&mut self, old: WindowId, new: WindowId) {
        if let Some(slot) = self.windows.iter_mut().find(|w| **w == old) {
            *slot = new;
        }
        if self.last_focused == Some(old) {
            self.last_focused = Some(new);
        }
    }

    pub fn last_focused(&self) -> Option<WindowId> { self.last_focused }
}

/// Fixed set of workspace slots plus the per-display active binding. The
/// same workspace may be active on more than one display at once.
#[derive(Debug)]
pub struct VirtualWorkspaceManager {
    workspaces: Vec<VirtualWorkspace>,
    active_workspace_per_display: HashMap<DisplayId, WorkspaceId>,
    window_to_workspace: HashMap<WindowId, WorkspaceId>,
}

impl VirtualWorkspaceManager {
    pub fn new(count: usize, names: &[String]) -> Self {
        let count = count.clamp(1, MAX_WORKSPACES);
        let workspaces = (1..=count)
            .map(|n| {
                let id = WorkspaceId::new(n as u8);
                let name = names
                    .get(n - 1)
                    .filter(|name| !name.is_empty())
                    .cloned()
                    .unwrap_or_else(|| n.to_string());
                VirtualWorkspace::new(id, name)
            })
            .collect();
        Self {
            workspaces,
            active_workspace_per_display: HashMap::default(),
            window_to_workspace: HashMap::default(),
        }
    }

    pub fn len(&self) -> usize { self.workspaces.len() }

    pub fn is_empty(&self) -> bool { self.workspaces.is_empty() }

    pub fn workspace(&self, id: WorkspaceId) -> Option<&VirtualWorkspace> {
        if id.get() == 0 {
            return None;
        }
        self.workspaces.get(id.index())
    }

    fn workspace_mut(&mut self, id: WorkspaceId) -> Option<&mut VirtualWorkspace> {
        if id.get() == 0 {
            return None;
        }
        self.workspaces.get_mut(id.index())
    }

    pub fn validate(&self, id: u8) -> Result<WorkspaceId, WorkspaceError> {
        let ws = WorkspaceId::new(id);
        self.workspace(ws).map(|w| w.id).ok_or(WorkspaceError::InvalidWorkspaceId(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualWorkspace> + '_ { self.workspaces.iter() }

    pub fn active_workspace(&self, display: DisplayId) -> Option<WorkspaceId> {
        self.active_workspace_per_display.get(&display).copied()
    }

    /// Makes `workspace` visible on `display_id`, returning the workspace it
    /// replaces.
    pub fn set_active_workspace(
        &mut self,
        display_id: DisplayId,
        workspace: WorkspaceId,
    ) -> Result<Option<WorkspaceId>, WorkspaceError> {
        if self.workspace(workspace).is_none() {
            error!(?workspace, "Attempted to activate non-existent workspace");
            return Err(WorkspaceError::InvalidWorkspaceId(workspace.get()));
        }
        let previous = self.active_workspace_per_display.insert(display_id, workspace);
        trace!(?display_id, ?previous, ?workspace, "active workspace set");
        Ok(previous)
    }

    pub fn forget_display(&mut self, display: DisplayId) { self.active_workspace_per_display.remove(&display); }

    pub fn is_visible(&self, workspace: WorkspaceId, display: DisplayId) -> bool {
        self.active_workspace(display) == Some(workspace)
    }

    pub fn displays_showing(&self, workspace: WorkspaceId) -> Vec<DisplayId> {
        let mut out: Vec<_> = self
            .active_workspace_per_display
            .iter()
            .filter(|(_, active)| **active == workspace)
            .map(|(display, _)| *display)
            .collect();
        out.sort_unstable();
        out
    }

    /// Lowest-numbered workspace not active on any display; the first one
    /// when every workspace is already shown somewhere.
    pub fn first_unshown_workspace(&self) -> WorkspaceId {
        self.workspaces
            .iter()
            .map(|w| w.id)
            .find(|ws| !self.active_workspace_per_display.values().any(|a| a == ws))
            .unwrap_or(WorkspaceId::new(1))
    }

    pub fn assign_window_to_workspace(
        &mut self,
        window_id: WindowId,
        workspace_id: WorkspaceId,
    ) -> Result<(), WorkspaceError> {
        if self.workspace(workspace_id).is_none() {
            error!(?workspace_id, "Attempted to assign window to non-existent workspace");
            return Err(WorkspaceError::InvalidWorkspaceId(workspace_id.get()));
        }
        if let Some(old) = self.window_to_workspace.insert(window_id, workspace_id) {
            if let Some(ws) = self.workspace_mut(old) {
                ws.remove_window(window_id);
            }
        }
        if let Some(ws) = self.workspace_mut(workspace_id) {
            ws.add_window(window_id);
        }
        Ok(())
    }

    pub fn workspace_for_window(&self, window_id: WindowId) -> Option<WorkspaceId> {
        self.window_to_workspace.get(&window_id).copied()
    }

    pub fn remove_window(&mut self, window_id: WindowId) -> Option<WorkspaceId> {
        let workspace_id = self.window_to_workspace.remove(&window_id)?;
        if let Some(ws) = self.workspace_mut(workspace_id) {
            ws.remove_window(window_id);
        }
        Some(workspace_id)
    }

    /// Hands `old`'s membership slot (and remembered focus) to `new`.
    pub fn replace_window(&mut self, old: WindowId, new: WindowId) -> Result<(), WorkspaceError> {
        let workspace_id = self
            .window_to_workspace
            .remove(&old)
            .ok_or(WorkspaceError::UnassignedWindow(old))?;
        if let Some(prev) = self.window_to_workspace.insert(new, workspace_id) {
            if let Some(ws) = self.workspace_mut(prev) {
                ws.remove_window(new);
            }
        }
        if let Some(ws) = self.workspace_mut(workspace_id) {
            ws.replace_window(old, new);
        }
        Ok(())
    }

    pub fn windows_in(&self, workspace_id: WorkspaceId) -> Vec<WindowId> {
        self.workspace(workspace_id).map(|w| w.windows().collect()).unwrap_or_default()
    }

    pub fn set_last_focused_window(&mut self, workspace_id: WorkspaceId, window_id: Option<WindowId>) {
        if let Some(workspace) = self.workspace_mut(workspace_id) {
            workspace.last_focused = window_id;
        }
    }

    pub fn last_focused_window(&self, workspace_id: WorkspaceId) -> Option<WindowId> {
        self.workspace(workspace_id)?.last_focused()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    fn manager() -> VirtualWorkspaceManager { VirtualWorkspaceManager::new(10, &["Main".to_string()]) }

    #[test]
    fn workspaces_are_named_and_bounded() {
        let manager = manager();
        assert_eq!(manager.len(), 10);
        assert_eq!(manager.workspace(WorkspaceId::new(1)).unwrap().name, "Main");
        assert_eq!(manager.workspace(WorkspaceId::new(2)).unwrap().name, "2");
        assert!(manager.workspace(WorkspaceId::new(0)).is_none());
        assert!(manager.workspace(WorkspaceId::new(11)).is_none());
        assert_eq!(manager.validate(11), Err(WorkspaceError::InvalidWorkspaceId(11)));
    }

    #[test]
    fn window_is_member_of_exactly_one_workspace() {
        let mut manager = manager();
        let w = WindowId::new(1);
        manager.assign_window_to_workspace(w, WorkspaceId::new(1)).unwrap();
        manager.assign_window_to_workspace(w, WorkspaceId::new(2)).unwrap();
        assert!(manager.windows_in(WorkspaceId::new(1)).is_empty());
        assert_eq!(manager.windows_in(WorkspaceId::new(2)), vec![w]);
        assert_eq!(manager.workspace_for_window(w), Some(WorkspaceId::new(2)));
    }

    #[test]
    fn membership_preserves_insertion_order() {
        let mut manager = manager();
        for id in [3, 1, 2] {
            manager.assign_window_to_workspace(WindowId::new(id), WorkspaceId::new(1)).unwrap();
        }
        assert_eq!(
            manager.windows_in(WorkspaceId::new(1)),
            vec![WindowId::new(3), WindowId::new(1), WindowId::new(2)]
        );
    }

    #[test]
    fn same_workspace_may_be_active_on_two_displays() {
        let mut manager = manager();
        let ws = WorkspaceId::new(3);
        manager.set_active_workspace(DisplayId::new(1), ws).unwrap();
        manager.set_active_workspace(DisplayId::new(2), ws).unwrap();
        assert_eq!(manager.displays_showing(ws), vec![DisplayId::new(1), DisplayId::new(2)]);
    }

    #[test]
    fn set_active_returns_previous() {
        let mut manager = manager();
        let d = DisplayId::new(1);
        assert_eq!(manager.set_active_workspace(d, WorkspaceId::new(1)), Ok(None));
        assert_eq!(
            manager.set_active_workspace(d, WorkspaceId::new(4)),
            Ok(Some(WorkspaceId::new(1)))
        );
        assert!(manager.set_active_workspace(d, WorkspaceId::new(42)).is_err());
        assert_eq!(manager.active_workspace(d), Some(WorkspaceId::new(4)));
    }

    #[test]
    fn replace_window_keeps_position_and_focus() {
        let mut manager = manager();
        let ws = WorkspaceId::new(1);
        for id in [1, 2, 3] {
            manager.assign_window_to_workspace(WindowId::new(id), ws).unwrap();
        }
        manager.set_last_focused_window(ws, Some(WindowId::new(2)));
        manager.replace_window(WindowId::new(2), WindowId::new(9)).unwrap();
        assert_eq!(
            manager.windows_in(ws),
            vec![WindowId::new(1), WindowId::new(9), WindowId::new(3)]
        );
        assert_eq!(manager.last_focused_window(ws), Some(WindowId::new(9)));
        assert_eq!(manager.workspace_for_window(WindowId::new(2)), None);
    }

    #[test]
    fn first_unshown_workspace_skips_active_ones() {
        let mut manager = manager();
        manager.set_active_workspace(DisplayId::new(1), WorkspaceId::new(1)).unwrap();
        manager.set_active_workspace(DisplayId::new(2), WorkspaceId::new(2)).unwrap();
        assert_eq!(manager.first_unshown_workspace(), WorkspaceId::new(3));
    }
}
