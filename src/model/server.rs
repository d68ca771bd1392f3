//! Read-only views of reactor state handed to diagnostic tooling.

use serde::{Deserialize, Serialize};

use crate::model::display::DisplayId;
use crate::model::tab_group::TabGroupId;
use crate::model::virtual_workspace::WorkspaceId;
use crate::model::window::{WindowId, WindowMode, pid_t};
use crate::sys::geometry::Frame;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WindowData {
    pub id: WindowId,
    pub pid: pid_t,
    pub frame: Frame,
    pub mode: WindowMode,
    pub is_fullscreen: bool,
    pub is_focused: bool,
    pub workspace: WorkspaceId,
    pub display: DisplayId,
    pub tab_group: Option<TabGroupId>,
    pub is_suppressed: bool,
    pub is_parked: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkspaceData {
    pub id: WorkspaceId,
    pub name: String,
    pub windows: Vec<WindowId>,
    pub last_focused: Option<WindowId>,
    /// Displays on which this workspace is currently shown.
    pub active_on: Vec<DisplayId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DisplayData {
    pub id: DisplayId,
    pub visible_frame: Frame,
    pub full_frame: Frame,
    pub is_primary: bool,
    pub active_workspace: Option<WorkspaceId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApplicationData {
    pub pid: pid_t,
    pub bundle_id: Option<String>,
    pub window_count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TabGroupData {
    pub id: TabGroupId,
    pub pid: pid_t,
    pub leader: WindowId,
    pub active: WindowId,
    pub members: Vec<WindowId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LayoutData {
    pub workspace: WorkspaceId,
    pub display: DisplayId,
    pub windows: Vec<WindowId>,
    pub tree: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub focused_window: Option<WindowId>,
    pub focused_display: Option<DisplayId>,
    pub windows: Vec<WindowData>,
    pub workspaces: Vec<WorkspaceData>,
    pub displays: Vec<DisplayData>,
    pub applications: Vec<ApplicationData>,
    pub tab_groups: Vec<TabGroupData>,
    pub layouts: Vec<LayoutData>,
    pub dropped_events: u64,
}
