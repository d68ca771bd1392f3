use thiserror::Error;

use crate::model::virtual_workspace::WorkspaceError;
use crate::model::window::{WindowId, pid_t};

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("Unknown window: {0}")]
    UnknownWindow(WindowId),
    #[error("Workspace operation failed: {0}")]
    Workspace(#[from] WorkspaceError),
    #[error("No display in slot {0}")]
    InvalidDisplaySlot(usize),
    #[error("No displays are connected")]
    NoDisplays,
    #[error("Window {0} is not manageable")]
    Unmanageable(WindowId),
    #[error("Could not resolve window identity for pid {0}")]
    IdentityUnresolved(pid_t),
    #[error("No window is focused")]
    NoFocusedWindow,
}
