pub mod display;
pub mod server;
pub mod tab_group;
pub mod virtual_workspace;
pub mod window;

pub use display::{Display, DisplayId, DisplayModel, HideCorner};
pub use tab_group::{TabGroup, TabGroupId, TabGroupManager};
pub use virtual_workspace::{VirtualWorkspace, VirtualWorkspaceManager, WorkspaceError, WorkspaceId};
pub use window::{Window, WindowId, WindowMode, WindowRegistry, pid_t};
