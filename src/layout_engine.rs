pub mod binary_tree;
mod graph;
pub mod utils;
mod workspaces;

pub use binary_tree::LayoutNode;
pub use graph::{Direction, Orientation};
pub use workspaces::{LayoutKey, WorkspaceLayouts};
