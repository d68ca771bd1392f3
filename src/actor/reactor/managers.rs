use crate::model::window::WindowId;

/// Tracks a mouse drag of a tiled window.
#[derive(Debug, Default)]
pub struct DragManager {
    pub mouse_down: bool,
    /// The first window that moved while the button was held.
    pub dragged: Option<WindowId>,
    /// The tiled window currently under the dragged one, if any.
    pub preview: Option<WindowId>,
}

impl DragManager {
    pub fn reset(&mut self) {
        self.mouse_down = false;
        self.dragged = None;
        self.preview = None;
    }

    pub fn is_dragging(&self) -> bool { self.mouse_down }

    pub fn dragged(&self) -> Option<WindowId> { self.dragged }

    pub fn last_target(&self) -> Option<WindowId> { self.preview }

    pub fn forget(&mut self, wid: WindowId) {
        if self.dragged == Some(wid) {
            self.dragged = None;
            self.preview = None;
        }
        if self.preview == Some(wid) {
            self.preview = None;
        }
    }
}
