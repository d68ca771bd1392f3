use crate::common::config::GapSettings;
use crate::sys::geometry::{Frame, Round};

/// The display's usable area with the configured outer gaps removed.
pub fn compute_tiling_area(screen: Frame, gaps: &GapSettings) -> Frame {
    let outer = &gaps.outer;
    if outer.top == 0.0 && outer.left == 0.0 && outer.bottom == 0.0 && outer.right == 0.0 {
        return screen;
    }
    Frame::new(
        screen.x + outer.left,
        screen.y + outer.top,
        (screen.width - outer.left - outer.right).max(0.0),
        (screen.height - outer.top - outer.bottom).max(0.0),
    )
    .round()
}
