use std::sync::Arc;

use super::Reactor;
use crate::common::config::Config;
use crate::model::display::{Display, DisplayId};
use crate::model::virtual_workspace::WorkspaceId;
use crate::model::window::WindowId;
use crate::sys::geometry::Frame;
use crate::sys::headless::HeadlessWindowSystem;

pub const D1: DisplayId = DisplayId::new(1);
pub const D2: DisplayId = DisplayId::new(2);
pub const WS1: WorkspaceId = WorkspaceId::new(1);
pub const WS2: WorkspaceId = WorkspaceId::new(2);
pub const WS3: WorkspaceId = WorkspaceId::new(3);

pub fn w(id: u32) -> WindowId { WindowId::new(id) }

/// A 1000x800 display with a 25 unit menu bar, placed at `x`.
pub fn display(id: u32, x: f64, primary: bool) -> Display {
    Display {
        id: DisplayId::new(id),
        visible_frame: Frame::new(x, 25.0, 1000.0, 775.0),
        full_frame: Frame::new(x, 0.0, 1000.0, 800.0),
        is_primary: primary,
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.settings.identity_retry_delay_ms = 0;
    config
}

pub fn reactor_with(
    config: Config,
    displays: Vec<Display>,
) -> (Reactor<HeadlessWindowSystem>, Arc<HeadlessWindowSystem>) {
    let ws = Arc::new(HeadlessWindowSystem::new(displays));
    (Reactor::new(config, ws.clone()), ws)
}

pub fn single_display() -> (Reactor<HeadlessWindowSystem>, Arc<HeadlessWindowSystem>) {
    reactor_with(test_config(), vec![display(1, 0.0, true)])
}

pub fn dual_display() -> (Reactor<HeadlessWindowSystem>, Arc<HeadlessWindowSystem>) {
    reactor_with(test_config(), vec![display(1, 0.0, true), display(2, 1000.0, false)])
}

pub const LEFT_HALF: Frame = Frame::new(0.0, 25.0, 500.0, 775.0);
pub const RIGHT_HALF: Frame = Frame::new(500.0, 25.0, 500.0, 775.0);
pub const FULL: Frame = Frame::new(0.0, 25.0, 1000.0, 775.0);
