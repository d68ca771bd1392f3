use tracing::{debug, info};

use crate::actor::reactor::events::space::SpaceEventHandler;
use crate::actor::reactor::{Reactor, ReactorError};
use crate::model::window::pid_t;
use crate::sys::window_system::WindowSystem;

pub struct AppEventHandler;

impl AppEventHandler {
    pub fn handle_app_launched<W: WindowSystem>(reactor: &mut Reactor<W>, pid: pid_t) -> Result<(), ReactorError> {
        reactor.observe(pid);
        let windows: Vec<_> =
            reactor.window_system.discover_windows().into_iter().filter(|w| w.pid == pid).collect();
        debug!(pid, count = windows.len(), "application launched");
        for window in windows {
            SpaceEventHandler::adopt(reactor, window);
        }
        Ok(())
    }

    /// Drops every window the process owned, tiled or suppressed.
    pub fn handle_app_terminated<W: WindowSystem>(reactor: &mut Reactor<W>, pid: pid_t) -> Result<(), ReactorError> {
        let grouped = reactor.tabs.remove_pid(pid);
        let windows = reactor.windows.windows_for_pid(pid);
        for &wid in &windows {
            reactor.forget_window(wid);
        }
        if reactor.observed_apps.remove(&pid) {
            reactor.window_system.unobserve_app(pid);
        }
        info!(pid, removed = windows.len(), tabs = grouped.len(), "application terminated");
        Ok(())
    }
}
