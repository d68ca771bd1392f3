use tracing::{debug, info, warn};

use crate::actor::reactor::events::tab::TabEventHandler;
use crate::actor::reactor::{Reactor, ReactorError};
use crate::common::collections::HashSet;
use crate::model::display::DisplayId;
use crate::model::window::WindowId;
use crate::sys::window_system::{DiscoveredWindow, WindowSystem};

pub struct SpaceEventHandler;

impl SpaceEventHandler {
    /// Rebuilds the registry from what the platform reports as on screen.
    pub fn handle_space_changed<W: WindowSystem>(reactor: &mut Reactor<W>) -> Result<(), ReactorError> {
        let discovered = reactor.window_system.discover_windows();
        let seen: HashSet<WindowId> = discovered.iter().map(|w| w.id).collect();
        for window in discovered {
            Self::adopt(reactor, window);
        }

        let stale: Vec<_> = reactor
            .windows
            .ids()
            .into_iter()
            .filter(|wid| {
                !seen.contains(wid) && !reactor.parked.contains(*wid) && reactor.tabs.group_of(*wid).is_none()
            })
            .collect();
        for wid in stale {
            debug!(?wid, "window no longer reported; dropping");
            reactor.forget_window(wid);
        }
        reactor.retile_all();
        Ok(())
    }

    /// Admits a discovered window the registry does not know yet.
    pub(crate) fn adopt<W: WindowSystem>(reactor: &mut Reactor<W>, window: DiscoveredWindow) {
        let DiscoveredWindow { id, pid, frame } = window;
        if reactor.windows.contains(id) || !reactor.window_system.should_manage_window(pid, id) {
            return;
        }
        if TabEventHandler::absorb_sibling(reactor, pid, id, frame) {
            return;
        }
        if let Err(err) = reactor.admit_window(pid, id, frame) {
            debug!(?id, %err, "could not adopt window");
        }
    }

    /// Full topology refresh. Surviving displays keep their workspace and
    /// trees; windows of removed displays move to the primary display.
    pub fn handle_display_changed<W: WindowSystem>(reactor: &mut Reactor<W>) -> Result<(), ReactorError> {
        let topology = reactor.window_system.get_display_topology();
        let diff = reactor.displays.refresh(topology);
        if reactor.displays.is_empty() {
            warn!("no displays connected; keeping window assignments");
            return Err(ReactorError::NoDisplays);
        }
        let primary = reactor.displays.primary().map(|d| d.id).ok_or(ReactorError::NoDisplays)?;

        for &display in &diff.added {
            reactor.workspace_on(display)?;
        }

        for &removed in &diff.removed {
            reactor.workspaces.forget_display(removed);
            let orphaned_trees = reactor.layouts.take_display(removed);
            let target = reactor.workspace_on(primary)?;
            let orphans: Vec<_> = reactor
                .windows
                .ids()
                .into_iter()
                .filter(|&wid| reactor.windows.get(wid).is_some_and(|w| w.display == removed))
                .collect();
            for &wid in &orphans {
                if reactor.workspaces.workspace_for_window(wid).is_some() {
                    reactor.workspaces.assign_window_to_workspace(wid, target)?;
                }
                if let Some(w) = reactor.windows.get_mut(wid) {
                    w.workspace = target;
                    w.display = primary;
                }
                Self::bring_floating_onto(reactor, wid, primary);
            }
            for (_, windows) in orphaned_trees {
                for wid in windows {
                    reactor.layouts.insert_window(target, primary, wid);
                }
            }
            info!(?removed, moved = orphans.len(), ?target, "display removed");
        }

        if reactor.focused_display.is_some_and(|d| !reactor.displays.contains(d)) {
            reactor.focused_display = Some(primary);
        }
        reactor.refresh_visibility();
        Ok(())
    }

    /// Floating windows have no tree to put them back on screen, so an
    /// orphaned one is centered on its new display. Parked windows pick the
    /// new frame up when they are revealed.
    fn bring_floating_onto<W: WindowSystem>(reactor: &mut Reactor<W>, wid: WindowId, display_id: DisplayId) {
        let Some(visible) = reactor.displays.get(display_id).map(|d| d.visible_frame) else {
            return;
        };
        let Some(window) = reactor.windows.get_mut(wid) else {
            return;
        };
        if window.is_tiled() {
            return;
        }
        let frame = if window.is_fullscreen {
            visible
        } else {
            visible.centered(window.frame.width, window.frame.height)
        };
        window.frame = frame;
        let pid = window.pid;
        if !reactor.parked.contains(wid) {
            reactor.window_system.set_window_frame(pid, wid, frame);
        }
        debug!(?wid, ?frame, "floating window moved off removed display");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use crate::actor::reactor::Event;
    use crate::actor::reactor::testing::*;
    use crate::common::config::AppRule;
    use crate::sys::geometry::Frame;

    #[test]
    fn discovery_drops_windows_that_vanished() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        ws.add_window(10, w(2), Frame::new(200.0, 100.0, 300.0, 300.0));
        reactor.start();

        ws.remove_window(w(2));
        ws.add_window(11, w(3), Frame::new(600.0, 100.0, 300.0, 300.0));
        reactor.handle_event(Event::SpaceChanged);

        assert_eq!(reactor.windows.ids(), vec![w(1), w(3)]);
        assert_eq!(reactor.layouts.tree(WS1, D1).unwrap().windows(), vec![w(1), w(3)]);
    }

    #[test]
    fn discovery_keeps_parked_windows() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        reactor.start();
        reactor.handle_event(Event::Command(crate::actor::reactor::Command::FocusWorkspace(2)));
        ws.set_on_screen(w(1), false);
        reactor.handle_event(Event::SpaceChanged);
        assert!(reactor.windows.contains(w(1)));
    }

    #[test]
    fn each_new_display_gets_its_own_workspace() {
        let (mut reactor, _ws) = dual_display();
        reactor.start();
        assert_eq!(reactor.workspaces.active_workspace(D1), Some(WS1));
        assert_eq!(reactor.workspaces.active_workspace(D2), Some(WS2));
    }

    #[test]
    fn removed_display_moves_its_windows_to_primary() {
        let (mut reactor, ws) = dual_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        ws.add_window(10, w(2), Frame::new(1100.0, 100.0, 300.0, 300.0));
        ws.add_window(10, w(3), Frame::new(1500.0, 100.0, 300.0, 300.0));
        reactor.start();
        assert_eq!(reactor.layouts.tree(WS2, D2).unwrap().windows(), vec![w(2), w(3)]);

        ws.set_displays(vec![display(1, 0.0, true)]);
        reactor.handle_event(Event::DisplayChanged);

        assert!(reactor.layouts.tree(WS2, D2).is_none());
        assert_eq!(reactor.layouts.tree(WS1, D1).unwrap().windows(), vec![w(1), w(2), w(3)]);
        for id in 1..=3 {
            let window = reactor.windows.get(w(id)).unwrap();
            assert_eq!((window.workspace, window.display), (WS1, D1));
        }
        assert_eq!(reactor.workspaces.windows_in(WS1), vec![w(1), w(2), w(3)]);
        assert_eq!(reactor.workspaces.active_workspace(D2), None);
    }

    #[test]
    fn floating_window_of_removed_display_is_centered_on_primary() {
        let mut config = test_config();
        config.app_rules.push(AppRule {
            app_id: "com.example.float".to_string(),
            workspace: None,
            floating: true,
        });
        let (mut reactor, ws) = reactor_with(config, vec![display(1, 0.0, true), display(2, 1000.0, false)]);
        ws.set_bundle_id(20, "com.example.float");
        ws.add_window(20, w(1), Frame::new(1300.0, 200.0, 400.0, 300.0));
        reactor.start();
        assert_eq!(reactor.windows.get(w(1)).unwrap().display, D2);

        ws.set_displays(vec![display(1, 0.0, true)]);
        reactor.handle_event(Event::DisplayChanged);

        let expected = Frame::new(300.0, 262.5, 400.0, 300.0);
        let window = reactor.windows.get(w(1)).unwrap();
        assert_eq!((window.workspace, window.display), (WS1, D1));
        assert_eq!(window.frame, expected);
        assert_eq!(ws.frame(w(1)), Some(expected));
        assert!(!reactor.parked.contains(w(1)));
    }

    #[test]
    fn surviving_display_keeps_its_workspace() {
        let (mut reactor, ws) = dual_display();
        reactor.start();
        reactor.focused_display = Some(D2);
        reactor.handle_event(Event::Command(crate::actor::reactor::Command::FocusWorkspace(5)));
        assert_eq!(reactor.workspaces.active_workspace(D2), Some(crate::model::WorkspaceId::new(5)));

        ws.set_displays(vec![display(2, 1000.0, true)]);
        reactor.handle_event(Event::DisplayChanged);
        assert_eq!(reactor.workspaces.active_workspace(D2), Some(crate::model::WorkspaceId::new(5)));
        assert_eq!(reactor.focused_display, Some(D2));
    }

    #[test]
    fn losing_every_display_keeps_state() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        reactor.start();
        ws.set_displays(Vec::new());
        reactor.handle_event(Event::DisplayChanged);
        assert!(reactor.windows.contains(w(1)));
    }
}
