use tracing::{debug, trace};

use crate::actor::reactor::events::drag::DragEventHandler;
use crate::actor::reactor::events::tab::TabEventHandler;
use crate::actor::reactor::{Reactor, ReactorError};
use crate::model::window::{WindowId, pid_t};
use crate::sys::geometry::SameAs;
use crate::sys::window_system::WindowSystem;

pub struct WindowEventHandler;

impl WindowEventHandler {
    pub fn handle_window_created<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        pid: pid_t,
        wid: WindowId,
    ) -> Result<(), ReactorError> {
        if reactor.windows.contains(wid) {
            trace!(?wid, "window already known");
            return Ok(());
        }
        if !reactor.window_system.should_manage_window(pid, wid) {
            return Err(ReactorError::Unmanageable(wid));
        }
        let frame = reactor.resolve_frame(pid, wid).ok_or(ReactorError::IdentityUnresolved(pid))?;
        if TabEventHandler::absorb_sibling(reactor, pid, wid, frame) {
            return Ok(());
        }
        reactor.admit_window(pid, wid, frame)
    }

    pub fn handle_window_destroyed<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        pid: pid_t,
        wid: WindowId,
    ) -> Result<(), ReactorError> {
        reactor.forget_window(wid).ok_or(ReactorError::UnknownWindow(wid))?;
        trace!(?wid, pid, "window destroyed");
        Ok(())
    }

    /// Minimized windows leave the model entirely and come back through
    /// ordinary admission.
    pub fn handle_window_minimized<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        pid: pid_t,
        wid: WindowId,
    ) -> Result<(), ReactorError> {
        reactor.forget_window(wid).ok_or(ReactorError::UnknownWindow(wid))?;
        debug!(?wid, pid, "window minimized");
        Ok(())
    }

    pub fn handle_window_deminimized<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        pid: pid_t,
        wid: WindowId,
    ) -> Result<(), ReactorError> {
        Self::handle_window_created(reactor, pid, wid)
    }

    pub fn handle_window_frame_changed<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        pid: pid_t,
        wid: WindowId,
    ) -> Result<(), ReactorError> {
        if !reactor.windows.contains(wid) {
            return Err(ReactorError::UnknownWindow(wid));
        }
        if reactor.parked.contains(wid) {
            trace!(?wid, "ignoring frame change of parked window");
            return Ok(());
        }
        if reactor.tabs.is_suppressed(wid) {
            TabEventHandler::detect_drag_out(reactor, wid)?;
            return Ok(());
        }

        let frame = reactor.window_system.window_frame(pid, wid).ok_or(ReactorError::IdentityUnresolved(pid))?;
        let leader = reactor.tabs.resolve_leader(wid);
        let window = reactor.windows.get(leader).ok_or(ReactorError::UnknownWindow(leader))?;
        let (workspace, display_id, tiled, fullscreen, stored) =
            (window.workspace, window.display, window.is_tiled(), window.is_fullscreen, window.frame);

        if fullscreen {
            reactor.retile_workspace(workspace, display_id);
            return Ok(());
        }
        if tiled && reactor.drag_manager.is_dragging() {
            DragEventHandler::update_preview(reactor, leader, frame);
            return Ok(());
        }

        let new_display = reactor.displays.display_for_frame(&frame).ok_or(ReactorError::NoDisplays)?;
        if !tiled {
            for member in reactor.group_members(leader) {
                if let Some(w) = reactor.windows.get_mut(member) {
                    w.frame = frame;
                }
            }
            if new_display != display_id {
                let target = reactor.workspace_on(new_display)?;
                reactor.relocate(leader, target, new_display)?;
            }
            return Ok(());
        }

        if stored.same_as(&frame) {
            return Ok(());
        }
        if new_display != display_id {
            let target = reactor.workspace_on(new_display)?;
            debug!(?leader, from = ?display_id, to = ?new_display, "window crossed displays");
            reactor.relocate(leader, target, new_display)
        } else {
            trace!(?leader, "snapping tiled window back");
            reactor.retile_workspace(workspace, display_id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use crate::actor::reactor::testing::*;
    use crate::actor::reactor::{Command, Event};
    use crate::common::config::AppRule;
    use crate::model::window::WindowMode;
    use crate::sys::geometry::Frame;

    #[test]
    fn created_window_is_tiled_on_active_workspace() {
        let (mut reactor, ws) = single_display();
        reactor.start();
        ws.add_window(10, w(1), Frame::new(50.0, 50.0, 300.0, 200.0));
        reactor.handle_event(Event::WindowCreated { pid: 10, window_id: w(1) });

        let window = reactor.windows.get(w(1)).unwrap();
        assert_eq!((window.workspace, window.display), (WS1, D1));
        assert_eq!(ws.frame(w(1)), Some(FULL));
        assert_eq!(reactor.workspaces.windows_in(WS1), vec![w(1)]);
    }

    #[test]
    fn unmanageable_windows_are_ignored() {
        let (mut reactor, ws) = single_display();
        reactor.start();
        ws.add_window(10, w(1), Frame::new(50.0, 50.0, 300.0, 200.0));
        ws.set_manageable(w(1), false);
        reactor.handle_event(Event::WindowCreated { pid: 10, window_id: w(1) });
        assert!(!reactor.windows.contains(w(1)));
        assert!(ws.applied_frames().is_empty());
    }

    #[test]
    fn identity_resolution_is_retried() {
        let (mut reactor, ws) = single_display();
        reactor.start();
        ws.add_window(10, w(1), Frame::new(50.0, 50.0, 300.0, 200.0));
        ws.set_unresolved(w(1), 3);
        reactor.handle_event(Event::WindowCreated { pid: 10, window_id: w(1) });
        assert!(reactor.windows.contains(w(1)));
    }

    #[test]
    fn identity_resolution_gives_up_silently() {
        let (mut reactor, ws) = single_display();
        reactor.start();
        ws.add_window(10, w(1), Frame::new(50.0, 50.0, 300.0, 200.0));
        ws.set_unresolved(w(1), 50);
        reactor.handle_event(Event::WindowCreated { pid: 10, window_id: w(1) });
        assert!(!reactor.windows.contains(w(1)));
    }

    #[test]
    fn destroying_a_window_retiles_the_rest() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        ws.add_window(10, w(2), Frame::new(200.0, 100.0, 300.0, 300.0));
        reactor.start();
        ws.remove_window(w(1));
        reactor.handle_event(Event::WindowDestroyed { pid: 10, window_id: w(1) });

        assert!(!reactor.windows.contains(w(1)));
        assert_eq!(reactor.layouts.tree(WS1, D1).unwrap().windows(), vec![w(2)]);
        assert_eq!(ws.frame(w(2)), Some(FULL));
    }

    #[test]
    fn destroying_an_unknown_window_is_a_no_op() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        reactor.start();
        ws.clear_applied();
        reactor.handle_event(Event::WindowDestroyed { pid: 10, window_id: w(42) });
        assert!(ws.applied_frames().is_empty());
        assert!(reactor.windows.contains(w(1)));
    }

    #[test]
    fn minimize_and_restore() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        ws.add_window(10, w(2), Frame::new(200.0, 100.0, 300.0, 300.0));
        reactor.start();

        reactor.handle_event(Event::WindowMinimized { pid: 10, window_id: w(1) });
        assert!(!reactor.windows.contains(w(1)));
        assert_eq!(ws.frame(w(2)), Some(FULL));

        reactor.handle_event(Event::WindowDeminimized { pid: 10, window_id: w(1) });
        assert_eq!(reactor.layouts.tree(WS1, D1).unwrap().windows(), vec![w(2), w(1)]);
        assert_eq!(ws.frame(w(1)), Some(RIGHT_HALF));
        assert_eq!(ws.frame(w(2)), Some(LEFT_HALF));
    }

    #[test]
    fn crossing_displays_moves_window_between_trees() {
        let (mut reactor, ws) = dual_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        ws.add_window(10, w(2), Frame::new(200.0, 100.0, 300.0, 300.0));
        reactor.start();
        assert_eq!(reactor.workspaces.active_workspace(D2), Some(WS2));

        ws.move_window(w(2), Frame::new(1200.0, 100.0, 500.0, 775.0));
        reactor.handle_event(Event::WindowMoved { pid: 10, window_id: w(2) });

        assert_eq!(reactor.layouts.tree(WS1, D1).unwrap().windows(), vec![w(1)]);
        assert_eq!(reactor.layouts.tree(WS2, D2).unwrap().windows(), vec![w(2)]);
        let window = reactor.windows.get(w(2)).unwrap();
        assert_eq!((window.workspace, window.display), (WS2, D2));
        assert_eq!(ws.frame(w(1)), Some(FULL));
        assert_eq!(ws.frame(w(2)), Some(Frame::new(1000.0, 25.0, 1000.0, 775.0)));
    }

    #[test]
    fn tiled_window_snaps_back_after_stray_move() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        reactor.start();
        ws.move_window(w(1), Frame::new(40.0, 60.0, 700.0, 500.0));
        reactor.handle_event(Event::WindowMoved { pid: 10, window_id: w(1) });
        assert_eq!(ws.frame(w(1)), Some(FULL));
    }

    #[test]
    fn echoes_of_applied_frames_are_ignored() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        reactor.start();
        ws.clear_applied();
        reactor.handle_event(Event::WindowResized { pid: 10, window_id: w(1) });
        assert!(ws.applied_frames().is_empty());
    }

    #[test]
    fn fullscreen_window_is_forced_back() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        ws.add_window(10, w(2), Frame::new(200.0, 100.0, 300.0, 300.0));
        reactor.start();
        reactor.handle_event(Event::WindowFocused { pid: 10, window_id: w(1) });
        reactor.handle_event(Event::Command(Command::ToggleFullscreen));
        assert_eq!(ws.frame(w(1)), Some(FULL));

        ws.move_window(w(1), Frame::new(10.0, 10.0, 20.0, 20.0));
        reactor.handle_event(Event::WindowMoved { pid: 10, window_id: w(1) });
        assert_eq!(ws.frame(w(1)), Some(FULL));
    }

    #[test]
    fn floating_windows_keep_user_frames() {
        let mut config = test_config();
        config.app_rules.push(AppRule {
            app_id: "com.example.palette".into(),
            workspace: None,
            floating: true,
        });
        let (mut reactor, ws) = reactor_with(config, vec![display(1, 0.0, true)]);
        ws.set_bundle_id(20, "com.example.palette");
        ws.add_window(20, w(5), Frame::new(100.0, 100.0, 300.0, 300.0));
        reactor.start();

        assert_eq!(reactor.windows.get(w(5)).unwrap().mode, WindowMode::Floating);
        assert!(reactor.layouts.tree(WS1, D1).is_none());
        let moved = Frame::new(300.0, 200.0, 300.0, 300.0);
        ws.move_window(w(5), moved);
        reactor.handle_event(Event::WindowMoved { pid: 20, window_id: w(5) });
        assert_eq!(reactor.windows.get(w(5)).unwrap().frame, moved);
        assert_eq!(ws.frame(w(5)), Some(moved));
    }

    #[test]
    fn app_rule_sends_window_to_hidden_workspace() {
        let mut config = test_config();
        config.app_rules.push(AppRule {
            app_id: "com.example.mail".into(),
            workspace: Some(3),
            floating: false,
        });
        let (mut reactor, ws) = reactor_with(config, vec![display(1, 0.0, true)]);
        reactor.start();
        ws.set_bundle_id(30, "com.example.mail");
        ws.add_window(30, w(7), Frame::new(100.0, 100.0, 300.0, 300.0));
        reactor.handle_event(Event::WindowCreated { pid: 30, window_id: w(7) });

        assert_eq!(reactor.windows.get(w(7)).unwrap().workspace, WS3);
        assert!(reactor.parked.contains(w(7)));
        assert_eq!(ws.frame(w(7)), Some(Frame::new(999.0, 799.0, 300.0, 300.0)));
    }
}
