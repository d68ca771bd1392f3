use tracing::{debug, trace};

use crate::actor::reactor::{Reactor, ReactorError};
use crate::model::window::WindowId;
use crate::sys::geometry::Frame;
use crate::sys::window_system::WindowSystem;

pub struct DragEventHandler;

impl DragEventHandler {
    pub fn handle_mouse_down<W: WindowSystem>(reactor: &mut Reactor<W>) {
        reactor.drag_manager.reset();
        reactor.drag_manager.mouse_down = true;
    }

    /// Recomputes the drop target for a tiled window being dragged: the
    /// tiled leaf under the window's center on the display it is over.
    pub fn update_preview<W: WindowSystem>(reactor: &mut Reactor<W>, leader: WindowId, frame: Frame) {
        match reactor.drag_manager.dragged {
            None => reactor.drag_manager.dragged = Some(leader),
            Some(dragged) if dragged != leader => return,
            Some(_) => {}
        }

        let target = reactor.displays.display_for_frame(&frame).and_then(|display| {
            let workspace = reactor.workspaces.active_workspace(display)?;
            let bounding = reactor.tiling_area(display)?;
            let windows = &reactor.windows;
            reactor.layouts.leaf_at(
                workspace,
                display,
                bounding,
                reactor.config.settings.gaps.inner,
                frame.mid(),
                |wid| wid == leader || !windows.get(wid).is_some_and(|w| w.is_tiled()),
            )
        });
        if reactor.drag_manager.preview != target {
            trace!(?leader, ?target, "drop target changed");
        }
        reactor.drag_manager.preview = target;
    }

    pub fn handle_mouse_up<W: WindowSystem>(reactor: &mut Reactor<W>) -> Result<(), ReactorError> {
        let dragged = reactor.drag_manager.dragged();
        let target = reactor.drag_manager.last_target();
        reactor.drag_manager.reset();
        let Some(dragged) = dragged else {
            return Ok(());
        };
        let window = reactor.windows.get(dragged).ok_or(ReactorError::UnknownWindow(dragged))?;
        let (pid, workspace, display) = (window.pid, window.workspace, window.display);

        if let Some(target) = target {
            return Self::swap(reactor, dragged, target);
        }

        let shown = reactor.tabs.resolve_active(dragged);
        let new_display = reactor
            .window_system
            .window_frame(pid, shown)
            .and_then(|frame| reactor.displays.display_for_frame(&frame));
        match new_display {
            Some(new_display) if new_display != display => {
                let target_ws = reactor.workspace_on(new_display)?;
                debug!(?dragged, ?new_display, "window dropped on another display");
                reactor.relocate(dragged, target_ws, new_display)
            }
            _ => {
                reactor.retile_workspace(workspace, display);
                Ok(())
            }
        }
    }

    fn swap<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        dragged: WindowId,
        target: WindowId,
    ) -> Result<(), ReactorError> {
        let a = reactor.windows.get(dragged).ok_or(ReactorError::UnknownWindow(dragged))?;
        let b = reactor.windows.get(target).ok_or(ReactorError::UnknownWindow(target))?;
        let (a_key, b_key) = ((a.workspace, a.display), (b.workspace, b.display));

        if a_key == b_key {
            reactor.layouts.swap(a_key.0, a_key.1, dragged, target);
            debug!(?dragged, ?target, "swapped windows");
        } else {
            reactor.layouts.swap_across(dragged, target);
            reactor.assign_location(dragged, b_key.0, b_key.1)?;
            reactor.assign_location(target, a_key.0, a_key.1)?;
            debug!(?dragged, ?target, "swapped windows across displays");
            reactor.retile_workspace(b_key.0, b_key.1);
        }
        reactor.retile_workspace(a_key.0, a_key.1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use crate::actor::reactor::Event;
    use crate::actor::reactor::testing::*;
    use crate::sys::geometry::Frame;

    #[test]
    fn dropping_onto_a_sibling_swaps_them() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        ws.add_window(10, w(2), Frame::new(200.0, 100.0, 300.0, 300.0));
        reactor.start();

        reactor.handle_event(Event::MouseDown);
        ws.move_window(w(1), Frame::new(600.0, 100.0, 500.0, 775.0));
        reactor.handle_event(Event::WindowMoved { pid: 10, window_id: w(1) });
        assert_eq!(reactor.drag_manager.preview, Some(w(2)));
        reactor.handle_event(Event::MouseUp);

        assert_eq!(reactor.layouts.tree(WS1, D1).unwrap().windows(), vec![w(2), w(1)]);
        assert_eq!(ws.frame(w(1)), Some(RIGHT_HALF));
        assert_eq!(ws.frame(w(2)), Some(LEFT_HALF));
        assert_eq!(reactor.drag_manager.dragged, None);
        assert_eq!(reactor.drag_manager.preview, None);
    }

    #[test]
    fn drop_without_target_snaps_back() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        reactor.start();

        reactor.handle_event(Event::MouseDown);
        ws.move_window(w(1), Frame::new(300.0, 200.0, 1000.0, 775.0));
        reactor.handle_event(Event::WindowMoved { pid: 10, window_id: w(1) });
        assert_eq!(reactor.drag_manager.preview, None);
        reactor.handle_event(Event::MouseUp);
        assert_eq!(ws.frame(w(1)), Some(FULL));
    }

    #[test]
    fn drop_on_other_display_swaps_across_trees() {
        let (mut reactor, ws) = dual_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        ws.add_window(20, w(2), Frame::new(1100.0, 100.0, 300.0, 300.0));
        reactor.start();

        reactor.handle_event(Event::MouseDown);
        ws.move_window(w(1), Frame::new(1200.0, 100.0, 500.0, 500.0));
        reactor.handle_event(Event::WindowMoved { pid: 10, window_id: w(1) });
        reactor.handle_event(Event::MouseUp);

        assert_eq!(reactor.layouts.tree(WS1, D1).unwrap().windows(), vec![w(2)]);
        assert_eq!(reactor.layouts.tree(WS2, D2).unwrap().windows(), vec![w(1)]);
        assert_eq!(reactor.windows.get(w(1)).unwrap().display, D2);
        assert_eq!(reactor.windows.get(w(2)).unwrap().workspace, WS1);
        assert_eq!(ws.frame(w(2)), Some(FULL));
        assert_eq!(ws.frame(w(1)), Some(Frame::new(1000.0, 25.0, 1000.0, 775.0)));
    }

    #[test]
    fn drop_on_empty_display_reassigns_window() {
        let (mut reactor, ws) = dual_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        ws.add_window(10, w(2), Frame::new(200.0, 100.0, 300.0, 300.0));
        reactor.start();

        reactor.handle_event(Event::MouseDown);
        ws.move_window(w(2), Frame::new(1200.0, 100.0, 500.0, 500.0));
        reactor.handle_event(Event::WindowMoved { pid: 10, window_id: w(2) });
        assert_eq!(reactor.windows.get(w(2)).unwrap().display, D1);
        reactor.handle_event(Event::MouseUp);

        assert_eq!(reactor.windows.get(w(2)).unwrap().display, D2);
        assert_eq!(reactor.layouts.tree(WS2, D2).unwrap().windows(), vec![w(2)]);
        assert_eq!(ws.frame(w(1)), Some(FULL));
    }

    #[test]
    fn removing_the_dragged_window_clears_the_session() {
        let (mut reactor, ws) = single_display();
        ws.add_window(10, w(1), Frame::new(100.0, 100.0, 300.0, 300.0));
        ws.add_window(10, w(2), Frame::new(200.0, 100.0, 300.0, 300.0));
        reactor.start();

        reactor.handle_event(Event::MouseDown);
        ws.move_window(w(1), Frame::new(600.0, 100.0, 500.0, 775.0));
        reactor.handle_event(Event::WindowMoved { pid: 10, window_id: w(1) });
        ws.remove_window(w(1));
        reactor.handle_event(Event::WindowDestroyed { pid: 10, window_id: w(1) });
        assert_eq!(reactor.drag_manager.dragged, None);
        assert_eq!(reactor.drag_manager.preview, None);
        reactor.handle_event(Event::MouseUp);
        assert_eq!(reactor.layouts.tree(WS1, D1).unwrap().windows(), vec![w(2)]);
    }
}
