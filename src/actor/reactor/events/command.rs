use tracing::{debug, trace};

use crate::actor::reactor::{Command, Reactor, ReactorError};
use crate::layout_engine::Direction;
use crate::model::window::{WindowId, WindowMode};
use crate::sys::window_system::WindowSystem;

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_command<W: WindowSystem>(reactor: &mut Reactor<W>, command: Command) -> Result<(), ReactorError> {
        match command {
            Command::FocusWorkspace(n) => Self::focus_workspace(reactor, n),
            Command::MoveWindowToWorkspace(n) => Self::move_window_to_workspace(reactor, n),
            Command::MoveWindowToDisplay(slot) => Self::move_window_to_display(reactor, slot),
            Command::FocusDirection(direction) => Self::focus_direction(reactor, direction),
            Command::ToggleSplit => Self::toggle_split(reactor),
            Command::ToggleFullscreen => Self::toggle_fullscreen(reactor),
            Command::ToggleFloat => Self::toggle_float(reactor),
            Command::Retile => {
                reactor.retile_all();
                Ok(())
            }
        }
    }

    fn focus_workspace<W: WindowSystem>(reactor: &mut Reactor<W>, n: u8) -> Result<(), ReactorError> {
        let target = reactor.workspaces.validate(n)?;
        let display_id = reactor.command_display().ok_or(ReactorError::NoDisplays)?;
        let previous = reactor.workspaces.active_workspace(display_id);
        if previous == Some(target) {
            trace!(?target, "workspace already active");
            return Ok(());
        }

        reactor.drag_manager.reset();
        reactor.workspaces.set_active_workspace(display_id, target)?;
        if let Some(previous) = previous {
            reactor.hide_workspace(previous, display_id);
        }
        reactor.show_workspace(target, display_id);
        reactor.focused_display = Some(display_id);
        debug!(?previous, ?target, ?display_id, "switched workspace");

        let on_display = |wid: &WindowId| reactor.windows.get(*wid).is_some_and(|w| w.display == display_id);
        let focus = reactor
            .workspaces
            .last_focused_window(target)
            .filter(on_display)
            .or_else(|| reactor.workspaces.windows_in(target).into_iter().find(on_display));
        match focus {
            Some(wid) => {
                reactor.raise_window(wid);
            }
            None => reactor.focused_window = None,
        }
        Ok(())
    }

    /// The window stays on its display. If the target workspace is not shown
    /// there the window is parked.
    fn move_window_to_workspace<W: WindowSystem>(reactor: &mut Reactor<W>, n: u8) -> Result<(), ReactorError> {
        let target = reactor.workspaces.validate(n)?;
        let leader = reactor.focused_leader().ok_or(ReactorError::NoFocusedWindow)?;
        let display = reactor.windows.get(leader).map(|w| w.display).ok_or(ReactorError::UnknownWindow(leader))?;
        reactor.relocate(leader, target, display)?;
        if !reactor.workspaces.is_visible(target, display) {
            reactor.focused_window = None;
        }
        Ok(())
    }

    fn move_window_to_display<W: WindowSystem>(reactor: &mut Reactor<W>, slot: usize) -> Result<(), ReactorError> {
        let leader = reactor.focused_leader().ok_or(ReactorError::NoFocusedWindow)?;
        let display = reactor.displays.slot(slot).map(|d| d.id).ok_or(ReactorError::InvalidDisplaySlot(slot))?;
        let workspace = reactor.workspace_on(display)?;
        reactor.relocate(leader, workspace, display)?;
        reactor.raise_window(leader);
        Ok(())
    }

    /// Focuses the nearest window whose center lies strictly on the requested
    /// side of the focused window's center.
    fn focus_direction<W: WindowSystem>(reactor: &mut Reactor<W>, direction: Direction) -> Result<(), ReactorError> {
        let leader = reactor.focused_leader().ok_or(ReactorError::NoFocusedWindow)?;
        let window = reactor.windows.get(leader).ok_or(ReactorError::UnknownWindow(leader))?;
        let (workspace, display, origin) = (window.workspace, window.display, window.frame.mid());

        let best = reactor
            .workspaces
            .windows_in(workspace)
            .into_iter()
            .filter(|&wid| wid != leader)
            .filter_map(|wid| {
                let w = reactor.windows.get(wid).filter(|w| w.display == display)?;
                let c = w.frame.mid();
                let ahead = match direction {
                    Direction::Left => c.x < origin.x,
                    Direction::Right => c.x > origin.x,
                    Direction::Up => c.y < origin.y,
                    Direction::Down => c.y > origin.y,
                };
                ahead.then(|| ((c.x - origin.x).hypot(c.y - origin.y), origin.manhattan(c), wid))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)))
            .map(|(_, _, wid)| wid);

        let Some(target) = best else {
            trace!(?direction, "nothing to focus in that direction");
            return Ok(());
        };
        reactor.raise_window(target);
        Ok(())
    }

    fn toggle_split<W: WindowSystem>(reactor: &mut Reactor<W>) -> Result<(), ReactorError> {
        match reactor.focused_leader() {
            Some(leader) => {
                let window = reactor.windows.get(leader).ok_or(ReactorError::UnknownWindow(leader))?;
                let (workspace, display) = (window.workspace, window.display);
                if !reactor.layouts.toggle_split(workspace, display, leader) {
                    reactor.layouts.toggle_default_orientation();
                }
                reactor.retile_workspace(workspace, display);
            }
            None => reactor.layouts.toggle_default_orientation(),
        }
        debug!(default = ?reactor.layouts.default_orientation(), "split direction toggled");
        Ok(())
    }

    /// Fullscreen windows keep their leaf and render over the display's
    /// usable area.
    fn toggle_fullscreen<W: WindowSystem>(reactor: &mut Reactor<W>) -> Result<(), ReactorError> {
        let leader = reactor.focused_leader().ok_or(ReactorError::NoFocusedWindow)?;
        let window = reactor.windows.get_mut(leader).ok_or(ReactorError::UnknownWindow(leader))?;
        window.is_fullscreen = !window.is_fullscreen;
        let (workspace, display, fullscreen, tiled) =
            (window.workspace, window.display, window.is_fullscreen, window.is_tiled());
        debug!(?leader, fullscreen, "fullscreen toggled");
        if tiled {
            reactor.retile_workspace(workspace, display);
            return Ok(());
        }
        let frame = if fullscreen {
            reactor.displays.get(display).map(|d| d.visible_frame)
        } else {
            reactor.windows.get(leader).map(|w| w.frame)
        };
        if let Some(frame) = frame {
            for member in reactor.group_members(leader) {
                if let Some(pid) = reactor.windows.get(member).map(|w| w.pid) {
                    reactor.window_system.set_window_frame(pid, member, frame);
                }
            }
        }
        Ok(())
    }

    fn toggle_float<W: WindowSystem>(reactor: &mut Reactor<W>) -> Result<(), ReactorError> {
        let leader = reactor.focused_leader().ok_or(ReactorError::NoFocusedWindow)?;
        let window = reactor.windows.get_mut(leader).ok_or(ReactorError::UnknownWindow(leader))?;
        let mode = match window.mode {
            WindowMode::Tiled => WindowMode::Floating,
            WindowMode::Floating => WindowMode::Tiled,
        };
        window.mode = mode;
        let (workspace, display) = (window.workspace, window.display);
        for member in reactor.group_members(leader) {
            if let Some(w) = reactor.windows.get_mut(member) {
                w.mode = mode;
            }
        }
        match mode {
            WindowMode::Floating => {
                reactor.layouts.remove_window(workspace, display, leader);
            }
            WindowMode::Tiled => {
                reactor.layouts.insert_window(workspace, display, leader);
            }
        }
        debug!(?leader, ?mode, "floating toggled");
        reactor.retile_workspace(workspace, display);
        Ok(())
    }
}
