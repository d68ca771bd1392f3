//! The Reactor's job is to maintain coherence between the platform and the
//! model.
//!
//! It takes lifecycle facts and user commands off the event queue one at a
//! time, updates the window registry, tab groups, workspaces and layout
//! trees, and pushes the resulting frames back out through the
//! [`WindowSystem`]. Everything here runs on a single thread and nothing
//! suspends; the reactor is deliberately not `Send`.

mod error;
mod events;
mod managers;
mod replay;

#[cfg(test)]
mod testing;

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

pub use error::ReactorError;
use events::app::AppEventHandler;
use events::command::CommandEventHandler;
use events::drag::DragEventHandler;
use events::space::SpaceEventHandler;
use events::tab::TabEventHandler;
use events::window::WindowEventHandler;
use managers::DragManager;
pub use replay::{Script, ScriptWindow, Step, apply_world_change, replay};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::actor;
use crate::common::collections::BTreeSet;
use crate::common::config::Config;
use crate::layout_engine::utils::compute_tiling_area;
use crate::layout_engine::{Direction, WorkspaceLayouts};
use crate::model::display::{DisplayId, DisplayModel};
use crate::model::server::{
    ApplicationData, DisplayData, LayoutData, StateSnapshot, TabGroupData, WindowData, WorkspaceData,
};
use crate::model::tab_group::TabGroupManager;
use crate::model::virtual_workspace::{VirtualWorkspaceManager, WorkspaceId};
use crate::model::window::{Window, WindowId, WindowMode, WindowRegistry, pid_t};
use crate::sys::geometry::{Frame, Round};
use crate::sys::recovery::{ParkedLedger, ParkedWindow, RecoveryHandle};
use crate::sys::window_system::{WindowSystem, retry};

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

pub fn channel(capacity: usize) -> (Sender, Receiver) { actor::channel(capacity) }

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Event {
    ApplicationLaunched { pid: pid_t },
    ApplicationTerminated { pid: pid_t },

    WindowCreated { pid: pid_t, window_id: WindowId },
    WindowDestroyed { pid: pid_t, window_id: WindowId },
    WindowFocused { pid: pid_t, window_id: WindowId },
    WindowMoved { pid: pid_t, window_id: WindowId },
    WindowResized { pid: pid_t, window_id: WindowId },
    WindowMinimized { pid: pid_t, window_id: WindowId },
    WindowDeminimized { pid: pid_t, window_id: WindowId },

    /// The process's focused window changed; the new window id has to be
    /// queried because it may be a tab the reactor has never seen.
    FocusedWindowChanged { pid: pid_t },

    /// The active native space changed. Triggers a discovery pass.
    SpaceChanged,
    /// Monitors were added, removed or rearranged.
    DisplayChanged,

    MouseDown,
    MouseUp,

    Command(Command),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum Command {
    FocusWorkspace(u8),
    MoveWindowToWorkspace(u8),
    /// Index into the current display list.
    MoveWindowToDisplay(usize),
    FocusDirection(Direction),
    ToggleSplit,
    ToggleFullscreen,
    ToggleFloat,
    Retile,
}

pub struct Reactor<W: WindowSystem> {
    pub(crate) config: Config,
    pub(crate) window_system: Arc<W>,
    pub(crate) windows: WindowRegistry,
    pub(crate) displays: DisplayModel,
    pub(crate) workspaces: VirtualWorkspaceManager,
    pub(crate) layouts: WorkspaceLayouts,
    pub(crate) tabs: TabGroupManager,
    pub(crate) drag_manager: DragManager,
    pub(crate) observed_apps: BTreeSet<pid_t>,
    pub(crate) focused_window: Option<WindowId>,
    pub(crate) focused_display: Option<DisplayId>,
    pub(crate) parked: ParkedLedger,
    dropped_events: u64,
    _not_send: PhantomData<*const ()>,
}

static_assertions::assert_not_impl_any!(
    Reactor<crate::sys::headless::HeadlessWindowSystem>: Send, Sync
);

impl<W: WindowSystem> Reactor<W> {
    pub fn new(config: Config, window_system: Arc<W>) -> Self {
        let settings = &config.settings;
        Reactor {
            windows: WindowRegistry::new(),
            displays: DisplayModel::new(),
            workspaces: VirtualWorkspaceManager::new(settings.workspace_count, &config.workspaces.names),
            layouts: WorkspaceLayouts::new(settings.default_split),
            tabs: TabGroupManager::new(settings.tab_frame_tolerance),
            drag_manager: DragManager::default(),
            observed_apps: BTreeSet::new(),
            focused_window: None,
            focused_display: None,
            parked: ParkedLedger::new(),
            dropped_events: 0,
            config,
            window_system,
            _not_send: PhantomData,
        }
    }

    /// Reads the display topology and adopts every window already on screen.
    pub fn start(&mut self) {
        self.handle_event(Event::DisplayChanged);
        self.handle_event(Event::SpaceChanged);
    }

    /// Handles events until every sender is gone, then puts parked windows
    /// back on screen.
    pub fn run(mut self, events: Receiver) {
        while let Some((span, event)) = events.recv() {
            let _guard = span.enter();
            self.handle_event(event);
            drop(_guard);
            self.drain(&events);
        }
        self.shutdown();
    }

    /// Handles everything currently queued. Returns the number of events
    /// processed.
    pub fn drain(&mut self, events: &Receiver) -> usize {
        let mut handled = 0;
        while let Some((span, event)) = events.try_recv() {
            let _guard = span.enter();
            self.handle_event(event);
            handled += 1;
        }
        self.dropped_events = events.dropped();
        handled
    }

    /// Restores every parked window. Called on normal exit.
    pub fn shutdown(&mut self) -> usize { self.recovery_handle().restore() }

    pub fn recovery_handle(&self) -> RecoveryHandle<W> {
        RecoveryHandle::new(self.parked.clone(), self.window_system.clone())
    }

    pub fn window_system(&self) -> &W { &self.window_system }

    pub fn config(&self) -> &Config { &self.config }

    pub fn retile(&mut self) { self.handle_event(Event::Command(Command::Retile)) }

    pub fn toggle_split_direction(&mut self) { self.handle_event(Event::Command(Command::ToggleSplit)) }

    pub fn focus_workspace(&mut self, n: u8) { self.handle_event(Event::Command(Command::FocusWorkspace(n))) }

    pub fn move_focused_window_to_workspace(&mut self, n: u8) {
        self.handle_event(Event::Command(Command::MoveWindowToWorkspace(n)))
    }

    pub fn move_focused_window_to_display(&mut self, slot: usize) {
        self.handle_event(Event::Command(Command::MoveWindowToDisplay(slot)))
    }

    pub fn focus_direction(&mut self, direction: Direction) {
        self.handle_event(Event::Command(Command::FocusDirection(direction)))
    }

    fn log_event(&self, event: &Event) {
        match event {
            Event::WindowMoved { .. } | Event::WindowResized { .. } | Event::MouseUp | Event::MouseDown => {
                trace!(?event, "Event")
            }
            _ => debug!(?event, "Event"),
        }
    }

    #[instrument(name = "reactor::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        self.log_event(&event);
        let result = match event {
            Event::ApplicationLaunched { pid } => AppEventHandler::handle_app_launched(self, pid),
            Event::ApplicationTerminated { pid } => AppEventHandler::handle_app_terminated(self, pid),
            Event::WindowCreated { pid, window_id } => {
                WindowEventHandler::handle_window_created(self, pid, window_id)
            }
            Event::WindowDestroyed { pid, window_id } => {
                WindowEventHandler::handle_window_destroyed(self, pid, window_id)
            }
            Event::WindowFocused { pid, window_id } => TabEventHandler::handle_window_focused(self, pid, window_id),
            Event::WindowMoved { pid, window_id } | Event::WindowResized { pid, window_id } => {
                WindowEventHandler::handle_window_frame_changed(self, pid, window_id)
            }
            Event::WindowMinimized { pid, window_id } => {
                WindowEventHandler::handle_window_minimized(self, pid, window_id)
            }
            Event::WindowDeminimized { pid, window_id } => {
                WindowEventHandler::handle_window_deminimized(self, pid, window_id)
            }
            Event::FocusedWindowChanged { pid } => TabEventHandler::handle_focused_window_changed(self, pid),
            Event::SpaceChanged => SpaceEventHandler::handle_space_changed(self),
            Event::DisplayChanged => SpaceEventHandler::handle_display_changed(self),
            Event::MouseDown => {
                DragEventHandler::handle_mouse_down(self);
                Ok(())
            }
            Event::MouseUp => DragEventHandler::handle_mouse_up(self),
            Event::Command(command) => CommandEventHandler::handle_command(self, command),
        };
        if let Err(err) = result {
            debug!(%err, "event ignored");
        }
    }

    pub(crate) fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.config.settings.identity_retry_delay_ms)
    }

    /// Queries a window's frame, riding out the short window after creation
    /// during which the platform cannot resolve it yet.
    pub(crate) fn resolve_frame(&self, pid: pid_t, wid: WindowId) -> Option<Frame> {
        let ws = &self.window_system;
        retry(self.config.settings.identity_retry_attempts, self.retry_delay(), || {
            ws.window_frame(pid, wid)
        })
    }

    pub(crate) fn observe(&mut self, pid: pid_t) {
        if self.observed_apps.insert(pid) {
            self.window_system.observe_app(pid);
        }
    }

    /// The leader plus every other member of its tab group.
    pub(crate) fn group_members(&self, wid: WindowId) -> Vec<WindowId> {
        match self.tabs.group_of(wid) {
            Some(group) => group.members().to_vec(),
            None => vec![wid],
        }
    }

    /// The active workspace of `display`, assigning one if the display has
    /// none yet.
    pub(crate) fn workspace_on(&mut self, display: DisplayId) -> Result<WorkspaceId, ReactorError> {
        if let Some(ws) = self.workspaces.active_workspace(display) {
            return Ok(ws);
        }
        let ws = self.workspaces.first_unshown_workspace();
        self.workspaces.set_active_workspace(display, ws)?;
        Ok(ws)
    }

    /// Display used by commands: that of the focused window, else the last
    /// focused display, else the primary.
    pub(crate) fn command_display(&self) -> Option<DisplayId> {
        self.focused_window
            .and_then(|w| self.windows.get(w))
            .map(|w| w.display)
            .or(self.focused_display)
            .filter(|d| self.displays.contains(*d))
            .or_else(|| self.displays.primary().map(|d| d.id))
    }

    pub(crate) fn focused_leader(&self) -> Option<WindowId> {
        let wid = self.focused_window.filter(|w| self.windows.contains(*w))?;
        Some(self.tabs.resolve_leader(wid))
    }

    pub(crate) fn note_focus(&mut self, wid: WindowId) {
        let Some(window) = self.windows.get(wid) else {
            return;
        };
        let (workspace, display) = (window.workspace, window.display);
        self.focused_window = Some(wid);
        self.focused_display = Some(display);
        let leader = self.tabs.resolve_leader(wid);
        if self.workspaces.workspace_for_window(leader) == Some(workspace) {
            self.workspaces.set_last_focused_window(workspace, Some(leader));
        }
    }

    /// Focuses the visible member of `wid`'s tab group.
    pub(crate) fn raise_window(&mut self, wid: WindowId) -> bool {
        let target = self.tabs.resolve_active(wid);
        let Some(pid) = self.windows.get(target).map(|w| w.pid) else {
            return false;
        };
        let focused = self.window_system.focus_window(pid, target);
        self.note_focus(target);
        focused
    }

    pub(crate) fn tiling_area(&self, display: DisplayId) -> Option<Frame> {
        let d = self.displays.get(display)?;
        Some(compute_tiling_area(d.visible_frame, &self.config.settings.gaps))
    }

    /// Flattens the (workspace, display) tree and applies the frames. Does
    /// nothing while the workspace is hidden on that display.
    pub(crate) fn retile_workspace(&mut self, workspace: WorkspaceId, display_id: DisplayId) {
        if !self.workspaces.is_visible(workspace, display_id) {
            return;
        }
        let (Some(visible), Some(bounding)) =
            (self.displays.get(display_id).map(|d| d.visible_frame), self.tiling_area(display_id))
        else {
            return;
        };
        let frames = self.layouts.calculate(workspace, display_id, bounding, self.config.settings.gaps.inner);
        trace!(?workspace, ?display_id, count = frames.len(), "retile");
        for (wid, frame) in frames {
            let Some(fullscreen) = self.windows.get(wid).map(|w| w.is_fullscreen) else {
                warn!(?wid, "layout references unknown window");
                continue;
            };
            let target = if fullscreen { visible } else { frame.round() };
            for member in self.group_members(wid) {
                self.apply_frame(member, target);
            }
            self.tabs.set_canonical_frame(wid, target);
        }
    }

    pub(crate) fn retile_display(&mut self, display: DisplayId) {
        if let Some(ws) = self.workspaces.active_workspace(display) {
            self.retile_workspace(ws, display);
        }
    }

    pub(crate) fn retile_all(&mut self) {
        let displays: Vec<_> = self.displays.displays().iter().map(|d| d.id).collect();
        for display in displays {
            self.retile_display(display);
        }
    }

    fn apply_frame(&mut self, wid: WindowId, frame: Frame) {
        let Some(window) = self.windows.get_mut(wid) else {
            return;
        };
        window.frame = frame;
        let pid = window.pid;
        self.parked.unpark(wid);
        if !self.window_system.set_window_frame(pid, wid, frame) {
            debug!(?wid, ?frame, "window system rejected frame");
        }
    }

    /// Moves a window to the hidden corner of its display. Its stored frame
    /// is left alone so it can be restored at the same size.
    pub(crate) fn park_window(&mut self, wid: WindowId) {
        let Some(window) = self.windows.get(wid) else {
            return;
        };
        if self.parked.contains(wid) {
            return;
        }
        let (pid, display, frame) = (window.pid, window.display, window.frame);
        let Some(hidden) = self.displays.hidden_position(
            display,
            frame.width,
            frame.height,
            self.config.settings.hide_peek_margin,
        ) else {
            return;
        };
        self.parked.park(wid, ParkedWindow {
            pid,
            display,
            width: frame.width,
            height: frame.height,
        });
        self.window_system.set_window_frame(pid, wid, hidden);
        trace!(?wid, ?hidden, "parked");
    }

    /// Brings a parked window back. Tiled windows get their frame from the
    /// next retile; floating ones return to their stored frame.
    pub(crate) fn reveal_window(&mut self, wid: WindowId) {
        if self.parked.unpark(wid).is_none() {
            return;
        }
        if let Some(window) = self.windows.get(wid) {
            if !window.is_tiled() {
                self.window_system.set_window_frame(window.pid, wid, window.frame);
            }
        }
    }

    pub(crate) fn windows_on(&self, workspace: WorkspaceId, display: DisplayId) -> Vec<WindowId> {
        self.windows.windows_on(workspace, display)
    }

    pub(crate) fn hide_workspace(&mut self, workspace: WorkspaceId, display: DisplayId) {
        for wid in self.windows_on(workspace, display) {
            self.park_window(wid);
        }
    }

    pub(crate) fn show_workspace(&mut self, workspace: WorkspaceId, display: DisplayId) {
        for wid in self.windows_on(workspace, display) {
            self.reveal_window(wid);
        }
        self.retile_workspace(workspace, display);
    }

    /// Re-derives which windows should be parked from the workspace model,
    /// then retiles everything visible.
    pub(crate) fn refresh_visibility(&mut self) {
        for wid in self.windows.ids() {
            let Some(window) = self.windows.get(wid) else {
                continue;
            };
            if self.workspaces.is_visible(window.workspace, window.display) {
                self.reveal_window(wid);
            } else {
                self.parked.unpark(wid);
                self.park_window(wid);
            }
        }
        self.retile_all();
    }

    /// Registers a new standalone window on the display its frame belongs
    /// to, honouring app rules.
    pub(crate) fn admit_window(&mut self, pid: pid_t, wid: WindowId, frame: Frame) -> Result<(), ReactorError> {
        let display_id = self.displays.display_for_frame(&frame).ok_or(ReactorError::NoDisplays)?;
        let mut workspace = self.workspace_on(display_id)?;
        let mut mode = WindowMode::Tiled;
        let rule = self
            .window_system
            .app_bundle_id(pid)
            .and_then(|app_id| self.config.rule_for(&app_id).cloned());
        if let Some(rule) = rule {
            if let Some(n) = rule.workspace {
                workspace = self.workspaces.validate(n)?;
            }
            if rule.floating {
                mode = WindowMode::Floating;
            }
            debug!(?wid, app_id = %rule.app_id, ?workspace, ?mode, "app rule applied");
        }

        let mut window = Window::new(wid, pid, frame, workspace, display_id);
        window.mode = mode;
        self.windows.insert(window);
        self.workspaces.assign_window_to_workspace(wid, workspace)?;
        if mode == WindowMode::Tiled {
            self.layouts.insert_window(workspace, display_id, wid);
        }
        self.observe(pid);
        debug!(?wid, pid, ?workspace, ?display_id, "window admitted");

        if self.workspaces.is_visible(workspace, display_id) {
            self.retile_workspace(workspace, display_id);
        } else {
            self.park_window(wid);
        }
        Ok(())
    }

    /// Takes `wid` out of its tab group, workspace and layout tree. A group
    /// leader hands its leaf and membership slot to the next leader.
    /// Returns the (workspace, display) that needs a retile.
    pub(crate) fn release_slot(&mut self, wid: WindowId) -> Option<(WorkspaceId, DisplayId)> {
        let window = self.windows.get(wid)?;
        let key = (window.workspace, window.display);

        if let Some(group) = self.tabs.group_of(wid) {
            let was_leader = group.leader == wid;
            let others: Vec<_> = group.members().iter().copied().filter(|&m| m != wid).collect();
            let survivor = self.tabs.remove_member(wid);
            let heir = survivor.or_else(|| others.first().map(|&m| self.tabs.resolve_leader(m)));
            if let (true, Some(heir)) = (was_leader, heir) {
                self.layouts.replace_window(wid, heir);
                if self.workspaces.replace_window(wid, heir).is_err() {
                    trace!(?wid, "released leader had no workspace slot");
                }
                debug!(?wid, ?heir, "tab group slot handed over");
            }
        }

        self.workspaces.remove_window(wid);
        self.layouts.remove_anywhere(wid);
        Some(key)
    }

    /// Drops every trace of `wid`.
    pub(crate) fn forget_window(&mut self, wid: WindowId) -> Option<Window> {
        let affected = self.release_slot(wid);
        let window = self.windows.remove(wid)?;
        self.parked.unpark(wid);
        self.drag_manager.forget(wid);
        if self.focused_window == Some(wid) {
            self.focused_window = None;
        }
        if let Some((ws, display)) = affected {
            self.retile_workspace(ws, display);
        }
        debug!(?wid, pid = window.pid, "window forgotten");
        Some(window)
    }

    /// Records a new (workspace, display) for `wid` and its tab group
    /// without touching any layout tree.
    pub(crate) fn assign_location(
        &mut self,
        wid: WindowId,
        workspace: WorkspaceId,
        display: DisplayId,
    ) -> Result<(), ReactorError> {
        self.workspaces.assign_window_to_workspace(wid, workspace)?;
        for member in self.group_members(wid) {
            if let Some(w) = self.windows.get_mut(member) {
                w.workspace = workspace;
                w.display = display;
            }
        }
        Ok(())
    }

    /// Moves `wid` and its tab group to another (workspace, display) pair.
    pub(crate) fn relocate(
        &mut self,
        wid: WindowId,
        workspace: WorkspaceId,
        display_id: DisplayId,
    ) -> Result<(), ReactorError> {
        let window = self.windows.get(wid).ok_or(ReactorError::UnknownWindow(wid))?;
        let old = (window.workspace, window.display);
        if old == (workspace, display_id) {
            return Ok(());
        }
        let tiled = window.is_tiled();
        self.workspaces.validate(workspace.get())?;

        self.layouts.remove_anywhere(wid);
        self.assign_location(wid, workspace, display_id)?;
        let members = self.group_members(wid);
        if tiled {
            self.layouts.insert_window(workspace, display_id, wid);
        }
        debug!(?wid, from = ?old, to = ?(workspace, display_id), "window relocated");

        if self.workspaces.is_visible(workspace, display_id) {
            for &member in &members {
                self.reveal_window(member);
            }
            self.retile_workspace(workspace, display_id);
        } else {
            for &member in &members {
                self.parked.unpark(member);
                self.park_window(member);
            }
        }
        self.retile_workspace(old.0, old.1);
        Ok(())
    }

    pub fn windows(&self) -> Vec<WindowData> {
        self.windows
            .ids()
            .into_iter()
            .filter_map(|wid| {
                let w = self.windows.get(wid)?;
                Some(WindowData {
                    id: wid,
                    pid: w.pid,
                    frame: w.frame,
                    mode: w.mode,
                    is_fullscreen: w.is_fullscreen,
                    is_focused: self.focused_window == Some(wid),
                    workspace: w.workspace,
                    display: w.display,
                    tab_group: self.tabs.group_id_of(wid),
                    is_suppressed: self.tabs.is_suppressed(wid),
                    is_parked: self.parked.contains(wid),
                })
            })
            .collect()
    }

    pub fn workspaces(&self) -> Vec<WorkspaceData> {
        self.workspaces
            .iter()
            .map(|ws| WorkspaceData {
                id: ws.id,
                name: ws.name.clone(),
                windows: ws.windows().collect(),
                last_focused: ws.last_focused(),
                active_on: self.workspaces.displays_showing(ws.id),
            })
            .collect()
    }

    pub fn displays(&self) -> Vec<DisplayData> {
        self.displays
            .displays()
            .iter()
            .map(|d| DisplayData {
                id: d.id,
                visible_frame: d.visible_frame,
                full_frame: d.full_frame,
                is_primary: d.is_primary,
                active_workspace: self.workspaces.active_workspace(d.id),
            })
            .collect()
    }

    pub fn observed_apps(&self) -> Vec<ApplicationData> {
        self.observed_apps
            .iter()
            .map(|&pid| ApplicationData {
                pid,
                bundle_id: self.window_system.app_bundle_id(pid),
                window_count: self.windows.windows_for_pid(pid).len(),
            })
            .collect()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let mut tab_groups: Vec<_> = self
            .tabs
            .groups()
            .map(|g| TabGroupData {
                id: g.id,
                pid: g.pid,
                leader: g.leader,
                active: g.active,
                members: g.members().to_vec(),
            })
            .collect();
        tab_groups.sort_by_key(|g| g.id);
        let layouts = self
            .layouts
            .keys()
            .into_iter()
            .filter_map(|(workspace, display)| {
                let tree = self.layouts.tree(workspace, display)?;
                Some(LayoutData {
                    workspace,
                    display,
                    windows: tree.windows(),
                    tree: tree.draw_tree(),
                })
            })
            .collect();
        StateSnapshot {
            focused_window: self.focused_window,
            focused_display: self.focused_display,
            windows: self.windows(),
            workspaces: self.workspaces(),
            displays: self.displays(),
            applications: self.observed_apps(),
            tab_groups,
            layouts,
            dropped_events: self.dropped_events,
        }
    }
}
