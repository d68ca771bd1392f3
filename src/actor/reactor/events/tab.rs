//! Folding native tabs into one layout slot.
//!
//! The platform reports every tab of a tabbed window as its own window with
//! its own id, and gives no hint that they belong together. Two windows of
//! the same process whose frames agree within the configured tolerance are
//! treated as tabs of one window: the leader holds the tree leaf and the
//! workspace slot, the rest follow it around.

use tracing::{debug, trace};

use crate::actor::reactor::{Reactor, ReactorError};
use crate::model::tab_group::TabGroupId;
use crate::model::window::{Window, WindowId, pid_t};
use crate::sys::geometry::Frame;
use crate::sys::window_system::{WindowSystem, retry};

pub struct TabEventHandler;

impl TabEventHandler {
    pub fn handle_window_focused<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        pid: pid_t,
        wid: WindowId,
    ) -> Result<(), ReactorError> {
        if !reactor.windows.contains(wid) {
            return Err(ReactorError::UnknownWindow(wid));
        }
        trace!(?wid, pid, "window focused");
        Self::activate(reactor, wid);
        Ok(())
    }

    /// The process's focus moved. An unknown window id here is usually a tab
    /// switch: the newly shown tab has never been reported before.
    pub fn handle_focused_window_changed<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        pid: pid_t,
    ) -> Result<(), ReactorError> {
        let ws = reactor.window_system.clone();
        let settings = &reactor.config.settings;
        let wid = retry(settings.identity_retry_attempts, reactor.retry_delay(), || {
            ws.get_focused_window(pid)
        })
        .ok_or(ReactorError::IdentityUnresolved(pid))?;

        if reactor.windows.contains(wid) {
            Self::activate(reactor, wid);
            return Ok(());
        }
        if !ws.should_manage_window(pid, wid) {
            return Err(ReactorError::Unmanageable(wid));
        }
        let frame = reactor.resolve_frame(pid, wid).ok_or(ReactorError::IdentityUnresolved(pid))?;

        match Self::find_sibling(reactor, pid, wid, &frame) {
            Some(leader) => {
                Self::absorb(reactor, leader, wid, frame);
                Self::activate(reactor, wid);
                Self::absorb_background_tabs(reactor, pid, leader);
                debug!(?wid, ?leader, "focus moved to a new tab");
            }
            None => {
                reactor.admit_window(pid, wid, frame)?;
                reactor.note_focus(wid);
            }
        }
        Ok(())
    }

    /// Joins `wid` to the group of a same-process window occupying the same
    /// frame. Returns false when there is no such window.
    pub(crate) fn absorb_sibling<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        pid: pid_t,
        wid: WindowId,
        frame: Frame,
    ) -> bool {
        let Some(leader) = Self::find_sibling(reactor, pid, wid, &frame) else {
            return false;
        };
        Self::absorb(reactor, leader, wid, frame);
        if !reactor.window_system.is_window_on_screen(wid) || Self::active_is_visible(reactor, leader) {
            return true;
        }
        Self::activate(reactor, wid);
        true
    }

    /// A suppressed tab that shows up on screen away from its group's frame
    /// was dragged out into a window of its own.
    pub(crate) fn detect_drag_out<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        wid: WindowId,
    ) -> Result<bool, ReactorError> {
        let Some(group) = reactor.tabs.group_of(wid) else {
            return Ok(false);
        };
        let (pid, canonical) = (group.pid, group.canonical_frame);
        if !reactor.window_system.is_window_on_screen(wid) {
            return Ok(false);
        }
        let Some(frame) = reactor.window_system.window_frame(pid, wid) else {
            return Ok(false);
        };
        if reactor.tabs.frames_match(&canonical, &frame) {
            return Ok(false);
        }
        debug!(?wid, ?frame, ?canonical, "tab dragged out of its group");
        reactor.forget_window(wid);
        reactor.admit_window(pid, wid, frame)?;
        Ok(true)
    }

    /// Only windows shown on the display `frame` belongs to are candidates;
    /// parked windows keep a stale frame that says nothing about tabs.
    fn find_sibling<W: WindowSystem>(
        reactor: &Reactor<W>,
        pid: pid_t,
        wid: WindowId,
        frame: &Frame,
    ) -> Option<WindowId> {
        let display_id = reactor.displays.display_for_frame(frame)?;
        reactor
            .windows
            .windows_for_pid(pid)
            .into_iter()
            .filter(|&other| other != wid && !reactor.parked.contains(other))
            .find(|&other| {
                reactor.windows.get(other).is_some_and(|w| {
                    w.display == display_id
                        && reactor.workspaces.is_visible(w.workspace, w.display)
                        && reactor.tabs.frames_match(&w.frame, frame)
                })
            })
            .map(|other| reactor.tabs.resolve_leader(other))
    }

    fn active_is_visible<W: WindowSystem>(reactor: &Reactor<W>, leader: WindowId) -> bool {
        let active = reactor.tabs.resolve_active(leader);
        reactor.window_system.is_window_on_screen(active)
    }

    /// Adds `wid` to `leader`'s group as a suppressed member, creating the
    /// group if needed. Membership and tree state stay with the leader.
    fn absorb<W: WindowSystem>(
        reactor: &mut Reactor<W>,
        leader: WindowId,
        wid: WindowId,
        frame: Frame,
    ) -> Option<TabGroupId> {
        let leader_window = reactor.windows.get(leader)?;
        let (pid, workspace, display, mode, leader_frame) = (
            leader_window.pid,
            leader_window.workspace,
            leader_window.display,
            leader_window.mode,
            leader_window.frame,
        );
        let group = reactor.tabs.create_group(pid, leader, leader_frame);
        reactor.tabs.add_member(group, wid);

        let mut window = Window::new(wid, pid, frame, workspace, display);
        window.mode = mode;
        if !window.is_tiled() {
            window.frame = leader_frame;
        }
        reactor.windows.insert(window);
        reactor.observe(pid);
        debug!(?wid, ?leader, ?group, "tab absorbed");

        if reactor.workspaces.is_visible(workspace, display) {
            reactor.retile_workspace(workspace, display);
        } else {
            reactor.park_window(wid);
        }
        Some(group)
    }

    /// Picks up every other window of `pid` sharing the leader's frame. These
    /// are background tabs that were never reported on their own.
    fn absorb_background_tabs<W: WindowSystem>(reactor: &mut Reactor<W>, pid: pid_t, leader: WindowId) {
        let Some(canonical) = reactor.windows.get(leader).map(|w| w.frame) else {
            return;
        };
        for id in reactor.window_system.get_all_window_ids(pid) {
            if reactor.windows.contains(id) || !reactor.window_system.should_manage_window(pid, id) {
                continue;
            }
            let Some(frame) = reactor.window_system.window_frame(pid, id) else {
                continue;
            };
            if reactor.tabs.frames_match(&canonical, &frame) {
                Self::absorb(reactor, leader, id, frame);
            }
        }
    }

    fn activate<W: WindowSystem>(reactor: &mut Reactor<W>, wid: WindowId) {
        if let Some(previous) = reactor.tabs.set_active(wid) {
            debug!(?previous, ?wid, "tab switched");
        }
        reactor.note_focus(wid);
    }
}
