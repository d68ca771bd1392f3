//! A deterministic, in-memory window system.
//!
//! Holds a small model of windows, processes and displays, and records every
//! frame the reactor applies. Used by the test suite and by the replay tool.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::common::collections::{BTreeMap, BTreeSet, HashMap};
use crate::model::display::Display;
use crate::model::window::{WindowId, pid_t};
use crate::sys::geometry::Frame;
use crate::sys::window_system::{DiscoveredWindow, WindowSystem};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FakeWindow {
    pub pid: pid_t,
    pub frame: Frame,
    #[serde(default = "yes")]
    pub on_screen: bool,
    #[serde(default = "yes")]
    pub manageable: bool,
}

fn yes() -> bool { true }

#[derive(Debug, Default)]
struct State {
    windows: BTreeMap<WindowId, FakeWindow>,
    displays: Vec<Display>,
    focused: HashMap<pid_t, WindowId>,
    bundle_ids: HashMap<pid_t, String>,
    observed: BTreeSet<pid_t>,
    /// Number of upcoming `window_frame` calls that report the window as
    /// unresolvable.
    unresolved: HashMap<WindowId, u32>,
    applied: Vec<(WindowId, Frame)>,
    focus_requests: Vec<WindowId>,
}

#[derive(Debug, Default)]
pub struct HeadlessWindowSystem {
    state: Mutex<State>,
}

impl HeadlessWindowSystem {
    pub fn new(displays: Vec<Display>) -> Self {
        let system = Self::default();
        system.set_displays(displays);
        system
    }

    pub fn set_displays(&self, displays: Vec<Display>) { self.state.lock().displays = displays; }

    pub fn add_window(&self, pid: pid_t, id: WindowId, frame: Frame) {
        self.insert_window(id, FakeWindow {
            pid,
            frame,
            on_screen: true,
            manageable: true,
        });
    }

    pub fn insert_window(&self, id: WindowId, window: FakeWindow) {
        self.state.lock().windows.insert(id, window);
    }

    pub fn remove_window(&self, id: WindowId) -> Option<FakeWindow> {
        let mut state = self.state.lock();
        state.focused.retain(|_, w| *w != id);
        state.windows.remove(&id)
    }

    pub fn remove_app(&self, pid: pid_t) {
        let mut state = self.state.lock();
        state.windows.retain(|_, w| w.pid != pid);
        state.focused.remove(&pid);
    }

    /// Moves a window as the user would, without recording it as applied.
    pub fn move_window(&self, id: WindowId, frame: Frame) {
        if let Some(w) = self.state.lock().windows.get_mut(&id) {
            w.frame = frame;
        }
    }

    pub fn set_on_screen(&self, id: WindowId, on_screen: bool) {
        if let Some(w) = self.state.lock().windows.get_mut(&id) {
            w.on_screen = on_screen;
        }
    }

    pub fn set_manageable(&self, id: WindowId, manageable: bool) {
        if let Some(w) = self.state.lock().windows.get_mut(&id) {
            w.manageable = manageable;
        }
    }

    pub fn set_focused(&self, pid: pid_t, id: WindowId) { self.state.lock().focused.insert(pid, id); }

    pub fn set_bundle_id(&self, pid: pid_t, bundle_id: impl Into<String>) {
        self.state.lock().bundle_ids.insert(pid, bundle_id.into());
    }

    pub fn set_unresolved(&self, id: WindowId, misses: u32) {
        self.state.lock().unresolved.insert(id, misses);
    }

    pub fn frame(&self, id: WindowId) -> Option<Frame> { self.state.lock().windows.get(&id).map(|w| w.frame) }

    /// Frames applied through `set_window_frame`, oldest first.
    pub fn applied_frames(&self) -> Vec<(WindowId, Frame)> { self.state.lock().applied.clone() }

    pub fn clear_applied(&self) { self.state.lock().applied.clear(); }

    pub fn focus_requests(&self) -> Vec<WindowId> { self.state.lock().focus_requests.clone() }

    pub fn observed_apps(&self) -> Vec<pid_t> { self.state.lock().observed.iter().copied().collect() }
}

impl WindowSystem for HeadlessWindowSystem {
    fn discover_windows(&self) -> Vec<DiscoveredWindow> {
        let state = self.state.lock();
        state
            .windows
            .iter()
            .filter(|(_, w)| w.on_screen && w.manageable)
            .map(|(&id, w)| DiscoveredWindow { id, pid: w.pid, frame: w.frame })
            .collect()
    }

    fn set_window_frame(&self, pid: pid_t, id: WindowId, frame: Frame) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        match state.windows.get_mut(&id) {
            Some(w) if w.pid == pid => {
                w.frame = frame;
                state.applied.push((id, frame));
                trace!(?id, ?frame, "frame applied");
                true
            }
            _ => false,
        }
    }

    fn focus_window(&self, pid: pid_t, id: WindowId) -> bool {
        let mut state = self.state.lock();
        if !state.windows.get(&id).is_some_and(|w| w.pid == pid) {
            return false;
        }
        state.focused.insert(pid, id);
        state.focus_requests.push(id);
        true
    }

    fn get_focused_window(&self, pid: pid_t) -> Option<WindowId> { self.state.lock().focused.get(&pid).copied() }

    fn should_manage_window(&self, pid: pid_t, id: WindowId) -> bool {
        self.state.lock().windows.get(&id).is_some_and(|w| w.pid == pid && w.manageable)
    }

    fn is_window_on_screen(&self, id: WindowId) -> bool {
        self.state.lock().windows.get(&id).is_some_and(|w| w.on_screen)
    }

    fn get_all_window_ids(&self, pid: pid_t) -> Vec<WindowId> {
        let state = self.state.lock();
        state.windows.iter().filter(|(_, w)| w.pid == pid).map(|(&id, _)| id).collect()
    }

    fn observe_app(&self, pid: pid_t) -> bool { self.state.lock().observed.insert(pid) }

    fn unobserve_app(&self, pid: pid_t) { self.state.lock().observed.remove(&pid); }

    fn get_display_topology(&self) -> Vec<Display> { self.state.lock().displays.clone() }

    fn window_frame(&self, pid: pid_t, id: WindowId) -> Option<Frame> {
        let mut state = self.state.lock();
        if let Some(misses) = state.unresolved.get_mut(&id) {
            if *misses > 0 {
                *misses -= 1;
                return None;
            }
        }
        state.windows.get(&id).filter(|w| w.pid == pid).map(|w| w.frame)
    }

    fn app_bundle_id(&self, pid: pid_t) -> Option<String> { self.state.lock().bundle_ids.get(&pid).cloned() }
}
