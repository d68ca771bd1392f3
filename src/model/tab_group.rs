//! Native tab groups.
//!
//! Some applications implement tabs as separate native windows that occupy
//! the same rectangle and are mutually exclusive on screen. The platform
//! exposes no tab-group identifier, so membership is inferred from matching
//! frames. A group occupies a single layout slot held by its leader; only
//! the active member is visible and every other member is suppressed.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::common::collections::HashMap;
use crate::model::window::{WindowId, pid_t};
use crate::sys::geometry::{Frame, SameAs};

pub const DEFAULT_FRAME_TOLERANCE: f64 = 2.0;

/// True when every component of the two frames differs by at most
/// [`DEFAULT_FRAME_TOLERANCE`].
pub fn frames_match(a: &Frame, b: &Frame) -> bool { a.same_as_within(b, DEFAULT_FRAME_TOLERANCE) }

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabGroupId(u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabGroup {
    pub id: TabGroupId,
    pub pid: pid_t,
    pub leader: WindowId,
    pub active: WindowId,
    members: Vec<WindowId>,
    pub canonical_frame: Frame,
}

impl TabGroup {
    pub fn members(&self) -> &[WindowId] { &self.members }

    pub fn len(&self) -> usize { self.members.len() }

    pub fn is_empty(&self) -> bool { self.members.is_empty() }

    pub fn contains(&self, wid: WindowId) -> bool { self.members.contains(&wid) }

    pub fn suppressed(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.members.iter().copied().filter(move |&w| w != self.active)
    }
}

#[derive(Debug)]
pub struct TabGroupManager {
    groups: HashMap<TabGroupId, TabGroup>,
    member_to_group: HashMap<WindowId, TabGroupId>,
    next_id: u32,
    tolerance: f64,
}

impl Default for TabGroupManager {
    fn default() -> Self { Self::new(DEFAULT_FRAME_TOLERANCE) }
}

impl TabGroupManager {
    pub fn new(tolerance: f64) -> Self {
        Self {
            groups: HashMap::default(),
            member_to_group: HashMap::default(),
            next_id: 1,
            tolerance,
        }
    }

    pub fn frames_match(&self, a: &Frame, b: &Frame) -> bool { a.same_as_within(b, self.tolerance) }

    /// Starts a group whose only member is both leader and active. Callers
    /// add the second member straight away; a group left with a single
    /// member dissolves on the next removal.
    pub fn create_group(&mut self, pid: pid_t, window_id: WindowId, frame: Frame) -> TabGroupId {
        if let Some(existing) = self.member_to_group.get(&window_id) {
            return *existing;
        }
        let id = TabGroupId(self.next_id);
        self.next_id += 1;
        self.groups.insert(id, TabGroup {
            id,
            pid,
            leader: window_id,
            active: window_id,
            members: vec![window_id],
            canonical_frame: frame,
        });
        self.member_to_group.insert(window_id, id);
        debug!(?id, pid, leader = ?window_id, "tab group created");
        id
    }

    /// Idempotent. Leader and active member are left alone.
    pub fn add_member(&mut self, group: TabGroupId, window_id: WindowId) -> bool {
        let Some(g) = self.groups.get_mut(&group) else {
            return false;
        };
        match self.member_to_group.get(&window_id) {
            Some(existing) if *existing == group => return true,
            Some(_) => return false,
            None => {}
        }
        g.members.push(window_id);
        self.member_to_group.insert(window_id, group);
        trace!(?group, ?window_id, members = g.members.len(), "tab group member added");
        true
    }

    /// Removes `window_id` from its group. A removed leader or active member
    /// is replaced by the first remaining member. When fewer than two
    /// members remain the group dissolves and the survivor, if any, is
    /// returned so the caller can re-admit it as a standalone window.
    pub fn remove_member(&mut self, window_id: WindowId) -> Option<WindowId> {
        let group_id = self.member_to_group.remove(&window_id)?;
        let g = self.groups.get_mut(&group_id)?;
        g.members.retain(|&w| w != window_id);
        if let Some(&first) = g.members.first() {
            if g.leader == window_id {
                g.leader = first;
            }
            if g.active == window_id {
                g.active = first;
            }
        }
        if g.members.len() >= 2 {
            trace!(?group_id, ?window_id, "tab group member removed");
            return None;
        }
        let survivor = g.members.first().copied();
        self.groups.remove(&group_id);
        if let Some(s) = survivor {
            self.member_to_group.remove(&s);
        }
        debug!(?group_id, ?survivor, "tab group dissolved");
        survivor
    }

    /// Drops every group owned by `pid`, returning all of their members.
    pub fn remove_pid(&mut self, pid: pid_t) -> Vec<WindowId> {
        let ids: Vec<_> = self.groups.values().filter(|g| g.pid == pid).map(|g| g.id).collect();
        let mut out = Vec::new();
        for id in ids {
            if let Some(g) = self.groups.remove(&id) {
                for m in &g.members {
                    self.member_to_group.remove(m);
                }
                out.extend(g.members);
            }
        }
        out
    }

    pub fn group(&self, id: TabGroupId) -> Option<&TabGroup> { self.groups.get(&id) }

    pub fn group_of(&self, window_id: WindowId) -> Option<&TabGroup> {
        self.groups.get(self.member_to_group.get(&window_id)?)
    }

    pub fn group_id_of(&self, window_id: WindowId) -> Option<TabGroupId> {
        self.member_to_group.get(&window_id).copied()
    }

    pub fn groups(&self) -> impl Iterator<Item = &TabGroup> + '_ { self.groups.values() }

    pub fn resolve_leader(&self, window_id: WindowId) -> WindowId {
        self.group_of(window_id).map_or(window_id, |g| g.leader)
    }

    pub fn resolve_active(&self, window_id: WindowId) -> WindowId {
        self.group_of(window_id).map_or(window_id, |g| g.active)
    }

    pub fn is_suppressed(&self, window_id: WindowId) -> bool {
        self.group_of(window_id).is_some_and(|g| g.active != window_id)
    }

    /// Makes `window_id` the visible member of its group, returning the
    /// member it replaces.
    pub fn set_active(&mut self, window_id: WindowId) -> Option<WindowId> {
        let group_id = self.member_to_group.get(&window_id)?;
        let g = self.groups.get_mut(group_id)?;
        if g.active == window_id {
            return None;
        }
        Some(std::mem::replace(&mut g.active, window_id))
    }

    pub fn set_canonical_frame(&mut self, window_id: WindowId, frame: Frame) {
        if let Some(g) = self.member_to_group.get(&window_id).and_then(|id| self.groups.get_mut(id)) {
            g.canonical_frame = frame;
        }
    }
}
