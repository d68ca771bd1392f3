use tracing::{trace, warn};

use super::binary_tree::{self, LayoutNode};
use super::Orientation;
use crate::common::collections::HashMap;
use crate::model::display::DisplayId;
use crate::model::virtual_workspace::WorkspaceId;
use crate::model::window::WindowId;
use crate::sys::geometry::{Frame, Point};

pub type LayoutKey = (WorkspaceId, DisplayId);

/// One independent BSP tree per (workspace, display) pair. Most pairs never
/// hold a window and have no entry at all.
#[derive(Debug, Default)]
pub struct WorkspaceLayouts {
    map: HashMap<LayoutKey, Box<LayoutNode>>,
    default_orientation: Orientation,
}

impl WorkspaceLayouts {
    pub fn new(default_orientation: Orientation) -> Self {
        Self {
            map: HashMap::default(),
            default_orientation,
        }
    }

    pub fn default_orientation(&self) -> Orientation { self.default_orientation }

    pub fn toggle_default_orientation(&mut self) {
        self.default_orientation = self.default_orientation.toggle();
    }

    pub fn tree(&self, workspace: WorkspaceId, display: DisplayId) -> Option<&LayoutNode> {
        self.map.get(&(workspace, display)).map(|b| &**b)
    }

    /// The pair whose tree holds `window`, if any.
    pub fn locate(&self, window: WindowId) -> Option<LayoutKey> {
        self.map.iter().find(|(_, tree)| tree.contains(window)).map(|(k, _)| *k)
    }

    pub fn contains(&self, workspace: WorkspaceId, display: DisplayId, window: WindowId) -> bool {
        self.tree(workspace, display).is_some_and(|t| t.contains(window))
    }

    /// Refuses windows that already occupy a leaf anywhere, so a window is
    /// never in two trees at once.
    pub fn insert_window(&mut self, workspace: WorkspaceId, display: DisplayId, window: WindowId) -> bool {
        if let Some(existing) = self.locate(window) {
            if existing != (workspace, display) {
                warn!(?window, ?existing, "window already tiled elsewhere");
            }
            return false;
        }
        let key = (workspace, display);
        let tree = self.map.remove(&key);
        self.map.insert(key, binary_tree::insert(tree, window, self.default_orientation));
        trace!(?window, ?key, "inserted into layout");
        true
    }

    pub fn remove_window(&mut self, workspace: WorkspaceId, display: DisplayId, window: WindowId) -> bool {
        let key = (workspace, display);
        let Some(tree) = self.map.remove(&key) else {
            return false;
        };
        let found = tree.contains(window);
        if let Some(rest) = binary_tree::remove(tree, window) {
            self.map.insert(key, rest);
        }
        found
    }

    /// Removes `window` from whichever tree holds it.
    pub fn remove_anywhere(&mut self, window: WindowId) -> Option<LayoutKey> {
        let (ws, display) = self.locate(window)?;
        self.remove_window(ws, display, window);
        Some((ws, display))
    }

    pub fn swap(&mut self, workspace: WorkspaceId, display: DisplayId, a: WindowId, b: WindowId) -> bool {
        self.map.get_mut(&(workspace, display)).is_some_and(|t| binary_tree::swap(t, a, b))
    }

    /// Exchanges two windows that live in different trees.
    pub fn swap_across(&mut self, a: WindowId, b: WindowId) -> bool {
        let (Some(ka), Some(kb)) = (self.locate(a), self.locate(b)) else {
            return false;
        };
        if ka == kb {
            return self.swap(ka.0, ka.1, a, b);
        }
        let replaced_a = self.map.get_mut(&ka).is_some_and(|t| t.replace(a, b));
        let replaced_b = self.map.get_mut(&kb).is_some_and(|t| t.replace(b, a));
        replaced_a && replaced_b
    }

    /// Hands `old`'s leaf to `new` wherever it is.
    pub fn replace_window(&mut self, old: WindowId, new: WindowId) -> bool {
        self.map.values_mut().any(|t| t.replace(old, new))
    }

    /// Flips the split above `window`, or the default orientation when the
    /// window is alone in its tree.
    pub fn toggle_split(&mut self, workspace: WorkspaceId, display: DisplayId, window: WindowId) -> bool {
        let Some(tree) = self.map.get_mut(&(workspace, display)).filter(|t| t.contains(window)) else {
            return false;
        };
        if !tree.toggle_orientation_of_parent(window) {
            self.default_orientation = self.default_orientation.toggle();
        }
        true
    }

    pub fn calculate(
        &self,
        workspace: WorkspaceId,
        display: DisplayId,
        bounding: Frame,
        inner_gap: f64,
    ) -> Vec<(WindowId, Frame)> {
        self.tree(workspace, display)
            .map(|t| binary_tree::apply(t, bounding, inner_gap))
            .unwrap_or_default()
    }

    pub fn leaf_at(
        &self,
        workspace: WorkspaceId,
        display: DisplayId,
        bounding: Frame,
        inner_gap: f64,
        point: Point,
        exclude: impl Fn(WindowId) -> bool,
    ) -> Option<WindowId> {
        self.tree(workspace, display)?.leaf_at(bounding, inner_gap, point, exclude)
    }

    /// Drops every tree bound to `display`, returning their windows.
    pub fn take_display(&mut self, display: DisplayId) -> Vec<(WorkspaceId, Vec<WindowId>)> {
        let keys: Vec<_> = self.map.keys().filter(|(_, d)| *d == display).copied().collect();
        let mut out: Vec<_> = keys
            .into_iter()
            .filter_map(|key| self.map.remove(&key).map(|t| (key.0, t.windows())))
            .collect();
        out.sort_by_key(|(ws, _)| *ws);
        out
    }

    pub fn keys(&self) -> Vec<LayoutKey> {
        let mut keys: Vec<_> = self.map.keys().copied().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    fn w(id: u32) -> WindowId { WindowId::new(id) }

    const WS1: WorkspaceId = WorkspaceId::new(1);
    const WS2: WorkspaceId = WorkspaceId::new(2);
    const D1: DisplayId = DisplayId::new(1);
    const D2: DisplayId = DisplayId::new(2);

    #[test]
    fn trees_are_independent_per_pair() {
        let mut layouts = WorkspaceLayouts::default();
        assert!(layouts.insert_window(WS1, D1, w(1)));
        assert!(layouts.insert_window(WS1, D2, w(2)));
        assert!(layouts.insert_window(WS2, D1, w(3)));
        assert_eq!(layouts.locate(w(2)), Some((WS1, D2)));
        assert_eq!(layouts.keys(), vec![(WS1, D1), (WS1, D2), (WS2, D1)]);
    }

    #[test]
    fn window_cannot_be_tiled_twice() {
        let mut layouts = WorkspaceLayouts::default();
        assert!(layouts.insert_window(WS1, D1, w(1)));
        assert!(!layouts.insert_window(WS2, D1, w(1)));
        assert!(!layouts.insert_window(WS1, D1, w(1)));
        assert_eq!(layouts.tree(WS1, D1).unwrap().leaf_count(), 1);
    }

    #[test]
    fn removing_last_window_drops_the_tree() {
        let mut layouts = WorkspaceLayouts::default();
        layouts.insert_window(WS1, D1, w(1));
        assert!(layouts.remove_window(WS1, D1, w(1)));
        assert!(layouts.tree(WS1, D1).is_none());
        assert!(!layouts.remove_window(WS1, D1, w(1)));
        assert_eq!(layouts.remove_anywhere(w(1)), None);
    }

    #[test]
    fn swap_across_trees_exchanges_slots() {
        let mut layouts = WorkspaceLayouts::default();
        layouts.insert_window(WS1, D1, w(1));
        layouts.insert_window(WS1, D1, w(2));
        layouts.insert_window(WS1, D2, w(3));
        assert!(layouts.swap_across(w(1), w(3)));
        assert_eq!(layouts.tree(WS1, D1).unwrap().windows(), vec![w(3), w(2)]);
        assert_eq!(layouts.tree(WS1, D2).unwrap().windows(), vec![w(1)]);
    }

    #[test]
    fn toggle_split_on_lone_window_flips_default() {
        let mut layouts = WorkspaceLayouts::new(Orientation::Horizontal);
        layouts.insert_window(WS1, D1, w(1));
        assert!(layouts.toggle_split(WS1, D1, w(1)));
        assert_eq!(layouts.default_orientation(), Orientation::Vertical);
        layouts.insert_window(WS1, D1, w(2));
        let frames = layouts.calculate(WS1, D1, Frame::new(0.0, 0.0, 100.0, 100.0), 0.0);
        assert_eq!(frames[1], (w(2), Frame::new(0.0, 50.0, 100.0, 50.0)));
    }

    #[test]
    fn take_display_returns_windows_by_workspace() {
        let mut layouts = WorkspaceLayouts::default();
        layouts.insert_window(WS2, D2, w(5));
        layouts.insert_window(WS1, D2, w(3));
        layouts.insert_window(WS1, D2, w(4));
        layouts.insert_window(WS1, D1, w(1));
        let taken = layouts.take_display(D2);
        assert_eq!(taken, vec![(WS1, vec![w(3), w(4)]), (WS2, vec![w(5)])]);
        assert_eq!(layouts.keys(), vec![(WS1, D1)]);
    }
}
