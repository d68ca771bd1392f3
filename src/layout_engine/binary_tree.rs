//! Binary space partition tree for a single (workspace, display) pair.
//!
//! Every split owns both of its children. Insertion always descends into the
//! right child and alternates the split orientation on the way down, which
//! keeps trees predictable without any rebalancing.

use serde::{Deserialize, Serialize};

use crate::layout_engine::Orientation;
use crate::model::window::WindowId;
use crate::sys::geometry::{Frame, Point};

pub const DEFAULT_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayoutNode {
    Leaf {
        window: WindowId,
    },
    Split {
        orientation: Orientation,
        ratio: f64,
        left: Box<LayoutNode>,
        right: Box<LayoutNode>,
    },
}

/// Adds `window` to `tree`, creating the tree when there is none.
pub fn insert(tree: Option<Box<LayoutNode>>, window: WindowId, orientation: Orientation) -> Box<LayoutNode> {
    match tree {
        None => Box::new(LayoutNode::Leaf { window }),
        Some(mut root) => {
            root.insert_rightmost(window, orientation);
            root
        }
    }
}

/// Removes `window`, returning `None` once the tree is empty.
pub fn remove(tree: Box<LayoutNode>, window: WindowId) -> Option<Box<LayoutNode>> { tree.remove(window) }

pub fn swap(tree: &mut LayoutNode, a: WindowId, b: WindowId) -> bool { tree.swap(a, b) }

pub fn apply(tree: &LayoutNode, bounding: Frame, inner_gap: f64) -> Vec<(WindowId, Frame)> {
    let mut out = Vec::new();
    tree.apply_into(bounding, inner_gap, &mut out);
    out
}

impl LayoutNode {
    pub fn leaf(window: WindowId) -> LayoutNode { LayoutNode::Leaf { window } }

    fn insert_rightmost(&mut self, window: WindowId, orientation: Orientation) {
        match self {
            LayoutNode::Split { right, .. } => right.insert_rightmost(window, orientation.toggle()),
            LayoutNode::Leaf { .. } => {
                let old = std::mem::replace(self, LayoutNode::Leaf { window });
                *self = LayoutNode::Split {
                    orientation,
                    ratio: DEFAULT_RATIO,
                    left: Box::new(old),
                    right: Box::new(LayoutNode::Leaf { window }),
                };
            }
        }
    }

    /// Subtrees that do not hold `window` are moved, never reallocated, so
    /// their boxes survive the removal untouched. Collapsed splits are
    /// dropped here.
    pub fn remove(self: Box<Self>, window: WindowId) -> Option<Box<LayoutNode>> {
        if !self.contains(window) {
            return Some(self);
        }
        match *self {
            LayoutNode::Leaf { .. } => None,
            LayoutNode::Split { orientation, ratio, left, right } => {
                match (left.remove(window), right.remove(window)) {
                    (None, None) => None,
                    (Some(survivor), None) | (None, Some(survivor)) => Some(survivor),
                    (Some(left), Some(right)) => Some(Box::new(LayoutNode::Split {
                        orientation,
                        ratio,
                        left,
                        right,
                    })),
                }
            }
        }
    }

    pub fn contains(&self, window: WindowId) -> bool {
        match self {
            LayoutNode::Leaf { window: w } => *w == window,
            LayoutNode::Split { left, right, .. } => left.contains(window) || right.contains(window),
        }
    }

    /// Leaves in tree order.
    pub fn windows(&self) -> Vec<WindowId> {
        let mut out = Vec::new();
        self.collect_windows(&mut out);
        out
    }

    fn collect_windows(&self, out: &mut Vec<WindowId>) {
        match self {
            LayoutNode::Leaf { window } => out.push(*window),
            LayoutNode::Split { left, right, .. } => {
                left.collect_windows(out);
                right.collect_windows(out);
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            LayoutNode::Leaf { .. } => 1,
            LayoutNode::Split { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Exchanges the ids of two leaves in place. Both must be present.
    pub fn swap(&mut self, a: WindowId, b: WindowId) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) {
            return false;
        }
        self.for_each_leaf_mut(&mut |w| {
            if *w == a {
                *w = b;
            } else if *w == b {
                *w = a;
            }
        });
        true
    }

    /// Renames the leaf holding `old`. Used when a tab group hands its slot
    /// to a new leader and when a swap crosses trees.
    pub fn replace(&mut self, old: WindowId, new: WindowId) -> bool {
        let mut found = false;
        self.for_each_leaf_mut(&mut |w| {
            if *w == old {
                *w = new;
                found = true;
            }
        });
        found
    }

    fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&mut WindowId)) {
        match self {
            LayoutNode::Leaf { window } => f(window),
            LayoutNode::Split { left, right, .. } => {
                left.for_each_leaf_mut(f);
                right.for_each_leaf_mut(f);
            }
        }
    }

    /// Flips the split directly above `window`. Returns false for a lone
    /// leaf, which has no parent split.
    pub fn toggle_orientation_of_parent(&mut self, window: WindowId) -> bool {
        match self {
            LayoutNode::Leaf { .. } => false,
            LayoutNode::Split { orientation, left, right, .. } => {
                let is_child = |n: &LayoutNode| matches!(n, LayoutNode::Leaf { window: w } if *w == window);
                if is_child(left) || is_child(right) {
                    *orientation = orientation.toggle();
                    return true;
                }
                left.toggle_orientation_of_parent(window) || right.toggle_orientation_of_parent(window)
            }
        }
    }

    fn apply_into(&self, rect: Frame, gap: f64, out: &mut Vec<(WindowId, Frame)>) {
        match self {
            LayoutNode::Leaf { window } => out.push((*window, rect)),
            LayoutNode::Split { orientation, ratio, left, right } => {
                let (r1, r2) = split_rect(rect, *orientation, *ratio, gap);
                left.apply_into(r1, gap, out);
                right.apply_into(r2, gap, out);
            }
        }
    }

    /// The leaf whose computed rectangle contains `point`, skipping any
    /// window for which `exclude` returns true.
    pub fn leaf_at(
        &self,
        bounding: Frame,
        gap: f64,
        point: Point,
        exclude: impl Fn(WindowId) -> bool,
    ) -> Option<WindowId> {
        apply(self, bounding, gap)
            .into_iter()
            .find(|(wid, frame)| !exclude(*wid) && frame.contains(point))
            .map(|(wid, _)| wid)
    }

    pub fn draw_tree(&self) -> String {
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &self.ascii_tree()).is_err() {
            out.clear();
        }
        out
    }

    fn ascii_tree(&self) -> ascii_tree::Tree {
        match self {
            LayoutNode::Leaf { window } => ascii_tree::Tree::Leaf(vec![format!("window {window}")]),
            LayoutNode::Split { orientation, ratio, left, right } => ascii_tree::Tree::Node(
                format!("{orientation:?} {ratio:.2}"),
                vec![left.ascii_tree(), right.ascii_tree()],
            ),
        }
    }
}

fn split_rect(rect: Frame, orientation: Orientation, ratio: f64, gap: f64) -> (Frame, Frame) {
    match orientation {
        Orientation::Horizontal => {
            let available = (rect.width - gap).max(0.0);
            let first_w = (available * ratio).max(0.0);
            let second_w = (available - first_w).max(0.0);
            (
                Frame::new(rect.x, rect.y, first_w, rect.height),
                Frame::new(rect.x + first_w + gap, rect.y, second_w, rect.height),
            )
        }
        Orientation::Vertical => {
            let available = (rect.height - gap).max(0.0);
            let first_h = (available * ratio).max(0.0);
            let second_h = (available - first_h).max(0.0);
            (
                Frame::new(rect.x, rect.y, rect.width, first_h),
                Frame::new(rect.x, rect.y + first_h + gap, rect.width, second_h),
            )
        }
    }
}
