use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sys::geometry::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(u32);

impl DisplayId {
    pub const fn new(id: u32) -> DisplayId { DisplayId(id) }

    pub fn get(self) -> u32 { self.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Display {
    pub id: DisplayId,
    /// Usable area: menu bar and dock excluded.
    pub visible_frame: Frame,
    pub full_frame: Frame,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HideCorner {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

const ADJACENCY_SLOP: f64 = 1.0;

/// Snapshot of the connected monitors. Rebuilt wholesale on every topology
/// change; never patched.
#[derive(Debug, Default, Clone)]
pub struct DisplayModel {
    displays: Vec<Display>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TopologyDiff {
    pub added: Vec<DisplayId>,
    pub removed: Vec<DisplayId>,
}

impl DisplayModel {
    pub fn new() -> Self { Self::default() }

    /// Replaces the snapshot. If the platform flags no display as primary the
    /// first one is promoted so that a primary always exists while any
    /// display is connected.
    pub fn refresh(&mut self, mut displays: Vec<Display>) -> TopologyDiff {
        if !displays.is_empty() && !displays.iter().any(|d| d.is_primary) {
            displays[0].is_primary = true;
        }
        let added = displays
            .iter()
            .filter(|d| self.get(d.id).is_none())
            .map(|d| d.id)
            .collect();
        let removed = self
            .displays
            .iter()
            .filter(|old| !displays.iter().any(|d| d.id == old.id))
            .map(|d| d.id)
            .collect();
        self.displays = displays;
        let diff = TopologyDiff { added, removed };
        debug!(?diff, count = self.displays.len(), "display topology refreshed");
        diff
    }

    pub fn displays(&self) -> &[Display] { &self.displays }

    pub fn is_empty(&self) -> bool { self.displays.is_empty() }

    pub fn get(&self, id: DisplayId) -> Option<&Display> { self.displays.iter().find(|d| d.id == id) }

    pub fn contains(&self, id: DisplayId) -> bool { self.get(id).is_some() }

    pub fn slot(&self, index: usize) -> Option<&Display> { self.displays.get(index) }

    pub fn primary(&self) -> Option<&Display> {
        self.displays.iter().find(|d| d.is_primary).or_else(|| self.displays.first())
    }

    /// The display whose usable area contains the center of `frame`. When no
    /// display contains it, the one with the largest overlap wins, and ties
    /// go to the primary display.
    pub fn display_for_frame(&self, frame: &Frame) -> Option<DisplayId> {
        let center = frame.mid();
        if let Some(d) = self.displays.iter().find(|d| d.visible_frame.contains(center)) {
            return Some(d.id);
        }
        let primary = self.primary()?.id;
        let mut best: Option<(DisplayId, f64)> = None;
        let mut tied = false;
        for d in &self.displays {
            let overlap = d.visible_frame.overlap_area(frame);
            match best {
                Some((_, area)) if overlap < area => {}
                Some((id, area)) if overlap == area => {
                    tied = true;
                    if d.id == primary {
                        best = Some((d.id, overlap));
                    } else {
                        best = Some((id, area));
                    }
                }
                _ => {
                    tied = false;
                    best = Some((d.id, overlap));
                }
            }
        }
        match best {
            Some((id, area)) if area > 0.0 && (!tied || id == primary) => Some(id),
            _ => Some(primary),
        }
    }

    /// A screen corner of `display` that does not touch another monitor.
    pub fn hide_corner(&self, display: DisplayId) -> HideCorner {
        let Some(this) = self.get(display) else {
            return HideCorner::default();
        };
        let f = this.full_frame;
        let others = || self.displays.iter().filter(|d| d.id != display).map(|d| d.full_frame);
        let spans_y = |o: &Frame| o.y < f.max_y() && o.max_y() > f.y;
        let spans_x = |o: &Frame| o.x < f.max_x() && o.max_x() > f.x;
        let right = others().any(|o| (o.x - f.max_x()).abs() <= ADJACENCY_SLOP && spans_y(&o));
        let left = others().any(|o| (o.max_x() - f.x).abs() <= ADJACENCY_SLOP && spans_y(&o));
        let below = others().any(|o| (o.y - f.max_y()).abs() <= ADJACENCY_SLOP && spans_x(&o));
        let above = others().any(|o| (o.max_y() - f.y).abs() <= ADJACENCY_SLOP && spans_x(&o));

        if !right && !below {
            HideCorner::BottomRight
        } else if !left && !below {
            HideCorner::BottomLeft
        } else if !right && !above {
            HideCorner::TopRight
        } else if !left && !above {
            HideCorner::TopLeft
        } else {
            HideCorner::BottomRight
        }
    }

    /// Where a window of the given size is parked while its workspace is
    /// hidden on `display`: pushed past a free corner so only `peek` units
    /// stay on screen.
    pub fn hidden_position(&self, display: DisplayId, width: f64, height: f64, peek: f64) -> Option<Frame> {
        let f = self.get(display)?.full_frame;
        let (x, y) = match self.hide_corner(display) {
            HideCorner::BottomRight => (f.max_x() - peek, f.max_y() - peek),
            HideCorner::BottomLeft => (f.x - width + peek, f.max_y() - peek),
            HideCorner::TopRight => (f.max_x() - peek, f.y - height + peek),
            HideCorner::TopLeft => (f.x - width + peek, f.y - height + peek),
        };
        Some(Frame::new(x, y, width, height))
    }
}
