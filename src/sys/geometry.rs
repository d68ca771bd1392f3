//! Rectangles in the global, top-left-origin coordinate space shared by all
//! displays.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Point { Point { x, y } }

    /// Manhattan distance to another point.
    pub fn manhattan(self, other: Point) -> f64 { (self.x - other.x).abs() + (self.y - other.y).abs() }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Frame {
        Frame { x, y, width, height }
    }

    pub fn max_x(&self) -> f64 { self.x + self.width }

    pub fn max_y(&self) -> f64 { self.y + self.height }

    pub fn mid(&self) -> Point { Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0) }

    pub fn area(&self) -> f64 { self.width.max(0.0) * self.height.max(0.0) }

    /// Half-open containment: a point on the right or bottom edge belongs to
    /// the neighbouring rectangle.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.max_x() && p.y >= self.y && p.y < self.max_y()
    }

    pub fn intersection(&self, other: &Frame) -> Option<Frame> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        if max_x <= x || max_y <= y {
            return None;
        }
        Some(Frame::new(x, y, max_x - x, max_y - y))
    }

    pub fn overlap_area(&self, other: &Frame) -> f64 {
        self.intersection(other).map_or(0.0, |f| f.area())
    }

    /// A frame of `width` x `height` centered inside `self`, clamped so it
    /// never exceeds `self`.
    pub fn centered(&self, width: f64, height: f64) -> Frame {
        let width = width.min(self.width).max(0.0);
        let height = height.min(self.height).max(0.0);
        Frame::new(
            self.x + (self.width - width) / 2.0,
            self.y + (self.height - height) / 2.0,
            width,
            height,
        )
    }
}

/// Approximate equality with an explicit tolerance per component.
pub trait SameAs {
    fn same_as_within(&self, other: &Self, tolerance: f64) -> bool;

    fn same_as(&self, other: &Self) -> bool { self.same_as_within(other, 0.1) }
}

impl SameAs for Frame {
    fn same_as_within(&self, other: &Frame, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Frame {
    fn round(&self) -> Frame {
        let min_x = self.x.round();
        let min_y = self.y.round();
        let max_x = self.max_x().round();
        let max_y = self.max_y().round();
        Frame::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn containment_is_half_open() {
        let f = Frame::new(0.0, 0.0, 100.0, 100.0);
        assert!(f.contains(Point::new(0.0, 0.0)));
        assert!(f.contains(Point::new(99.9, 50.0)));
        assert!(!f.contains(Point::new(100.0, 50.0)));
    }

    #[test]
    fn overlap_of_disjoint_frames_is_zero() {
        let a = Frame::new(0.0, 0.0, 100.0, 100.0);
        let b = Frame::new(100.0, 0.0, 100.0, 100.0);
        assert_eq!(a.overlap_area(&b), 0.0);
        let c = Frame::new(50.0, 50.0, 100.0, 100.0);
        assert_eq!(a.overlap_area(&c), 2500.0);
    }

    #[test]
    fn centered_clamps_to_container() {
        let screen = Frame::new(100.0, 0.0, 1000.0, 800.0);
        assert_eq!(screen.centered(400.0, 200.0), Frame::new(400.0, 300.0, 400.0, 200.0));
        assert_eq!(screen.centered(4000.0, 200.0), Frame::new(100.0, 300.0, 1000.0, 200.0));
    }

    #[test]
    fn same_as_respects_tolerance() {
        let a = Frame::new(10.0, 10.0, 500.0, 400.0);
        let b = Frame::new(12.0, 8.0, 498.0, 402.0);
        assert!(a.same_as_within(&b, 2.0));
        assert!(!a.same_as_within(&b, 1.9));
        assert_eq!(a.same_as_within(&b, 2.0), b.same_as_within(&a, 2.0));
    }

    #[test]
    fn round_keeps_edges_aligned() {
        let f = Frame::new(0.4, 0.6, 99.4, 99.8);
        assert_eq!(f.round(), Frame::new(0.0, 1.0, 100.0, 99.0));
    }
}
