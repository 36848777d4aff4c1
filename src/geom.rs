//! Stage geometry
//!
//! Stage space is measured in grid cells with the y-axis pointing up:
//! - `bottom` is the smallest y of a rectangle, `top` the largest
//! - a rectangle is stored as its lower-left corner plus its size
//! - derived values (edges, collision regions) are computed from those
//!   inputs only

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle given by its lower-left corner and size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub corner: DVec2,
    pub size: DVec2,
}

impl Rect {
    pub fn new(corner: DVec2, size: DVec2) -> Self {
        Self { corner, size }
    }

    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(DVec2::new(x, y), DVec2::new(width, height))
    }

    /// Rectangle spanning two opposite corners
    pub fn from_corners(a: DVec2, b: DVec2) -> Self {
        let min = a.min(b);
        Self::new(min, a.max(b) - min)
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.corner.x
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.corner.x + self.size.x
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.corner.y
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.corner.y + self.size.y
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.size.y
    }

    pub fn center(&self) -> DVec2 {
        self.corner + self.size / 2.0
    }

    /// Same rectangle moved by `delta`
    pub fn translated(&self, delta: DVec2) -> Self {
        Self::new(self.corner + delta, self.size)
    }

    /// Overlap of two rectangles. Rectangles that only touch produce a
    /// zero-width or zero-height overlap; disjoint rectangles produce `None`.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let right = self.right().min(other.right());
        let bottom = self.bottom().max(other.bottom());
        let top = self.top().min(other.top());

        if left > right || bottom > top {
            return None;
        }
        Some(Rect::from_xywh(left, bottom, right - left, top - bottom))
    }

    /// Whether the rectangles overlap or touch
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.bottom() <= other.top()
            && other.bottom() <= self.top()
    }

    /// Whether both extents exceed `epsilon`
    pub fn has_area(&self, epsilon: f64) -> bool {
        self.width() > epsilon && self.height() > epsilon
    }
}

/// Circle with a square collision region inscribed in it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    center: DVec2,
    radius: f64,
    collision_region: Rect,
}

impl Circle {
    pub fn new(center: DVec2, radius: f64) -> Self {
        let half = DVec2::splat(radius / std::f64::consts::SQRT_2);
        Self {
            center,
            radius,
            collision_region: Rect::from_corners(center - half, center + half),
        }
    }

    pub fn center(&self) -> DVec2 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Largest axis-aligned square inside the circle
    pub fn collision_region(&self) -> Rect {
        self.collision_region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::from_xywh(1.0, 2.0, 3.0, 4.0);
        assert_eq!(r.left(), 1.0);
        assert_eq!(r.right(), 4.0);
        assert_eq!(r.bottom(), 2.0);
        assert_eq!(r.top(), 6.0);
        assert_eq!(r.center(), DVec2::new(2.5, 4.0));
    }

    #[test]
    fn test_intersection_overlap() {
        let a = Rect::from_xywh(0.0, 0.0, 2.0, 2.0);
        let b = Rect::from_xywh(1.0, 1.5, 2.0, 2.0);
        let hit = a.intersection(&b).unwrap();
        assert_eq!(hit, Rect::from_xywh(1.0, 1.5, 1.0, 0.5));
        assert!(hit.has_area(1e-9));
    }

    #[test]
    fn test_touching_rects_intersect_without_area() {
        let a = Rect::from_xywh(0.0, 0.0, 1.0, 1.0);
        let b = Rect::from_xywh(1.0, 0.0, 1.0, 1.0);
        assert!(a.intersects(&b));
        let hit = a.intersection(&b).unwrap();
        assert_eq!(hit.width(), 0.0);
        assert!(!hit.has_area(1e-9));
    }

    #[test]
    fn test_disjoint_rects() {
        let a = Rect::from_xywh(0.0, 0.0, 1.0, 1.0);
        let b = Rect::from_xywh(0.0, 1.5, 1.0, 1.0);
        assert!(!a.intersects(&b));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_circle_collision_region() {
        let c = Circle::new(DVec2::new(5.5, 1.5), 0.5);
        let region = c.collision_region();
        let half = 0.5 / std::f64::consts::SQRT_2;
        assert!((region.width() - 2.0 * half).abs() < 1e-12);
        assert!((region.center() - c.center()).length() < 1e-12);
        // Every corner of the region lies on or inside the circle
        let corner_distance = (region.corner - c.center()).length();
        assert!(corner_distance <= c.radius() + 1e-12);
    }
}
