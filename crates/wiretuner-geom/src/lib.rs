//! Geometry primitives for the WireTuner document engine.
//!
//! # Overview
//!
//! This crate defines the pure, allocation-light math shared by the
//! document model, the event applier, and the hit-test index: points,
//! axis-aligned rectangles, anchor points with handle invariants, path
//! segments, and the deterministic shape-to-path conversion used by
//! `ShapeObject`.
//!
//! # Determinism
//!
//! Every type here is `Copy`/`Clone` plain old data over `f64`. No type in
//! this crate performs IO, reads the wall clock, or uses randomness, so
//! downstream replay determinism (document invariant 3) only depends on
//! the caller feeding identical inputs.
//!
//! # Invariants enforced
//!
//! - [`Point`] coordinates are always finite (never NaN/Inf) -- enforced at
//!   construction via [`Point::new`].
//! - [`Rectangle`] width/height are non-negative.
//! - [`AnchorPoint`] preserves the `smooth`/`symmetric` handle constraints
//!   described in the document model (see [`AnchorPoint::is_valid`]).

mod anchor;
mod bezier;
mod path;
mod rect;
mod shape;

pub use anchor::{AnchorKind, AnchorPoint};
pub use bezier::{distance_to_polyline, distance_to_segment, flatten_cubic, point_in_polygon};
pub use path::{Path, Segment, SegmentKind};
pub use rect::Rectangle;
pub use shape::{Shape, ShapeKind};

use serde::{Deserialize, Serialize};

/// A world-space coordinate.
///
/// # Invariants
///
/// `x` and `y` are always finite. [`Point::new`] panics on NaN/Inf inputs;
/// callers that accept untrusted (e.g. deserialized) coordinates should
/// validate with [`Point::is_finite`] before constructing one of these in
/// a context where a panic is unacceptable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        debug_assert!(x.is_finite() && y.is_finite(), "non-finite point ({x}, {y})");
        Point { x, y }
    }

    pub const fn origin() -> Self {
        Point { x: 0.0, y: 0.0 }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn add(&self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(&self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(&self, factor: f64) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Rotate around `pivot` by `radians`.
    pub fn rotate_around(&self, pivot: Point, radians: f64) -> Point {
        let (s, c) = radians.sin_cos();
        let dx = self.x - pivot.x;
        let dy = self.y - pivot.y;
        Point::new(pivot.x + dx * c - dy * s, pivot.y + dx * s + dy * c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.add(b), Point::new(4.0, 6.0));
        assert_eq!(b.sub(a), Point::new(2.0, 2.0));
        assert_eq!(a.scale(2.0), Point::new(2.0, 4.0));
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
        assert_eq!(b.distance_to(a), 5.0);
    }

    #[test]
    fn rotate_around_self_is_identity() {
        let p = Point::new(10.0, -3.0);
        let rotated = p.rotate_around(p, 1.234);
        assert!((rotated.x - p.x).abs() < 1e-9);
        assert!((rotated.y - p.y).abs() < 1e-9);
    }
}
