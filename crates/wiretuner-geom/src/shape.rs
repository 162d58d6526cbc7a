use crate::{AnchorKind, AnchorPoint, Path, Point, Rectangle};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A deterministically-generated shape. `parameters` is interpreted
/// according to `kind`; see [`Shape::to_path`] for the exact geometry
/// each kind produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub kind: ShapeKind,
    pub bounds: Rectangle,
    /// Number of sides for `polygon`/`star`. Ignored by `rect`/`ellipse`.
    #[serde(default = "default_point_count")]
    pub points: u32,
    /// Inner-radius ratio (0.0..1.0) for `star`. Ignored otherwise.
    #[serde(default = "default_inner_radius_ratio")]
    pub inner_radius_ratio: f64,
}

fn default_point_count() -> u32 {
    5
}

fn default_inner_radius_ratio() -> f64 {
    0.5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Rect,
    Ellipse,
    Polygon,
    Star,
}

impl Shape {
    pub fn rect(bounds: Rectangle) -> Self {
        Shape {
            kind: ShapeKind::Rect,
            bounds,
            points: default_point_count(),
            inner_radius_ratio: default_inner_radius_ratio(),
        }
    }

    pub fn ellipse(bounds: Rectangle) -> Self {
        Shape {
            kind: ShapeKind::Ellipse,
            bounds,
            points: default_point_count(),
            inner_radius_ratio: default_inner_radius_ratio(),
        }
    }

    pub fn polygon(bounds: Rectangle, sides: u32) -> Self {
        Shape {
            kind: ShapeKind::Polygon,
            bounds,
            points: sides.max(3),
            inner_radius_ratio: default_inner_radius_ratio(),
        }
    }

    pub fn star(bounds: Rectangle, points: u32, inner_radius_ratio: f64) -> Self {
        Shape {
            kind: ShapeKind::Star,
            bounds,
            points: points.max(3),
            inner_radius_ratio: inner_radius_ratio.clamp(0.01, 0.99),
        }
    }

    /// Convert to a closed [`Path`]. Deterministic: identical `Shape`
    /// values always produce byte-identical anchor sequences.
    pub fn to_path(&self) -> Path {
        match self.kind {
            ShapeKind::Rect => self.rect_path(),
            ShapeKind::Ellipse => self.ellipse_path(),
            ShapeKind::Polygon => self.radial_path(self.points, 1.0),
            ShapeKind::Star => self.star_path(),
        }
    }

    fn rect_path(&self) -> Path {
        let anchors = vec![
            corner_anchor(self.bounds.left(), self.bounds.top()),
            corner_anchor(self.bounds.right(), self.bounds.top()),
            corner_anchor(self.bounds.right(), self.bounds.bottom()),
            corner_anchor(self.bounds.left(), self.bounds.bottom()),
        ];
        Path::new(anchors, true)
    }

    fn ellipse_path(&self) -> Path {
        const KAPPA: f64 = 0.5522847498;
        let b = &self.bounds;
        let cx = b.center().x;
        let cy = b.center().y;
        let rx = b.w / 2.0;
        let ry = b.h / 2.0;
        let kx = rx * KAPPA;
        let ky = ry * KAPPA;

        let top = Point::new(cx, cy - ry);
        let right = Point::new(cx + rx, cy);
        let bottom = Point::new(cx, cy + ry);
        let left = Point::new(cx - rx, cy);

        let anchors = vec![
            AnchorPoint::new(top, AnchorKind::Smooth).with_handles(
                Some(Point::new(cx - kx, cy - ry)),
                Some(Point::new(cx + kx, cy - ry)),
            ),
            AnchorPoint::new(right, AnchorKind::Smooth).with_handles(
                Some(Point::new(cx + rx, cy - ky)),
                Some(Point::new(cx + rx, cy + ky)),
            ),
            AnchorPoint::new(bottom, AnchorKind::Smooth).with_handles(
                Some(Point::new(cx + kx, cy + ry)),
                Some(Point::new(cx - kx, cy + ry)),
            ),
            AnchorPoint::new(left, AnchorKind::Smooth).with_handles(
                Some(Point::new(cx - rx, cy + ky)),
                Some(Point::new(cx - rx, cy - ky)),
            ),
        ];
        let mut path = Path::new(anchors, true);
        for seg in path.segments.iter_mut() {
            seg.kind = crate::SegmentKind::Bezier;
        }
        path
    }

    /// Regular N-gon inscribed in `self.bounds`, first anchor pointing up.
    /// `radius_scale` lets [`Shape::star_path`] reuse this for the outer
    /// ring while applying a separate inner ring.
    fn radial_path(&self, sides: u32, radius_scale: f64) -> Path {
        let b = &self.bounds;
        let cx = b.center().x;
        let cy = b.center().y;
        let r = (b.w.min(b.h) / 2.0) * radius_scale;
        let n = sides.max(3);
        let mut anchors = Vec::with_capacity(n as usize);
        for i in 0..n {
            let angle = -PI / 2.0 + (i as f64) * 2.0 * PI / (n as f64);
            anchors.push(corner_anchor(cx + r * angle.cos(), cy + r * angle.sin()));
        }
        Path::new(anchors, true)
    }

    fn star_path(&self) -> Path {
        let b = &self.bounds;
        let cx = b.center().x;
        let cy = b.center().y;
        let outer_r = b.w.min(b.h) / 2.0;
        let inner_r = outer_r * self.inner_radius_ratio;
        let n = self.points.max(3) * 2;
        let mut anchors = Vec::with_capacity(n as usize);
        for i in 0..n {
            let radius = if i % 2 == 0 { outer_r } else { inner_r };
            let angle = -PI / 2.0 + (i as f64) * PI / (self.points.max(3) as f64);
            anchors.push(corner_anchor(cx + radius * angle.cos(), cy + radius * angle.sin()));
        }
        Path::new(anchors, true)
    }
}

fn corner_anchor(x: f64, y: f64) -> AnchorPoint {
    AnchorPoint::new(Point::new(x, y), AnchorKind::Corner)
}
