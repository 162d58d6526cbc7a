use crate::Point;

/// Flatten a cubic Bezier segment `(p0, p1, p2, p3)` into a polyline.
///
/// `subdivisions` controls the fixed-step tessellation density; the
/// hit-test index's default (20) balances distance-query accuracy against
/// the cost of testing every segment of a complex path. Returns `p0`
/// through `p3` inclusive, `subdivisions + 1` points total.
///
/// This is a uniform-parameter flattening, not true adaptive (curvature
/// driven) flattening -- simple, deterministic, and sufficiently precise
/// for the tolerances hit-testing uses. A curvature-adaptive flattener is
/// a reasonable future upgrade if profiling shows it matters.
pub fn flatten_cubic(p0: Point, p1: Point, p2: Point, p3: Point, subdivisions: usize) -> Vec<Point> {
    let steps = subdivisions.max(1);
    let mut points = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        points.push(cubic_point(p0, p1, p2, p3, t));
    }
    points
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

/// Shortest distance from `point` to the polyline `a..=b`.
pub fn distance_to_segment(point: Point, a: Point, b: Point) -> f64 {
    let ab = b.sub(a);
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq < 1e-12 {
        return point.distance_to(a);
    }
    let t = ((point.x - a.x) * ab.x + (point.y - a.y) * ab.y) / len_sq;
    let t = t.clamp(0.0, 1.0);
    let projected = Point::new(a.x + ab.x * t, a.y + ab.y * t);
    point.distance_to(projected)
}

/// Distance from `point` to the nearest segment of the polyline.
pub fn distance_to_polyline(point: Point, polyline: &[Point]) -> f64 {
    polyline
        .windows(2)
        .map(|w| distance_to_segment(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Even-odd winding test: is `point` inside the closed polyline?
///
/// Only meaningful for closed paths; callers must not call this for open
/// paths (the document model enforces this by only invoking fill hit
/// tests on `Path`s with `closed == true`).
pub fn point_in_polygon(point: Point, polyline: &[Point]) -> bool {
    let mut inside = false;
    let n = polyline.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let pi = polyline[i];
        let pj = polyline[j];
        let crosses = (pi.y > point.y) != (pj.y > point.y);
        if crosses {
            let x_intersect = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_intersect {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_endpoints_match_control_points() {
        let p0 = Point::new(0.0, 0.0);
        let p3 = Point::new(100.0, 0.0);
        let poly = flatten_cubic(p0, Point::new(30.0, 50.0), Point::new(70.0, -50.0), p3, 20);
        assert_eq!(poly.first().copied(), Some(p0));
        assert_eq!(poly.last().copied(), Some(p3));
        assert_eq!(poly.len(), 21);
    }

    #[test]
    fn straight_line_flattens_to_collinear_points() {
        let p0 = Point::new(0.0, 0.0);
        let p3 = Point::new(10.0, 0.0);
        // Control points on the line itself -> flattened polyline is the line.
        let poly = flatten_cubic(p0, Point::new(3.0, 0.0), Point::new(7.0, 0.0), p3, 4);
        for p in &poly {
            assert!(p.y.abs() < 1e-9);
        }
    }

    #[test]
    fn distance_to_segment_perpendicular() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        let d = distance_to_segment(Point::new(5.0, 5.0), a, b);
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn point_in_polygon_square() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ];
        assert!(point_in_polygon(Point::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &square));
    }
}
