use crate::Point;
use serde::{Deserialize, Serialize};

/// Behavior classification for an anchor's control handles.
///
/// `corner`, `smooth`, `symmetric` describe handle coupling; `tangent`,
/// `line`, `bezier` describe the segment shape leaving the anchor. The
/// document model carries all six as one closed set per the wire format,
/// rather than splitting them into two orthogonal enums, to match the
/// canonical JSON `"type"` field used by imported/exported documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchorKind {
    Corner,
    Smooth,
    Symmetric,
    Tangent,
    Line,
    Bezier,
}

/// A single point on a [`crate::Path`], with optional incoming/outgoing
/// Bezier control handles.
///
/// # Invariants
///
/// - `kind == Smooth` implies `handle_in == -handle_out` (the handles are
///   opposite vectors from `position`).
/// - `kind == Symmetric` implies `handle_in` and `handle_out` are
///   collinear through `position` (equal magnitude is not required, only
///   direction).
///
/// These are re-checked by [`AnchorPoint::is_valid`] after every mutation
/// in the applier (document model invariant 5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub position: Point,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub handle_in: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub handle_out: Option<Point>,
    #[serde(rename = "type")]
    pub kind: AnchorKind,
}

/// Tolerance for the floating-point handle-collinearity/opposition checks.
const HANDLE_EPSILON: f64 = 1e-6;

impl AnchorPoint {
    pub fn new(position: Point, kind: AnchorKind) -> Self {
        AnchorPoint {
            position,
            handle_in: None,
            handle_out: None,
            kind,
        }
    }

    pub fn with_handles(mut self, handle_in: Option<Point>, handle_out: Option<Point>) -> Self {
        self.handle_in = handle_in;
        self.handle_out = handle_out;
        self
    }

    /// Vector from `position` to `handle_in`, if present.
    fn in_vector(&self) -> Option<Point> {
        self.handle_in.map(|h| h.sub(self.position))
    }

    /// Vector from `position` to `handle_out`, if present.
    fn out_vector(&self) -> Option<Point> {
        self.handle_out.map(|h| h.sub(self.position))
    }

    /// Re-assert the handle-coupling invariant for this anchor's `kind`.
    ///
    /// Anchors with no handles on the constrained side trivially satisfy
    /// the invariant -- a `smooth`/`symmetric` anchor need not have both
    /// handles populated (e.g. the first/last anchor of an open path).
    pub fn is_valid(&self) -> bool {
        match self.kind {
            AnchorKind::Smooth => match (self.in_vector(), self.out_vector()) {
                (Some(vin), Some(vout)) => {
                    (vin.x + vout.x).abs() < HANDLE_EPSILON && (vin.y + vout.y).abs() < HANDLE_EPSILON
                }
                _ => true,
            },
            AnchorKind::Symmetric => match (self.in_vector(), self.out_vector()) {
                (Some(vin), Some(vout)) => is_collinear_through_origin(vin, vout),
                _ => true,
            },
            AnchorKind::Corner | AnchorKind::Tangent | AnchorKind::Line | AnchorKind::Bezier => {
                true
            }
        }
    }

    /// Move the anchor and its handles by the same translation.
    pub fn translate(&self, delta: Point) -> AnchorPoint {
        AnchorPoint {
            position: self.position.add(delta),
            handle_in: self.handle_in.map(|h| h.add(delta)),
            handle_out: self.handle_out.map(|h| h.add(delta)),
            kind: self.kind,
        }
    }
}

/// True if `a` and `b` point in opposite or identical directions from the
/// origin (collinear through zero), within [`HANDLE_EPSILON`].
fn is_collinear_through_origin(a: Point, b: Point) -> bool {
    let cross = a.x * b.y - a.y * b.x;
    cross.abs() < HANDLE_EPSILON
}
