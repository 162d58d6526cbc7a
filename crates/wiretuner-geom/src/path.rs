use crate::{bezier, AnchorPoint, Point, Rectangle};
use serde::{Deserialize, Serialize};

/// The curve shape connecting two anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentKind {
    Line,
    Bezier,
}

/// A directed edge between two anchors of the owning [`Path`].
///
/// # Invariants
///
/// `start_anchor_index` and `end_anchor_index` are valid indices into the
/// parent path's `anchors`. If the path is `closed`, its last segment
/// returns to index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start_anchor_index: usize,
    pub end_anchor_index: usize,
    pub kind: SegmentKind,
}

/// An ordered sequence of anchors and the segments connecting them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub anchors: Vec<AnchorPoint>,
    pub segments: Vec<Segment>,
    pub closed: bool,
}

/// Reasons a [`Path`] fails structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    SegmentIndexOutOfRange { segment_index: usize, anchor_index: usize },
    ClosedPathDoesNotReturnToStart,
    AnchorInvariantViolated { anchor_index: usize },
}

impl Path {
    pub fn new(anchors: Vec<AnchorPoint>, closed: bool) -> Self {
        let mut segments = Vec::new();
        for i in 0..anchors.len().saturating_sub(1) {
            segments.push(Segment {
                start_anchor_index: i,
                end_anchor_index: i + 1,
                kind: SegmentKind::Line,
            });
        }
        if closed && anchors.len() > 1 {
            segments.push(Segment {
                start_anchor_index: anchors.len() - 1,
                end_anchor_index: 0,
                kind: SegmentKind::Line,
            });
        }
        Path {
            anchors,
            segments,
            closed,
        }
    }

    /// Validate segment index ranges, the closed-path return-to-start
    /// invariant, and every anchor's handle-coupling invariant.
    pub fn validate(&self) -> Result<(), PathError> {
        let n = self.anchors.len();
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.start_anchor_index >= n {
                return Err(PathError::SegmentIndexOutOfRange {
                    segment_index: i,
                    anchor_index: seg.start_anchor_index,
                });
            }
            if seg.end_anchor_index >= n {
                return Err(PathError::SegmentIndexOutOfRange {
                    segment_index: i,
                    anchor_index: seg.end_anchor_index,
                });
            }
        }
        if self.closed && !self.segments.is_empty() {
            let last = self.segments.last().unwrap();
            if last.end_anchor_index != 0 {
                return Err(PathError::ClosedPathDoesNotReturnToStart);
            }
        }
        for (i, anchor) in self.anchors.iter().enumerate() {
            if !anchor.is_valid() {
                return Err(PathError::AnchorInvariantViolated { anchor_index: i });
            }
        }
        Ok(())
    }

    /// Flatten every segment into one continuous polyline, using `subdivisions`
    /// steps per Bezier segment (straight segments need only their endpoints).
    pub fn flatten(&self, subdivisions: usize) -> Vec<Point> {
        let mut polyline = Vec::new();
        for (i, seg) in self.segments.iter().enumerate() {
            let start = self.anchors[seg.start_anchor_index];
            let end = self.anchors[seg.end_anchor_index];
            let pts = match seg.kind {
                SegmentKind::Line => vec![start.position, end.position],
                SegmentKind::Bezier => {
                    let c1 = start.handle_out.unwrap_or(start.position);
                    let c2 = end.handle_in.unwrap_or(end.position);
                    bezier::flatten_cubic(start.position, c1, c2, end.position, subdivisions)
                }
            };
            if i == 0 {
                polyline.extend(pts);
            } else {
                // Skip the first point: it duplicates the previous segment's end.
                polyline.extend(pts.into_iter().skip(1));
            }
        }
        polyline
    }

    /// Axis-aligned bounding box over all anchor positions (and handles,
    /// so a Bezier curve that bows beyond its anchors is still covered --
    /// this is a control-polygon bound, not the tight curve bound, which
    /// is sufficient for broad-phase hit-testing).
    pub fn bounds(&self) -> Rectangle {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut visit = |p: Point| {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        };
        for anchor in &self.anchors {
            visit(anchor.position);
            if let Some(h) = anchor.handle_in {
                visit(h);
            }
            if let Some(h) = anchor.handle_out {
                visit(h);
            }
        }
        if !min_x.is_finite() {
            return Rectangle::new(0.0, 0.0, 0.0, 0.0);
        }
        Rectangle::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}
