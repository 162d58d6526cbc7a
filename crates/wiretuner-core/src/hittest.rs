use crate::config::EngineConfig;
use crate::document::{Artboard, Document, VectorObject};
use crate::ids::ObjectId;
use wiretuner_geom::{distance_to_polyline, point_in_polygon, Point, Rectangle};

/// What part of an object a hit landed on, used to break distance ties:
/// an anchor under the cursor always wins over a stroke, which always
/// wins over a fill (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HitKind {
    Fill,
    Stroke,
    Anchor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub object_id: ObjectId,
    pub kind: HitKind,
    pub distance: f64,
}

enum Node {
    Leaf {
        object_id: ObjectId,
        bounds: Rectangle,
    },
    Branch {
        bounds: Rectangle,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn bounds(&self) -> Rectangle {
        match self {
            Node::Leaf { bounds, .. } => *bounds,
            Node::Branch { bounds, .. } => *bounds,
        }
    }
}

/// A bottom-up, median-split bounding volume hierarchy over every
/// object's bounds in a document, rebuilt whenever the scene's object
/// set changes (§4.10). Query cost is `O(log n + k)` for `k` results
/// instead of the `O(n)` linear scan a flat list would need.
pub struct HitTestIndex {
    root: Option<Node>,
}

impl HitTestIndex {
    /// Build the index from every object across every artboard's layers.
    /// `O(n log n)` in the object count.
    pub fn build(document: &Document) -> Self {
        let mut items: Vec<(ObjectId, Rectangle)> = Vec::new();
        for artboard in &document.artboards {
            collect_bounds(artboard, &mut items);
        }
        HitTestIndex {
            root: build_node(items),
        }
    }

    /// Every hit at `point` within `tolerance` world units, sorted by
    /// ascending distance; ties at equal distance break by [`HitKind`]
    /// priority, anchor first (§4.10).
    pub fn hit_test(
        &self,
        document: &Document,
        point: Point,
        tolerance: f64,
        config: &EngineConfig,
    ) -> Vec<HitResult> {
        let mut candidates = Vec::new();
        if let Some(root) = &self.root {
            collect_candidates(root, point, tolerance, &mut candidates);
        }
        let mut results: Vec<HitResult> = Vec::new();
        for object_id in candidates {
            let Some((_, _, object)) = document.locate_object(&object_id) else {
                continue;
            };
            if let Some(hit) = classify_hit(object, point, tolerance, config) {
                results.push(HitResult {
                    object_id,
                    kind: hit.kind,
                    distance: hit.distance,
                });
            }
        }
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap()
                .then_with(|| b.kind.cmp(&a.kind))
        });
        results
    }

    /// Every object whose bounds intersect `rect`, for marquee selection.
    /// Unordered broad-phase result -- callers that need fine-grained
    /// containment should intersect against the object's actual geometry.
    pub fn hit_test_bounds(&self, rect: &Rectangle) -> Vec<ObjectId> {
        let mut results = Vec::new();
        if let Some(root) = &self.root {
            collect_bounds_overlap(root, rect, &mut results);
        }
        results
    }
}

fn collect_bounds(artboard: &Artboard, out: &mut Vec<(ObjectId, Rectangle)>) {
    for layer in &artboard.layers {
        if !layer.visible {
            continue;
        }
        for object in &layer.objects {
            out.push((object.id().clone(), object.to_path().bounds()));
        }
    }
}

fn build_node(mut items: Vec<(ObjectId, Rectangle)>) -> Option<Node> {
    if items.is_empty() {
        return None;
    }
    if items.len() == 1 {
        let (object_id, bounds) = items.remove(0);
        return Some(Node::Leaf { object_id, bounds });
    }
    let overall = items
        .iter()
        .map(|(_, b)| *b)
        .reduce(|a, b| a.union(&b))
        .unwrap();
    let split_on_x = overall.w >= overall.h;
    items.sort_by(|(_, a), (_, b)| {
        let ca = a.center();
        let cb = b.center();
        if split_on_x {
            ca.x.partial_cmp(&cb.x).unwrap()
        } else {
            ca.y.partial_cmp(&cb.y).unwrap()
        }
    });
    let mid = items.len() / 2;
    let right_items = items.split_off(mid);
    let left = build_node(items)?;
    let right = build_node(right_items)?;
    let bounds = left.bounds().union(&right.bounds());
    Some(Node::Branch {
        bounds,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn collect_candidates(node: &Node, point: Point, tolerance: f64, out: &mut Vec<ObjectId>) {
    if !node.bounds().inflate(tolerance).contains_point(point) {
        return;
    }
    match node {
        Node::Leaf { object_id, .. } => out.push(object_id.clone()),
        Node::Branch { left, right, .. } => {
            collect_candidates(left, point, tolerance, out);
            collect_candidates(right, point, tolerance, out);
        }
    }
}

fn collect_bounds_overlap(node: &Node, rect: &Rectangle, out: &mut Vec<ObjectId>) {
    if !node.bounds().intersects(rect) {
        return;
    }
    match node {
        Node::Leaf { object_id, .. } => out.push(object_id.clone()),
        Node::Branch { left, right, .. } => {
            collect_bounds_overlap(left, rect, out);
            collect_bounds_overlap(right, rect, out);
        }
    }
}

struct Classified {
    kind: HitKind,
    distance: f64,
}

fn classify_hit(
    object: &VectorObject,
    point: Point,
    tolerance: f64,
    config: &EngineConfig,
) -> Option<Classified> {
    let path = object.to_path();
    let polyline = path.flatten(config.hit_test_subdivisions);
    if polyline.is_empty() {
        return None;
    }
    for (index, anchor) in path.anchors.iter().enumerate() {
        let _ = index;
        let d = point.distance_to(anchor.position);
        if d <= tolerance {
            return Some(Classified {
                kind: HitKind::Anchor,
                distance: d,
            });
        }
    }
    let stroke_distance = distance_to_polyline(point, &polyline);
    if stroke_distance <= tolerance {
        return Some(Classified {
            kind: HitKind::Stroke,
            distance: stroke_distance,
        });
    }
    if path.closed && point_in_polygon(point, &polyline) {
        return Some(Classified {
            kind: HitKind::Fill,
            distance: 0.0,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Layer, Transform};
    use crate::ids::{ArtboardId, DocumentId, LayerId};
    use wiretuner_geom::{AnchorKind, AnchorPoint, Path, Shape};

    fn document_with_rect(bounds: Rectangle) -> (Document, ObjectId) {
        let mut document = Document::empty(DocumentId::new(), 1);
        let mut artboard = Artboard::new(
            ArtboardId::new(),
            "Board",
            Rectangle::new(0.0, 0.0, 1000.0, 1000.0),
        );
        let mut layer = Layer::new(LayerId::new(), "Layer 1");
        let object_id = ObjectId::new();
        layer.objects.push(VectorObject::ShapeObject {
            id: object_id.clone(),
            shape: Shape::rect(bounds),
            transform: Transform::default(),
        });
        artboard.layers.push(layer);
        document.artboards.push(artboard);
        (document, object_id)
    }

    #[test]
    fn hit_test_finds_object_inside_fill() {
        let (document, object_id) = document_with_rect(Rectangle::new(0.0, 0.0, 100.0, 100.0));
        let index = HitTestIndex::build(&document);
        let config = EngineConfig::default();
        let hits = index.hit_test(&document, Point::new(50.0, 50.0), 2.0, &config);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object_id, object_id);
        assert_eq!(hits[0].kind, HitKind::Fill);
    }

    #[test]
    fn hit_test_misses_outside_tolerance() {
        let (document, _object_id) = document_with_rect(Rectangle::new(0.0, 0.0, 100.0, 100.0));
        let index = HitTestIndex::build(&document);
        let config = EngineConfig::default();
        let hits = index.hit_test(&document, Point::new(500.0, 500.0), 2.0, &config);
        assert!(hits.is_empty());
    }

    #[test]
    fn anchor_hit_outranks_fill_at_same_point() {
        let mut document = Document::empty(DocumentId::new(), 1);
        let mut artboard = Artboard::new(
            ArtboardId::new(),
            "Board",
            Rectangle::new(0.0, 0.0, 1000.0, 1000.0),
        );
        let mut layer = Layer::new(LayerId::new(), "Layer 1");
        let object_id = ObjectId::new();
        let path = Path::new(
            vec![
                AnchorPoint::new(Point::new(0.0, 0.0), AnchorKind::Corner),
                AnchorPoint::new(Point::new(100.0, 0.0), AnchorKind::Corner),
                AnchorPoint::new(Point::new(100.0, 100.0), AnchorKind::Corner),
                AnchorPoint::new(Point::new(0.0, 100.0), AnchorKind::Corner),
            ],
            true,
        );
        layer.objects.push(VectorObject::PathObject {
            id: object_id.clone(),
            path,
            transform: Transform::default(),
        });
        artboard.layers.push(layer);
        document.artboards.push(artboard);

        let index = HitTestIndex::build(&document);
        let config = EngineConfig::default();
        let hits = index.hit_test(&document, Point::new(0.0, 0.0), 5.0, &config);
        assert_eq!(hits[0].kind, HitKind::Anchor);
    }

    #[test]
    fn hits_at_tied_distance_rank_anchor_over_stroke_over_fill() {
        let a = HitResult {
            object_id: "a".into(),
            kind: HitKind::Fill,
            distance: 1.0,
        };
        let b = HitResult {
            object_id: "b".into(),
            kind: HitKind::Stroke,
            distance: 1.0,
        };
        let c = HitResult {
            object_id: "c".into(),
            kind: HitKind::Anchor,
            distance: 1.0,
        };
        let mut results = vec![a.clone(), b.clone(), c.clone()];
        results.sort_by(|x, y| {
            x.distance
                .partial_cmp(&y.distance)
                .unwrap()
                .then_with(|| y.kind.cmp(&x.kind))
        });
        assert_eq!(results, vec![c, b, a]);
    }

    #[test]
    fn hit_test_bounds_finds_overlapping_objects() {
        let (document, object_id) = document_with_rect(Rectangle::new(0.0, 0.0, 50.0, 50.0));
        let index = HitTestIndex::build(&document);
        let found = index.hit_test_bounds(&Rectangle::new(0.0, 0.0, 200.0, 200.0));
        assert!(found.contains(&object_id));
        let missed = index.hit_test_bounds(&Rectangle::new(500.0, 500.0, 10.0, 10.0));
        assert!(!missed.contains(&object_id));
    }
}
