use crate::ids::{ArtboardId, LayerId, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use wiretuner_geom::{Path, Rectangle, Shape};

/// A 2D affine offset/rotate/scale applied to a [`VectorObject`]'s geometry
/// at render time. Geometry itself (anchors, shape parameters) stays in the
/// object's own coordinate space; `transform` composes on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub rotate_radians: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            translate_x: 0.0,
            translate_y: 0.0,
            rotate_radians: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// Either a free-form path or a parametric shape, carrying a stable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum VectorObject {
    #[serde(rename = "path")]
    PathObject {
        id: ObjectId,
        path: Path,
        #[serde(default)]
        transform: Transform,
    },
    #[serde(rename = "shape")]
    ShapeObject {
        id: ObjectId,
        shape: Shape,
        #[serde(default)]
        transform: Transform,
    },
}

impl VectorObject {
    pub fn id(&self) -> &ObjectId {
        match self {
            VectorObject::PathObject { id, .. } => id,
            VectorObject::ShapeObject { id, .. } => id,
        }
    }

    pub fn transform(&self) -> &Transform {
        match self {
            VectorObject::PathObject { transform, .. } => transform,
            VectorObject::ShapeObject { transform, .. } => transform,
        }
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        match self {
            VectorObject::PathObject { transform, .. } => transform,
            VectorObject::ShapeObject { transform, .. } => transform,
        }
    }

    /// The object's geometry as a [`Path`], converting shapes deterministically.
    pub fn to_path(&self) -> Path {
        match self {
            VectorObject::PathObject { path, .. } => path.clone(),
            VectorObject::ShapeObject { shape, .. } => shape.to_path(),
        }
    }
}

/// Rendering order is insertion order into `objects`: first = bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    pub objects: Vec<VectorObject>,
}

fn default_true() -> bool {
    true
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Layer {
            id,
            name: name.into(),
            visible: true,
            locked: false,
            objects: Vec::new(),
        }
    }

    pub fn object(&self, object_id: &ObjectId) -> Option<&VectorObject> {
        self.objects.iter().find(|o| o.id() == object_id)
    }

    pub fn object_mut(&mut self, object_id: &ObjectId) -> Option<&mut VectorObject> {
        self.objects.iter_mut().find(|o| o.id() == object_id)
    }
}

/// `objectIds`: the selected objects. `anchorIndices`: per-object selected
/// anchor positions, for anchor-level editing within a selected path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub object_ids: BTreeSet<ObjectId>,
    pub anchor_indices: BTreeMap<ObjectId, BTreeSet<usize>>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.object_ids.is_empty() && self.anchor_indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.object_ids.clear();
        self.anchor_indices.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

/// `zoom` is clamped to `[0.05, 8.0]` by every mutator (§3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
    pub canvas_size: CanvasSize,
}

pub const MIN_ZOOM: f64 = 0.05;
pub const MAX_ZOOM: f64 = 8.0;

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
            canvas_size: CanvasSize {
                width: 800.0,
                height: 600.0,
            },
        }
    }
}

impl Viewport {
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artboard {
    pub id: ArtboardId,
    pub name: String,
    pub bounds: Rectangle,
    pub background_color: String,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub viewport: Viewport,
}

impl Artboard {
    pub fn new(id: ArtboardId, name: impl Into<String>, bounds: Rectangle) -> Self {
        Artboard {
            id,
            name: name.into(),
            bounds,
            background_color: "#FFFFFF".to_string(),
            layers: Vec::new(),
            selection: Selection::default(),
            viewport: Viewport::default(),
        }
    }

    pub fn layer(&self, layer_id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == layer_id)
    }

    pub fn layer_mut(&mut self, layer_id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| &l.id == layer_id)
    }

    /// Locate an object by id across every layer of this artboard.
    pub fn find_object(&self, object_id: &ObjectId) -> Option<(&LayerId, &VectorObject)> {
        for layer in &self.layers {
            if let Some(obj) = layer.object(object_id) {
                return Some((&layer.id, obj));
            }
        }
        None
    }

    pub fn find_object_mut(&mut self, object_id: &ObjectId) -> Option<&mut VectorObject> {
        for layer in &mut self.layers {
            if let Some(obj) = layer.object_mut(object_id) {
                return Some(obj);
            }
        }
        None
    }
}

/// The root of the event-sourced document tree: `Document → Artboard →
/// Layer → VectorObject`. Ownership is a strict tree; object ids are
/// unique within the document (§3 inv. 4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: crate::ids::DocumentId,
    pub title: String,
    pub schema_version: u32,
    pub artboards: Vec<Artboard>,
}

impl Document {
    pub fn empty(id: crate::ids::DocumentId, schema_version: u32) -> Self {
        Document {
            id,
            title: "Untitled".to_string(),
            schema_version,
            artboards: Vec::new(),
        }
    }

    pub fn artboard(&self, artboard_id: &ArtboardId) -> Option<&Artboard> {
        self.artboards.iter().find(|a| &a.id == artboard_id)
    }

    pub fn artboard_mut(&mut self, artboard_id: &ArtboardId) -> Option<&mut Artboard> {
        self.artboards.iter_mut().find(|a| &a.id == artboard_id)
    }

    /// Locate an object anywhere in the document, returning its owning
    /// artboard/layer ids alongside it.
    pub fn locate_object(
        &self,
        object_id: &ObjectId,
    ) -> Option<(&ArtboardId, &LayerId, &VectorObject)> {
        for artboard in &self.artboards {
            if let Some((layer_id, obj)) = artboard.find_object(object_id) {
                return Some((&artboard.id, layer_id, obj));
            }
        }
        None
    }

    /// Canonical JSON bytes: declaration-order fields, sorted map keys via
    /// `BTreeMap`, no HashMap anywhere in the tree (§3 inv. 3).
    pub fn to_canonical_json(&self) -> crate::error::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DocumentId;

    #[test]
    fn empty_document_has_no_artboards() {
        let doc = Document::empty(DocumentId::new(), 1);
        assert!(doc.artboards.is_empty());
    }

    #[test]
    fn viewport_zoom_clamps_to_range() {
        let vp = Viewport::default().with_zoom(100.0);
        assert_eq!(vp.zoom, MAX_ZOOM);
        let vp = Viewport::default().with_zoom(0.0001);
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn locate_object_finds_across_layers() {
        let mut doc = Document::empty(DocumentId::new(), 1);
        let mut artboard = Artboard::new(
            ArtboardId::new(),
            "Board 1",
            Rectangle::new(0.0, 0.0, 100.0, 100.0),
        );
        let mut layer = Layer::new(LayerId::new(), "Layer 1");
        let obj_id = ObjectId::new();
        layer.objects.push(VectorObject::PathObject {
            id: obj_id.clone(),
            path: Path::new(vec![], false),
            transform: Transform::default(),
        });
        artboard.layers.push(layer);
        doc.artboards.push(artboard);

        let found = doc.locate_object(&obj_id);
        assert!(found.is_some());
    }

    #[test]
    fn canonical_json_round_trips() {
        let doc = Document::empty(DocumentId::new(), 1);
        let bytes = doc.to_canonical_json().unwrap();
        let back: Document = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc, back);
    }
}
