use crate::document::{Artboard, Document, Layer, VectorObject};
use crate::error::{EngineError, Result};
use crate::event::{Envelope, EventPayload, SelectMode};
use crate::ids::{ArtboardId, LayerId, ObjectId};
use std::collections::BTreeMap;
use wiretuner_geom::{AnchorKind, AnchorPoint, Path};

/// The applier's working state: the [`Document`] plus a transient
/// object-id → (artboard, layer) index kept in sync on every handler so
/// object lookups don't require a full tree scan. The index is rebuilt
/// from scratch by [`ApplierState::reindex`] and is never itself
/// persisted -- it is derivable from `document` alone.
#[derive(Debug, Clone)]
pub struct ApplierState {
    pub document: Document,
    object_index: BTreeMap<ObjectId, (ArtboardId, LayerId)>,
}

impl ApplierState {
    pub fn new(document: Document) -> Self {
        let mut state = ApplierState {
            document,
            object_index: BTreeMap::new(),
        };
        state.reindex();
        state
    }

    pub fn reindex(&mut self) {
        self.object_index.clear();
        for artboard in &self.document.artboards {
            for layer in &artboard.layers {
                for object in &layer.objects {
                    self.object_index
                        .insert(object.id().clone(), (artboard.id.clone(), layer.id.clone()));
                }
            }
        }
    }

    fn locate(&self, object_id: &ObjectId) -> Option<(&ArtboardId, &LayerId)> {
        self.object_index
            .get(object_id)
            .map(|(a, l)| (a, l))
    }
}

/// Apply one committed event to `state`, returning an error for unknown
/// object ids or broken invariants. Callers in replay with
/// `continueOnError = true` catch the error and skip the sequence instead
/// of propagating it (§4.6); live callers reject the event (§4.4).
pub fn apply(state: &mut ApplierState, envelope: &Envelope) -> Result<()> {
    let at = envelope.event_sequence.to_string();
    match envelope.payload() {
        EventPayload::CreatePath {
            artboard_id,
            layer_id,
            path_id,
            start,
        } => {
            let layer = layer_mut(state, artboard_id, layer_id, &at)?;
            layer.objects.push(VectorObject::PathObject {
                id: path_id.clone(),
                path: Path::new(
                    vec![AnchorPoint::new(*start, AnchorKind::Corner)],
                    false,
                ),
                transform: Default::default(),
            });
            state.object_index.insert(
                path_id.clone(),
                (artboard_id.clone(), layer_id.clone()),
            );
            Ok(())
        }

        EventPayload::AddAnchor {
            path_id,
            position,
            anchor_type,
            h_out,
            h_in,
        } => {
            let path = path_mut(state, path_id, &at)?;
            let anchor =
                AnchorPoint::new(*position, *anchor_type).with_handles(*h_in, *h_out);
            if !anchor.is_valid() {
                return Err(EngineError::InvariantViolated {
                    kind: "AnchorHandleCoupling".to_string(),
                    at,
                });
            }
            let index = path.anchors.len();
            path.anchors.push(anchor);
            if index > 0 {
                path.segments.push(wiretuner_geom::Segment {
                    start_anchor_index: index - 1,
                    end_anchor_index: index,
                    kind: wiretuner_geom::SegmentKind::Line,
                });
            }
            Ok(())
        }

        EventPayload::MoveAnchor {
            path_id,
            anchor_index,
            position,
        } => {
            let path = path_mut(state, path_id, &at)?;
            let anchor = path
                .anchors
                .get_mut(*anchor_index)
                .ok_or_else(|| unknown_anchor(&at))?;
            let delta = position.sub(anchor.position);
            *anchor = anchor.translate(delta);
            if !anchor.is_valid() {
                return Err(EngineError::InvariantViolated {
                    kind: "AnchorHandleCoupling".to_string(),
                    at,
                });
            }
            Ok(())
        }

        EventPayload::DeleteAnchor {
            path_id,
            anchor_index,
        } => {
            let path = path_mut(state, path_id, &at)?;
            if *anchor_index >= path.anchors.len() {
                return Err(unknown_anchor(&at));
            }
            path.anchors.remove(*anchor_index);
            *path = Path::new(std::mem::take(&mut path.anchors), path.closed);
            Ok(())
        }

        EventPayload::UpdateHandle {
            path_id,
            anchor_index,
            h_in,
            h_out,
        } => {
            let path = path_mut(state, path_id, &at)?;
            let anchor = path
                .anchors
                .get_mut(*anchor_index)
                .ok_or_else(|| unknown_anchor(&at))?;
            if h_in.is_some() {
                anchor.handle_in = *h_in;
            }
            if h_out.is_some() {
                anchor.handle_out = *h_out;
            }
            if !anchor.is_valid() {
                return Err(EngineError::InvariantViolated {
                    kind: "AnchorHandleCoupling".to_string(),
                    at,
                });
            }
            Ok(())
        }

        EventPayload::FinishPath { path_id, closed } => {
            let path = path_mut(state, path_id, &at)?;
            *path = Path::new(std::mem::take(&mut path.anchors), *closed);
            Ok(())
        }

        EventPayload::CreateShape {
            artboard_id,
            layer_id,
            object_id,
            shape,
        } => {
            let layer = layer_mut(state, artboard_id, layer_id, &at)?;
            layer.objects.push(VectorObject::ShapeObject {
                id: object_id.clone(),
                shape: shape.clone(),
                transform: Default::default(),
            });
            state.object_index.insert(
                object_id.clone(),
                (artboard_id.clone(), layer_id.clone()),
            );
            Ok(())
        }

        EventPayload::UpdateShapeParameters { object_id, shape } => {
            let obj = object_mut(state, object_id, &at)?;
            match obj {
                VectorObject::ShapeObject { shape: s, .. } => {
                    *s = shape.clone();
                    Ok(())
                }
                VectorObject::PathObject { .. } => Err(EngineError::InvariantViolated {
                    kind: "UpdateShapeParametersOnPath".to_string(),
                    at,
                }),
            }
        }

        EventPayload::DeleteObject { object_id } => {
            let (artboard_id, layer_id) = state
                .locate(object_id)
                .map(|(a, l)| (a.clone(), l.clone()))
                .ok_or_else(|| unknown_object(&at))?;
            let layer = layer_mut(state, &artboard_id, &layer_id, &at)?;
            layer.objects.retain(|o| o.id() != object_id);
            state.object_index.remove(object_id);
            Ok(())
        }

        EventPayload::MoveObject { object_id, delta } => {
            let obj = object_mut(state, object_id, &at)?;
            let t = obj.transform_mut();
            t.translate_x += delta.x;
            t.translate_y += delta.y;
            Ok(())
        }

        EventPayload::RotateObject {
            object_id,
            delta_radians,
        } => {
            let obj = object_mut(state, object_id, &at)?;
            obj.transform_mut().rotate_radians += delta_radians;
            Ok(())
        }

        EventPayload::ScaleObject {
            object_id,
            scale_x,
            scale_y,
        } => {
            let obj = object_mut(state, object_id, &at)?;
            let t = obj.transform_mut();
            t.scale_x *= scale_x;
            t.scale_y *= scale_y;
            Ok(())
        }

        EventPayload::SelectObjects { object_ids, mode } => {
            let artboard = active_artboard_mut(state, &at)?;
            match mode {
                SelectMode::Replace => {
                    artboard.selection.clear();
                    artboard.selection.object_ids.extend(object_ids.iter().cloned());
                }
                SelectMode::Add => {
                    artboard.selection.object_ids.extend(object_ids.iter().cloned());
                }
                SelectMode::Toggle => {
                    for id in object_ids {
                        if !artboard.selection.object_ids.remove(id) {
                            artboard.selection.object_ids.insert(id.clone());
                        }
                    }
                }
            }
            Ok(())
        }

        EventPayload::ClearSelection {} => {
            let artboard = active_artboard_mut(state, &at)?;
            artboard.selection.clear();
            Ok(())
        }

        EventPayload::SelectAnchors {
            object_id,
            anchor_indices,
        } => {
            let artboard = active_artboard_mut(state, &at)?;
            artboard
                .selection
                .anchor_indices
                .insert(object_id.clone(), anchor_indices.iter().copied().collect());
            Ok(())
        }

        EventPayload::CreateLayer {
            artboard_id,
            layer_id,
            name,
        } => {
            let artboard = artboard_mut(state, artboard_id, &at)?;
            artboard.layers.push(Layer::new(layer_id.clone(), name.clone()));
            Ok(())
        }

        EventPayload::ReorderLayers {
            artboard_id,
            layer_ids,
        } => {
            let artboard = artboard_mut(state, artboard_id, &at)?;
            let mut reordered = Vec::with_capacity(artboard.layers.len());
            for id in layer_ids {
                if let Some(pos) = artboard.layers.iter().position(|l| &l.id == id) {
                    reordered.push(artboard.layers.remove(pos));
                }
            }
            reordered.extend(artboard.layers.drain(..));
            artboard.layers = reordered;
            Ok(())
        }

        EventPayload::SetLayerProperties {
            artboard_id,
            layer_id,
            name,
            visible,
            locked,
        } => {
            let artboard = artboard_mut(state, artboard_id, &at)?;
            let layer = artboard
                .layer_mut(layer_id)
                .ok_or_else(|| unknown_layer(&at))?;
            if let Some(name) = name {
                layer.name = name.clone();
            }
            if let Some(visible) = visible {
                layer.visible = *visible;
            }
            if let Some(locked) = locked {
                layer.locked = *locked;
            }
            Ok(())
        }

        EventPayload::CreateArtboard {
            artboard_id,
            name,
            bounds,
        } => {
            state
                .document
                .artboards
                .push(Artboard::new(artboard_id.clone(), name.clone(), *bounds));
            Ok(())
        }

        EventPayload::UpdateArtboardBounds { artboard_id, bounds } => {
            let artboard = artboard_mut(state, artboard_id, &at)?;
            artboard.bounds = *bounds;
            Ok(())
        }

        // Group boundary markers carry no document mutation; operation
        // grouping (§4.7) observes them via the event's `undoGroupId`.
        EventPayload::StartGroup { .. } | EventPayload::EndGroup { .. } => Ok(()),
    }
}

fn artboard_mut<'a>(
    state: &'a mut ApplierState,
    artboard_id: &ArtboardId,
    at: &str,
) -> Result<&'a mut Artboard> {
    state
        .document
        .artboard_mut(artboard_id)
        .ok_or_else(|| EngineError::InvariantViolated {
            kind: "UnknownArtboard".to_string(),
            at: at.to_string(),
        })
}

fn layer_mut<'a>(
    state: &'a mut ApplierState,
    artboard_id: &ArtboardId,
    layer_id: &LayerId,
    at: &str,
) -> Result<&'a mut Layer> {
    let artboard = artboard_mut(state, artboard_id, at)?;
    artboard
        .layer_mut(layer_id)
        .ok_or_else(|| unknown_layer(at))
}

fn object_mut<'a>(
    state: &'a mut ApplierState,
    object_id: &ObjectId,
    at: &str,
) -> Result<&'a mut VectorObject> {
    let (artboard_id, layer_id) = state
        .locate(object_id)
        .map(|(a, l)| (a.clone(), l.clone()))
        .ok_or_else(|| unknown_object(at))?;
    let layer = layer_mut(state, &artboard_id, &layer_id, at)?;
    layer.object_mut(object_id).ok_or_else(|| unknown_object(at))
}

fn path_mut<'a>(
    state: &'a mut ApplierState,
    path_id: &ObjectId,
    at: &str,
) -> Result<&'a mut Path> {
    match object_mut(state, path_id, at)? {
        VectorObject::PathObject { path, .. } => Ok(path),
        VectorObject::ShapeObject { .. } => Err(EngineError::InvariantViolated {
            kind: "PathEventOnShape".to_string(),
            at: at.to_string(),
        }),
    }
}

/// The first artboard is the implicit "active" one for selection events,
/// which carry no `artboardId` of their own per §4.1 -- a
/// single-artboard session is the common case; multi-artboard selection
/// targeting is left to the tool layer's event construction.
fn active_artboard_mut<'a>(state: &'a mut ApplierState, at: &str) -> Result<&'a mut Artboard> {
    state
        .document
        .artboards
        .first_mut()
        .ok_or_else(|| EngineError::InvariantViolated {
            kind: "NoActiveArtboard".to_string(),
            at: at.to_string(),
        })
}

fn unknown_object(at: &str) -> EngineError {
    EngineError::InvariantViolated {
        kind: "UnknownObjectId".to_string(),
        at: at.to_string(),
    }
}

fn unknown_anchor(at: &str) -> EngineError {
    EngineError::InvariantViolated {
        kind: "UnknownAnchorIndex".to_string(),
        at: at.to_string(),
    }
}

fn unknown_layer(at: &str) -> EngineError {
    EngineError::InvariantViolated {
        kind: "UnknownLayerId".to_string(),
        at: at.to_string(),
    }
}
