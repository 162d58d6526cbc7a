use crate::ids::{ArtboardId, DocumentId, EventId, GroupId, LayerId, ObjectId};
use serde::{Deserialize, Serialize};
use wiretuner_geom::{AnchorKind, Point, Rectangle, Shape};

/// How a [`EventPayload::SelectObjects`] event combines with the current
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectMode {
    Replace,
    Add,
    Toggle,
}

/// The closed set of domain event kinds (§4.1). Internally tagged on
/// `"type"` so the wire form matches §6.2 exactly; field order
/// within each variant is declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    CreatePath {
        #[serde(rename = "artboardId")]
        artboard_id: ArtboardId,
        #[serde(rename = "layerId")]
        layer_id: LayerId,
        #[serde(rename = "pathId")]
        path_id: ObjectId,
        start: Point,
    },
    AddAnchor {
        #[serde(rename = "pathId")]
        path_id: ObjectId,
        position: Point,
        #[serde(rename = "anchorType")]
        anchor_type: AnchorKind,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        #[serde(rename = "hOut")]
        h_out: Option<Point>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        #[serde(rename = "hIn")]
        h_in: Option<Point>,
    },
    MoveAnchor {
        #[serde(rename = "pathId")]
        path_id: ObjectId,
        #[serde(rename = "anchorIndex")]
        anchor_index: usize,
        position: Point,
    },
    DeleteAnchor {
        #[serde(rename = "pathId")]
        path_id: ObjectId,
        #[serde(rename = "anchorIndex")]
        anchor_index: usize,
    },
    UpdateHandle {
        #[serde(rename = "pathId")]
        path_id: ObjectId,
        #[serde(rename = "anchorIndex")]
        anchor_index: usize,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        #[serde(rename = "hIn")]
        h_in: Option<Point>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        #[serde(rename = "hOut")]
        h_out: Option<Point>,
    },
    FinishPath {
        #[serde(rename = "pathId")]
        path_id: ObjectId,
        closed: bool,
    },
    CreateShape {
        #[serde(rename = "artboardId")]
        artboard_id: ArtboardId,
        #[serde(rename = "layerId")]
        layer_id: LayerId,
        #[serde(rename = "objectId")]
        object_id: ObjectId,
        shape: Shape,
    },
    UpdateShapeParameters {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
        shape: Shape,
    },
    DeleteObject {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
    },
    MoveObject {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
        delta: Point,
    },
    RotateObject {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
        #[serde(rename = "deltaRadians")]
        delta_radians: f64,
    },
    ScaleObject {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
        #[serde(rename = "scaleX")]
        scale_x: f64,
        #[serde(rename = "scaleY")]
        scale_y: f64,
    },
    SelectObjects {
        #[serde(rename = "objectIds")]
        object_ids: Vec<ObjectId>,
        mode: SelectMode,
    },
    ClearSelection {},
    SelectAnchors {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
        #[serde(rename = "anchorIndices")]
        anchor_indices: Vec<usize>,
    },
    CreateLayer {
        #[serde(rename = "artboardId")]
        artboard_id: ArtboardId,
        #[serde(rename = "layerId")]
        layer_id: LayerId,
        name: String,
    },
    ReorderLayers {
        #[serde(rename = "artboardId")]
        artboard_id: ArtboardId,
        #[serde(rename = "layerIds")]
        layer_ids: Vec<LayerId>,
    },
    SetLayerProperties {
        #[serde(rename = "artboardId")]
        artboard_id: ArtboardId,
        #[serde(rename = "layerId")]
        layer_id: LayerId,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        visible: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        locked: Option<bool>,
    },
    CreateArtboard {
        #[serde(rename = "artboardId")]
        artboard_id: ArtboardId,
        name: String,
        bounds: Rectangle,
    },
    UpdateArtboardBounds {
        #[serde(rename = "artboardId")]
        artboard_id: ArtboardId,
        bounds: Rectangle,
    },
    StartGroup {
        #[serde(rename = "groupId")]
        group_id: GroupId,
        label: String,
        reason: String,
    },
    EndGroup {
        #[serde(rename = "groupId")]
        group_id: GroupId,
        label: String,
    },
}

impl EventPayload {
    /// The event type discriminant, matching the `"type"` wire tag.
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::CreatePath { .. } => "CreatePath",
            EventPayload::AddAnchor { .. } => "AddAnchor",
            EventPayload::MoveAnchor { .. } => "MoveAnchor",
            EventPayload::DeleteAnchor { .. } => "DeleteAnchor",
            EventPayload::UpdateHandle { .. } => "UpdateHandle",
            EventPayload::FinishPath { .. } => "FinishPath",
            EventPayload::CreateShape { .. } => "CreateShape",
            EventPayload::UpdateShapeParameters { .. } => "UpdateShapeParameters",
            EventPayload::DeleteObject { .. } => "DeleteObject",
            EventPayload::MoveObject { .. } => "MoveObject",
            EventPayload::RotateObject { .. } => "RotateObject",
            EventPayload::ScaleObject { .. } => "ScaleObject",
            EventPayload::SelectObjects { .. } => "SelectObjects",
            EventPayload::ClearSelection {} => "ClearSelection",
            EventPayload::SelectAnchors { .. } => "SelectAnchors",
            EventPayload::CreateLayer { .. } => "CreateLayer",
            EventPayload::ReorderLayers { .. } => "ReorderLayers",
            EventPayload::SetLayerProperties { .. } => "SetLayerProperties",
            EventPayload::CreateArtboard { .. } => "CreateArtboard",
            EventPayload::UpdateArtboardBounds { .. } => "UpdateArtboardBounds",
            EventPayload::StartGroup { .. } => "StartGroup",
            EventPayload::EndGroup { .. } => "EndGroup",
        }
    }

    /// True for the continuous/high-frequency kinds the sampling recorder
    /// coalesces (§4.3); every other kind is discrete and bypasses sampling.
    pub fn is_continuous(&self) -> bool {
        matches!(
            self,
            EventPayload::MoveAnchor { .. }
                | EventPayload::MoveObject { .. }
                | EventPayload::RotateObject { .. }
                | EventPayload::ScaleObject { .. }
        )
    }
}

/// An event before it has been assigned a sequence number. Produced by the
/// tool layer or the sampling recorder; only [`crate::store::EventStore`]
/// can turn one into an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftEvent {
    pub document_id: DocumentId,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub undo_group_id: Option<GroupId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sampling_interval_ms: Option<u64>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl DraftEvent {
    pub fn new(document_id: DocumentId, timestamp: i64, payload: EventPayload) -> Self {
        DraftEvent {
            document_id,
            timestamp,
            user_id: None,
            session_id: None,
            undo_group_id: None,
            sampling_interval_ms: None,
            payload,
        }
    }

    pub fn with_undo_group(mut self, group_id: GroupId) -> Self {
        self.undo_group_id = Some(group_id);
        self
    }

    pub fn with_sampling_interval(mut self, ms: u64) -> Self {
        self.sampling_interval_ms = Some(ms);
        self
    }
}

/// A durably committed event: a [`DraftEvent`] plus the sequence number and
/// id assigned at commit time. The only constructor is
/// [`Envelope::commit`], called exclusively by the event store, mirroring
/// the commit-index-assignment discipline of a two-type event pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub(crate) event_id: EventId,
    pub event_sequence: u64,
    #[serde(flatten)]
    pub(crate) draft: DraftEvent,
}

impl Envelope {
    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn timestamp(&self) -> i64 {
        self.draft.timestamp
    }

    pub fn user_id(&self) -> Option<&str> {
        self.draft.user_id.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.draft.session_id.as_deref()
    }

    pub fn undo_group_id(&self) -> Option<&GroupId> {
        self.draft.undo_group_id.as_ref()
    }

    pub fn sampling_interval_ms(&self) -> Option<u64> {
        self.draft.sampling_interval_ms
    }

    /// Rebuild an unsequenced draft from this envelope, retargeted at
    /// `document_id`. Used by import paths that replay an event stream
    /// into a different document than the one it was recorded against.
    pub fn to_draft_for(&self, document_id: DocumentId) -> DraftEvent {
        DraftEvent {
            document_id,
            timestamp: self.draft.timestamp,
            user_id: self.draft.user_id.clone(),
            session_id: self.draft.session_id.clone(),
            undo_group_id: self.draft.undo_group_id.clone(),
            sampling_interval_ms: self.draft.sampling_interval_ms,
            payload: self.draft.payload.clone(),
        }
    }
}

impl Envelope {
    /// Assign `sequence` and `event_id` to `draft`. Only the event store
    /// calls this, so sequence assignment can never be forged by callers.
    pub(crate) fn commit(draft: DraftEvent, sequence: u64, event_id: EventId) -> Self {
        Envelope {
            event_id,
            event_sequence: sequence,
            draft,
        }
    }

    pub fn payload(&self) -> &EventPayload {
        &self.draft.payload
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.draft.document_id
    }
}
