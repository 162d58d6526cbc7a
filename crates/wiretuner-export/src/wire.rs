//! Collaboration wire contract (§6.4): the message shapes a realtime
//! transport would carry between a client and the server that owns a
//! document's operation log. This module defines the data only -- no
//! socket, no transport, no server loop -- mirroring how the engine
//! "defines, but does not implement" this layer.

pub use wiretuner_core::ot::{transform, Operation, OperationPayload};

use serde::{Deserialize, Serialize};
use wiretuner_geom::Point;

/// A client submitting a locally-applied operation for the server to
/// transform against the log tail and broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSubmit {
    pub op: Operation,
    pub client_sequence: u64,
    pub base_server_sequence: u64,
}

/// Server acknowledgment that a submitted operation was accepted and
/// assigned a place in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationAck {
    pub op_id: String,
    pub server_sequence: u64,
}

/// Server fan-out of an operation (already transformed against the log
/// tail) to every other connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationBroadcast {
    pub op: Operation,
    pub server_sequence: u64,
}

/// Ephemeral per-client cursor/selection state, rebroadcast to peers but
/// never persisted to the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cursor: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub selection: Option<Vec<String>>,
    pub user_id: String,
    pub session_id: String,
    pub ts: i64,
}

/// Sent to a client whose local state has diverged too far to reconcile
/// incrementally; the client is expected to discard its buffered ops and
/// reload from the server's current tip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resync {
    pub server_sequence: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireError {
    pub code: String,
    pub message: String,
}

/// The closed set of messages a collaboration transport exchanges, tagged
/// on `"type"` the same way [`wiretuner_core::event::EventPayload`] is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CollabMessage {
    OperationSubmit(OperationSubmit),
    OperationAck(OperationAck),
    OperationBroadcast(OperationBroadcast),
    Presence(Presence),
    Resync(Resync),
    Error(WireError),
}

/// Policy limits a transport implementation enforces; these are not
/// invariants the types here check, only the documented values of
/// §6.4 for a server to apply.
pub struct RateLimitPolicy;

impl RateLimitPolicy {
    pub const OPS_PER_MINUTE_PER_CLIENT: u32 = 300;
    pub const MAX_CONCURRENT_EDITORS_PER_DOCUMENT: u32 = 10;
    pub const IDLE_TIMEOUT_SECONDS: u32 = 5 * 60;
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiretuner_core::ids::ObjectId;

    #[test]
    fn operation_submit_round_trips_as_json() {
        let msg = CollabMessage::OperationSubmit(OperationSubmit {
            op: Operation {
                id: "op-1".to_string(),
                user_id: "alice".to_string(),
                session_id: "s1".to_string(),
                local_sequence: 0,
                server_sequence: None,
                timestamp: 1_000,
                payload: OperationPayload::Move {
                    object_id: ObjectId::new(),
                    delta_x: 1.0,
                    delta_y: 0.0,
                },
            },
            client_sequence: 0,
            base_server_sequence: 41,
        });
        let json = serde_json::to_string(&msg).unwrap();
        let back: CollabMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn presence_omits_absent_cursor_and_selection() {
        let presence = Presence {
            cursor: None,
            selection: None,
            user_id: "bob".to_string(),
            session_id: "s2".to_string(),
            ts: 5,
        };
        let json = serde_json::to_string(&presence).unwrap();
        assert!(!json.contains("cursor"));
        assert!(!json.contains("selection"));
    }

    #[test]
    fn rate_limit_policy_matches_documented_values() {
        assert_eq!(RateLimitPolicy::OPS_PER_MINUTE_PER_CLIENT, 300);
        assert_eq!(RateLimitPolicy::MAX_CONCURRENT_EDITORS_PER_DOCUMENT, 10);
        assert_eq!(RateLimitPolicy::IDLE_TIMEOUT_SECONDS, 300);
    }
}
