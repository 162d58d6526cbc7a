use crate::ids::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An operation submitted by a collaborating client, carrying the
/// identity needed to break ties deterministically (§4.11).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub local_sequence: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub server_sequence: Option<u64>,
    pub timestamp: i64,
    pub payload: OperationPayload,
}

/// The closed set of operation kinds the transformer resolves. `Insert`
/// carries a position `i` rather than the inserted content, mirroring
/// the "Insert at i" table entries of §4.11 -- this transformer resolves
/// structural position/identity conflicts, not content merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationPayload {
    Insert { index: usize },
    Delete { object_id: ObjectId },
    Move { object_id: ObjectId, delta_x: f64, delta_y: f64 },
    Modify { object_id: ObjectId, property: String, value: Value },
    ModifyAnchor { object_id: ObjectId, anchor_index: usize, value: Value },
}

/// `a` → no-op, represented as a `Delete` on an id that can no longer
/// exist by construction; callers recognize NoOp via
/// [`Operation::is_noop`] rather than a dedicated payload variant, since
/// "turn into nothing" is a transform outcome, not a distinct op kind a
/// client would ever submit.
const NOOP_MARKER: &str = "__noop__";

impl Operation {
    pub fn is_noop(&self) -> bool {
        self.id == NOOP_MARKER
    }

    fn into_noop(mut self) -> Operation {
        self.id = NOOP_MARKER.to_string();
        self
    }
}

/// Transform incoming operation `a` against already-applied operation
/// `b`, both against the same pre-image, per the §4.11 table.
/// Pure: never mutates `a` or `b`, returns the adjusted form of `a`.
pub fn transform(a: &Operation, b: &Operation) -> Operation {
    use OperationPayload::*;

    match (&a.payload, &b.payload) {
        (Insert { index: ia }, Insert { index: ib }) => {
            // Tie-break by (userId, id): the operation that sorts later
            // is treated as having been applied second, so it shifts.
            let a_is_later = (&a.user_id, &a.id) > (&b.user_id, &b.id);
            if *ia == *ib && a_is_later {
                bump_insert(a, *ia + 1)
            } else if *ia > *ib {
                bump_insert(a, *ia + 1)
            } else {
                a.clone()
            }
        }

        (Insert { .. }, Delete { .. }) => a.clone(),

        (Delete { object_id: xa }, Delete { object_id: xb }) if xa == xb => a.clone().into_noop(),

        (Move { object_id: xa, .. }, Delete { object_id: xb }) if xa == xb => {
            a.clone().into_noop()
        }

        (Move { object_id: xa, delta_x: dxa, delta_y: dya }, Move { object_id: xb, .. })
            if xa == xb =>
        {
            // Server order wins: `b` was already applied, so `a`'s delta
            // composes on top unchanged -- the *document's* state after
            // both already reflects `b`'s delta, `a` just adds its own.
            let mut out = a.clone();
            out.payload = Move {
                object_id: xa.clone(),
                delta_x: *dxa,
                delta_y: *dya,
            };
            out
        }

        (Modify { object_id: xa, property: pa, value: _ }, Modify { object_id: xb, property: pb, value: vb })
            if xa == xb && pa == pb =>
        {
            // Last-write-wins by timestamp, tie-break by userId.
            let b_wins = b.timestamp > a.timestamp
                || (b.timestamp == a.timestamp && b.user_id > a.user_id);
            if b_wins {
                let mut out = a.clone();
                out.payload = Modify {
                    object_id: xa.clone(),
                    property: pa.clone(),
                    value: vb.clone(),
                };
                out.into_noop()
            } else {
                a.clone()
            }
        }

        (Modify { object_id: xa, .. }, Delete { object_id: xb }) if xa == xb => {
            a.clone().into_noop()
        }

        (ModifyAnchor { object_id: xa, .. }, Delete { object_id: xb }) if xa == xb => {
            a.clone().into_noop()
        }

        // No conflicting relationship: operations on unrelated objects, or
        // combinations the table does not name a transform for, pass
        // through unchanged.
        _ => a.clone(),
    }
}

fn bump_insert(a: &Operation, new_index: usize) -> Operation {
    let mut out = a.clone();
    out.payload = OperationPayload::Insert { index: new_index };
    out
}
