use crate::applier::{self, ApplierState};
use crate::document::Document;
use crate::error::{EngineError, Result};
use crate::ids::DocumentId;
use crate::snapshot::SnapshotStore;
use crate::store::FileEventStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of [`replay_to_sequence`]: the reconstructed state plus any
/// sequences skipped and warnings accumulated along the way (§4.6).
#[derive(Debug)]
pub struct ReplayResult {
    pub state: ApplierState,
    pub skipped_sequences: Vec<u64>,
    pub warnings: Vec<EngineError>,
}

/// Reconstruct document state at `target` by finding the nearest snapshot
/// and applying the event range on top of it.
///
/// When `continue_on_error` is true, an applier failure at a given
/// sequence is recorded in `skipped_sequences`/`warnings` and replay
/// continues; when false, the first such failure aborts with
/// `ReplayFailed`.
pub fn replay_to_sequence(
    event_store: &FileEventStore,
    snapshot_store: &SnapshotStore,
    document_id: &DocumentId,
    target: u64,
    continue_on_error: bool,
    cancel: Option<&Arc<AtomicBool>>,
) -> Result<ReplayResult> {
    let mut warnings = Vec::new();

    let (snapshot, snapshot_warnings) = snapshot_store.latest_at_or_before(document_id, target)?;
    warnings.extend(snapshot_warnings);

    let (base_document, base_sequence) = match snapshot {
        Some(snap) => {
            let document: Document = serde_json::from_slice(&snap.payload)?;
            (document, snap.event_sequence as i64)
        }
        None => (Document::empty(document_id.clone(), 1), -1),
    };

    let mut state = ApplierState::new(base_document);
    let mut skipped_sequences = Vec::new();

    let from = (base_sequence + 1).max(0) as u64;
    let events = event_store.range(document_id, from, Some(target))?;
    for event in events {
        if let Some(flag) = cancel {
            if flag.load(Ordering::SeqCst) {
                return Err(EngineError::Cancelled);
            }
        }
        let envelope = event?;
        let sequence = envelope.event_sequence;
        match applier::apply(&mut state, &envelope) {
            Ok(()) => {}
            Err(e) => {
                if continue_on_error {
                    skipped_sequences.push(sequence);
                    warnings.push(e);
                } else {
                    return Err(EngineError::ReplayFailed { at_sequence: sequence });
                }
            }
        }
    }

    Ok(ReplayResult {
        state,
        skipped_sequences,
        warnings,
    })
}
