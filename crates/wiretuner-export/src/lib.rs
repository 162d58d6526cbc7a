//! Bounded-range debug export/import for WireTuner documents, and the
//! plain-data message shapes a collaboration transport would carry.
//!
//! # Overview
//!
//! [`export_range`] pulls a contiguous, size-bounded slice of a document's
//! event log (plus the nearest preceding snapshot) into a single JSON
//! value suitable for filing a bug report or seeding a fixture.
//! [`import_bundle`] does the reverse: it replays an exported bundle into
//! a fresh document, optionally under a new document id, verifying each
//! entry's digest before trusting it.
//!
//! Every exported entry (the optional snapshot and each event) carries a
//! BLAKE3 digest in the bundle's manifest, generalizing the per-entry
//! digest idiom a content-addressed blob store uses for tamper evidence --
//! here applied to a flat JSON export rather than an archive.

pub mod wire;

use serde::{Deserialize, Serialize};
use wiretuner_core::error::{EngineError, Result};
use wiretuner_core::event::{DraftEvent, Envelope};
use wiretuner_core::ids::DocumentId;
use wiretuner_core::snapshot::SnapshotStore;
use wiretuner_core::store::FileEventStore;
use wiretuner_core::{document::Document, replay};

/// Debug-export entries cannot span more than this many sequences (§6.3).
pub const MAX_EXPORT_RANGE: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ManifestEntryKind {
    Snapshot,
    Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub kind: ManifestEntryKind,
    pub sequence: u64,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub document_id: DocumentId,
    pub export_version: u32,
    pub exported_at: i64,
    pub event_range: EventRange,
    pub event_count: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub snapshot_sequence: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotExport {
    pub event_sequence: u64,
    pub data: serde_json::Value,
}

/// The bundle written by [`export_range`] and read by [`import_bundle`].
/// Shape matches the `{metadata, snapshot?, events}` object of §6.3,
/// plus an additive `manifest` array carrying a BLAKE3 digest per entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugExport {
    pub metadata: ExportMetadata,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub snapshot: Option<SnapshotExport>,
    pub events: Vec<Envelope>,
    pub manifest: Vec<ManifestEntry>,
}

fn digest_of(value: &impl Serialize) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Export `[start, end]` (inclusive) of `document_id`'s event log, plus
/// the nearest snapshot at or before `start`, as a single bounded JSON
/// value. Rejects a range wider than [`MAX_EXPORT_RANGE`].
pub fn export_range(
    event_store: &FileEventStore,
    snapshot_store: &SnapshotStore,
    document_id: &DocumentId,
    start: u64,
    end: u64,
    exported_at: i64,
) -> Result<DebugExport> {
    if end < start {
        return Err(EngineError::SchemaValidation {
            field: "eventRange".to_string(),
            reason: format!("end {end} precedes start {start}"),
        });
    }
    let span = end - start + 1;
    if span > MAX_EXPORT_RANGE {
        return Err(EngineError::SchemaValidation {
            field: "eventRange".to_string(),
            reason: format!("range spans {span} events, exceeds max {MAX_EXPORT_RANGE}"),
        });
    }

    let mut manifest = Vec::new();
    let snapshot_bound = start.saturating_sub(1);
    let snapshot = if start > 0 {
        let (found, _warnings) = snapshot_store.latest_at_or_before(document_id, snapshot_bound)?;
        found
    } else {
        None
    };
    let snapshot_export = match &snapshot {
        Some(snap) => {
            let data: serde_json::Value = serde_json::from_slice(&snap.payload)?;
            let export = SnapshotExport {
                event_sequence: snap.event_sequence,
                data,
            };
            manifest.push(ManifestEntry {
                kind: ManifestEntryKind::Snapshot,
                sequence: export.event_sequence,
                digest: digest_of(&export.data)?,
            });
            Some(export)
        }
        None => None,
    };

    let mut events = Vec::new();
    for envelope in event_store.range(document_id, start, Some(end))? {
        let envelope = envelope?;
        manifest.push(ManifestEntry {
            kind: ManifestEntryKind::Event,
            sequence: envelope.event_sequence,
            digest: digest_of(&envelope)?,
        });
        events.push(envelope);
    }

    let metadata = ExportMetadata {
        document_id: document_id.clone(),
        export_version: 1,
        exported_at,
        event_range: EventRange { start, end },
        event_count: events.len(),
        snapshot_sequence: snapshot_export.as_ref().map(|s| s.event_sequence),
    };

    Ok(DebugExport {
        metadata,
        snapshot: snapshot_export,
        events,
        manifest,
    })
}

/// Verify every manifest entry's digest against the bundle's actual
/// snapshot/events. Returns the first mismatch found, if any.
pub fn verify_manifest(bundle: &DebugExport) -> Result<()> {
    let expected_events = bundle.metadata.event_count;
    if bundle.events.len() != expected_events {
        return Err(EngineError::SchemaValidation {
            field: "eventCount".to_string(),
            reason: format!(
                "metadata claims {expected_events} events, bundle carries {}",
                bundle.events.len()
            ),
        });
    }
    for entry in &bundle.manifest {
        let actual = match entry.kind {
            ManifestEntryKind::Snapshot => {
                let snap = bundle.snapshot.as_ref().ok_or_else(|| EngineError::SchemaValidation {
                    field: "snapshot".to_string(),
                    reason: "manifest references a snapshot entry but none is present".to_string(),
                })?;
                digest_of(&snap.data)?
            }
            ManifestEntryKind::Event => {
                let envelope = bundle
                    .events
                    .iter()
                    .find(|e| e.event_sequence == entry.sequence)
                    .ok_or_else(|| EngineError::SchemaValidation {
                        field: "events".to_string(),
                        reason: format!("manifest references event {} not present in bundle", entry.sequence),
                    })?;
                digest_of(envelope)?
            }
        };
        if actual != entry.digest {
            return Err(EngineError::SchemaValidation {
                field: "manifest".to_string(),
                reason: format!(
                    "digest mismatch at sequence {}: expected {}, computed {actual}",
                    entry.sequence, entry.digest
                ),
            });
        }
    }
    Ok(())
}

/// Outcome of [`import_bundle`].
#[derive(Debug)]
pub struct ImportResult {
    pub document: Document,
    pub imported_event_count: usize,
    pub warnings: Vec<EngineError>,
}

/// Replay `bundle` into `target_document_id`, re-sequencing its events to
/// start right after the imported snapshot (or at 0 if the bundle carries
/// none). Digests are checked against the manifest unless
/// `skip_validation` is set.
///
/// This remaps the document id: a bundle exported from one document can
/// be imported into an unrelated, empty one, producing a state equal to
/// replaying the source range on top of the source document (§8 scenario
/// 6), modulo the sequence-number shift the seeded snapshot introduces --
/// see DESIGN.md for the exact rebasing rule.
pub fn import_bundle(
    event_store: &FileEventStore,
    snapshot_store: &SnapshotStore,
    target_document_id: &DocumentId,
    bundle: &DebugExport,
    skip_validation: bool,
) -> Result<ImportResult> {
    if !skip_validation {
        verify_manifest(bundle)?;
    }

    let mut next_sequence = 0u64;
    if let Some(snapshot_export) = &bundle.snapshot {
        let mut document: Document = serde_json::from_value(snapshot_export.data.clone())?;
        document.id = target_document_id.clone();
        let snapshot =
            wiretuner_core::snapshot::create(&document, 0, snapshot_export.event_sequence as i64)?;
        snapshot_store.write(&snapshot)?;
        next_sequence = 1;
    }

    let drafts: Vec<DraftEvent> = bundle
        .events
        .iter()
        .map(|envelope| envelope.to_draft_for(target_document_id.clone()))
        .collect();
    let imported_event_count = drafts.len();
    if !drafts.is_empty() {
        event_store.append_batch(drafts, 200)?;
    }

    let target = if imported_event_count == 0 {
        next_sequence.saturating_sub(1)
    } else {
        next_sequence + imported_event_count as u64 - 1
    };
    let result = replay::replay_to_sequence(
        event_store,
        snapshot_store,
        target_document_id,
        target,
        true,
        None,
    )?;

    Ok(ImportResult {
        document: result.state.document,
        imported_event_count,
        warnings: result.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiretuner_core::event::EventPayload;

    fn draft(document_id: &DocumentId, seq_hint: i64) -> DraftEvent {
        DraftEvent::new(
            document_id.clone(),
            1_000 + seq_hint,
            EventPayload::ClearSelection {},
        )
    }

    #[test]
    fn export_rejects_ranges_wider_than_the_cap() {
        let dir = tempdir().unwrap();
        let event_store = FileEventStore::open(dir.path().join("events")).unwrap();
        let snapshot_store = SnapshotStore::open(dir.path().join("snapshots")).unwrap();
        let doc_id = DocumentId::new();
        let result = export_range(&event_store, &snapshot_store, &doc_id, 0, MAX_EXPORT_RANGE, 1);
        assert!(result.is_err());
    }

    #[test]
    fn export_then_import_round_trips_without_a_snapshot() {
        let dir = tempdir().unwrap();
        let event_store = FileEventStore::open(dir.path().join("events")).unwrap();
        let snapshot_store = SnapshotStore::open(dir.path().join("snapshots")).unwrap();
        let doc_id = DocumentId::new();
        for i in 0..20 {
            event_store.append(draft(&doc_id, i), 50).unwrap();
        }

        let bundle = export_range(&event_store, &snapshot_store, &doc_id, 5, 14, 2_000).unwrap();
        assert_eq!(bundle.events.len(), 10);
        assert_eq!(bundle.metadata.event_count, 10);
        assert!(bundle.snapshot.is_none());
        verify_manifest(&bundle).unwrap();

        let target_dir = tempdir().unwrap();
        let target_event_store = FileEventStore::open(target_dir.path().join("events")).unwrap();
        let target_snapshot_store = SnapshotStore::open(target_dir.path().join("snapshots")).unwrap();
        let target_id = DocumentId::new();
        let imported = import_bundle(
            &target_event_store,
            &target_snapshot_store,
            &target_id,
            &bundle,
            false,
        )
        .unwrap();
        assert_eq!(imported.imported_event_count, 10);
        assert!(imported.warnings.is_empty());
        assert_eq!(imported.document.id, target_id);
    }

    #[test]
    fn import_rejects_a_tampered_manifest_digest() {
        let dir = tempdir().unwrap();
        let event_store = FileEventStore::open(dir.path().join("events")).unwrap();
        let snapshot_store = SnapshotStore::open(dir.path().join("snapshots")).unwrap();
        let doc_id = DocumentId::new();
        for i in 0..5 {
            event_store.append(draft(&doc_id, i), 50).unwrap();
        }
        let mut bundle = export_range(&event_store, &snapshot_store, &doc_id, 0, 4, 2_000).unwrap();
        bundle.manifest[0].digest =
            "0000000000000000000000000000000000000000000000000000000000000000".to_string();

        let target_dir = tempdir().unwrap();
        let target_event_store = FileEventStore::open(target_dir.path().join("events")).unwrap();
        let target_snapshot_store = SnapshotStore::open(target_dir.path().join("snapshots")).unwrap();
        let target_id = DocumentId::new();
        let result =
            import_bundle(&target_event_store, &target_snapshot_store, &target_id, &bundle, false);
        assert!(result.is_err());
    }

    #[test]
    fn import_with_skip_validation_ignores_a_tampered_manifest() {
        let dir = tempdir().unwrap();
        let event_store = FileEventStore::open(dir.path().join("events")).unwrap();
        let snapshot_store = SnapshotStore::open(dir.path().join("snapshots")).unwrap();
        let doc_id = DocumentId::new();
        for i in 0..5 {
            event_store.append(draft(&doc_id, i), 50).unwrap();
        }
        let mut bundle = export_range(&event_store, &snapshot_store, &doc_id, 0, 4, 2_000).unwrap();
        bundle.manifest[0].digest = "corrupted".to_string();

        let target_dir = tempdir().unwrap();
        let target_event_store = FileEventStore::open(target_dir.path().join("events")).unwrap();
        let target_snapshot_store = SnapshotStore::open(target_dir.path().join("snapshots")).unwrap();
        let target_id = DocumentId::new();
        let imported =
            import_bundle(&target_event_store, &target_snapshot_store, &target_id, &bundle, true)
                .unwrap();
        assert_eq!(imported.imported_event_count, 5);
    }
}
