//! Materializes a persistent large-stress fixture on disk for manual perf
//! tracking: a `events/` + `snapshots/` tree under a target directory,
//! built by actually replaying every generated event through the applier
//! (see [`wiretuner_tour::fixture`]).
//!
//! ```sh
//! cargo run --bin gen-large-stress -- fixtures/large-stress
//! ```
//!
//! Tests and benches do not depend on this binary having been run; they
//! generate their own fixtures into a tempdir via the same
//! [`wiretuner_tour::fixture::generate`] call. This binary exists for
//! developers who want a fixture that survives across runs for manual
//! `bench-tour` trend comparisons.

use std::path::PathBuf;
use wiretuner_core::snapshot::SnapshotStore;
use wiretuner_core::store::FileEventStore;
use wiretuner_tour::fixture::{self, FixtureConfig};

fn main() {
    let target_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("fixtures/large-stress"));

    let event_store = FileEventStore::open(target_dir.join("events"))
        .expect("failed to open event store directory");
    let snapshot_store = SnapshotStore::open(target_dir.join("snapshots"))
        .expect("failed to open snapshot store directory");

    let config = FixtureConfig::default();
    let outcome = fixture::generate(&event_store, &snapshot_store, &config)
        .expect("fixture generation failed");

    let manifest = serde_json::json!({
        "documentId": outcome.document_id.0,
        "artboardId": outcome.artboard_id.0,
        "eventCount": outcome.event_count,
        "finalSequence": outcome.final_sequence,
        "snapshotCount": outcome.snapshot_count,
        "seed": config.seed,
    });
    std::fs::write(
        target_dir.join("manifest.json"),
        serde_json::to_vec_pretty(&manifest).expect("serialize manifest"),
    )
    .expect("write manifest.json");

    eprintln!(
        "generated {} events ({} snapshots) for document {} under {}",
        outcome.event_count,
        outcome.snapshot_count,
        outcome.document_id.0,
        target_dir.display()
    );
}
