//! Stand-alone replay-performance harness: generates a deterministic
//! large-stress fixture, then times `replay_to_sequence` against spec
//! §4.6's two reference targets (not contracts): a near-snapshot replay
//! and a full replay with no snapshot at all. Emits a JSON artifact and
//! appends a trend line, the way `wiretuner-tour`'s other perf tooling
//! does (see [`wiretuner_tour::bench`]).
//!
//! ```sh
//! cargo run --release --bin bench-tour
//! ```

use std::path::PathBuf;
use std::time::Instant;
use wiretuner_core::replay::replay_to_sequence;
use wiretuner_core::snapshot::SnapshotStore;
use wiretuner_core::store::FileEventStore;
use wiretuner_tour::bench::{
    self, append_trend_line, new_artifact, read_current_rss_kib, write_artifact, BenchmarkStats,
    CommandProvenance,
};
use wiretuner_tour::fixture::{self, FixtureConfig};

fn artifact_path() -> PathBuf {
    std::env::var("WIRETUNER_TOUR_BENCH_ARTIFACT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".tmp/perf/bench_tour_metrics.json"))
}

fn trend_path() -> PathBuf {
    std::env::var("WIRETUNER_PERF_TREND_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".tmp/perf/trends/bench_tour.jsonl"))
}

fn run_lane(
    event_store: &FileEventStore,
    snapshot_store: &SnapshotStore,
    document_id: &wiretuner_core::ids::DocumentId,
    target: u64,
    iters: usize,
) -> (Vec<std::time::Duration>, Option<u64>) {
    let mut samples = Vec::with_capacity(iters);
    let mut peak_rss_kib = None;
    for _ in 0..iters {
        let start = Instant::now();
        let result =
            replay_to_sequence(event_store, snapshot_store, document_id, target, true, None)
                .expect("replay must succeed on a clean fixture");
        std::hint::black_box(&result.state.document.id);
        samples.push(start.elapsed());
        if let Some(rss) = read_current_rss_kib() {
            peak_rss_kib = Some(peak_rss_kib.map_or(rss, |prev: u64| prev.max(rss)));
        }
    }
    (samples, peak_rss_kib)
}

fn main() -> Result<(), String> {
    let iters = bench::parse_iters("WIRETUNER_TOUR_BENCH_ITERS", 10);

    let tmp = tempfile::tempdir().map_err(|e| format!("failed to create tempdir: {e}"))?;
    let event_store = FileEventStore::open(tmp.path().join("events"))
        .map_err(|e| format!("failed to open event store: {e}"))?;
    let snapshot_store = SnapshotStore::open(tmp.path().join("snapshots"))
        .map_err(|e| format!("failed to open snapshot store: {e}"))?;
    let config = FixtureConfig::default();
    let outcome = fixture::generate(&event_store, &snapshot_store, &config)
        .map_err(|e| format!("fixture generation failed: {e}"))?;

    // Lane A: replay within 5000 events of the newest snapshot.
    let (snap, _) = snapshot_store
        .latest_at_or_before(&outcome.document_id, outcome.final_sequence)
        .map_err(|e| format!("snapshot lookup failed: {e}"))?;
    let snap_seq = snap.as_ref().map(|s| s.event_sequence).unwrap_or(0);
    let near_snapshot_target = snap
        .as_ref()
        .map(|s| (s.event_sequence + 5_000).min(outcome.final_sequence))
        .unwrap_or(outcome.final_sequence);
    let (near_samples, near_rss) = run_lane(
        &event_store,
        &snapshot_store,
        &outcome.document_id,
        near_snapshot_target,
        iters,
    );

    // Lane B: full replay with no snapshot help at all.
    let empty_snapshots = SnapshotStore::open(tmp.path().join("snapshots-empty"))
        .map_err(|e| format!("failed to open empty snapshot store: {e}"))?;
    let (full_samples, full_rss) = run_lane(
        &event_store,
        &empty_snapshots,
        &outcome.document_id,
        outcome.final_sequence,
        iters,
    );

    let near_stats = BenchmarkStats::from_samples(
        near_samples,
        (near_snapshot_target - snap_seq) as usize,
        near_rss,
    );
    let full_stats =
        BenchmarkStats::from_samples(full_samples, outcome.event_count as usize, full_rss);

    println!(
        "near_snapshot_replay_ms_p50={:.2} p95={:.2}",
        near_stats.run_ms_p50, near_stats.run_ms_p95
    );
    println!(
        "full_replay_ms_p50={:.2} p95={:.2}",
        full_stats.run_ms_p50, full_stats.run_ms_p95
    );

    let command = CommandProvenance::current(outcome.event_count);
    let artifact = new_artifact("full_replay", full_stats.clone(), command.clone());
    write_artifact(&artifact_path(), &artifact)?;
    println!("tour_bench_artifact={}", artifact_path().display());
    append_trend_line(&trend_path(), &artifact)?;
    println!("tour_perf_trend_log={}", trend_path().display());

    let near_artifact = new_artifact("near_snapshot_replay", near_stats, command);
    write_artifact(
        &artifact_path().with_file_name("bench_tour_near_snapshot.json"),
        &near_artifact,
    )?;

    Ok(())
}
