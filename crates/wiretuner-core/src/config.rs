/// Tunable knobs named after the constants spec'd throughout this engine.
/// Keeping these as fields rather than hardcoded literals lets callers
/// (tests in particular) exercise boundary behavior without recompiling.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Events between automatic snapshots (§4.5).
    pub snapshot_interval: u64,
    /// Snapshots retained per document by `SnapshotStore::prune` (§4.5).
    pub snapshot_keep_count: usize,
    /// Sampling window for the continuous-event recorder, in ms (§4.3).
    pub sampling_interval_ms: u64,
    /// Idle gap that starts a new implicit operation group, in ms (§4.7).
    pub idle_threshold_ms: u64,
    /// Entries held by the undo/redo navigator's replayed-state cache (§4.8).
    pub undo_cache_capacity: usize,
    /// Append-latency threshold above which a warning is emitted (§4.2).
    pub append_latency_warn_ms: u64,
    /// Bounded-retry attempts for transient storage errors on load (§5).
    pub load_retry_attempts: u32,
    /// Backoff schedule in ms for load retries (§5): 10, 40, 160 by default.
    pub load_retry_backoff_ms: [u64; 3],
    /// Default Bezier flattening subdivisions for hit-testing (§4.10).
    pub hit_test_subdivisions: usize,
    /// Current schema version this engine build writes and supports (§3 inv. 6).
    pub schema_version: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            snapshot_interval: 1000,
            snapshot_keep_count: 3,
            sampling_interval_ms: 50,
            idle_threshold_ms: 200,
            undo_cache_capacity: 10,
            append_latency_warn_ms: 50,
            load_retry_attempts: 3,
            load_retry_backoff_ms: [10, 40, 160],
            hit_test_subdivisions: 20,
            schema_version: 1,
        }
    }
}
