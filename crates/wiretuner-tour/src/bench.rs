//! Benchmark-stats plumbing shared by the `bench-replay` binary: percentile
//! aggregation over wall-clock samples, the artifact schema it writes, and
//! RSS sampling on Linux.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

pub fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx]
}

pub fn mean(samples: &[Duration]) -> Duration {
    if samples.is_empty() {
        return Duration::ZERO;
    }
    let total = samples
        .iter()
        .fold(Duration::ZERO, |acc, value| acc.saturating_add(*value));
    total / samples.len() as u32
}

pub fn throughput_eps(run_ms: f64, event_count: usize) -> f64 {
    if run_ms <= f64::EPSILON {
        return 0.0;
    }
    (event_count as f64) / (run_ms / 1000.0)
}

pub fn parse_iters(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

#[cfg(target_os = "linux")]
pub fn read_current_rss_kib() -> Option<u64> {
    let status = fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let value = rest.split_whitespace().next()?;
            return value.parse::<u64>().ok();
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
pub fn read_current_rss_kib() -> Option<u64> {
    None
}

/// Percentile/throughput summary over a batch of timed runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkStats {
    pub iters: usize,
    pub run_ms_p50: f64,
    pub run_ms_p95: f64,
    pub run_ms_p99: f64,
    pub run_ms_mean: f64,
    pub throughput_events_per_sec_p50: f64,
    pub throughput_events_per_sec_p95: f64,
    pub throughput_events_per_sec_p99: f64,
    pub peak_rss_kib: Option<u64>,
}

impl BenchmarkStats {
    pub fn from_samples(mut samples: Vec<Duration>, event_count: usize, peak_rss_kib: Option<u64>) -> Self {
        samples.sort_unstable();
        let p50 = percentile(&samples, 0.50).as_secs_f64() * 1000.0;
        let p95 = percentile(&samples, 0.95).as_secs_f64() * 1000.0;
        let p99 = percentile(&samples, 0.99).as_secs_f64() * 1000.0;
        let avg = mean(&samples).as_secs_f64() * 1000.0;
        BenchmarkStats {
            iters: samples.len(),
            run_ms_p50: p50,
            run_ms_p95: p95,
            run_ms_p99: p99,
            run_ms_mean: avg,
            throughput_events_per_sec_p50: throughput_eps(p50, event_count),
            throughput_events_per_sec_p95: throughput_eps(p95, event_count),
            throughput_events_per_sec_p99: throughput_eps(p99, event_count),
            peak_rss_kib,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandProvenance {
    pub argv: Vec<String>,
    pub fixture_event_count: u64,
    pub package_version: String,
    pub target_os: String,
    pub target_arch: String,
}

impl CommandProvenance {
    pub fn current(fixture_event_count: u64) -> Self {
        CommandProvenance {
            argv: std::env::args().collect(),
            fixture_event_count,
            package_version: env!("CARGO_PKG_VERSION").to_string(),
            target_os: std::env::consts::OS.to_string(),
            target_arch: std::env::consts::ARCH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchArtifact {
    pub schema_version: String,
    pub lane: String,
    pub stats: BenchmarkStats,
    pub command: CommandProvenance,
}

const SCHEMA_VERSION: &str = "wiretuner-tour-bench-v1";

pub fn validate_bench_artifact(artifact: &BenchArtifact) -> Result<(), String> {
    if artifact.schema_version != SCHEMA_VERSION {
        return Err(format!(
            "unexpected bench schema_version: {}",
            artifact.schema_version
        ));
    }
    if artifact.stats.iters == 0 {
        return Err("bench stats.iters must be greater than zero".to_string());
    }
    Ok(())
}

pub fn new_artifact(lane: &str, stats: BenchmarkStats, command: CommandProvenance) -> BenchArtifact {
    BenchArtifact {
        schema_version: SCHEMA_VERSION.to_string(),
        lane: lane.to_string(),
        stats,
        command,
    }
}

pub fn write_artifact(path: &PathBuf, artifact: &BenchArtifact) -> Result<(), String> {
    validate_bench_artifact(artifact)?;
    let parent = path
        .parent()
        .ok_or_else(|| format!("artifact path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .map_err(|e| format!("failed to create artifact dir {}: {e}", parent.display()))?;
    let payload = serde_json::to_vec_pretty(artifact)
        .map_err(|e| format!("failed to serialize bench artifact: {e}"))?;
    fs::write(path, payload)
        .map_err(|e| format!("failed to write bench artifact {}: {e}", path.display()))?;
    Ok(())
}

pub fn append_trend_line(path: &PathBuf, artifact: &BenchArtifact) -> Result<(), String> {
    let parent = path
        .parent()
        .ok_or_else(|| format!("trend path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .map_err(|e| format!("failed to create trend dir {}: {e}", parent.display()))?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("failed to open trend log {}: {e}", path.display()))?;
    let line =
        serde_json::to_string(artifact).map_err(|e| format!("failed to serialize trend line: {e}"))?;
    file.write_all(line.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .map_err(|e| format!("failed to append trend line {}: {e}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_empty_is_zero() {
        assert_eq!(percentile(&[], 0.95), Duration::ZERO);
    }

    #[test]
    fn throughput_handles_zero_runtime() {
        assert_eq!(throughput_eps(0.0, 1000), 0.0);
    }

    #[test]
    fn stats_from_samples_computes_percentiles_and_throughput() {
        let samples = vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(30),
            Duration::from_millis(40),
        ];
        let stats = BenchmarkStats::from_samples(samples, 1_000, Some(4096));
        assert_eq!(stats.iters, 4);
        assert!(stats.run_ms_p50 > 0.0);
        assert!(stats.throughput_events_per_sec_p50 > 0.0);
        assert_eq!(stats.peak_rss_kib, Some(4096));
    }

    #[test]
    fn bench_artifact_validator_rejects_zero_iters() {
        let artifact = new_artifact(
            "cold",
            BenchmarkStats {
                iters: 0,
                run_ms_p50: 1.0,
                run_ms_p95: 1.0,
                run_ms_p99: 1.0,
                run_ms_mean: 1.0,
                throughput_events_per_sec_p50: 10.0,
                throughput_events_per_sec_p95: 10.0,
                throughput_events_per_sec_p99: 10.0,
                peak_rss_kib: None,
            },
            CommandProvenance::current(0),
        );
        let err = validate_bench_artifact(&artifact).expect_err("zero iters must be rejected");
        assert!(err.contains("iters"));
    }
}
