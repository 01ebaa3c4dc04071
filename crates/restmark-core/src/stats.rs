use serde::{Deserialize, Serialize};

use crate::http::probe::Sample;

/// Statistical summary of all samples for one (phase, target) pair.
///
/// Latencies are milliseconds with sub-millisecond precision. Failed
/// requests count toward the latency fields — a failed call still consumed
/// client time — and the success rate is reported separately so a fast but
/// failing target stays visible as such.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PhaseResult {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Percentage in [0, 100]; 0 for an empty sample set.
    pub success_rate: f64,
    pub requests_per_second: f64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
    pub elapsed_seconds: f64,
}

impl PhaseResult {
    pub fn empty() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            success_rate: 0.0,
            requests_per_second: 0.0,
            avg_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
            p95_ms: 0.0,
            elapsed_seconds: 0.0,
        }
    }
}

/// Reduce a batch of samples into a [`PhaseResult`].
///
/// Pure and deterministic; `elapsed_seconds` is the wall-clock span of the
/// whole concurrent batch as measured by the caller — RPS is derived from
/// it, never from the samples' own latencies.
pub fn summarize(samples: &[Sample], elapsed_seconds: f64) -> PhaseResult {
    let total = samples.len() as u64;
    if total == 0 {
        return PhaseResult::empty();
    }

    let successes = samples.iter().filter(|s| s.success).count() as u64;
    let latencies: Vec<f64> = samples.iter().map(Sample::elapsed_ms).collect();

    let sum: f64 = latencies.iter().sum();
    let min = latencies.iter().copied().fold(f64::INFINITY, f64::min);
    let max = latencies.iter().copied().fold(0.0_f64, f64::max);

    let rps = if elapsed_seconds > 0.0 {
        total as f64 / elapsed_seconds
    } else {
        0.0
    };

    PhaseResult {
        total_requests: total,
        successful_requests: successes,
        failed_requests: total - successes,
        success_rate: successes as f64 / total as f64 * 100.0,
        requests_per_second: rps,
        avg_ms: sum / total as f64,
        min_ms: min,
        max_ms: max,
        p95_ms: percentile_95(latencies),
        elapsed_seconds,
    }
}

/// 95th percentile by rank: `sorted[floor(0.95 × N)]`, clamped to the last
/// valid index. Not interpolated — this index definition is shared across
/// harness implementations so results stay comparable run to run.
fn percentile_95(mut latencies: Vec<f64>) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }
    latencies.sort_by(|a, b| a.total_cmp(b));
    let idx = ((0.95 * latencies.len() as f64).floor() as usize).min(latencies.len() - 1);
    latencies[idx]
}
