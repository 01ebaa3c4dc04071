use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::http::probe::{self, ProbeCall};
use crate::target::Target;
use crate::workload::HttpMethod;

/// Record ids created during the CREATE phase, per target. Built
/// incrementally by the orchestrator, consumed by [`run_cleanup`], and
/// discarded with the run.
#[derive(Debug, Default)]
pub struct CreatedRecordLedger {
    ids_by_target: HashMap<String, Vec<i64>>,
}

impl CreatedRecordLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, target_name: &str, id: i64) {
        self.ids_by_target
            .entry(target_name.to_string())
            .or_default()
            .push(id);
    }

    pub fn ids_for(&self, target_name: &str) -> &[i64] {
        self.ids_by_target
            .get(target_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_ids(&self) -> usize {
        self.ids_by_target.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_ids() == 0
    }
}

/// Pull the assigned record id out of a CREATE response body.
/// Anything that is not a JSON object with a numeric `id` yields `None`.
pub fn extract_created_id(body: &str) -> Option<i64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("id")?.as_i64()
}

/// Per-target result of a cleanup pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CleanupOutcome {
    pub target: String,
    pub attempted: u64,
    pub deleted: u64,
    pub failed: u64,
    /// Record count observed before the run (seed records).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_count: Option<usize>,
    /// Seed records removed by the DELETE workload phase itself. The DELETE
    /// phase targets a seed id, so these records cannot come back; the
    /// verification accounts for them instead of reporting a false mismatch.
    pub seed_records_deleted: u64,
    /// Record count observed after the cleanup pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_count: Option<usize>,
    /// True when the post-cleanup listing cardinality equals the baseline
    /// less the seed records the DELETE phase removed.
    pub baseline_verified: bool,
}

/// Delete every ledger id from `target`, best-effort.
///
/// A failed deletion is logged and counted but never stops the remaining
/// deletions. Afterwards the target's listing endpoint is re-queried and its
/// cardinality compared against the pre-run baseline — the deletion
/// responses alone are not trusted. Running the pass twice is harmless: the
/// second pass only collects 404s.
pub async fn run_cleanup(
    target: &Target,
    ids: &[i64],
    baseline_count: Option<usize>,
    seed_records_deleted: u64,
) -> CleanupOutcome {
    let mut deleted = 0u64;
    let mut failed = 0u64;

    for id in ids {
        let call = ProbeCall::new(HttpMethod::Delete, target.url(&format!("/db/items/{id}")));
        let sample = probe::execute(target.client(), &call).await;
        if sample.success {
            deleted += 1;
        } else {
            failed += 1;
            tracing::warn!(
                target_name = %target.name(),
                id,
                status = sample.status,
                error = sample.error.as_deref().unwrap_or("non-2xx status"),
                "cleanup deletion failed"
            );
        }
    }

    let final_count = target.record_count().await;
    let baseline_verified = match (baseline_count, final_count) {
        (Some(before), Some(after)) => {
            after as i64 == before as i64 - seed_records_deleted as i64
        }
        _ => false,
    };

    if !baseline_verified {
        tracing::warn!(
            target_name = %target.name(),
            ?baseline_count,
            ?final_count,
            "cleanup could not verify the pre-run baseline"
        );
    }

    CleanupOutcome {
        target: target.name().to_string(),
        attempted: ids.len() as u64,
        deleted,
        failed,
        baseline_count,
        seed_records_deleted,
        final_count,
        baseline_verified,
    }
}
