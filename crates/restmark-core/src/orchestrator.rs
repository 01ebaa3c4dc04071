use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::cleanup::{self, CleanupOutcome, CreatedRecordLedger};
use crate::error::RestmarkError;
use crate::runner;
use crate::stats::{self, PhaseResult};
use crate::target::Target;
use crate::workload::{build_phase_plans, Phase, PhasePlan};

/// Knobs for one comparison run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Requests per target for full-volume phases.
    pub requests: usize,
    /// Concurrency ceiling for full-volume phases.
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            requests: 1000,
            concurrency: 50,
            timeout: Duration::from_secs(30),
        }
    }
}

/// The reduction of one (phase, target) batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PhaseRecord {
    pub phase: Phase,
    pub target: String,
    pub result: PhaseResult,
}

/// Everything a completed run produced, handed to the comparator.
#[derive(Debug)]
pub struct RunOutcome {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Reachable targets in configured order.
    pub target_names: Vec<String>,
    /// Targets that failed pre-flight and were excluded from every phase.
    pub skipped_targets: Vec<String>,
    pub records: Vec<PhaseRecord>,
    pub cleanup: Vec<CleanupOutcome>,
}

#[derive(Debug)]
struct TargetState {
    target: Target,
    reachable: bool,
    baseline_count: Option<usize>,
}

/// Explicit run state threaded through the orchestration — no process-wide
/// globals, so isolated runs can coexist in one process (tests rely on it).
#[derive(Debug)]
pub struct RunContext {
    config: RunConfig,
    targets: Vec<TargetState>,
    ledger: CreatedRecordLedger,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(targets: Vec<Target>, config: RunConfig) -> Result<Self, RestmarkError> {
        if targets.is_empty() {
            return Err(RestmarkError::Config("no targets configured".to_string()));
        }
        Ok(Self {
            config,
            targets: targets
                .into_iter()
                .map(|target| TargetState {
                    target,
                    reachable: false,
                    baseline_count: None,
                })
                .collect(),
            ledger: CreatedRecordLedger::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops admission of new requests when cancelled. In-flight
    /// requests finish or time out individually.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Probe every target's `/health` endpoint and record its liveness;
    /// reachable targets also get their pre-run record-count baseline
    /// captured for cleanup verification.
    ///
    /// # Errors
    ///
    /// [`RestmarkError::NoReachableTargets`] when every target fails the
    /// probe — the run must abort before any phase executes.
    pub async fn preflight(&mut self) -> Result<(), RestmarkError> {
        for state in &mut self.targets {
            state.reachable = state.target.check_health().await;
            if state.reachable {
                state.baseline_count = state.target.record_count().await;
                tracing::info!(
                    target_name = %state.target.name(),
                    baseline = ?state.baseline_count,
                    "target reachable"
                );
            } else {
                tracing::warn!(
                    target_name = %state.target.name(),
                    url = %state.target.base_url(),
                    "target unreachable — skipping for this run"
                );
            }
        }

        if self.targets.iter().all(|s| !s.reachable) {
            return Err(RestmarkError::NoReachableTargets);
        }
        Ok(())
    }

    /// Run every phase against every reachable target, then clean up.
    ///
    /// Phases execute strictly sequentially: a phase finishes for all
    /// targets before the next begins for any, so DELETE traffic never
    /// overlaps READ measurements.
    pub async fn execute(mut self) -> Result<RunOutcome, RestmarkError> {
        self.preflight().await?;

        let started_at = Utc::now();
        let plans = build_phase_plans(self.config.requests, self.config.concurrency);
        let mut records = Vec::with_capacity(plans.len() * self.targets.len());
        // Successful DELETE-phase requests remove seed records that cleanup
        // cannot restore; the baseline verification must account for them.
        let mut seed_deletions: std::collections::HashMap<String, u64> =
            std::collections::HashMap::new();

        for plan in &plans {
            if self.cancel.is_cancelled() {
                tracing::warn!(phase = %plan.phase, "run cancelled — skipping remaining phases");
                break;
            }
            for state in self.targets.iter().filter(|s| s.reachable) {
                let result = run_phase_for_target(plan, &state.target, &self.cancel, &mut self.ledger).await;
                if plan.phase == Phase::Delete {
                    seed_deletions
                        .insert(state.target.name().to_string(), result.successful_requests);
                }
                records.push(PhaseRecord {
                    phase: plan.phase,
                    target: state.target.name().to_string(),
                    result,
                });
            }
        }

        // Cleanup runs last, independent of the reporting path, and is not
        // subject to cancellation — it restores the targets' baselines.
        let mut cleanup_outcomes = Vec::new();
        for state in self.targets.iter().filter(|s| s.reachable) {
            let outcome = cleanup::run_cleanup(
                &state.target,
                self.ledger.ids_for(state.target.name()),
                state.baseline_count,
                seed_deletions
                    .get(state.target.name())
                    .copied()
                    .unwrap_or(0),
            )
            .await;
            tracing::info!(
                target_name = %outcome.target,
                attempted = outcome.attempted,
                deleted = outcome.deleted,
                failed = outcome.failed,
                verified = outcome.baseline_verified,
                "cleanup finished"
            );
            cleanup_outcomes.push(outcome);
        }

        Ok(RunOutcome {
            started_at,
            finished_at: Utc::now(),
            target_names: self
                .targets
                .iter()
                .filter(|s| s.reachable)
                .map(|s| s.target.name().to_string())
                .collect(),
            skipped_targets: self
                .targets
                .iter()
                .filter(|s| !s.reachable)
                .map(|s| s.target.name().to_string())
                .collect(),
            records,
            cleanup: cleanup_outcomes,
        })
    }
}

/// Materialize one phase batch for one target, time it wall-clock, and
/// reduce the samples. CREATE responses feed the ledger.
async fn run_phase_for_target(
    plan: &PhasePlan,
    target: &Target,
    cancel: &CancellationToken,
    ledger: &mut CreatedRecordLedger,
) -> PhaseResult {
    tracing::info!(
        phase = %plan.phase,
        target_name = %target.name(),
        requests = plan.requests,
        concurrency = plan.concurrency,
        "running phase"
    );

    let calls = (0..plan.requests)
        .map(|i| plan.call_for(target.base_url(), i))
        .collect();

    let batch_start = Instant::now();
    let samples = runner::run_batch(target.client(), calls, plan.concurrency, cancel).await;
    let elapsed_seconds = batch_start.elapsed().as_secs_f64();

    if plan.phase == Phase::Create {
        for sample in samples.iter().filter(|s| s.success) {
            if let Some(id) = sample.body.as_deref().and_then(cleanup::extract_created_id) {
                ledger.record(target.name(), id);
            }
        }
    }

    let result = stats::summarize(&samples, elapsed_seconds);
    tracing::debug!(
        phase = %plan.phase,
        target_name = %target.name(),
        rps = result.requests_per_second,
        avg_ms = result.avg_ms,
        success_rate = result.success_rate,
        "phase finished"
    );
    result
}
