pub mod chart;
pub mod export;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cleanup::CleanupOutcome;
use crate::orchestrator::{PhaseRecord, RunOutcome};
use crate::workload::{Category, Phase};

/// Targets below this success rate (percent) are excluded from winning a
/// phase, no matter what RPS they report.
pub const MIN_WINNER_SUCCESS_RATE: f64 = 50.0;

/// Winner of one phase plus how far ahead it was.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PhaseStanding {
    pub phase: Phase,
    /// Highest-RPS target among those meeting the success-rate floor.
    /// `None` when no target qualified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    /// Winner RPS / runner-up RPS, when a qualified runner-up exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rps_ratio: Option<f64>,
    /// Runner-up average latency / winner average latency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ratio: Option<f64>,
}

/// Winner of one category of phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryStanding {
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    /// Phase wins inside this category, per target, in configured order.
    pub phase_wins: Vec<(String, u64)>,
}

/// The persisted artifact of a whole comparison run. Field names are stable
/// so downstream tooling can diff runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ComparisonReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Targets that took part, in configured order.
    pub targets: Vec<String>,
    /// Targets excluded at pre-flight.
    pub skipped_targets: Vec<String>,
    pub results: Vec<PhaseRecord>,
    pub phase_standings: Vec<PhaseStanding>,
    pub category_standings: Vec<CategoryStanding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_champion: Option<String>,
    pub cleanup: Vec<CleanupOutcome>,
}

impl ComparisonReport {
    /// Reduce a finished run into the comparison artifact.
    ///
    /// All winner selection iterates targets in configured order with strict
    /// greater-than comparisons, so ties resolve to the earlier-configured
    /// target and identical inputs always produce identical standings.
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let phase_standings = phase_standings(&outcome.records, &outcome.target_names);
        let category_standings =
            category_standings(&outcome.records, &outcome.target_names, &phase_standings);
        let overall_champion =
            overall_champion(&outcome.records, &outcome.target_names, &category_standings);

        Self {
            run_id: Uuid::new_v4(),
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
            targets: outcome.target_names.clone(),
            skipped_targets: outcome.skipped_targets.clone(),
            results: outcome.records.clone(),
            phase_standings,
            category_standings,
            overall_champion,
            cleanup: outcome.cleanup.clone(),
        }
    }

    pub fn result_for(&self, phase: Phase, target: &str) -> Option<&PhaseRecord> {
        self.results
            .iter()
            .find(|r| r.phase == phase && r.target == target)
    }
}

fn record_for<'a>(
    records: &'a [PhaseRecord],
    phase: Phase,
    target: &str,
) -> Option<&'a PhaseRecord> {
    records
        .iter()
        .find(|r| r.phase == phase && r.target == target)
}

fn phase_standings(records: &[PhaseRecord], targets: &[String]) -> Vec<PhaseStanding> {
    Phase::ALL
        .iter()
        .filter(|phase| records.iter().any(|r| r.phase == **phase))
        .map(|&phase| {
            // Qualified contenders in configured order.
            let contenders: Vec<&PhaseRecord> = targets
                .iter()
                .filter_map(|t| record_for(records, phase, t))
                .filter(|r| r.result.success_rate >= MIN_WINNER_SUCCESS_RATE)
                .collect();

            let winner = contenders
                .iter()
                .fold(None::<&&PhaseRecord>, |best, r| match best {
                    Some(b) if b.result.requests_per_second >= r.result.requests_per_second => best,
                    _ => Some(r),
                })
                .copied();

            let runner_up = winner.and_then(|w| {
                contenders
                    .iter()
                    .filter(|r| r.target != w.target)
                    .fold(None::<&&PhaseRecord>, |best, r| match best {
                        Some(b) if b.result.requests_per_second >= r.result.requests_per_second => {
                            best
                        }
                        _ => Some(r),
                    })
                    .copied()
            });

            let rps_ratio = match (winner, runner_up) {
                (Some(w), Some(r)) if r.result.requests_per_second > 0.0 => {
                    Some(w.result.requests_per_second / r.result.requests_per_second)
                }
                _ => None,
            };
            let latency_ratio = match (winner, runner_up) {
                (Some(w), Some(r)) if w.result.avg_ms > 0.0 => {
                    Some(r.result.avg_ms / w.result.avg_ms)
                }
                _ => None,
            };

            PhaseStanding {
                phase,
                winner: winner.map(|r| r.target.clone()),
                rps_ratio,
                latency_ratio,
            }
        })
        .collect()
}

/// Sum of a target's RPS across the given phases (missing records count 0).
fn summed_rps(records: &[PhaseRecord], phases: &[Phase], target: &str) -> f64 {
    phases
        .iter()
        .filter_map(|&p| record_for(records, p, target))
        .map(|r| r.result.requests_per_second)
        .sum()
}

fn category_standings(
    records: &[PhaseRecord],
    targets: &[String],
    phase_standings: &[PhaseStanding],
) -> Vec<CategoryStanding> {
    Category::ALL
        .iter()
        .filter(|category| {
            records
                .iter()
                .any(|r| r.phase.category() == **category)
        })
        .map(|&category| {
            let phases = category.phases();
            let phase_wins: Vec<(String, u64)> = targets
                .iter()
                .map(|t| {
                    let wins = phase_standings
                        .iter()
                        .filter(|s| s.phase.category() == category)
                        .filter(|s| s.winner.as_deref() == Some(t.as_str()))
                        .count() as u64;
                    (t.clone(), wins)
                })
                .collect();

            let max_wins = phase_wins.iter().map(|(_, w)| *w).max().unwrap_or(0);
            let winner = if max_wins == 0 {
                None
            } else {
                // Most phase wins; ties broken by summed RPS over the
                // category's phases, in configured order.
                phase_wins
                    .iter()
                    .filter(|(_, w)| *w == max_wins)
                    .fold(None::<(&String, f64)>, |best, (t, _)| {
                        let rps = summed_rps(records, &phases, t);
                        match best {
                            Some((_, best_rps)) if best_rps >= rps => best,
                            _ => Some((t, rps)),
                        }
                    })
                    .map(|(t, _)| t.clone())
            };

            CategoryStanding {
                category,
                winner,
                phase_wins,
            }
        })
        .collect()
}

fn overall_champion(
    records: &[PhaseRecord],
    targets: &[String],
    category_standings: &[CategoryStanding],
) -> Option<String> {
    let wins = |t: &str| {
        category_standings
            .iter()
            .filter(|c| c.winner.as_deref() == Some(t))
            .count() as u64
    };
    let max_wins = targets.iter().map(|t| wins(t)).max().unwrap_or(0);
    if max_wins == 0 {
        return None;
    }

    // Most categories; ties broken by aggregate RPS across all phases.
    targets
        .iter()
        .filter(|t| wins(t) == max_wins)
        .fold(None::<(&String, f64)>, |best, t| {
            let rps = summed_rps(records, &Phase::ALL, t);
            match best {
                Some((_, best_rps)) if best_rps >= rps => best,
                _ => Some((t, rps)),
            }
        })
        .map(|(t, _)| t.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::PhaseResult;

    fn result(rps: f64, success_rate: f64, avg_ms: f64) -> PhaseResult {
        let total = 100;
        let successes = (success_rate).round() as u64;
        PhaseResult {
            total_requests: total,
            successful_requests: successes,
            failed_requests: total - successes,
            success_rate,
            requests_per_second: rps,
            avg_ms,
            min_ms: avg_ms / 2.0,
            max_ms: avg_ms * 2.0,
            p95_ms: avg_ms * 1.5,
            elapsed_seconds: 1.0,
        }
    }

    fn record(phase: Phase, target: &str, rps: f64, success_rate: f64, avg_ms: f64) -> PhaseRecord {
        PhaseRecord {
            phase,
            target: target.to_string(),
            result: result(rps, success_rate, avg_ms),
        }
    }

    fn outcome(targets: &[&str], records: Vec<PhaseRecord>) -> RunOutcome {
        let now = Utc::now();
        RunOutcome {
            started_at: now,
            finished_at: now,
            target_names: targets.iter().map(|s| s.to_string()).collect(),
            skipped_targets: Vec::new(),
            records,
            cleanup: Vec::new(),
        }
    }

    #[test]
    fn zero_success_target_never_wins_a_phase() {
        // The failing target fabricates a higher RPS; it must not win.
        let records = vec![
            record(Phase::ReadAll, "honest", 500.0, 100.0, 10.0),
            record(Phase::ReadAll, "liar", 9000.0, 0.0, 1.0),
        ];
        let report = ComparisonReport::from_outcome(&outcome(&["honest", "liar"], records));
        let standing = &report.phase_standings[0];
        assert_eq!(standing.winner.as_deref(), Some("honest"));
    }

    #[test]
    fn no_qualified_target_means_no_winner() {
        let records = vec![
            record(Phase::ReadAll, "a", 100.0, 10.0, 5.0),
            record(Phase::ReadAll, "b", 200.0, 20.0, 5.0),
        ];
        let report = ComparisonReport::from_outcome(&outcome(&["a", "b"], records));
        assert!(report.phase_standings[0].winner.is_none());
        assert!(report.category_standings[0].winner.is_none());
        assert!(report.overall_champion.is_none());
    }

    #[test]
    fn equal_rps_tie_goes_to_earlier_configured_target() {
        let records = vec![
            record(Phase::ReadAll, "first", 100.0, 100.0, 5.0),
            record(Phase::ReadAll, "second", 100.0, 100.0, 5.0),
        ];
        let report = ComparisonReport::from_outcome(&outcome(&["first", "second"], records));
        assert_eq!(report.phase_standings[0].winner.as_deref(), Some("first"));
    }

    #[test]
    fn ratios_compare_winner_to_runner_up() {
        let records = vec![
            record(Phase::Basic, "fast", 200.0, 100.0, 5.0),
            record(Phase::Basic, "slow", 100.0, 100.0, 20.0),
        ];
        let report = ComparisonReport::from_outcome(&outcome(&["fast", "slow"], records));
        let standing = &report.phase_standings[0];
        assert!((standing.rps_ratio.unwrap() - 2.0).abs() < 1e-9);
        assert!((standing.latency_ratio.unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn category_winner_takes_majority_of_phase_wins() {
        // Database WRITE has three phases; "b" wins two of them.
        let records = vec![
            record(Phase::Create, "a", 300.0, 100.0, 5.0),
            record(Phase::Create, "b", 100.0, 100.0, 5.0),
            record(Phase::Update, "a", 100.0, 100.0, 5.0),
            record(Phase::Update, "b", 200.0, 100.0, 5.0),
            record(Phase::Delete, "a", 100.0, 100.0, 5.0),
            record(Phase::Delete, "b", 150.0, 100.0, 5.0),
        ];
        let report = ComparisonReport::from_outcome(&outcome(&["a", "b"], records));
        let write = report
            .category_standings
            .iter()
            .find(|c| c.category == Category::DatabaseWrite)
            .unwrap();
        assert_eq!(write.winner.as_deref(), Some("b"));
        assert_eq!(write.phase_wins, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }

    #[test]
    fn category_tie_breaks_on_summed_rps() {
        // One phase win each inside Database READ; "b" has more total RPS.
        let records = vec![
            record(Phase::ReadAll, "a", 300.0, 100.0, 5.0),
            record(Phase::ReadAll, "b", 200.0, 100.0, 5.0),
            record(Phase::ReadOne, "a", 100.0, 100.0, 5.0),
            record(Phase::ReadOne, "b", 500.0, 100.0, 5.0),
        ];
        let report = ComparisonReport::from_outcome(&outcome(&["a", "b"], records));
        let read = report
            .category_standings
            .iter()
            .find(|c| c.category == Category::DatabaseRead)
            .unwrap();
        assert_eq!(read.winner.as_deref(), Some("b"));
    }

    #[test]
    fn overall_champion_wins_most_categories() {
        let records = vec![
            record(Phase::Basic, "a", 300.0, 100.0, 5.0),
            record(Phase::Basic, "b", 100.0, 100.0, 5.0),
            record(Phase::ReadAll, "a", 300.0, 100.0, 5.0),
            record(Phase::ReadAll, "b", 100.0, 100.0, 5.0),
            record(Phase::StressCpu, "a", 50.0, 100.0, 5.0),
            record(Phase::StressCpu, "b", 80.0, 100.0, 5.0),
        ];
        let report = ComparisonReport::from_outcome(&outcome(&["a", "b"], records));
        assert_eq!(report.overall_champion.as_deref(), Some("a"));
    }

    #[test]
    fn winner_selection_is_deterministic() {
        let records = vec![
            record(Phase::Basic, "a", 120.0, 100.0, 4.0),
            record(Phase::Basic, "b", 120.0, 100.0, 4.0),
            record(Phase::ReadAll, "a", 80.0, 100.0, 4.0),
            record(Phase::ReadAll, "b", 80.0, 100.0, 4.0),
        ];
        let out = outcome(&["a", "b"], records);
        let first = ComparisonReport::from_outcome(&out);
        let second = ComparisonReport::from_outcome(&out);
        let strip = |r: &ComparisonReport| {
            let mut v = serde_json::to_value(r).unwrap();
            v.as_object_mut().unwrap().remove("run_id");
            v
        };
        assert_eq!(strip(&first), strip(&second));
    }

    #[test]
    fn skipped_targets_survive_into_the_report() {
        let now = Utc::now();
        let out = RunOutcome {
            started_at: now,
            finished_at: now,
            target_names: vec!["alive".to_string()],
            skipped_targets: vec!["dead".to_string()],
            records: vec![record(Phase::Basic, "alive", 100.0, 100.0, 5.0)],
            cleanup: Vec::new(),
        };
        let report = ComparisonReport::from_outcome(&out);
        assert_eq!(report.skipped_targets, vec!["dead"]);
        assert!(report.results.iter().all(|r| r.target != "dead"));
    }
}
