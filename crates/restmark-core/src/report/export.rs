use std::path::Path;

use chrono::SecondsFormat;

use crate::error::RestmarkError;
use crate::report::ComparisonReport;
use crate::workload::Phase;

// ---------------------------------------------------------------------------
// JSON export
// ---------------------------------------------------------------------------

/// Export the comparison report as pretty-printed JSON.
pub fn export_json(report: &ComparisonReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Write the JSON artifact to disk.
pub fn write_json(report: &ComparisonReport, path: &Path) -> Result<(), RestmarkError> {
    let json = export_json(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Export the per-(phase, target) rows as CSV.
///
/// Produces a text document with:
/// - Leading comment lines (prefixed `#`) containing the run summary.
/// - A header row.
/// - One data row per (phase, target) result.
pub fn export_csv(report: &ComparisonReport) -> String {
    let mut out = String::new();

    out.push_str("# restmark comparison run\n");
    out.push_str(&format!("# Run ID: {}\n", report.run_id.hyphenated()));
    out.push_str(&format!(
        "# Started:  {}\n",
        report.started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    out.push_str(&format!(
        "# Finished: {}\n",
        report.finished_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    out.push_str(&format!("# Targets: {}\n", report.targets.join(", ")));
    if !report.skipped_targets.is_empty() {
        out.push_str(&format!(
            "# Skipped (unreachable): {}\n",
            report.skipped_targets.join(", ")
        ));
    }
    if let Some(champion) = &report.overall_champion {
        out.push_str(&format!("# Overall champion: {champion}\n"));
    }
    out.push('\n');

    out.push_str(
        "phase,target,total_requests,successful_requests,failed_requests,success_rate,requests_per_second,avg_ms,min_ms,max_ms,p95_ms,elapsed_seconds\n",
    );

    for record in &report.results {
        let r = &record.result;
        out.push_str(&format!(
            "{},{},{},{},{},{:.2},{:.2},{:.3},{:.3},{:.3},{:.3},{:.3}\n",
            record.phase.name(),
            csv_escape(&record.target),
            r.total_requests,
            r.successful_requests,
            r.failed_requests,
            r.success_rate,
            r.requests_per_second,
            r.avg_ms,
            r.min_ms,
            r.max_ms,
            r.p95_ms,
            r.elapsed_seconds,
        ));
    }

    out
}

/// Write the CSV artifact to disk.
pub fn write_csv(report: &ComparisonReport, path: &Path) -> Result<(), RestmarkError> {
    std::fs::write(path, export_csv(report))?;
    Ok(())
}

/// Wrap a field value in quotes and escape any embedded quotes.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Console rendering
// ---------------------------------------------------------------------------

/// Render the human-readable summary printed at the end of a run.
pub fn render_summary(report: &ComparisonReport) -> String {
    let mut out = String::new();

    out.push_str("=== RESTMARK COMPARISON RESULTS ===\n\n");
    out.push_str(&format!("Targets: {}\n", report.targets.join(", ")));
    if !report.skipped_targets.is_empty() {
        out.push_str(&format!(
            "Skipped (unreachable): {}\n",
            report.skipped_targets.join(", ")
        ));
    }
    out.push('\n');

    for target in &report.targets {
        out.push_str(&format!("--- {target} ---\n"));
        let header = format!(
            "{:<18} {:<10} {:<10} {:<10} {:<10} {:<10} {:<10}",
            "Phase", "Req/s", "Avg(ms)", "Min(ms)", "Max(ms)", "P95(ms)", "Success"
        );
        out.push_str(&header);
        out.push('\n');
        out.push_str(&"-".repeat(header.len()));
        out.push('\n');

        for phase in Phase::ALL {
            if let Some(record) = report.result_for(phase, target) {
                let r = &record.result;
                out.push_str(&format!(
                    "{:<18} {:<10.1} {:<10.2} {:<10.2} {:<10.2} {:<10.2} {}/{}\n",
                    phase.label(),
                    r.requests_per_second,
                    r.avg_ms,
                    r.min_ms,
                    r.max_ms,
                    r.p95_ms,
                    r.successful_requests,
                    r.total_requests,
                ));
            }
        }
        out.push('\n');
    }

    out.push_str("Phase winners:\n");
    for standing in &report.phase_standings {
        match &standing.winner {
            Some(winner) => {
                out.push_str(&format!("  {:<18} {winner}", standing.phase.label()));
                if let Some(ratio) = standing.rps_ratio {
                    out.push_str(&format!("  ({ratio:.2}x RPS vs runner-up"));
                    if let Some(lat) = standing.latency_ratio {
                        out.push_str(&format!(", {lat:.2}x lower latency"));
                    }
                    out.push(')');
                }
                out.push('\n');
            }
            None => {
                out.push_str(&format!(
                    "  {:<18} no winner (no target met the success-rate floor)\n",
                    standing.phase.label()
                ));
            }
        }
    }
    out.push('\n');

    out.push_str("Category winners:\n");
    for standing in &report.category_standings {
        match &standing.winner {
            Some(winner) => {
                out.push_str(&format!("  {:<18} {winner}\n", standing.category.label()))
            }
            None => out.push_str(&format!("  {:<18} no winner\n", standing.category.label())),
        }
    }
    out.push('\n');

    match &report.overall_champion {
        Some(champion) => out.push_str(&format!("Overall champion: {champion}\n")),
        None => out.push_str("Overall champion: none (no category produced a winner)\n"),
    }

    if !report.cleanup.is_empty() {
        out.push('\n');
        out.push_str("Cleanup:\n");
        for outcome in &report.cleanup {
            out.push_str(&format!(
                "  {}: {} attempted, {} deleted, {} failed, baseline {}\n",
                outcome.target,
                outcome.attempted,
                outcome.deleted,
                outcome.failed,
                if outcome.baseline_verified {
                    "verified"
                } else {
                    "NOT verified"
                },
            ));
        }
    }

    out
}
