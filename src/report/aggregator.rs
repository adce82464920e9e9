//! Folding per-probe results into a run report.
//!
//! Aggregation is a pure function of its inputs. The order of `results`
//! is preserved but never influences the counts or `all_passed`.

use crate::models::{NormalizedResult, ProbeId, RunReport, RunSummary};
use crate::runner::RunError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Build the run report for one orchestration pass.
///
/// Fails only on a broken result set (the same probe id twice), which is
/// an orchestrator-level fault rather than a probe failure.
pub fn aggregate(
    run_id: String,
    results: Vec<NormalizedResult>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> Result<RunReport, RunError> {
    let mut seen = HashSet::with_capacity(results.len());
    for result in &results {
        if !seen.insert(&result.id) {
            return Err(RunError::DuplicateResult(result.id.clone()));
        }
    }

    let summary = RunSummary::from_results(&results);
    let failed: Vec<&NormalizedResult> = results.iter().filter(|r| !r.success).collect();
    let failed_ids: Vec<ProbeId> = failed.iter().map(|r| r.id.clone()).collect();
    let failure_details: Vec<String> = failed.iter().map(|r| format_failure(r)).collect();

    let duration_ms_total = (finished_at - started_at).num_milliseconds().max(0) as u64;

    Ok(RunReport {
        run_id,
        started_at,
        finished_at,
        duration_ms_total,
        all_passed: summary.failed == 0,
        summary,
        failed_ids,
        failure_details,
        results,
    })
}

/// One-line description of a failed probe: `"<id> → <message>"`.
pub fn format_failure(result: &NormalizedResult) -> String {
    format!("{} → {}", result.id, result.message)
}

/// Results sorted slowest first.
pub fn slowest_probes(results: &[NormalizedResult], n: usize) -> Vec<&NormalizedResult> {
    let mut sorted: Vec<&NormalizedResult> = results.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(r.duration_ms));
    sorted.truncate(n);
    sorted
}
