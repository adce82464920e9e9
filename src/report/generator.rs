//! Markdown and JSON report generation.
//!
//! This module renders a [`RunReport`] as a plain text artifact for the
//! CLI. The JSON form is the same document the HTTP trigger returns.

use crate::models::{NormalizedResult, RunReport, RunSummary};
use crate::report::slowest_probes;
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str("# PulseCheck Report\n\n");
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_summary_section(&report.summary, report.all_passed));
    output.push_str(&generate_failures_section(&report.failure_details));
    output.push_str(&generate_results_section(&report.results));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &RunReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Run:** `{}`\n", report.run_id));
    section.push_str(&format!(
        "- **Started:** {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Finished:** {}\n",
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Duration:** {}ms\n", report.duration_ms_total));

    let slowest = slowest_probes(&report.results, 1);
    if let Some(slowest) = slowest.first() {
        section.push_str(&format!(
            "- **Slowest Probe:** `{}` ({}ms)\n",
            slowest.id, slowest.duration_ms
        ));
    }
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(summary: &RunSummary, all_passed: bool) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    let verdict = if all_passed {
        "✅ All probes passed"
    } else {
        "❌ Some probes failed"
    };
    section.push_str(&format!("**{}**\n\n", verdict));

    section.push_str("| ✅ Passed | ❌ Failed | **Total** |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | **{}** |\n\n",
        summary.passed, summary.failed, summary.total
    ));

    section
}

/// Generate the failures section.
fn generate_failures_section(details: &[String]) -> String {
    if details.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Failures\n\n");
    for detail in details {
        section.push_str(&format!("- {}\n", detail));
    }
    section.push('\n');

    section
}

/// Generate the per-probe results table.
fn generate_results_section(results: &[NormalizedResult]) -> String {
    let mut section = String::new();

    section.push_str("## Results\n\n");

    if results.is_empty() {
        section.push_str("No probes are registered.\n\n");
        return section;
    }

    section.push_str("| Probe | Status | Duration | Message |\n");
    section.push_str("|:---|:---:|---:|:---|\n");
    for result in results {
        let status = if result.success { "✅" } else { "❌" };
        section.push_str(&format!(
            "| `{}` | {} | {}ms | {} |\n",
            result.id,
            status,
            result.duration_ms,
            escape_cell(&result.message)
        ));
    }
    section.push('\n');

    section
}

/// Keep a message on one table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by PulseCheck*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
