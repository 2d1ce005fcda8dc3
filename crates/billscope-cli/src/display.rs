//! Text cards for analysis reports.
//!
//! Findings are grouped by direction (benefits, costs, other) and each group
//! keeps the ranked order it arrived in.

use std::fmt::Write;

use billscope_core::{ImpactDirection, ImpactFinding};
use billscope_pipeline::{AnalysisReport, AnalysisSource, PipelineStatus};

const MAX_CITATION_CHARS: usize = 280;

// ── Groupings ──

const GROUPS: &[(&str, ImpactDirection)] = &[
    ("Benefits", ImpactDirection::Positive),
    ("Costs", ImpactDirection::Negative),
    ("Other changes", ImpactDirection::Neutral),
];

// ── Public API ──

/// Render a report as grouped text cards.
pub fn render_report(title: &str, report: &AnalysisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== {title} ===");
    let source = match report.source {
        AnalysisSource::Oracle => "full analysis",
        AnalysisSource::Heuristic => "rule-based analysis (analysis service unavailable)",
    };
    let _ = writeln!(
        out,
        "{} finding(s) from {} paragraph(s), {source}",
        report.findings.len(),
        report.chunk_count
    );
    let _ = writeln!(out, "Generated {}", report.completed_at.format("%Y-%m-%d %H:%M UTC"));
    out.push('\n');

    for (header, direction) in GROUPS {
        let group: Vec<&ImpactFinding> = report
            .findings
            .iter()
            .filter(|f| f.impact == *direction)
            .collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{header}");
        for finding in group {
            render_card(&mut out, finding);
        }
    }

    out
}

/// One status event as a single stderr line.
pub fn render_status(status: &PipelineStatus) -> String {
    if status.is_complete && status.error.is_none() {
        return format!("[{:>2}] {:<18} {}", status.step, "done", status.message);
    }
    format!("[{:>2}] {:<18} {}", status.step, status.stage, status.message)
}

// ── Card rendering ──

fn render_card(out: &mut String, finding: &ImpactFinding) {
    let _ = writeln!(out, "  {} [{} / {}]", finding.title, finding.category, finding.severity);
    let _ = writeln!(out, "    {}", finding.description);
    for detail in &finding.details {
        let _ = writeln!(out, "    - {detail}");
    }
    if let Some(citation) = &finding.citation {
        let _ = writeln!(
            out,
            "    {:<10} \"{}\"",
            citation.section_label,
            clip(&citation.text, MAX_CITATION_CHARS)
        );
    }
    out.push('\n');
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max).collect();
    clipped.push_str("...");
    clipped
}
