//! Compact text summaries of a scan or plan for an assistant prompt.

use crate::domain::{Finding, Plan, ScanResult};
use crate::plan::PlanSummary;
use crate::utils::truncate_to_tokens;
use std::fmt::Write;

/// Findings listed per residual category.
const FINDINGS_PER_CATEGORY: usize = 20;
/// Diffs included in a plan context.
const SAMPLE_DIFFS: usize = 3;
const DIFF_TOKENS: usize = 1_500;

const INSTRUCTIONS: &str = "\
INSTRUCTIONS:
- Suggest concrete brand_map entries and safe structural patterns if useful
- Suggest import fixes where necessary
- Return actionable, concise steps
";

pub fn scan_context(request: &str, scan: &ScanResult, max_tokens: usize) -> String {
    let mut out = format!("REQUEST: {request}\n\nSCAN SUMMARY:\n");
    let _ = writeln!(out, "root:  {}", scan.root.display());
    let _ = writeln!(out, "files: {}", scan.stats.files);
    let _ = writeln!(out, "dirs:  {}", scan.stats.dirs);
    let _ = writeln!(out, "bytes: {}", scan.stats.total_bytes);
    let _ = writeln!(out, "stack: {}", scan.stack.detected.join(", "));
    if !scan.stats.languages.is_empty() {
        let languages: Vec<String> =
            scan.stats.languages.iter().map(|(lang, count)| format!("{lang}={count}")).collect();
        let _ = writeln!(out, "languages: {}", languages.join(", "));
    }
    if let Some(revision) = &scan.revision {
        let _ = writeln!(out, "revision: {revision}");
    }
    out.push('\n');
    out.push_str(INSTRUCTIONS);
    truncate_to_tokens(&out, max_tokens)
}

pub fn plan_context(request: &str, plan: &Plan, max_tokens: usize) -> String {
    let summary = PlanSummary::of(plan);
    let mut out = format!("REQUEST: {request}\n\nPLAN SUMMARY:\n");
    let _ = writeln!(out, "source_root: {}", plan.source_root.display());
    let _ = writeln!(out, "dest_root:   {}", plan.destination_root.display());
    let _ = writeln!(
        out,
        "files:       {} ({} changed, {} copied)",
        summary.actions, summary.changed, summary.copies
    );
    let brand: Vec<String> = plan.config.brand_map.iter().map(|m| format!("{} -> {}", m.old, m.new)).collect();
    let _ = writeln!(out, "brand_map:   [{}]", brand.join(", "));
    let _ = writeln!(out, "patterns:    {}", plan.config.patterns.len());
    let _ = writeln!(out, "scrub:       {}", plan.config.scrub_secrets);

    out.push_str("\nRESIDUALS:\n");
    section(&mut out, "old_brand_hits", &plan.residual.brand_tokens);
    section(&mut out, "secret_hits", &plan.residual.secrets);
    section(&mut out, "import_warns", &plan.residual.imports);
    section(&mut out, "template_vars", &plan.residual.template_vars);

    for action in plan.actions.iter().filter(|a| a.diff.is_some()).take(SAMPLE_DIFFS) {
        if let Some(diff) = &action.diff {
            let _ = write!(out, "\nDIFF {}:\n{}\n", action.destination, truncate_to_tokens(diff, DIFF_TOKENS));
        }
    }
    out.push('\n');
    out.push_str(INSTRUCTIONS);
    truncate_to_tokens(&out, max_tokens)
}

fn section(out: &mut String, label: &str, findings: &[Finding]) {
    let _ = writeln!(out, "{label}: {}", findings.len());
    for finding in findings.iter().take(FINDINGS_PER_CATEGORY) {
        let _ = writeln!(out, "  {}:{} {}", finding.path, finding.line, finding.detail);
    }
}
