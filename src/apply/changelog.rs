//! Extraction changelog written into the destination after a completed run.

use crate::domain::Plan;
use chrono::Utc;

pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

pub fn render_changelog(plan: &Plan, files_written: usize, transformed: usize) -> String {
    let mut out = String::new();
    out.push_str("# Changelog\n\n");
    out.push_str(&format!("## Extracted {}\n\n", Utc::now().format("%Y-%m-%d")));
    out.push_str(&format!("- Source: `{}`\n", plan.source_root.display()));
    out.push_str(&format!("- Destination: `{}`\n", plan.destination_root.display()));
    out.push_str(&format!("- Files written: {files_written} ({transformed} transformed)\n"));
    out.push_str(&format!(
        "- Secret scrubbing: {}\n",
        if plan.config.scrub_secrets { "enabled" } else { "disabled" }
    ));
    out.push_str(&format!("- Structural patterns: {}\n", plan.config.patterns.len()));

    let brand_map = plan.config.effective_brand_map();
    if !brand_map.is_empty() {
        out.push_str("\n### Renamed\n\n");
        for mapping in brand_map {
            out.push_str(&format!("- {} → {}\n", mapping.old, mapping.new));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BrandMapping, TransformConfig, PLAN_SCHEMA_VERSION};
    use std::path::PathBuf;

    #[test]
    fn test_changelog_lists_brand_map() {
        let plan = Plan {
            schema_version: PLAN_SCHEMA_VERSION.into(),
            id: "p".into(),
            created_at: Utc::now(),
            source_root: PathBuf::from("/work/acme"),
            destination_root: PathBuf::from("/work/globex"),
            config: TransformConfig {
                brand_map: vec![BrandMapping::new("Acme", "Globex")],
                ..Default::default()
            },
            actions: Vec::new(),
            directories: Vec::new(),
            residual: Default::default(),
            issues: Vec::new(),
        };
        let text = render_changelog(&plan, 4, 2);
        assert!(text.contains("- Files written: 4 (2 transformed)"));
        assert!(text.contains("- Secret scrubbing: disabled"));
        assert!(text.contains("- Acme → Globex"));
    }
}
