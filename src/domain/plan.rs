//! Plan types: the reviewable description of what an apply run would write.

use crate::domain::TransformConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const PLAN_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Copy,
    Transform,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Transform => "transform",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    BrandRename,
    SecretScrub,
    StructuralRewrite,
    ImportFix,
    LineEndings,
    TemplateVars,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrandRename => "brand_rename",
            Self::SecretScrub => "secret_scrub",
            Self::StructuralRewrite => "structural_rewrite",
            Self::ImportFix => "import_fix",
            Self::LineEndings => "line_endings",
            Self::TemplateVars => "template_vars",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: StepName,
    pub changed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl StepResult {
    pub fn unchanged(step: StepName) -> Self {
        Self { step, changed: false, warnings: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAction {
    /// Source path relative to the plan's source root.
    pub source: String,
    /// Destination path relative to the plan's destination root.
    pub destination: String,
    pub kind: ActionKind,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepResult>,
    /// Unified diff of all steps combined. Empty when nothing changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// SHA-256 of the source bytes seen at plan time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PlanAction {
    pub fn changed(&self) -> bool {
        self.steps.iter().any(|s| s.changed)
    }
}

/// A single advisory finding in the residual report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Finding {
    pub path: String,
    pub line: usize,
    pub snippet: String,
    pub detail: String,
}

/// Post-transform safety scan over the simulated output. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidualReport {
    #[serde(default)]
    pub brand_tokens: Vec<Finding>,
    #[serde(default)]
    pub secrets: Vec<Finding>,
    #[serde(default)]
    pub imports: Vec<Finding>,
    #[serde(default)]
    pub template_vars: Vec<Finding>,
}

impl ResidualReport {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.brand_tokens.len() + self.secrets.len() + self.imports.len() + self.template_vars.len()
    }

    /// Findings of every category that belong to `path`.
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.brand_tokens
            .iter()
            .chain(&self.secrets)
            .chain(&self.imports)
            .chain(&self.template_vars)
            .filter(move |f| f.path == path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A destination path that would resolve outside the destination root.
    PathEscape,
    /// A selected path that is not part of the scan.
    Missing,
    /// The destination already has entries; apply will refuse.
    DestinationConflict,
    /// The source file could not be read while planning.
    Unreadable,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathEscape => "path_escape",
            Self::Missing => "missing",
            Self::DestinationConflict => "destination_conflict",
            Self::Unreadable => "unreadable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanIssue {
    pub kind: IssueKind,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub schema_version: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    pub config: TransformConfig,
    pub actions: Vec<PlanAction>,
    /// Explicitly selected directories that contain no selected files.
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub residual: ResidualReport,
    #[serde(default)]
    pub issues: Vec<PlanIssue>,
}

impl Plan {
    pub fn destination_conflict(&self) -> bool {
        self.issues.iter().any(|i| i.kind == IssueKind::DestinationConflict)
    }

    pub fn transformed_count(&self) -> usize {
        self.actions.iter().filter(|a| a.kind == ActionKind::Transform && a.changed()).count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.actions.iter().map(|a| a.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_for_path_filters_all_categories() {
        let finding = |path: &str| Finding {
            path: path.into(),
            line: 1,
            snippet: "x".into(),
            detail: "d".into(),
        };
        let report = ResidualReport {
            brand_tokens: vec![finding("a.py")],
            secrets: vec![finding("b.py")],
            imports: vec![finding("a.py")],
            template_vars: Vec::new(),
        };
        assert_eq!(report.total(), 3);
        assert_eq!(report.for_path("a.py").count(), 2);
        assert_eq!(report.for_path("c.py").count(), 0);
    }

    #[test]
    fn step_names_serialize_snake_case() {
        let json = serde_json::to_string(&StepName::BrandRename).unwrap();
        assert_eq!(json, "\"brand_rename\"");
        assert_eq!(StepName::ImportFix.as_str(), "import_fix");
    }
}
