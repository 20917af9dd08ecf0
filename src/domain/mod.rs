//! Core data model shared by the scanner, plan builder, apply engine and jobs.

pub mod plan;
pub mod scan;
pub mod transform;

pub use plan::{
    ActionKind, Finding, IssueKind, Plan, PlanAction, PlanIssue, ResidualReport, StepName,
    StepResult, PLAN_SCHEMA_VERSION,
};
pub use scan::{FileCategory, NodeKind, ScanNode, ScanResult, ScanStats, StackSignals};
pub use transform::{BrandMapping, ImportFixConfig, LanguageFamily, PatternRule, TransformConfig};
