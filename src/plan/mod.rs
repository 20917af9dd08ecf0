//! Plan building, diff previews, residual scanning and persistence.

pub mod builder;
pub mod diff;
pub mod persist;
pub mod residual;

pub use builder::{build_plan, PlanBuilder};
pub use diff::{apply_diff, diff_stats, unified_diff};
pub use persist::{list_plans, load_plan, save_plan, PlanFormat, SavedPlan};
pub use residual::{OutputFile, ResidualScanner};

use crate::domain::{ActionKind, Plan};
use serde::Serialize;

/// Headline numbers for a plan, shown by the CLI and in the assistant context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub actions: usize,
    pub copies: usize,
    pub transforms: usize,
    pub changed: usize,
    pub bytes: u64,
    pub warnings: usize,
    pub residual_findings: usize,
    pub issues: usize,
}

impl PlanSummary {
    pub fn of(plan: &Plan) -> Self {
        Self {
            actions: plan.actions.len(),
            copies: plan.actions.iter().filter(|a| a.kind == ActionKind::Copy).count(),
            transforms: plan.actions.iter().filter(|a| a.kind == ActionKind::Transform).count(),
            changed: plan.transformed_count(),
            bytes: plan.total_bytes(),
            warnings: plan.actions.iter().map(|a| a.warnings.len()).sum(),
            residual_findings: plan.residual.total(),
            issues: plan.issues.len(),
        }
    }
}
