//! Plan persistence: JSON by default, YAML for `.yaml`/`.yml` files.

use crate::domain::Plan;
use crate::error::{ExtractError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Json,
    Yaml,
}

impl PlanFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// A saved plan found on disk.
#[derive(Debug, Clone, Serialize)]
pub struct SavedPlan {
    pub id: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub modified: Option<DateTime<Utc>>,
    pub size: u64,
    pub actions: usize,
    pub destination_root: PathBuf,
}

fn persist_error(path: &Path, message: impl ToString) -> ExtractError {
    ExtractError::Persist { path: path.to_path_buf(), message: message.to_string() }
}

pub fn plan_to_string(plan: &Plan, format: PlanFormat) -> Result<String> {
    match format {
        PlanFormat::Json => serde_json::to_string_pretty(plan)
            .map_err(|e| ExtractError::Config(format!("Failed to serialize plan: {e}"))),
        PlanFormat::Yaml => serde_yaml::to_string(plan)
            .map_err(|e| ExtractError::Config(format!("Failed to serialize plan: {e}"))),
    }
}

pub fn save_plan(plan: &Plan, path: &Path) -> Result<()> {
    let text = plan_to_string(plan, PlanFormat::for_path(path))
        .map_err(|e| persist_error(path, e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
    }
    fs::write(path, text).map_err(|e| ExtractError::io(path, e))?;
    debug!("Saved plan {} to {}", plan.id, path.display());
    Ok(())
}

pub fn load_plan(path: &Path) -> Result<Plan> {
    let text = fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
    match PlanFormat::for_path(path) {
        PlanFormat::Json => serde_json::from_str(&text).map_err(|e| persist_error(path, e)),
        PlanFormat::Yaml => serde_yaml::from_str(&text).map_err(|e| persist_error(path, e)),
    }
}

/// Saved plans in `dir`, newest first. Files that do not parse as plans are skipped.
pub fn list_plans(dir: &Path) -> Result<Vec<SavedPlan>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|e| ExtractError::io(dir, e))?;

    let mut plans = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_plan_file = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json") | Some("yaml") | Some("yml")
        );
        if !is_plan_file {
            continue;
        }
        let plan = match load_plan(&path) {
            Ok(plan) => plan,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let metadata = entry.metadata().ok();
        plans.push(SavedPlan {
            id: plan.id,
            created_at: plan.created_at,
            modified: metadata.as_ref().and_then(|m| m.modified().ok()).map(DateTime::<Utc>::from),
            size: metadata.map(|m| m.len()).unwrap_or(0),
            actions: plan.actions.len(),
            destination_root: plan.destination_root,
            path,
        });
    }
    plans.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.path.cmp(&b.path)));
    Ok(plans)
}
