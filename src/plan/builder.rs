//! Plan builder: turn a scan, a selection and a transform config into a Plan.
//!
//! Nothing here writes to disk. Source files are read once, run through the
//! same pipeline apply uses, diffed against their original text, and the
//! simulated outputs are handed to the residual scanner.

use super::diff::unified_diff;
use super::residual::{OutputFile, ResidualScanner};
use crate::domain::{
    ActionKind, IssueKind, Plan, PlanAction, PlanIssue, ScanNode, ScanResult, TransformConfig,
    PLAN_SCHEMA_VERSION,
};
use crate::transform::extras::builtin_template_vars;
use crate::transform::{Capabilities, Pipeline};
use crate::utils::{contained_path, normalize_relative, sha256_hex};
use chrono::{Local, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct PlanBuilder<'a> {
    scan: &'a ScanResult,
    config: TransformConfig,
    destination: PathBuf,
    capabilities: Capabilities,
    today: NaiveDate,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(scan: &'a ScanResult, config: TransformConfig, destination: impl Into<PathBuf>) -> Self {
        Self {
            scan,
            config,
            destination: destination.into(),
            capabilities: Capabilities::builtin(),
            today: Local::now().date_naive(),
        }
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Date used for the `DATE`/`YEAR` template variables.
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Build the plan. An empty selection selects the whole scanned tree.
    pub fn build(&self, selected: &[String]) -> Plan {
        let config = self.resolved_config();
        let pipeline = Pipeline::new(&config, &self.capabilities);

        let mut issues = Vec::new();
        let (files, directories) = self.expand_selection(selected, &mut issues);

        let mut actions = Vec::with_capacity(files.len());
        let mut outputs: Vec<(String, String)> = Vec::new();
        for node in files {
            if contained_path(&self.destination, &node.path).is_err() {
                issues.push(PlanIssue {
                    kind: IssueKind::PathEscape,
                    path: node.path.clone(),
                    message: "destination path would leave the destination root".into(),
                });
                continue;
            }
            match self.plan_file(node, &pipeline) {
                Ok((action, output)) => {
                    if let Some(text) = output {
                        outputs.push((action.destination.clone(), text));
                    }
                    actions.push(action);
                }
                Err(message) => {
                    warn!("Cannot plan {}: {}", node.path, message);
                    issues.push(PlanIssue {
                        kind: IssueKind::Unreadable,
                        path: node.path.clone(),
                        message,
                    });
                }
            }
        }

        if let Some(message) = destination_conflict(&self.destination) {
            issues.push(PlanIssue {
                kind: IssueKind::DestinationConflict,
                path: self.destination.display().to_string(),
                message,
            });
        }

        let variants = pipeline.brand().variants();
        let residual = ResidualScanner::new(variants, actions.iter().map(|a| a.destination.as_str()))
            .check_templates(config.substitute_templates)
            .scan(
                &outputs
                    .iter()
                    .map(|(path, content)| OutputFile { path, content })
                    .collect::<Vec<_>>(),
            );

        let plan = Plan {
            schema_version: PLAN_SCHEMA_VERSION.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            source_root: self.scan.root.clone(),
            destination_root: self.destination.clone(),
            config,
            actions,
            directories,
            residual,
            issues,
        };
        info!(
            "Planned {} actions ({} changed), {} residual findings, {} issues",
            plan.actions.len(),
            plan.transformed_count(),
            plan.residual.total(),
            plan.issues.len()
        );
        plan
    }

    /// User template variables layered over the built-in ones, fixed at plan
    /// time so apply substitutes exactly what the diff shows.
    fn resolved_config(&self) -> TransformConfig {
        let mut config = self.config.clone();
        if config.substitute_templates {
            let mut vars = builtin_template_vars(
                &dir_name(&self.destination),
                &dir_name(&self.scan.root),
                self.today,
            );
            vars.extend(std::mem::take(&mut config.template_vars));
            config.template_vars = vars;
        }
        config
    }

    /// Selected files in path order plus explicitly selected empty directories.
    fn expand_selection(
        &self,
        selected: &[String],
        issues: &mut Vec<PlanIssue>,
    ) -> (Vec<&'a ScanNode>, Vec<String>) {
        let default_selection = [String::new()];
        let selected = if selected.is_empty() { &default_selection[..] } else { selected };

        let mut files: BTreeMap<&'a str, &'a ScanNode> = BTreeMap::new();
        let mut directories = Vec::new();
        for raw in selected {
            let Some(rel) = normalize_relative(raw) else {
                issues.push(PlanIssue {
                    kind: IssueKind::PathEscape,
                    path: raw.clone(),
                    message: "selected path is outside the source root".into(),
                });
                continue;
            };
            let Some(node) = self.scan.find(&rel) else {
                issues.push(PlanIssue {
                    kind: IssueKind::Missing,
                    path: rel,
                    message: "not present in the scan (excluded, a symlink, or missing)".into(),
                });
                continue;
            };
            if node.is_file() {
                files.insert(node.path.as_str(), node);
                continue;
            }
            let below = node.files();
            if below.is_empty() && !rel.is_empty() {
                directories.push(rel);
            }
            for file in below {
                files.insert(file.path.as_str(), file);
            }
        }
        directories.sort();
        directories.dedup();
        (files.into_values().collect(), directories)
    }

    fn plan_file(&self, node: &ScanNode, pipeline: &Pipeline) -> Result<(PlanAction, Option<String>), String> {
        let path = self.scan.root.join(&node.path);
        let bytes = fs::read(&path).map_err(|e| e.to_string())?;
        let mut action = PlanAction {
            source: node.path.clone(),
            destination: node.path.clone(),
            kind: ActionKind::Copy,
            size: bytes.len() as u64,
            steps: Vec::new(),
            diff: None,
            source_sha256: Some(sha256_hex(&bytes)),
            warnings: Vec::new(),
        };
        if node.is_binary {
            return Ok((action, None));
        }

        let original = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                debug!("{} is not UTF-8; copying verbatim", node.path);
                action.warnings.push("not valid UTF-8; copied verbatim".into());
                return Ok((action, None));
            }
        };
        let outcome = pipeline.run(&original, &node.path);
        action.kind = ActionKind::Transform;
        action.diff = unified_diff(&node.path, &original, &outcome.content);
        action.warnings = outcome.warnings().cloned().collect();
        action.steps = outcome.steps;
        Ok((action, Some(outcome.content)))
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Why apply would refuse this destination, if it would.
fn destination_conflict(destination: &Path) -> Option<String> {
    if !destination.exists() {
        return None;
    }
    if !destination.is_dir() {
        return Some("destination exists and is not a directory".into());
    }
    match fs::read_dir(destination) {
        Ok(mut entries) => entries.next().map(|_| "destination already contains entries".into()),
        Err(e) => Some(format!("destination cannot be read: {e}")),
    }
}

/// Build a plan with the built-in engines.
pub fn build_plan(
    scan: &ScanResult,
    selected: &[String],
    config: &TransformConfig,
    destination: &Path,
) -> Plan {
    PlanBuilder::new(scan, config.clone(), destination).build(selected)
}
