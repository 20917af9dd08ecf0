//! Recipe configuration: reusable extraction settings
//!
//! Handles loading from recipe files, environment variables, and CLI arguments
//! with proper precedence (CLI > Env > File > Defaults).

pub mod loader;

pub use loader::{discover_recipe, load_recipe, save_recipe, RECIPE_CANDIDATES};

use crate::apply::{ApplyOptions, DEFAULT_FAILURE_THRESHOLD};
use crate::domain::{BrandMapping, ImportFixConfig, PatternRule, TransformConfig};
use crate::scan::{default_excludes, TreeScanner};
use crate::transform::{Capabilities, ImportEngine, StructuralEngine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Settings for the engines and the apply run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Consecutive per-file failures before an apply aborts. 0 disables the abort.
    pub failure_threshold: usize,
    /// Timeout for external tools such as `comby`, in milliseconds.
    pub tool_timeout_ms: u64,
    pub import_engine: ImportEngine,
    pub structural_engine: StructuralEngine,
    /// Write `CHANGELOG.md` into the destination after a completed apply.
    pub changelog: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            tool_timeout_ms: 10_000,
            import_engine: ImportEngine::default(),
            structural_engine: StructuralEngine::default(),
            changelog: false,
        }
    }
}

/// A saved extraction recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    /// Paths to extract, relative to the source root. Empty selects everything.
    pub includes: Vec<String>,
    /// Extra names or name globs excluded from the scan, on top of the defaults.
    pub excludes: Vec<String>,
    pub respect_gitignore: bool,
    pub brand_map: Vec<BrandMapping>,
    pub scrub_secrets: bool,
    pub patterns: Vec<PatternRule>,
    pub fix_imports: ImportFixConfig,
    pub normalize_line_endings: bool,
    pub substitute_templates: bool,
    pub template_vars: BTreeMap<String, String>,
    pub engine: EngineSettings,
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            excludes: Vec::new(),
            respect_gitignore: false,
            brand_map: Vec::new(),
            scrub_secrets: true,
            patterns: Vec::new(),
            fix_imports: ImportFixConfig::default(),
            normalize_line_endings: false,
            substitute_templates: false,
            template_vars: BTreeMap::new(),
            engine: EngineSettings::default(),
        }
    }
}

impl Recipe {
    pub fn transform_config(&self) -> TransformConfig {
        TransformConfig {
            brand_map: self.brand_map.clone(),
            scrub_secrets: self.scrub_secrets,
            patterns: self.patterns.clone(),
            fix_imports: self.fix_imports.clone(),
            normalize_line_endings: self.normalize_line_endings,
            substitute_templates: self.substitute_templates,
            template_vars: self.template_vars.clone(),
        }
    }

    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions { failure_threshold: self.engine.failure_threshold, changelog: self.engine.changelog }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.engine.tool_timeout_ms.max(1))
    }

    /// Probe and select the engines once for this run.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::detect(self.engine.structural_engine, self.engine.import_engine, self.tool_timeout())
    }

    /// Default exclusions plus the recipe's own.
    pub fn all_excludes(&self) -> Vec<String> {
        let mut excludes = default_excludes();
        for extra in &self.excludes {
            if !excludes.contains(extra) {
                excludes.push(extra.clone());
            }
        }
        excludes
    }

    pub fn scanner(&self, root: &Path) -> TreeScanner {
        TreeScanner::new(root).excludes(self.all_excludes()).respect_gitignore(self.respect_gitignore)
    }
}
