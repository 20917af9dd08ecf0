//! Transform pipeline: brand rename → secret scrub → structural rewrite →
//! import fix, then the optional line-ending and template steps.
//!
//! The pipeline is a pure function of (content, path, config, capabilities).
//! The plan builder and the apply engine both run it, so a plan's diff is
//! exactly what apply writes.

pub mod brand;
pub mod extras;
pub mod imports;
pub mod secrets;
pub mod structural;

use crate::domain::{LanguageFamily, StepName, StepResult, TransformConfig};
use crate::utils::language_for_path;
use brand::BrandRenamer;
use imports::{ImportRewriter, LineImportRewriter, SpecifierRenamer, TreeSitterImportRewriter};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use structural::{
    CombyRewriter, DisabledRewriter, RewriteResult, StructuralRewriter, TemplateRewriter,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralEngine {
    /// `comby` when installed, else the built-in template engine.
    #[default]
    Auto,
    Comby,
    Template,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportEngine {
    #[default]
    Native,
    Regex,
}

/// The concrete engines chosen for one run.
#[derive(Clone)]
pub struct Capabilities {
    structural: Arc<dyn StructuralRewriter>,
    imports: Arc<dyn ImportRewriter>,
    comby: Option<PathBuf>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("structural", &self.structural.name())
            .field("imports", &self.imports.name())
            .field("comby", &self.comby)
            .finish()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Capabilities {
    /// In-process engines only; never spawns external tools.
    pub fn builtin() -> Self {
        Self {
            structural: Arc::new(TemplateRewriter),
            imports: Arc::new(TreeSitterImportRewriter::new()),
            comby: None,
        }
    }

    /// Probe the environment once and pick engines for this run.
    pub fn detect(structural: StructuralEngine, imports: ImportEngine, tool_timeout: Duration) -> Self {
        let comby = match structural {
            StructuralEngine::Auto | StructuralEngine::Comby => CombyRewriter::detect(tool_timeout),
            _ => None,
        };
        let comby_path = comby.as_ref().map(|c| c.binary().to_path_buf());

        let structural: Arc<dyn StructuralRewriter> = match (structural, comby) {
            (StructuralEngine::None, _) => Arc::new(DisabledRewriter),
            (StructuralEngine::Template, _) => Arc::new(TemplateRewriter),
            (_, Some(comby)) => Arc::new(comby),
            (StructuralEngine::Comby, None) => {
                warn!("comby requested but not found on PATH; using the template engine");
                Arc::new(TemplateRewriter)
            }
            (StructuralEngine::Auto, None) => Arc::new(TemplateRewriter),
        };
        let imports: Arc<dyn ImportRewriter> = match imports {
            ImportEngine::Native => Arc::new(TreeSitterImportRewriter::new()),
            ImportEngine::Regex => Arc::new(LineImportRewriter),
        };

        info!("Engines: structural={}, imports={}", structural.name(), imports.name());
        Self { structural, imports, comby: comby_path }
    }

    pub fn with_structural(mut self, engine: Arc<dyn StructuralRewriter>) -> Self {
        self.structural = engine;
        self
    }

    pub fn with_imports(mut self, engine: Arc<dyn ImportRewriter>) -> Self {
        self.imports = engine;
        self
    }

    pub fn structural_name(&self) -> &'static str {
        self.structural.name()
    }

    pub fn import_name(&self) -> &'static str {
        self.imports.name()
    }

    pub fn comby_path(&self) -> Option<&PathBuf> {
        self.comby.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    pub content: String,
    pub steps: Vec<StepResult>,
}

impl TransformOutcome {
    pub fn changed(&self) -> bool {
        self.steps.iter().any(|s| s.changed)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &String> {
        self.steps.iter().flat_map(|s| s.warnings.iter())
    }
}

/// A configured pipeline. Build once per plan or apply run and reuse per file.
#[derive(Debug)]
pub struct Pipeline {
    config: TransformConfig,
    brand: BrandRenamer,
    specifiers: SpecifierRenamer,
    capabilities: Capabilities,
}

impl Pipeline {
    pub fn new(config: &TransformConfig, capabilities: &Capabilities) -> Self {
        let brand = BrandRenamer::new(&config.effective_brand_map());
        let specifiers = SpecifierRenamer::new(brand.variants());
        Self { config: config.clone(), brand, specifiers, capabilities: capabilities.clone() }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn brand(&self) -> &BrandRenamer {
        &self.brand
    }

    /// Run every enabled step over `content`. Never fails: a step that cannot
    /// complete records a warning and passes its input through.
    pub fn run(&self, content: &str, rel_path: &str) -> TransformOutcome {
        let language = language_for_path(rel_path);
        let mut text = content.to_string();
        let mut steps = Vec::new();

        if !self.brand.is_empty() {
            steps.push(match self.brand.rename(&text) {
                Ok(renamed) => record(StepName::BrandRename, &mut text, renamed, Vec::new()),
                Err(warning) => warned(StepName::BrandRename, warning),
            });
        }

        if self.config.scrub_secrets {
            let scrubbed = secrets::scrub_secrets(&text);
            steps.push(record(StepName::SecretScrub, &mut text, scrubbed.content, Vec::new()));
        }

        if !self.config.patterns.is_empty() {
            steps.push(self.structural_step(&mut text, rel_path, language));
        }

        let family = language.and_then(LanguageFamily::from_language);
        if let (Some(language), Some(family)) = (language, family) {
            if self.config.fix_imports.enabled_for(family) {
                let result = if self.specifiers.is_empty() {
                    StepResult::unchanged(StepName::ImportFix)
                } else {
                    let outcome = self.capabilities.imports.rewrite_imports(
                        &text,
                        language,
                        rel_path,
                        &self.specifiers,
                    );
                    record(StepName::ImportFix, &mut text, outcome.content, outcome.warnings)
                };
                steps.push(result);
            }
        }

        if self.config.normalize_line_endings {
            steps.push(match extras::normalize_line_endings(&text) {
                Some(normalized) => record(StepName::LineEndings, &mut text, normalized, Vec::new()),
                None => StepResult::unchanged(StepName::LineEndings),
            });
        }

        if self.config.substitute_templates {
            let (substituted, _) = extras::substitute_templates(&text, &self.config.template_vars);
            steps.push(record(StepName::TemplateVars, &mut text, substituted, Vec::new()));
        }

        TransformOutcome { content: text, steps }
    }

    fn structural_step(&self, text: &mut String, rel_path: &str, language: Option<&str>) -> StepResult {
        let mut changed = false;
        let mut warnings = Vec::new();
        for rule in &self.config.patterns {
            let in_scope = match language {
                Some(language) => rule.applies_to(language),
                None => rule.languages.is_empty(),
            };
            if !in_scope {
                continue;
            }
            match self.capabilities.structural.rewrite(text, rel_path, rule) {
                RewriteResult::Rewritten(rewritten) => {
                    changed |= rewritten != *text;
                    *text = rewritten;
                }
                RewriteResult::NoMatch => {}
                RewriteResult::Unavailable(reason) => {
                    warnings.push(format!("pattern '{}' skipped: {}", rule.pattern, reason));
                }
            }
        }
        StepResult { step: StepName::StructuralRewrite, changed, warnings }
    }
}

fn record(step: StepName, text: &mut String, next: String, warnings: Vec<String>) -> StepResult {
    let changed = next != *text;
    *text = next;
    StepResult { step, changed, warnings }
}

fn warned(step: StepName, warning: String) -> StepResult {
    StepResult { step, changed: false, warnings: vec![warning] }
}

/// One-shot helper with the built-in engines.
pub fn apply_transforms(content: &str, rel_path: &str, config: &TransformConfig) -> TransformOutcome {
    Pipeline::new(config, &Capabilities::builtin()).run(content, rel_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BrandMapping, ImportFixConfig, PatternRule};

    fn config() -> TransformConfig {
        TransformConfig {
            brand_map: vec![BrandMapping::new("OldBrand", "NewBrand")],
            scrub_secrets: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_brand_then_scrub() {
        let out = apply_transforms("OldBrand_API_KEY = \"sk-abc123def456ghi789jkl\"\n", "config/app.py", &config());
        assert_eq!(out.content, "NewBrand_API_KEY = \"<REDACTED>\"\n");
        let names: Vec<StepName> = out.steps.iter().map(|s| s.step).collect();
        assert_eq!(names, vec![StepName::BrandRename, StepName::SecretScrub]);
        assert!(out.steps.iter().all(|s| s.changed));
    }

    #[test]
    fn test_pipeline_is_idempotent() {
        let cfg = config();
        let input = "# OldBrand tools\nOLDBRAND_PASSWORD = 'hunter2'\nurl = 'postgres://u:pw@db/x'\n";
        let once = apply_transforms(input, "settings.py", &cfg);
        let twice = apply_transforms(&once.content, "settings.py", &cfg);
        assert_eq!(twice.content, once.content);
        assert!(!twice.changed());
    }

    #[test]
    fn test_scrub_leaves_code_expressions_alone() {
        let input = "import os\nAPI_KEY = os.environ[\"API_KEY\"]\nPASSWORD = get_password()\n";
        let out = apply_transforms(input, "settings.py", &config());
        assert_eq!(out.content, input);
        assert!(!out.changed());
    }

    #[test]
    fn test_brand_compile_error_becomes_step_warning() {
        let cfg = config();
        let mut pipeline = Pipeline::new(&cfg, &Capabilities::builtin());
        pipeline.brand = BrandRenamer::broken(&cfg.brand_map, "brand map did not compile: size limit");

        let out = pipeline.run("OldBrand_API_KEY = \"sk-abc123def456ghi789jkl\"\n", "app.py");
        let brand = &out.steps[0];
        assert_eq!(brand.step, StepName::BrandRename);
        assert!(!brand.changed);
        assert_eq!(brand.warnings, vec!["brand map did not compile: size limit".to_string()]);
        // Later steps still run.
        assert_eq!(out.content, "OldBrand_API_KEY = \"<REDACTED>\"\n");
    }

    #[test]
    fn test_unchanged_content_still_reports_steps() {
        let out = apply_transforms("nothing to see\n", "README.md", &config());
        assert_eq!(out.content, "nothing to see\n");
        assert!(!out.changed());
        assert_eq!(out.steps.len(), 2);
    }

    #[test]
    fn test_structural_scope_and_disabled_engine() {
        let cfg = TransformConfig {
            patterns: vec![PatternRule {
                pattern: "print(:[x])".into(),
                rewrite: "log(:[x])".into(),
                languages: vec!["python".into()],
            }],
            ..Default::default()
        };
        let out = apply_transforms("print(1)\n", "a.py", &cfg);
        assert_eq!(out.content, "log(1)\n");
        let out = apply_transforms("print(1)\n", "a.js", &cfg);
        assert_eq!(out.content, "print(1)\n");

        let disabled = Capabilities::detect(StructuralEngine::None, ImportEngine::Native, Duration::from_millis(50));
        let out = Pipeline::new(&cfg, &disabled).run("print(1)\n", "a.py");
        assert_eq!(out.content, "print(1)\n");
        assert_eq!(out.steps[0].warnings.len(), 1);
    }

    #[test]
    fn test_import_fix_follows_brand_rename() {
        let cfg = TransformConfig {
            brand_map: vec![BrandMapping::new("oldbrand", "newbrand")],
            fix_imports: ImportFixConfig::all(),
            ..Default::default()
        };
        let out = apply_transforms("import oldbrandsdk\nx = oldbrandsdk.run()\n", "main.py", &cfg);
        assert_eq!(out.content, "import newbrandsdk\nx = oldbrandsdk.run()\n");
        assert_eq!(out.steps.last().map(|s| s.step), Some(StepName::ImportFix));
    }

    #[test]
    fn test_trailing_steps() {
        let mut cfg = TransformConfig { normalize_line_endings: true, substitute_templates: true, ..Default::default() };
        cfg.template_vars.insert("PROJECT_NAME".into(), "globex".into());
        let out = apply_transforms("# {{PROJECT_NAME}}\r\n", "README.md", &cfg);
        assert_eq!(out.content, "# globex\n");
        let names: Vec<StepName> = out.steps.iter().map(|s| s.step).collect();
        assert_eq!(names, vec![StepName::LineEndings, StepName::TemplateVars]);
    }
}
