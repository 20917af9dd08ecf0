//! Recipe options shared by `scan`, `plan`, `apply` and `tools`.

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use super::utils::{
    parse_brand, parse_csv, parse_import_engine, parse_import_families, parse_pair, parse_pattern,
    parse_structural_engine,
};
use crate::config::{load_recipe, Recipe};
use crate::transform::{ImportEngine, StructuralEngine};

#[derive(Args, Debug, Clone, Default)]
pub struct RecipeArgs {
    /// Path to recipe file (repo-extract.toml, .repo-extract.yml, ...)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub recipe: Option<PathBuf>,

    /// Brand rename pair (repeatable)
    #[arg(short = 'b', long = "brand", value_name = "OLD=NEW")]
    pub brand: Vec<String>,

    /// Additional exclusions: names or name globs (comma-separated)
    #[arg(short = 'e', long, value_name = "GLOBS")]
    pub exclude: Option<String>,

    /// Honor .gitignore files while scanning
    #[arg(long)]
    pub gitignore: bool,

    /// Disable secret scrubbing
    #[arg(long)]
    pub no_scrub: bool,

    /// Structural rewrite rule, optionally scoped as `python,go:MATCH=>REWRITE` (repeatable)
    #[arg(long = "pattern", value_name = "MATCH=>REWRITE")]
    pub patterns: Vec<String>,

    /// Fix imports for these families (python, js, rust, go, all)
    #[arg(long, value_name = "LANGS")]
    pub fix_imports: Option<String>,

    /// Convert CRLF line endings to LF
    #[arg(long)]
    pub normalize_eol: bool,

    /// Substitute {{VAR}} placeholders
    #[arg(long)]
    pub templates: bool,

    /// Template variable (repeatable); enables substitution
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Structural engine: auto, comby, template, none
    #[arg(long, value_name = "ENGINE", value_parser = parse_structural_engine)]
    pub structural_engine: Option<StructuralEngine>,

    /// Import engine: native, regex
    #[arg(long, value_name = "ENGINE", value_parser = parse_import_engine)]
    pub import_engine: Option<ImportEngine>,

    /// Timeout for external tools in milliseconds
    #[arg(long, value_name = "MS")]
    pub tool_timeout_ms: Option<u64>,
}

impl RecipeArgs {
    /// Load the recipe for `source_root` and apply command-line overrides.
    pub fn resolve(&self, source_root: &Path) -> Result<Recipe> {
        let mut recipe = load_recipe(source_root, self.recipe.as_deref())?;
        self.apply_overrides(&mut recipe)?;
        Ok(recipe)
    }

    fn apply_overrides(&self, recipe: &mut Recipe) -> Result<()> {
        for pair in &self.brand {
            let mapping = parse_brand(pair)?;
            match recipe.brand_map.iter_mut().find(|m| m.old == mapping.old) {
                Some(existing) => existing.new = mapping.new,
                None => recipe.brand_map.push(mapping),
            }
        }
        if let Some(excludes) = parse_csv(&self.exclude) {
            recipe.excludes.extend(excludes);
        }
        if self.gitignore {
            recipe.respect_gitignore = true;
        }
        if self.no_scrub {
            recipe.scrub_secrets = false;
        }
        for pattern in &self.patterns {
            recipe.patterns.push(parse_pattern(pattern)?);
        }
        if let Some(families) = &self.fix_imports {
            recipe.fix_imports = parse_import_families(families)?;
        }
        if self.normalize_eol {
            recipe.normalize_line_endings = true;
        }
        if self.templates || !self.vars.is_empty() {
            recipe.substitute_templates = true;
        }
        for var in &self.vars {
            let (key, value) = parse_pair(var, "=")?;
            recipe.template_vars.insert(key, value);
        }
        if let Some(engine) = self.structural_engine {
            recipe.engine.structural_engine = engine;
        }
        if let Some(engine) = self.import_engine {
            recipe.engine.import_engine = engine;
        }
        if let Some(timeout) = self.tool_timeout_ms {
            recipe.engine.tool_timeout_ms = timeout;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BrandMapping;

    #[test]
    fn test_cli_overrides_recipe() {
        let mut recipe = Recipe { brand_map: vec![BrandMapping::new("Acme", "Old")], ..Default::default() };
        let args = RecipeArgs {
            brand: vec!["Acme=Nova".into(), "Foo=Bar".into()],
            no_scrub: true,
            vars: vec!["AUTHOR=Nova".into()],
            exclude: Some("*.log, tmp".into()),
            structural_engine: Some(StructuralEngine::None),
            ..Default::default()
        };
        args.apply_overrides(&mut recipe).unwrap();

        assert_eq!(recipe.brand_map, vec![BrandMapping::new("Acme", "Nova"), BrandMapping::new("Foo", "Bar")]);
        assert!(!recipe.scrub_secrets);
        assert!(recipe.substitute_templates);
        assert_eq!(recipe.template_vars.get("AUTHOR").map(String::as_str), Some("Nova"));
        assert_eq!(recipe.excludes, vec!["*.log", "tmp"]);
        assert_eq!(recipe.engine.structural_engine, StructuralEngine::None);
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let args = RecipeArgs { brand: vec!["nothing".into()], ..Default::default() };
        assert!(args.apply_overrides(&mut Recipe::default()).is_err());
    }
}
