//! Recipe file loading

use super::Recipe;
use anyhow::{anyhow, Context, Result};
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment prefix; nested keys use `__`, e.g. `REPO_EXTRACT_ENGINE__FAILURE_THRESHOLD`.
pub const ENV_PREFIX: &str = "REPO_EXTRACT_";

/// File names probed in the source root, in order.
pub const RECIPE_CANDIDATES: &[&str] = &[
    "repo-extract.toml",
    ".repo-extract.toml",
    "repo-extract.yml",
    ".repo-extract.yml",
    "repo-extract.yaml",
    ".repo-extract.yaml",
    "repo-extract.json",
    ".repo-extract.json",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecipeFormat {
    Toml,
    Yaml,
    Json,
}

fn format_for(path: &Path) -> Result<RecipeFormat> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "toml" => Ok(RecipeFormat::Toml),
        "yaml" | "yml" => Ok(RecipeFormat::Yaml),
        "json" => Ok(RecipeFormat::Json),
        other => Err(anyhow!("Unsupported recipe extension '.{}' for file {}", other, path.display())),
    }
}

/// Load a recipe: defaults, then the recipe file, then `REPO_EXTRACT_*` variables.
///
/// A recipe passed explicitly must parse. An auto-discovered one that fails
/// is reported with a warning and ignored.
pub fn load_recipe(source_root: &Path, recipe_path: Option<&Path>) -> Result<Recipe> {
    let explicit = recipe_path.is_some();
    let file = match recipe_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_recipe(source_root),
    };

    let Some(file) = file else {
        return extract(base());
    };

    if explicit && !file.is_file() {
        return Err(anyhow!("Recipe file not found: {}", file.display()));
    }

    match with_file(&file).and_then(extract) {
        Ok(recipe) => {
            tracing::debug!("Loaded recipe from {}", file.display());
            Ok(recipe)
        }
        Err(e) if explicit => Err(e),
        Err(e) => {
            tracing::warn!("Ignoring auto-discovered recipe {}: {:#}", file.display(), e);
            extract(base())
        }
    }
}

fn base() -> Figment {
    Figment::from(Serialized::defaults(Recipe::default()))
}

fn with_file(file: &Path) -> Result<Figment> {
    let figment = match format_for(file)? {
        RecipeFormat::Toml => base().merge(Toml::file(file)),
        RecipeFormat::Yaml => base().merge(Yaml::file(file)),
        RecipeFormat::Json => base().merge(Json::file(file)),
    };
    Ok(figment)
}

fn extract(figment: Figment) -> Result<Recipe> {
    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("Invalid recipe")
}

pub fn discover_recipe(source_root: &Path) -> Option<PathBuf> {
    RECIPE_CANDIDATES.iter().map(|name| source_root.join(name)).find(|path| path.is_file())
}

/// Write `recipe` in the format implied by the file extension.
pub fn save_recipe(recipe: &Recipe, path: &Path) -> Result<()> {
    let text = match format_for(path)? {
        RecipeFormat::Toml => toml::to_string_pretty(recipe).context("Failed to serialize recipe as TOML")?,
        RecipeFormat::Yaml => serde_yaml::to_string(recipe).context("Failed to serialize recipe as YAML")?,
        RecipeFormat::Json => {
            serde_json::to_string_pretty(recipe).context("Failed to serialize recipe as JSON")? + "\n"
        }
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed creating {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("Failed writing recipe: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BrandMapping;
    use crate::transform::{ImportEngine, StructuralEngine};
    use tempfile::TempDir;

    #[test]
    fn test_load_recipe_defaults_when_missing() {
        let tmp = TempDir::new().expect("tmp");
        let recipe = load_recipe(tmp.path(), None).expect("recipe");
        assert_eq!(recipe.engine.failure_threshold, Recipe::default().engine.failure_threshold);
        assert!(recipe.brand_map.is_empty());
    }

    #[test]
    fn test_load_toml_recipe() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(
            tmp.path().join("repo-extract.toml"),
            r#"
includes = ["src/core"]
scrub_secrets = false

[[brand_map]]
from = "Acme"
to = "Nova"

[fix_imports]
python = true

[engine]
failure_threshold = 0
structural_engine = "none"
import_engine = "regex"
"#,
        )
        .expect("write");

        let recipe = load_recipe(tmp.path(), None).expect("recipe");
        assert_eq!(recipe.includes, vec!["src/core"]);
        assert!(!recipe.scrub_secrets);
        assert_eq!(recipe.brand_map, vec![BrandMapping::new("Acme", "Nova")]);
        assert!(recipe.fix_imports.python);
        assert_eq!(recipe.engine.failure_threshold, 0);
        assert_eq!(recipe.engine.structural_engine, StructuralEngine::None);
        assert_eq!(recipe.engine.import_engine, ImportEngine::Regex);
        // Untouched engine keys keep their defaults.
        assert_eq!(recipe.engine.tool_timeout_ms, 10_000);
    }

    #[test]
    fn test_load_yaml_recipe_with_patterns() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("custom.yaml");
        fs::write(
            &path,
            "patterns:\n  - match: \"old(:[args])\"\n    rewrite: \"new(:[args])\"\n    languages: [python]\n",
        )
        .expect("write");

        let recipe = load_recipe(tmp.path(), Some(&path)).expect("recipe");
        assert_eq!(recipe.patterns.len(), 1);
        assert_eq!(recipe.patterns[0].pattern, "old(:[args])");
        assert!(recipe.patterns[0].applies_to("python"));
    }

    #[test]
    fn test_explicit_recipe_invalid_type_returns_err() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "scrub_secrets = \"sometimes\"\n").expect("write");

        let result = load_recipe(tmp.path(), Some(&path));
        assert!(result.is_err(), "explicit recipe with invalid type should return Err");
    }

    #[test]
    fn test_explicit_recipe_missing_or_unsupported_returns_err() {
        let tmp = TempDir::new().expect("tmp");
        assert!(load_recipe(tmp.path(), Some(&tmp.path().join("nope.toml"))).is_err());

        let path = tmp.path().join("recipe.ini");
        fs::write(&path, "x=1\n").expect("write");
        assert!(load_recipe(tmp.path(), Some(&path)).is_err());
    }

    #[test]
    fn test_auto_discovered_invalid_recipe_returns_default() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join(".repo-extract.toml"), "includes = 123\n").expect("write");

        let recipe = load_recipe(tmp.path(), None).expect("should not error on auto-discovery");
        assert!(recipe.includes.is_empty());
    }

    #[test]
    fn test_discovery_order() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("repo-extract.yml"), "{}\n").expect("write");
        fs::write(tmp.path().join(".repo-extract.toml"), "").expect("write");
        let found = discover_recipe(tmp.path()).expect("found");
        assert_eq!(found.file_name().and_then(|n| n.to_str()), Some(".repo-extract.toml"));
    }

    #[test]
    fn test_save_and_reload_each_format() {
        let tmp = TempDir::new().expect("tmp");
        let mut recipe = Recipe::default();
        recipe.brand_map.push(BrandMapping::new("Acme", "Nova"));
        recipe.template_vars.insert("AUTHOR".into(), "Nova Team".into());
        recipe.engine.changelog = true;

        for name in ["r.toml", "nested/r.yaml", "r.json"] {
            let path = tmp.path().join(name);
            save_recipe(&recipe, &path).expect("save");
            let loaded = load_recipe(tmp.path(), Some(&path)).expect("load");
            assert_eq!(loaded, recipe, "{name}");
        }
    }
}
