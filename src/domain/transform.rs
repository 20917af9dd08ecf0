//! User-chosen transform options. Immutable for the lifetime of one plan.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `{old, new}` brand token pair. Case variants are derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandMapping {
    #[serde(alias = "from")]
    pub old: String,
    #[serde(alias = "to")]
    pub new: String,
}

impl BrandMapping {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self { old: old.into(), new: new.into() }
    }
}

/// Structural match/rewrite rule. An empty `languages` list means every language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    #[serde(alias = "match")]
    pub pattern: String,
    pub rewrite: String,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl PatternRule {
    pub fn applies_to(&self, language: &str) -> bool {
        self.languages.is_empty() || self.languages.iter().any(|l| l.eq_ignore_ascii_case(language))
    }
}

/// Language families that have an import rewriter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageFamily {
    Python,
    JavaScript,
    Rust,
    Go,
}

impl LanguageFamily {
    /// Map a detected language name onto its import family.
    pub fn from_language(language: &str) -> Option<Self> {
        match language {
            "python" => Some(Self::Python),
            "javascript" | "typescript" => Some(Self::JavaScript),
            "rust" => Some(Self::Rust),
            "go" => Some(Self::Go),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Rust => "rust",
            Self::Go => "go",
        }
    }
}

/// Per-family import fix toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportFixConfig {
    pub python: bool,
    #[serde(alias = "js")]
    pub javascript: bool,
    pub rust: bool,
    pub go: bool,
}

impl ImportFixConfig {
    pub fn all() -> Self {
        Self { python: true, javascript: true, rust: true, go: true }
    }

    pub fn enabled_for(&self, family: LanguageFamily) -> bool {
        match family {
            LanguageFamily::Python => self.python,
            LanguageFamily::JavaScript => self.javascript,
            LanguageFamily::Rust => self.rust,
            LanguageFamily::Go => self.go,
        }
    }

    pub fn any(&self) -> bool {
        self.python || self.javascript || self.rust || self.go
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Applied longest-variant-first; on identical variants the earlier entry wins.
    pub brand_map: Vec<BrandMapping>,
    pub scrub_secrets: bool,
    pub patterns: Vec<PatternRule>,
    pub fix_imports: ImportFixConfig,
    pub normalize_line_endings: bool,
    /// Replace `{{NAME}}` placeholders with `template_vars`.
    pub substitute_templates: bool,
    pub template_vars: BTreeMap<String, String>,
}

impl TransformConfig {
    /// Brand pairs with blank tokens and no-op pairs removed.
    pub fn effective_brand_map(&self) -> Vec<BrandMapping> {
        self.brand_map
            .iter()
            .map(|m| BrandMapping::new(m.old.trim(), m.new.trim()))
            .filter(|m| !m.old.is_empty() && m.old != m.new)
            .collect()
    }
}
