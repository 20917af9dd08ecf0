//! Shared CLI utilities.

use anyhow::{bail, Result};

use crate::domain::{BrandMapping, ImportFixConfig, PatternRule};
use crate::transform::{ImportEngine, StructuralEngine};

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

/// Split `KEY<sep>VALUE`, trimming both sides. Neither side may be empty.
pub fn parse_pair(value: &str, sep: &str) -> Result<(String, String)> {
    let Some((key, val)) = value.split_once(sep) else {
        bail!("Expected KEY{}VALUE, got '{}'", sep, value);
    };
    let (key, val) = (key.trim(), val.trim());
    if key.is_empty() || val.is_empty() {
        bail!("Expected KEY{}VALUE, got '{}'", sep, value);
    }
    Ok((key.to_string(), val.to_string()))
}

/// `OLD=NEW`
pub fn parse_brand(value: &str) -> Result<BrandMapping> {
    let (old, new) = parse_pair(value, "=")?;
    Ok(BrandMapping::new(old, new))
}

/// `MATCH=>REWRITE`, optionally prefixed with `lang,lang:` to scope the rule.
pub fn parse_pattern(value: &str) -> Result<PatternRule> {
    let (head, rewrite) = value
        .split_once("=>")
        .ok_or_else(|| anyhow::anyhow!("Expected MATCH=>REWRITE, got '{}'", value))?;
    let (languages, pattern) = match head.split_once(':') {
        Some((langs, rest))
            if !langs.is_empty() && langs.chars().all(|c| c.is_ascii_alphanumeric() || c == ',') =>
        {
            (langs.split(',').filter(|l| !l.is_empty()).map(str::to_string).collect(), rest)
        }
        _ => (Vec::new(), head),
    };
    if pattern.trim().is_empty() {
        bail!("Pattern must not be empty: '{}'", value);
    }
    Ok(PatternRule { pattern: pattern.trim().to_string(), rewrite: rewrite.trim().to_string(), languages })
}

/// `python,js,rust,go` or `all`.
pub fn parse_import_families(value: &str) -> Result<ImportFixConfig> {
    let mut config = ImportFixConfig::default();
    for family in value.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        match family.to_ascii_lowercase().as_str() {
            "all" => config = ImportFixConfig::all(),
            "python" | "py" => config.python = true,
            "javascript" | "js" | "typescript" | "ts" => config.javascript = true,
            "rust" | "rs" => config.rust = true,
            "go" => config.go = true,
            other => bail!("Unknown import family '{}' (expected python, js, rust, go or all)", other),
        }
    }
    Ok(config)
}

pub fn parse_structural_engine(value: &str) -> Result<StructuralEngine, String> {
    match value.to_ascii_lowercase().as_str() {
        "auto" => Ok(StructuralEngine::Auto),
        "comby" => Ok(StructuralEngine::Comby),
        "template" => Ok(StructuralEngine::Template),
        "none" => Ok(StructuralEngine::None),
        other => Err(format!("invalid structural engine '{other}' (auto, comby, template, none)")),
    }
}

pub fn parse_import_engine(value: &str) -> Result<ImportEngine, String> {
    match value.to_ascii_lowercase().as_str() {
        "native" => Ok(ImportEngine::Native),
        "regex" => Ok(ImportEngine::Regex),
        other => Err(format!("invalid import engine '{other}' (native, regex)")),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
