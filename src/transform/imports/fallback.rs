//! Line-based import rewriter. Only lines that match an import/require form are touched.

use super::{rewrite_ranges, ImportOutcome, ImportRewriter, SpecifierRenamer};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static PY_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*from[ \t]+([\w.]+)[ \t]+import\b").expect("valid regex"));
static PY_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*import[ \t]+([\w.]+(?:[ \t]+as[ \t]+\w+)?(?:[ \t]*,[ \t]*[\w.]+(?:[ \t]+as[ \t]+\w+)?)*)")
        .expect("valid regex")
});
static PY_MODULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|,)[ \t]*([\w.]+)").expect("valid regex"));

static JS_SPECIFIERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"\bfrom[ \t]*['"]([^'"\n]+)['"]"#,
        r#"\brequire\([ \t]*['"]([^'"\n]+)['"][ \t]*\)"#,
        r#"\bimport\([ \t]*['"]([^'"\n]+)['"][ \t]*\)"#,
        r#"(?m)^[ \t]*import[ \t]*['"]([^'"\n]+)['"]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static RUST_USE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?use[ \t]+(?:::)?(\w+)").expect("valid regex")
});
static RUST_EXTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*extern[ \t]+crate[ \t]+(\w+)").expect("valid regex"));

static GO_SINGLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import[ \t]+(?:[\w.]+[ \t]+)?"([^"\n]+)""#).expect("valid regex")
});
static GO_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^[ \t]*import[ \t]*\((.*?)^[ \t]*\)").expect("valid regex"));
static GO_BLOCK_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*(?:[\w.]+[ \t]+)?"([^"\n]+)""#).expect("valid regex")
});

fn group_ranges(regex: &Regex, content: &str, group: usize) -> Vec<Range<usize>> {
    regex
        .captures_iter(content)
        .filter_map(|caps| caps.get(group).map(|m| m.range()))
        .collect()
}

fn rust_crate_ranges(content: &str) -> Vec<Range<usize>> {
    let mut ranges = group_ranges(&RUST_USE, content, 1);
    ranges.extend(group_ranges(&RUST_EXTERN, content, 1));
    ranges.retain(|r| !matches!(&content[r.clone()], "crate" | "self" | "super" | "std" | "core"));
    ranges
}

fn python_ranges(content: &str) -> Vec<Range<usize>> {
    let mut ranges = group_ranges(&PY_FROM, content, 1);
    for caps in PY_IMPORT.captures_iter(content) {
        let Some(list) = caps.get(1) else { continue };
        for module in PY_MODULE.captures_iter(list.as_str()) {
            if let Some(m) = module.get(1) {
                ranges.push(list.start() + m.start()..list.start() + m.end());
            }
        }
    }
    ranges
}

fn go_ranges(content: &str) -> Vec<Range<usize>> {
    let mut ranges = group_ranges(&GO_SINGLE, content, 1);
    for caps in GO_BLOCK.captures_iter(content) {
        let Some(body) = caps.get(1) else { continue };
        for line in GO_BLOCK_LINE.captures_iter(body.as_str()) {
            if let Some(m) = line.get(1) {
                ranges.push(body.start() + m.start()..body.start() + m.end());
            }
        }
    }
    ranges
}

/// Collect specifier ranges for `language` using line patterns only.
pub(crate) fn specifier_ranges(content: &str, language: &str) -> Option<Vec<Range<usize>>> {
    let ranges = match language {
        "python" => python_ranges(content),
        "javascript" | "typescript" => {
            JS_SPECIFIERS.iter().flat_map(|re| group_ranges(re, content, 1)).collect()
        }
        "rust" => rust_crate_ranges(content),
        "go" => go_ranges(content),
        _ => return None,
    };
    Some(ranges)
}

#[derive(Debug, Default)]
pub struct LineImportRewriter;

impl ImportRewriter for LineImportRewriter {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn rewrite_imports(
        &self,
        content: &str,
        language: &str,
        _rel_path: &str,
        renamer: &SpecifierRenamer,
    ) -> ImportOutcome {
        match specifier_ranges(content, language) {
            Some(ranges) => ImportOutcome {
                content: rewrite_ranges(content, ranges, renamer),
                warnings: Vec::new(),
            },
            None => ImportOutcome {
                content: content.to_string(),
                warnings: vec![format!("no import rules for language '{language}'")],
            },
        }
    }
}
