//! Residual report: re-scan the simulated output for what the transforms missed.
//!
//! Findings are advisory. Nothing here can fail a plan.

use crate::domain::{Finding, ResidualReport};
use crate::transform::brand::BrandVariant;
use crate::transform::extras::find_template_vars;
use crate::transform::imports::fallback::specifier_ranges;
use crate::transform::secrets::find_secrets;
use crate::utils::{clip, language_for_path, line_at, line_number, normalize_relative};
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;

const SNIPPET_CHARS: usize = 120;

const JS_RESOLVE_SUFFIXES: &[&str] = &[
    "",
    ".js",
    ".jsx",
    ".ts",
    ".tsx",
    ".mjs",
    ".cjs",
    ".json",
    "/index.js",
    "/index.jsx",
    "/index.ts",
    "/index.tsx",
];

/// One simulated output file.
pub struct OutputFile<'a> {
    pub path: &'a str,
    pub content: &'a str,
}

pub struct ResidualScanner<'a> {
    variants: &'a [BrandVariant],
    /// Destination paths of every file the plan writes.
    included: HashSet<&'a str>,
    check_templates: bool,
}

impl<'a> ResidualScanner<'a> {
    pub fn new(variants: &'a [BrandVariant], included: impl IntoIterator<Item = &'a str>) -> Self {
        Self { variants, included: included.into_iter().collect(), check_templates: false }
    }

    pub fn check_templates(mut self, enabled: bool) -> Self {
        self.check_templates = enabled;
        self
    }

    pub fn scan(&self, outputs: &[OutputFile<'_>]) -> ResidualReport {
        let mut report = ResidualReport::default();
        for file in outputs {
            report.brand_tokens.extend(self.brand_findings(file));
            report.secrets.extend(find_secrets(file.content).into_iter().map(|hit| Finding {
                path: file.path.to_string(),
                line: hit.line,
                snippet: hit.snippet,
                detail: format!("possible secret ({})", hit.rule),
            }));
            report.imports.extend(self.import_findings(file));
            if self.check_templates {
                report.template_vars.extend(find_template_vars(file.content).into_iter().map(
                    |(offset, name)| finding(file, offset, format!("unresolved template variable {{{{{name}}}}}")),
                ));
            }
        }
        report.brand_tokens.sort();
        report.secrets.sort();
        report.imports.sort();
        report.template_vars.sort();
        report
    }

    /// Byte spans covered by new-variant text; old tokens inside them are expected.
    fn new_spans(&self, content: &str) -> Vec<Range<usize>> {
        self.variants
            .iter()
            .flat_map(|v| content.match_indices(v.new.as_str()).map(|(i, m)| i..i + m.len()))
            .collect()
    }

    /// Offsets of old-variant occurrences, with the variant text.
    fn old_occurrences(&self, content: &str) -> Vec<(usize, &'a str)> {
        let covered = self.new_spans(content);
        let mut hits: Vec<(usize, &'a str)> = Vec::new();
        for variant in self.variants {
            for (start, _) in content.match_indices(variant.old.as_str()) {
                let end = start + variant.old.len();
                if covered.iter().any(|span| span.start <= start && end <= span.end) {
                    continue;
                }
                hits.push((start, variant.old.as_str()));
            }
        }
        hits.sort();
        hits
    }

    fn brand_findings(&self, file: &OutputFile<'_>) -> Vec<Finding> {
        let mut seen: BTreeSet<(usize, &str)> = BTreeSet::new();
        let mut out = Vec::new();
        for (offset, token) in self.old_occurrences(file.content) {
            let line = line_number(file.content, offset);
            if !seen.insert((line, token)) {
                continue;
            }
            let detail = if embedded(file.content, offset, token.len()) {
                format!("'{token}' embedded in a larger identifier")
            } else {
                format!("'{token}' was not replaced")
            };
            out.push(finding(file, offset, detail));
        }
        out
    }

    fn import_findings(&self, file: &OutputFile<'_>) -> Vec<Finding> {
        let Some(language) = language_for_path(file.path) else {
            return Vec::new();
        };
        let Some(ranges) = specifier_ranges(file.content, language) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for range in ranges {
            let specifier = &file.content[range.clone()];
            if let Some(token) = self.stale_token(specifier) {
                out.push(finding(
                    file,
                    range.start,
                    format!("import '{specifier}' still references '{token}'"),
                ));
            }
            let unresolved = match language {
                "javascript" | "typescript" if specifier.starts_with('.') => {
                    !self.js_target_included(file.path, specifier)
                }
                "python" if specifier.starts_with('.') => {
                    !self.python_target_included(file.path, specifier)
                }
                _ => false,
            };
            if unresolved {
                out.push(finding(
                    file,
                    range.start,
                    format!("relative import '{specifier}' does not resolve to an extracted file"),
                ));
            }
        }
        out
    }

    fn stale_token(&self, specifier: &str) -> Option<&'a str> {
        self.old_occurrences(specifier).first().map(|(_, token)| *token)
    }

    fn js_target_included(&self, importer: &str, specifier: &str) -> bool {
        let Some(base) = join_relative(parent_dir(importer), specifier) else {
            return false;
        };
        JS_RESOLVE_SUFFIXES.iter().any(|suffix| {
            let candidate = format!("{base}{suffix}");
            self.included.contains(candidate.trim_start_matches('/'))
        })
    }

    /// `from ..pkg.mod import x`: one dot is the importer's package, each extra dot climbs one level.
    fn python_target_included(&self, importer: &str, specifier: &str) -> bool {
        let dots = specifier.chars().take_while(|c| *c == '.').count();
        let module = &specifier[dots..];
        if module.is_empty() {
            // `from . import x` names attributes or submodules; nothing to check cheaply.
            return true;
        }
        let climb = "../".repeat(dots.saturating_sub(1));
        let relative = format!("{climb}{}", module.replace('.', "/"));
        let Some(base) = join_relative(parent_dir(importer), &relative) else {
            return false;
        };
        self.included.contains(format!("{base}.py").as_str())
            || self.included.contains(format!("{base}/__init__.py").as_str())
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn join_relative(dir: &str, relative: &str) -> Option<String> {
    if dir.is_empty() {
        normalize_relative(relative)
    } else {
        normalize_relative(&format!("{dir}/{relative}"))
    }
}

fn embedded(content: &str, offset: usize, len: usize) -> bool {
    let before = content[..offset].chars().next_back();
    let after = content[offset + len..].chars().next();
    before.is_some_and(|c| c.is_ascii_alphanumeric()) || after.is_some_and(|c| c.is_ascii_alphanumeric())
}

fn finding(file: &OutputFile<'_>, offset: usize, detail: String) -> Finding {
    Finding {
        path: file.path.to_string(),
        line: line_number(file.content, offset),
        snippet: clip(line_at(file.content, offset), SNIPPET_CHARS),
        detail,
    }
}
