//! Import fixing: rename module specifiers so they follow the brand rename.
//!
//! Only package/module specifiers are touched. Relative specifiers (`./x`,
//! `from .x import`) point at files inside the copied tree, whose names are
//! not changed, so they are left alone.

pub mod fallback;
pub mod native;

pub use fallback::LineImportRewriter;
pub use native::TreeSitterImportRewriter;

use crate::transform::brand::BrandVariant;
use crate::utils::escape_literal;
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub content: String,
    pub warnings: Vec<String>,
}

pub trait ImportRewriter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rewrite import specifiers in `content`. `language` is a detected
    /// language name (`python`, `typescript`, ...); `rel_path` refines it (`.tsx`).
    fn rewrite_imports(
        &self,
        content: &str,
        language: &str,
        rel_path: &str,
        renamer: &SpecifierRenamer,
    ) -> ImportOutcome;
}

/// Substring renamer for module specifiers.
///
/// Inside a specifier the boundary rule of the brand step is relaxed: any
/// occurrence of an old variant is replaced, longest first, in one pass.
#[derive(Debug)]
pub struct SpecifierRenamer {
    regex: Option<Regex>,
    replacements: HashMap<String, String>,
}

impl SpecifierRenamer {
    pub fn new(variants: &[BrandVariant]) -> Self {
        let mut ordered: Vec<&BrandVariant> = variants.iter().collect();
        ordered.sort_by(|a, b| b.old.len().cmp(&a.old.len()).then_with(|| a.old.cmp(&b.old)));
        let alternation: Vec<String> = ordered.iter().map(|v| escape_literal(&v.old)).collect();
        let regex =
            if alternation.is_empty() { None } else { Regex::new(&alternation.join("|")).ok() };
        let replacements = ordered.iter().map(|v| (v.old.clone(), v.new.clone())).collect();
        Self { regex, replacements }
    }

    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }

    pub fn rename<'a>(&self, specifier: &'a str) -> std::borrow::Cow<'a, str> {
        match &self.regex {
            Some(regex) => regex.replace_all(specifier, |caps: &regex::Captures<'_>| {
                let found = &caps[0];
                self.replacements.get(found).cloned().unwrap_or_else(|| found.to_string())
            }),
            None => std::borrow::Cow::Borrowed(specifier),
        }
    }
}

pub(crate) fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/')
}

/// Rename the given byte ranges of `content`. Overlapping ranges are dropped.
pub(crate) fn rewrite_ranges(
    content: &str,
    mut ranges: Vec<Range<usize>>,
    renamer: &SpecifierRenamer,
) -> String {
    ranges.sort_by_key(|r| r.start);
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for range in ranges {
        if range.start < last || range.end > content.len() {
            continue;
        }
        let specifier = &content[range.clone()];
        out.push_str(&content[last..range.start]);
        if is_relative_specifier(specifier) {
            out.push_str(specifier);
        } else {
            out.push_str(&renamer.rename(specifier));
        }
        last = range.end;
    }
    out.push_str(&content[last..]);
    out
}
