//! Brand rename: case-variant aware, longest-match-first token replacement.

use crate::domain::BrandMapping;
use crate::utils::escape_literal;
use fancy_regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// One derived `(old variant, new variant)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandVariant {
    pub old: String,
    pub new: String,
}

/// Title-case the way most templating tools do: the first letter of every
/// alphabetic run is upper-cased, the rest lower-cased.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if prev_alpha {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        prev_alpha = ch.is_alphabetic();
    }
    out
}

/// Derive `{exact, UPPER, Title, lower}` variants for each mapping.
///
/// A variant string already produced by an earlier variant or an earlier
/// mapping is skipped, so the exact spelling and the first entry win.
pub fn brand_variants(mappings: &[BrandMapping]) -> Vec<BrandVariant> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for mapping in mappings {
        let candidates = [
            (mapping.old.clone(), mapping.new.clone()),
            (mapping.old.to_uppercase(), mapping.new.to_uppercase()),
            (title_case(&mapping.old), title_case(&mapping.new)),
            (mapping.old.to_lowercase(), mapping.new.to_lowercase()),
        ];
        for (old, new) in candidates {
            if old.is_empty() || !seen.insert(old.clone()) {
                continue;
            }
            out.push(BrandVariant { old, new });
        }
    }
    out
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
}

/// Pattern for one variant. Alphanumeric edges must not touch another
/// alphanumeric character; `_`, `-`, `.` and `/` all count as separators.
/// Edges that are not alphanumeric (a dotted prefix such as `acme.`) match freely.
fn variant_pattern(variant: &str) -> String {
    let mut pattern = String::new();
    if variant.chars().next().is_some_and(is_token_char) {
        pattern.push_str("(?<![A-Za-z0-9])");
    }
    pattern.push_str(&escape_literal(variant));
    if variant.chars().last().is_some_and(is_token_char) {
        pattern.push_str("(?![A-Za-z0-9])");
    }
    pattern
}

/// Compiled brand rename step. Build once per plan or apply run.
#[derive(Debug)]
pub struct BrandRenamer {
    /// `Ok(None)` for an empty map; `Err` keeps the compile error for every file.
    regex: Result<Option<Regex>, String>,
    replacements: HashMap<String, String>,
    variants: Vec<BrandVariant>,
}

impl BrandRenamer {
    pub fn new(mappings: &[BrandMapping]) -> Self {
        let mut variants = brand_variants(mappings);
        // Longest first so that `AcmeCorp` is never shadowed by `Acme`.
        variants.sort_by(|a, b| b.old.len().cmp(&a.old.len()).then_with(|| a.old.cmp(&b.old)));

        let replacements: HashMap<String, String> =
            variants.iter().map(|v| (v.old.clone(), v.new.clone())).collect();

        let regex = if variants.is_empty() {
            Ok(None)
        } else {
            let alternation: Vec<String> =
                variants.iter().map(|v| format!("(?:{})", variant_pattern(&v.old))).collect();
            Regex::new(&alternation.join("|")).map(Some).map_err(|e| {
                warn!("Brand map did not compile: {}", e);
                format!("brand map did not compile: {e}")
            })
        };

        Self { regex, replacements, variants }
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn variants(&self) -> &[BrandVariant] {
        &self.variants
    }

    /// Replace every variant in a single left-to-right pass, so replaced text
    /// is never rescanned by a later variant.
    pub fn rename(&self, content: &str) -> Result<String, String> {
        let regex = match &self.regex {
            Ok(Some(regex)) => regex,
            Ok(None) => return Ok(content.to_string()),
            Err(error) => return Err(error.clone()),
        };

        let mut out = String::with_capacity(content.len());
        let mut last = 0;
        for found in regex.find_iter(content) {
            let found = found.map_err(|e| format!("brand rename stopped: {e}"))?;
            out.push_str(&content[last..found.start()]);
            match self.replacements.get(found.as_str()) {
                Some(replacement) => out.push_str(replacement),
                None => out.push_str(found.as_str()),
            }
            last = found.end();
        }
        out.push_str(&content[last..]);
        Ok(out)
    }
}

#[cfg(test)]
impl BrandRenamer {
    /// A renamer whose pattern failed to compile.
    pub(crate) fn broken(mappings: &[BrandMapping], reason: &str) -> Self {
        Self { regex: Err(reason.to_string()), ..Self::new(mappings) }
    }
}
