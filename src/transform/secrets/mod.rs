//! Secret scrubbing: rule-based value replacement plus an entropy pass.

pub mod entropy;
pub mod rules;

pub use entropy::{calculate_entropy, is_high_entropy};
pub use rules::{SecretRule, DEFAULT_RULES, ENTROPY_ASSIGNMENT, PLACEHOLDER};

use crate::utils::{clip, line_at, line_number};
use regex::Captures;
use std::collections::BTreeMap;

const SNIPPET_CHARS: usize = 120;

pub struct ScrubOutcome {
    pub content: String,
    /// Replacements per rule name; `entropy` for the entropy pass.
    pub counts: BTreeMap<String, usize>,
}

impl ScrubOutcome {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// A secret-looking value still present in some text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretHit {
    pub rule: &'static str,
    pub line: usize,
    /// The offending line with the value masked.
    pub snippet: String,
}

fn already_scrubbed(value: &str) -> bool {
    value.contains(PLACEHOLDER)
}

fn value_of<'a>(caps: &Captures<'a>, group: usize) -> Option<regex::Match<'a>> {
    caps.get(group).or_else(|| caps.get(0))
}

/// Replace every secret value with [`PLACEHOLDER`], keeping key names and quotes.
/// Already scrubbed values are left as they are, so the pass is idempotent.
pub fn scrub_secrets(content: &str) -> ScrubOutcome {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut output = content.to_string();

    for rule in DEFAULT_RULES.iter() {
        let mut hits = 0usize;
        let replaced = rule.pattern.replace_all(&output, |caps: &Captures<'_>| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            match value_of(caps, rule.value_group) {
                Some(value) if !already_scrubbed(value.as_str()) => {
                    hits += 1;
                    let mut expanded = String::new();
                    caps.expand(rule.replacement, &mut expanded);
                    expanded
                }
                _ => whole.to_string(),
            }
        });
        let replaced = replaced.into_owned();
        if hits > 0 {
            *counts.entry(rule.name.to_string()).or_insert(0) += hits;
            output = replaced;
        }
    }

    let mut entropy_hits = 0usize;
    let replaced = ENTROPY_ASSIGNMENT.replace_all(&output, |caps: &Captures<'_>| {
        let value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        if is_high_entropy(value) {
            entropy_hits += 1;
            format!("{}{}{}", &caps[1], PLACEHOLDER, &caps[3])
        } else {
            caps[0].to_string()
        }
    });
    let replaced = replaced.into_owned();
    if entropy_hits > 0 {
        counts.insert("entropy".to_string(), entropy_hits);
        output = replaced;
    }

    ScrubOutcome { content: output, counts }
}

fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    format!("{prefix}****")
}

fn hit(content: &str, value: regex::Match<'_>, rule: &'static str) -> SecretHit {
    let line = line_at(content, value.start());
    SecretHit {
        rule,
        line: line_number(content, value.start()),
        snippet: clip(&line.replace(value.as_str(), &mask(value.as_str())), SNIPPET_CHARS),
    }
}

/// Find secret-looking values that have not been scrubbed, in line order.
pub fn find_secrets(content: &str) -> Vec<SecretHit> {
    let mut hits = Vec::new();
    for rule in DEFAULT_RULES.iter() {
        for caps in rule.pattern.captures_iter(content) {
            if let Some(value) = value_of(&caps, rule.value_group) {
                if !already_scrubbed(value.as_str()) {
                    hits.push(hit(content, value, rule.name));
                }
            }
        }
    }
    for caps in ENTROPY_ASSIGNMENT.captures_iter(content) {
        if let Some(value) = caps.get(2) {
            if is_high_entropy(value.as_str()) {
                hits.push(hit(content, value, "entropy"));
            }
        }
    }
    hits.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.rule.cmp(b.rule)));
    // A token often matches both a prefix rule and a named-key rule.
    hits.dedup_by(|a, b| a.line == b.line && a.snippet == b.snippet);
    hits
}
