//! Entropy heuristics for secret-looking assignment values

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

pub const ENTROPY_THRESHOLD: f64 = 4.5;
/// Values must be strictly longer than this to count.
pub const ENTROPY_MIN_LEN: usize = 20;

/// Known non-secret shapes: UUIDs, hex digests and semver strings.
static SAFE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        r"^[0-9a-f]{40}$",
        r"^[0-9a-f]{32}$",
        r"^[0-9a-f]{64}$",
        r"^\d+\.\d+\.\d+[\w\-+.]*$",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

pub fn calculate_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for ch in s.chars() {
        *counts.entry(ch).or_insert(0) += 1;
    }

    let len = s.chars().count() as f64;
    counts
        .values()
        .map(|count| {
            let p = *count as f64 / len;
            -(p * p.log2())
        })
        .sum()
}

pub fn is_safe_value(s: &str) -> bool {
    SAFE_PATTERNS.iter().any(|re| re.is_match(s))
}

fn character_classes(s: &str) -> usize {
    let mut classes = 0;
    if s.chars().any(|c| c.is_ascii_lowercase()) {
        classes += 1;
    }
    if s.chars().any(|c| c.is_ascii_uppercase()) {
        classes += 1;
    }
    if s.chars().any(|c| c.is_ascii_digit()) {
        classes += 1;
    }
    if s.chars().any(|c| !c.is_ascii_alphanumeric()) {
        classes += 1;
    }
    classes
}

/// Long, random-looking and mixing at least two character classes.
pub fn is_high_entropy(value: &str) -> bool {
    value.chars().count() > ENTROPY_MIN_LEN
        && calculate_entropy(value) > ENTROPY_THRESHOLD
        && character_classes(value) >= 2
        && !is_safe_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_is_zero_for_repeated_chars() {
        assert_eq!(calculate_entropy("aaaaaa"), 0.0);
    }

    #[test]
    fn entropy_higher_for_mixed_string() {
        assert!(calculate_entropy("a1b2c3d4") > calculate_entropy("aaaaaaaa"));
    }

    #[test]
    fn random_token_is_high_entropy() {
        assert!(is_high_entropy("Zx9Qw3Er7Ty1Ui5Op2As8Df4Gh6Jk0L"));
    }

    #[test]
    fn short_or_uniform_values_are_not() {
        assert!(!is_high_entropy("short"));
        assert!(!is_high_entropy("abcabcabcabcabcabcabcabcabc"));
        assert!(!is_high_entropy("<REDACTED>"));
    }

    #[test]
    fn safe_shapes_are_exempt() {
        assert!(is_safe_value("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_safe_value("da39a3ee5e6b4b0d3255bfef95601890afd80709"));
        assert!(!is_high_entropy("da39a3ee5e6b4b0d3255bfef95601890afd80709"));
        assert!(is_safe_value("1.2.3-beta.4+build.567"));
    }
}
