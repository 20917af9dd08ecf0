//! Token estimation

/// Estimate tokens using a simple heuristic (chars / 4).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Truncate `text` to roughly `max_tokens`, cutting on a char boundary.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }
    text.chars().take(max_tokens * 4).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_chars_not_bytes() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("ééééééé"), 1);
    }

    #[test]
    fn truncation_keeps_short_text() {
        assert_eq!(truncate_to_tokens("short", 10), "short");
        assert_eq!(truncate_to_tokens(&"x".repeat(100), 5).len(), 20);
    }
}
