//! Small text helpers shared by transforms and residual scans.

/// 1-based line number of `offset` in `content`.
pub fn line_number(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1
}

/// The full line containing `offset`, without its terminator.
pub fn line_at(content: &str, offset: usize) -> &str {
    let offset = offset.min(content.len());
    let start = content[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = content[offset..].find('\n').map(|i| offset + i).unwrap_or(content.len());
    content[start..end].trim_end_matches('\r')
}

/// Trim and cap a snippet at `max_chars` characters.
pub fn clip(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Escape regex metacharacters, leaving every other character literal.
///
/// Unlike `regex::escape` this never emits escapes for `-`, `&` or `~`, which
/// the backtracking engine rejects outside character classes.
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if r"\.+*?()|[]{}^$".contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
