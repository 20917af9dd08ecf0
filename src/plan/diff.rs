//! Unified diff previews.

use diffy::{create_patch, Patch};

/// Unified diff from `original` to `modified` with `a/` and `b/` headers.
/// `None` when the two are identical.
pub fn unified_diff(rel_path: &str, original: &str, modified: &str) -> Option<String> {
    if original == modified {
        return None;
    }
    let rendered = create_patch(original, modified).to_string();
    // diffy always emits `--- original` / `+++ modified`; swap in the file path.
    let mut lines = rendered.splitn(3, '\n');
    let (_old, _new, body) = (lines.next(), lines.next(), lines.next().unwrap_or(""));
    Some(format!("--- a/{rel_path}\n+++ b/{rel_path}\n{body}"))
}

/// Apply a diff produced by [`unified_diff`] to `original`.
pub fn apply_diff(original: &str, diff: &str) -> Result<String, String> {
    let patch = Patch::from_str(diff).map_err(|e| format!("invalid diff: {e}"))?;
    diffy::apply(original, &patch).map_err(|e| format!("diff does not apply: {e}"))
}

/// Added and removed line counts of a unified diff.
pub fn diff_stats(diff: &str) -> (usize, usize) {
    diff.lines().fold((0, 0), |(added, removed), line| {
        if line.starts_with("+++") || line.starts_with("---") {
            (added, removed)
        } else if line.starts_with('+') {
            (added + 1, removed)
        } else if line.starts_with('-') {
            (added, removed + 1)
        } else {
            (added, removed)
        }
    })
}
