//! Path normalization and destination containment.

use crate::error::{ExtractError, Result};
use std::path::{Component, Path, PathBuf};

pub fn normalize_path(path: &str) -> String {
    // Convert backslashes to forward slashes and normalize
    path.replace('\\', "/")
}

/// Lexically normalize a relative path: drop `.` segments and empty segments,
/// resolve `..` against earlier segments. Returns `None` when the path is
/// absolute or climbs above its starting point.
pub fn normalize_relative(path: &str) -> Option<String> {
    let path = normalize_path(path);
    if path.starts_with('/') || Path::new(&path).has_root() {
        return None;
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => {
                // Windows drive prefixes such as `C:` are never relative.
                if other.len() == 2 && other.ends_with(':') {
                    return None;
                }
                segments.push(other);
            }
        }
    }
    Some(segments.join("/"))
}

/// Resolve `rel` under `root`, refusing anything that would land outside it.
///
/// The result always has `root` as a strict ancestor: an empty relative path
/// (the root itself) is rejected too.
pub fn contained_path(root: &Path, rel: &str) -> Result<PathBuf> {
    let escape = || ExtractError::PathEscape { path: rel.to_string() };
    let rel_path = Path::new(rel);
    let mut clean = PathBuf::new();
    for component in rel_path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => clean.push(part),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(escape());
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(escape());
    }
    let joined = root.join(&clean);
    if !joined.starts_with(root) || joined == root {
        return Err(escape());
    }
    Ok(joined)
}

/// Canonicalize a path that may not exist yet: the deepest existing ancestor
/// is canonicalized and the missing tail is appended lexically.
pub fn resolve_lenient(path: &Path) -> std::io::Result<PathBuf> {
    let joined =
        if path.is_absolute() { path.to_path_buf() } else { std::env::current_dir()?.join(path) };
    let mut absolute = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                absolute.pop();
            }
            Component::CurDir => {}
            other => absolute.push(other),
        }
    }

    let mut existing = absolute.as_path();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();
    loop {
        if existing.exists() {
            break;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in tail.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn normalize_relative_resolves_dots() {
        assert_eq!(normalize_relative("src/./a/../b.rs").as_deref(), Some("src/b.rs"));
        assert_eq!(normalize_relative("src\\lib.rs").as_deref(), Some("src/lib.rs"));
        assert_eq!(normalize_relative("").as_deref(), Some(""));
        assert!(normalize_relative("../etc/passwd").is_none());
        assert!(normalize_relative("a/../../b").is_none());
        assert!(normalize_relative("/etc/passwd").is_none());
    }

    #[test]
    fn contained_path_rejects_escapes() {
        let root = Path::new("/tmp/dest");
        assert_eq!(contained_path(root, "src/a.rs").unwrap(), PathBuf::from("/tmp/dest/src/a.rs"));
        assert!(matches!(
            contained_path(root, "../x"),
            Err(ExtractError::PathEscape { .. })
        ));
        assert!(contained_path(root, "/etc/passwd").is_err());
        assert!(contained_path(root, "").is_err());
        assert!(contained_path(root, "./").is_err());
    }

    #[test]
    fn resolve_lenient_handles_missing_tail() {
        let tmp = TempDir::new().expect("tmp");
        let missing = tmp.path().join("a/b/../c");
        let resolved = resolve_lenient(&missing).expect("resolve");
        let base = tmp.path().canonicalize().expect("canon");
        assert_eq!(resolved, base.join("a/c"));
    }
}
