//! Language detection from file names.

use std::path::Path;

/// Best-effort language name for a path, keyed on extension and a few
/// well-known extensionless names. `None` for unknown files.
pub fn language_for_path(path: impl AsRef<Path>) -> Option<&'static str> {
    let path = path.as_ref();
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_lowercase();
    match name.as_str() {
        "dockerfile" => return Some("dockerfile"),
        "makefile" => return Some("make"),
        _ => {}
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
    let language = match ext.as_str() {
        "py" | "pyi" => "python",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "rb" => "ruby",
        "php" => "php",
        "sh" | "bash" | "zsh" => "shell",
        "html" | "htm" => "html",
        "css" | "scss" | "sass" | "less" => "css",
        "vue" => "vue",
        "svelte" => "svelte",
        "sql" => "sql",
        _ => return None,
    };
    Some(language)
}

#[cfg(test)]
mod tests {
    use super::language_for_path;

    #[test]
    fn detects_common_languages() {
        assert_eq!(language_for_path("src/app.py"), Some("python"));
        assert_eq!(language_for_path("web/index.tsx"), Some("typescript"));
        assert_eq!(language_for_path("lib.rs"), Some("rust"));
        assert_eq!(language_for_path("Dockerfile"), Some("dockerfile"));
        assert_eq!(language_for_path("notes.txt"), None);
    }
}
