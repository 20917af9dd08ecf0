//! File classification helpers: binary probing and coarse file categories.

use crate::domain::FileCategory;
use crate::utils::language_for_path;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes read from the head of a file to decide binary vs. text.
pub const BINARY_PROBE_BYTES: usize = 8192;

const MINIFIED_INDICATORS: &[&str] = &[".min.", ".bundle.", ".packed."];

const BUILD_DIRS: &[&str] = &["dist", "build", "out", "target", ".next", ".nuxt"];

const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec", "specs"];

const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "bmp", "woff", "woff2", "ttf", "otf",
    "eot", "mp3", "mp4", "wav", "ogg", "webm", "pdf", "zip",
];

const CONFIG_EXTENSIONS: &[&str] =
    &["json", "jsonc", "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "properties", "xml"];

const DOC_EXTENSIONS: &[&str] = &["md", "markdown", "rst", "txt", "adoc"];

/// Classify a probe buffer: a null byte or invalid UTF-8 means binary.
///
/// A multi-byte sequence cut off by the end of the probe window is not an
/// error; only genuinely invalid bytes are.
pub fn is_binary_prefix(sample: &[u8]) -> bool {
    if sample.contains(&0) {
        return true;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => false,
        Err(e) => e.error_len().is_some(),
    }
}

/// Read at most `sample_size` bytes of `path` and classify them.
///
/// Unreadable files are reported as binary so that they are copied verbatim
/// rather than run through text transforms.
pub fn is_binary_file(path: &Path, sample_size: usize) -> bool {
    let Ok(mut file) = File::open(path) else {
        return true;
    };
    let mut sample = Vec::with_capacity(sample_size);
    if file.by_ref().take(sample_size as u64).read_to_end(&mut sample).is_err() {
        return true;
    }
    is_binary_prefix(&sample)
}

/// Assign a coarse category from the file name and its relative path.
pub fn categorize_file(name: &str, rel_path: &str) -> FileCategory {
    let lower_name = name.to_lowercase();
    let lower_path = rel_path.to_lowercase().replace('\\', "/");
    let dirs: Vec<&str> = lower_path.split('/').rev().skip(1).collect();
    let ext = lower_name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");

    if dirs.iter().any(|d| BUILD_DIRS.contains(d))
        || MINIFIED_INDICATORS.iter().any(|ind| lower_name.contains(ind))
    {
        return FileCategory::Build;
    }

    if dirs.iter().any(|d| TEST_DIRS.contains(d))
        || lower_name.contains(".test.")
        || lower_name.contains(".spec.")
        || lower_name.starts_with("test_")
        || lower_name.ends_with("_test.go")
        || lower_name.ends_with("_test.py")
    {
        return FileCategory::Test;
    }

    if DOC_EXTENSIONS.contains(&ext) || dirs.contains(&"docs") {
        return FileCategory::Doc;
    }

    if CONFIG_EXTENSIONS.contains(&ext)
        || lower_name.starts_with(".env")
        || matches!(lower_name.as_str(), "dockerfile" | "makefile" | ".gitignore" | ".editorconfig")
    {
        return FileCategory::Config;
    }

    if ASSET_EXTENSIONS.contains(&ext) {
        return FileCategory::Asset;
    }

    if language_for_path(rel_path).is_some() {
        return FileCategory::Source;
    }

    FileCategory::Other
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_binary_null_byte() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x00, 0x01, 0x02]).unwrap();
        file.flush().unwrap();

        assert!(is_binary_file(file.path(), BINARY_PROBE_BYTES));
    }

    #[test]
    fn test_text_is_not_binary() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all("Normal text file 🚀".as_bytes()).unwrap();
        file.flush().unwrap();

        assert!(!is_binary_file(file.path(), BINARY_PROBE_BYTES));
    }

    #[test]
    fn test_invalid_utf8_is_binary() {
        assert!(is_binary_prefix(&[0x66, 0x6f, 0xff, 0x6f]));
    }

    #[test]
    fn test_truncated_multibyte_at_probe_edge_is_text() {
        let bytes = "ab🚀".as_bytes();
        // Cut inside the 4-byte emoji.
        assert!(!is_binary_prefix(&bytes[..4]));
    }

    #[test]
    fn test_empty_file_is_text() {
        let file = NamedTempFile::new().unwrap();
        assert!(!is_binary_file(file.path(), BINARY_PROBE_BYTES));
    }

    #[test]
    fn test_categorize_file() {
        assert_eq!(categorize_file("app.py", "src/app.py"), FileCategory::Source);
        assert_eq!(categorize_file("app.test.js", "src/app.test.js"), FileCategory::Test);
        assert_eq!(categorize_file("README.md", "README.md"), FileCategory::Doc);
        assert_eq!(categorize_file("config.yaml", "config.yaml"), FileCategory::Config);
        assert_eq!(categorize_file("logo.png", "assets/logo.png"), FileCategory::Asset);
        assert_eq!(categorize_file("bundle.js", "dist/bundle.js"), FileCategory::Build);
        assert_eq!(categorize_file("spec.ts", "tests/spec.ts"), FileCategory::Test);
        assert_eq!(categorize_file("LICENSE", "LICENSE"), FileCategory::Other);
    }
}
