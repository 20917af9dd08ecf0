//! Technology stack detection from manifest files.

use crate::domain::StackSignals;
use std::fs;
use std::path::Path;

/// Stacks in report order, with the root-level manifests that indicate them.
const STACK_MANIFESTS: &[(&str, &[&str])] = &[
    ("node", &["package.json"]),
    ("python", &["pyproject.toml", "setup.py"]),
    ("go", &["go.mod"]),
    ("rust", &["Cargo.toml"]),
    ("java", &["pom.xml", "build.gradle", "build.gradle.kts"]),
    ("dotnet", &["global.json"]),
];

/// Stack name for a manifest file name, if it is one.
pub fn manifest_stack(file_name: &str) -> Option<&'static str> {
    if file_name.ends_with(".csproj") {
        return Some("dotnet");
    }
    STACK_MANIFESTS
        .iter()
        .find(|(_, manifests)| manifests.contains(&file_name))
        .map(|(stack, _)| *stack)
}

/// Inspect the manifests directly under `root`.
pub fn detect_stack(root: &Path) -> StackSignals {
    let names: Vec<String> = fs::read_dir(root)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();

    let mut signals = StackSignals::default();
    for (stack, _) in STACK_MANIFESTS {
        let present = names.iter().any(|name| manifest_stack(name) == Some(stack));
        signals.indicators.insert(stack.to_string(), present);
        if present {
            signals.detected.push(stack.to_string());
        }
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_python_and_node() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("pyproject.toml"), "[project]\n").unwrap();
        fs::write(tmp.path().join("package.json"), "{}").unwrap();

        let stack = detect_stack(tmp.path());
        assert_eq!(stack.detected, vec!["node", "python"]);
        assert_eq!(stack.indicators.get("go"), Some(&false));
    }

    #[test]
    fn test_detect_dotnet_project_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("App.csproj"), "<Project/>").unwrap();
        assert_eq!(detect_stack(tmp.path()).detected, vec!["dotnet"]);
    }

    #[test]
    fn test_nested_manifests_do_not_count() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/go.mod"), "module x").unwrap();
        assert!(detect_stack(tmp.path()).detected.is_empty());
    }
}
