//! Apply preconditions. Every check runs before the first write.

use crate::domain::Plan;
use crate::error::{ExtractError, Result};
use crate::utils::{contained_path, resolve_lenient};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Resolved roots for a run that passed preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    pub source: PathBuf,
    pub destination: PathBuf,
}

fn check_empty(destination: &Path) -> Result<()> {
    if !destination.exists() {
        return Ok(());
    }
    if !destination.is_dir() {
        return Err(ExtractError::InvalidDestination {
            path: destination.to_path_buf(),
            reason: "exists and is not a directory".into(),
        });
    }
    let mut entries = fs::read_dir(destination).map_err(|e| ExtractError::io(destination, e))?;
    if entries.next().is_some() {
        return Err(ExtractError::DestinationNotEmpty { path: destination.to_path_buf() });
    }
    Ok(())
}

fn check_disjoint(source: &Path, destination: &Path) -> Result<()> {
    if destination.starts_with(source) || source.starts_with(destination) {
        return Err(ExtractError::InvalidDestination {
            path: destination.to_path_buf(),
            reason: format!("overlaps the source root {}", source.display()),
        });
    }
    Ok(())
}

/// Validate `plan` against the filesystem as it is now.
///
/// Order: emptiness, overlap with the source, then containment of every
/// action and directory. A failure here means nothing has been written.
pub fn preflight(plan: &Plan) -> Result<Roots> {
    let run = || -> Result<Roots> {
        let destination = resolve_lenient(&plan.destination_root)
            .map_err(|e| ExtractError::io(&plan.destination_root, e))?;
        check_empty(&destination)?;

        let source = plan
            .source_root
            .canonicalize()
            .map_err(|_| ExtractError::InvalidRoot { path: plan.source_root.clone() })?;
        if !source.is_dir() {
            return Err(ExtractError::InvalidRoot { path: plan.source_root.clone() });
        }
        check_disjoint(&source, &destination)?;

        for action in &plan.actions {
            contained_path(&destination, &action.destination)?;
        }
        for dir in &plan.directories {
            contained_path(&destination, dir)?;
        }
        Ok(Roots { source, destination })
    };
    run().inspect_err(|e| warn!("Apply preflight failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionKind, PlanAction, TransformConfig, PLAN_SCHEMA_VERSION};
    use chrono::Utc;
    use tempfile::TempDir;

    fn plan(source: &Path, destination: &Path, dests: &[&str]) -> Plan {
        Plan {
            schema_version: PLAN_SCHEMA_VERSION.into(),
            id: "p".into(),
            created_at: Utc::now(),
            source_root: source.to_path_buf(),
            destination_root: destination.to_path_buf(),
            config: TransformConfig::default(),
            actions: dests
                .iter()
                .map(|d| PlanAction {
                    source: d.to_string(),
                    destination: d.to_string(),
                    kind: ActionKind::Copy,
                    size: 0,
                    steps: Vec::new(),
                    diff: None,
                    source_sha256: None,
                    warnings: Vec::new(),
                })
                .collect(),
            directories: Vec::new(),
            residual: Default::default(),
            issues: Vec::new(),
        }
    }

    #[test]
    fn test_fresh_destination_passes() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let roots = preflight(&plan(src.path(), &dst.path().join("out"), &["a.txt"])).unwrap();
        assert!(roots.destination.ends_with("out"));
    }

    #[test]
    fn test_non_empty_destination() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(dst.path().join("keep.txt"), "x").unwrap();
        let err = preflight(&plan(src.path(), dst.path(), &["a.txt"])).unwrap_err();
        assert!(matches!(err, ExtractError::DestinationNotEmpty { .. }));
    }

    #[test]
    fn test_destination_inside_source() {
        let src = TempDir::new().unwrap();
        let err = preflight(&plan(src.path(), &src.path().join("copy"), &[])).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidDestination { .. }));
    }

    #[test]
    fn test_source_inside_destination() {
        let dst = TempDir::new().unwrap();
        let src = dst.path().join("nested/src");
        fs::create_dir_all(&src).unwrap();
        // The destination is not empty either; emptiness is checked first.
        let err = preflight(&plan(&src, dst.path(), &[])).unwrap_err();
        assert!(matches!(err, ExtractError::DestinationNotEmpty { .. }));
    }

    #[test]
    fn test_escaping_action() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let err = preflight(&plan(src.path(), &dst.path().join("out"), &["ok.txt", "../evil.txt"]))
            .unwrap_err();
        assert!(matches!(err, ExtractError::PathEscape { .. }));
        assert!(!dst.path().join("out").exists());
    }
}
