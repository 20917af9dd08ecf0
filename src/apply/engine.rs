//! Apply engine: execute a plan's actions against an empty destination root.

use super::changelog::{render_changelog, CHANGELOG_FILE};
use super::events::{ApplyEvent, ApplyOutcome, ApplySummary, ProgressSink};
use super::preflight::{preflight, Roots};
use crate::domain::{ActionKind, Plan, PlanAction};
use crate::error::{ExtractError, Result};
use crate::transform::{Capabilities, Pipeline};
use crate::utils::{contained_path, sha256_hex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const DEFAULT_FAILURE_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOptions {
    /// Consecutive per-file failures that abort the run. 0 never aborts.
    pub failure_threshold: usize,
    /// Write a `CHANGELOG.md` into the destination after a completed run.
    pub changelog: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self { failure_threshold: DEFAULT_FAILURE_THRESHOLD, changelog: false }
    }
}

struct Written {
    bytes: u64,
    warnings: Vec<String>,
}

#[derive(Default)]
struct Tally {
    written: usize,
    bytes: u64,
    failed: usize,
    warnings: usize,
    consecutive_failures: usize,
}

impl Tally {
    fn summary(&self, outcome: ApplyOutcome, total: usize, skipped: usize) -> ApplySummary {
        ApplySummary {
            outcome,
            total,
            files_written: self.written,
            bytes_written: self.bytes,
            failed: self.failed,
            skipped,
            warnings: self.warnings,
            error_kind: None,
            error: None,
        }
    }
}

pub struct ApplyEngine<'a> {
    plan: &'a Plan,
    pipeline: Pipeline,
    options: ApplyOptions,
    cancel: Arc<AtomicBool>,
}

impl<'a> ApplyEngine<'a> {
    pub fn new(plan: &'a Plan, capabilities: &Capabilities) -> Self {
        Self {
            plan,
            pipeline: Pipeline::new(&plan.config, capabilities),
            options: ApplyOptions::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn options(mut self, options: ApplyOptions) -> Self {
        self.options = options;
        self
    }

    /// Share a cancel flag. It is polled before each file, never mid-write.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Run the plan.
    ///
    /// Precondition failures return an error before anything is written or
    /// emitted. Fatal aborts (`PathEscape`, `SystemicFailure`) emit `Aborted`
    /// and `Finished` and then return the error. Cancellation and completion
    /// return the summary that the `Finished` event carries.
    pub fn run(&self, sink: &mut dyn ProgressSink) -> Result<ApplySummary> {
        let roots = preflight(self.plan)?;
        let total = self.plan.actions.len();

        fs::create_dir_all(&roots.destination).map_err(|e| ExtractError::io(&roots.destination, e))?;
        // Canonical form of the now existing root, for the per-file checks.
        let destination = roots
            .destination
            .canonicalize()
            .map_err(|e| ExtractError::io(&roots.destination, e))?;
        let roots = Roots { destination, ..roots };

        info!("Applying {} actions into {}", total, roots.destination.display());
        sink.emit(ApplyEvent::Started { total, destination: roots.destination.clone() });

        let mut tally = Tally::default();
        if let Err(error) = self.create_directories(&roots.destination) {
            return Err(self.abort(sink, &tally, total, total, error));
        }

        for (index, action) in self.plan.actions.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                let skipped = total - index;
                info!("Apply cancelled after {} of {} actions", index, total);
                sink.emit(ApplyEvent::Cancelled { completed: index, skipped });
                let summary = tally.summary(ApplyOutcome::Cancelled, total, skipped);
                sink.emit(ApplyEvent::Finished { summary: summary.clone() });
                return Ok(summary);
            }

            // Only an escape is fatal; a parent that cannot be created fails this file alone.
            let written = match resolve_target(&roots.destination, &action.destination) {
                Ok(target) => self.write_action(&roots.source, action, &target),
                Err(error @ ExtractError::PathEscape { .. }) => {
                    return Err(self.abort(sink, &tally, total, total - index, error));
                }
                Err(error) => Err(error.to_string()),
            };

            match written {
                Ok(written) => {
                    tally.written += 1;
                    tally.bytes += written.bytes;
                    tally.warnings += written.warnings.len();
                    tally.consecutive_failures = 0;
                    debug!("Wrote {} ({} bytes)", action.destination, written.bytes);
                    sink.emit(ApplyEvent::FileCompleted {
                        index,
                        path: action.destination.clone(),
                        kind: action.kind,
                        bytes: written.bytes,
                        warnings: written.warnings,
                    });
                }
                Err(message) => {
                    tally.failed += 1;
                    tally.consecutive_failures += 1;
                    warn!("Failed to write {}: {}", action.destination, message);
                    sink.emit(ApplyEvent::FileFailed {
                        index,
                        path: action.destination.clone(),
                        kind: action.kind,
                        error: message.clone(),
                    });
                    let threshold = self.options.failure_threshold;
                    if threshold > 0 && tally.consecutive_failures >= threshold {
                        let error = ExtractError::SystemicFailure {
                            consecutive: tally.consecutive_failures,
                            last_error: message,
                        };
                        return Err(self.abort(sink, &tally, total, total - index - 1, error));
                    }
                }
            }
        }

        if self.options.changelog {
            self.write_changelog(&roots, &tally);
        }

        let summary = tally.summary(ApplyOutcome::Completed, total, 0);
        info!("{}", summary.describe());
        sink.emit(ApplyEvent::Finished { summary: summary.clone() });
        Ok(summary)
    }

    fn abort(
        &self,
        sink: &mut dyn ProgressSink,
        tally: &Tally,
        total: usize,
        skipped: usize,
        error: ExtractError,
    ) -> ExtractError {
        warn!("Apply aborted: {}", error);
        sink.emit(ApplyEvent::Aborted { kind: error.kind(), message: error.to_string() });
        let mut summary = tally.summary(ApplyOutcome::Failed, total, skipped);
        summary.error_kind = Some(error.kind());
        summary.error = Some(error.to_string());
        sink.emit(ApplyEvent::Finished { summary });
        error
    }

    fn create_directories(&self, destination: &Path) -> Result<()> {
        for dir in &self.plan.directories {
            let target = contained_path(destination, dir)?;
            fs::create_dir_all(&target).map_err(|e| ExtractError::io(&target, e))?;
        }
        Ok(())
    }

    /// Read, transform and write one action. Errors are per-file and non-fatal.
    fn write_action(&self, source_root: &Path, action: &PlanAction, target: &Path) -> std::result::Result<Written, String> {
        let source = contained_path(source_root, &action.source).map_err(|e| e.to_string())?;
        let bytes = fs::read(&source).map_err(|e| format!("read {}: {e}", action.source))?;
        let permissions = fs::metadata(&source).map(|m| m.permissions()).ok();

        let mut warnings = Vec::new();
        if let Some(expected) = &action.source_sha256 {
            if sha256_hex(&bytes) != *expected {
                warnings.push("source changed since the plan was built".to_string());
            }
        }

        let content = match action.kind {
            ActionKind::Copy => bytes,
            ActionKind::Transform => {
                let text = String::from_utf8(bytes)
                    .map_err(|_| "source is no longer valid UTF-8 text".to_string())?;
                let outcome = self.pipeline.run(&text, &action.source);
                warnings.extend(outcome.warnings().cloned());
                outcome.content.into_bytes()
            }
        };

        write_atomic(target, &content, permissions).map_err(|e| format!("write {}: {e}", action.destination))?;
        Ok(Written { bytes: content.len() as u64, warnings })
    }

    fn write_changelog(&self, roots: &Roots, tally: &Tally) {
        if self.plan.actions.iter().any(|a| a.destination.eq_ignore_ascii_case(CHANGELOG_FILE)) {
            debug!("Plan writes its own {}; not generating one", CHANGELOG_FILE);
            return;
        }
        let text = render_changelog(self.plan, tally.written, self.plan.transformed_count());
        let target = roots.destination.join(CHANGELOG_FILE);
        if let Err(e) = write_atomic(&target, text.as_bytes(), generated_file_permissions()) {
            warn!("Could not write {}: {}", target.display(), e);
        }
    }
}

/// Destination path for `rel`, checked lexically and again after its parent
/// directory exists, so a symlinked parent cannot redirect the write.
fn resolve_target(destination: &Path, rel: &str) -> Result<PathBuf> {
    let target = contained_path(destination, rel)?;
    let Some(parent) = target.parent() else {
        return Err(ExtractError::PathEscape { path: rel.to_string() });
    };
    fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
    let resolved_parent = parent.canonicalize().map_err(|e| ExtractError::io(parent, e))?;
    if !resolved_parent.starts_with(destination) {
        return Err(ExtractError::PathEscape { path: rel.to_string() });
    }
    Ok(target)
}

fn generated_file_permissions() -> Option<fs::Permissions> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(fs::Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Write through a temp file in the target directory, then rename into place.
fn write_atomic(target: &Path, content: &[u8], permissions: Option<fs::Permissions>) -> std::io::Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    if let Some(permissions) = permissions {
        fs::set_permissions(tmp.path(), permissions)?;
    }
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Apply `plan` with the built-in engines and default options.
pub fn apply(plan: &Plan, sink: &mut dyn ProgressSink) -> Result<ApplySummary> {
    ApplyEngine::new(plan, &Capabilities::builtin()).run(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BrandMapping, TransformConfig};
    use crate::plan::build_plan;
    use crate::scan::scan_tree;
    use tempfile::TempDir;

    fn source() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/app.py"), "import oldbrand\nNAME = 'OldBrand'\n").unwrap();
        fs::write(tmp.path().join("README.md"), "OldBrand docs\n").unwrap();
        fs::write(tmp.path().join("data.bin"), [0u8, 1, 2, 3]).unwrap();
        tmp
    }

    fn config() -> TransformConfig {
        TransformConfig {
            brand_map: vec![BrandMapping::new("OldBrand", "NewBrand")],
            scrub_secrets: true,
            ..Default::default()
        }
    }

    fn collect(plan: &Plan, options: ApplyOptions) -> (Result<ApplySummary>, Vec<ApplyEvent>) {
        let mut events = Vec::new();
        let result = ApplyEngine::new(plan, &Capabilities::builtin())
            .options(options)
            .run(&mut |e: ApplyEvent| events.push(e));
        (result, events)
    }

    #[test]
    fn test_apply_writes_transformed_and_copied_files() {
        let src = source();
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("out");
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &config(), &out);

        let (result, events) = collect(&plan, ApplyOptions::default());
        let summary = result.unwrap();
        assert_eq!(summary.outcome, ApplyOutcome::Completed);
        assert_eq!(summary.files_written, 3);
        assert_eq!(fs::read_to_string(out.join("src/app.py")).unwrap(), "import newbrand\nNAME = 'NewBrand'\n");
        assert_eq!(fs::read(out.join("data.bin")).unwrap(), vec![0u8, 1, 2, 3]);

        assert!(matches!(events.first(), Some(ApplyEvent::Started { total: 3, .. })));
        assert_eq!(events.iter().filter(|e| e.is_file_event()).count(), 3);
        assert_eq!(events.last().and_then(|e| e.summary()), Some(&summary));
    }

    #[test]
    fn test_non_empty_destination_is_untouched() {
        let src = source();
        let dst = TempDir::new().unwrap();
        fs::write(dst.path().join("keep.txt"), "precious").unwrap();
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &config(), dst.path());

        let (result, events) = collect(&plan, ApplyOptions::default());
        assert!(matches!(result, Err(ExtractError::DestinationNotEmpty { .. })));
        assert!(events.is_empty());
        let names: Vec<_> = fs::read_dir(dst.path()).unwrap().flatten().map(|e| e.file_name()).collect();
        assert_eq!(names, vec![std::ffi::OsString::from("keep.txt")]);
        assert_eq!(fs::read_to_string(dst.path().join("keep.txt")).unwrap(), "precious");
    }

    #[test]
    fn test_path_escape_writes_nothing() {
        let src = source();
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("out");
        let mut plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &config(), &out);
        plan.actions[1].destination = "../escaped.txt".into();

        let (result, events) = collect(&plan, ApplyOptions::default());
        assert!(matches!(result, Err(ExtractError::PathEscape { .. })));
        assert!(events.is_empty());
        assert!(!out.exists());
        assert!(!dst.path().join("escaped.txt").exists());
    }

    #[test]
    fn test_consecutive_failures_abort() {
        let src = source();
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("out");
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &config(), &out);
        for name in ["README.md", "data.bin", "src/app.py"] {
            fs::remove_file(src.path().join(name)).unwrap();
        }

        let options = ApplyOptions { failure_threshold: 2, changelog: false };
        let (result, events) = collect(&plan, options);
        assert!(matches!(result, Err(ExtractError::SystemicFailure { consecutive: 2, .. })));
        let summary = events.last().and_then(|e| e.summary()).cloned().unwrap();
        assert_eq!(summary.outcome, ApplyOutcome::Failed);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_unwritable_parent_fails_only_that_file() {
        let src = TempDir::new().unwrap();
        for name in ["a", "b.txt", "c.txt"] {
            fs::write(src.path().join(name), format!("{name}\n")).unwrap();
        }
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("out");
        let mut plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &config(), &out);
        let moved = plan.actions.iter().position(|a| a.source == "b.txt").unwrap();
        // `a` is written as a file first, so `a/b.txt` has no usable parent.
        plan.actions[moved].destination = "a/b.txt".into();

        let (result, events) = collect(&plan, ApplyOptions::default());
        let summary = result.unwrap();
        assert_eq!(summary.outcome, ApplyOutcome::Completed);
        assert_eq!(summary.files_written, 2);
        assert_eq!(summary.failed, 1);
        assert!(events.iter().any(|e| matches!(e, ApplyEvent::FileFailed { path, .. } if path == "a/b.txt")));
        assert_eq!(fs::read_to_string(out.join("c.txt")).unwrap(), "c.txt\n");
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let src = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(src.path().join(name), "x\n").unwrap();
        }
        let dst = TempDir::new().unwrap();
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &config(), &dst.path().join("out"));
        fs::remove_file(src.path().join("a.txt")).unwrap();
        fs::remove_file(src.path().join("c.txt")).unwrap();

        let options = ApplyOptions { failure_threshold: 2, changelog: false };
        let (result, events) = collect(&plan, options);
        let summary = result.unwrap();
        assert_eq!(summary.outcome, ApplyOutcome::Completed);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.files_written, 1);
        assert!(!events.iter().any(|e| matches!(e, ApplyEvent::Aborted { .. })));
    }

    #[test]
    fn test_threshold_zero_never_aborts() {
        let src = source();
        let dst = TempDir::new().unwrap();
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &config(), &dst.path().join("out"));
        for name in ["README.md", "data.bin", "src/app.py"] {
            fs::remove_file(src.path().join(name)).unwrap();
        }
        let (result, _) = collect(&plan, ApplyOptions { failure_threshold: 0, changelog: false });
        let summary = result.unwrap();
        assert_eq!(summary.outcome, ApplyOutcome::Completed);
        assert_eq!(summary.failed, 3);
    }

    #[test]
    fn test_stale_source_warns_and_recomputes() {
        let src = source();
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("out");
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &["README.md".into()], &config(), &out);
        fs::write(src.path().join("README.md"), "OldBrand docs, edited\n").unwrap();

        let (result, events) = collect(&plan, ApplyOptions::default());
        assert_eq!(result.unwrap().warnings, 1);
        assert_eq!(fs::read_to_string(out.join("README.md")).unwrap(), "NewBrand docs, edited\n");
        assert!(events.iter().any(|e| matches!(e, ApplyEvent::FileCompleted { warnings, .. } if !warnings.is_empty())));
    }

    #[test]
    fn test_cancel_before_start_skips_everything() {
        let src = source();
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("out");
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &config(), &out);
        let flag = Arc::new(AtomicBool::new(true));

        let mut events = Vec::new();
        let summary = ApplyEngine::new(&plan, &Capabilities::builtin())
            .cancel_flag(flag)
            .run(&mut |e: ApplyEvent| events.push(e))
            .unwrap();
        assert_eq!(summary.outcome, ApplyOutcome::Cancelled);
        assert_eq!(summary.skipped, 3);
        assert!(events.contains(&ApplyEvent::Cancelled { completed: 0, skipped: 3 }));
    }

    #[test]
    fn test_changelog_is_written_when_enabled() {
        let src = source();
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("out");
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &config(), &out);
        let (result, _) = collect(&plan, ApplyOptions { changelog: true, ..Default::default() });
        assert_eq!(result.unwrap().outcome, ApplyOutcome::Completed);
        let log = fs::read_to_string(out.join(CHANGELOG_FILE)).unwrap();
        assert!(log.contains("OldBrand → NewBrand"));
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_bit_is_preserved() {
        use std::os::unix::fs::PermissionsExt;
        let src = source();
        fs::write(src.path().join("run.sh"), "#!/bin/sh\necho hi\n").unwrap();
        fs::set_permissions(src.path().join("run.sh"), fs::Permissions::from_mode(0o755)).unwrap();
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("out");
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &["run.sh".into()], &config(), &out);
        let (result, _) = collect(&plan, ApplyOptions::default());
        result.unwrap();
        let mode = fs::metadata(out.join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
