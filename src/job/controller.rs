//! Job controller: runs each apply on its own worker thread.
//!
//! A destination root belongs to at most one active job. Cancellation sets a
//! flag that the apply engine polls between files, so a cancelled job never
//! leaves a partially written file behind.

use super::log::EventLog;
use super::{lock, JobSnapshot, JobStatus};
use crate::apply::{preflight, ApplyEngine, ApplyEvent, ApplyOptions, ApplyOutcome, ApplySummary};
use crate::domain::Plan;
use crate::error::{ExtractError, Result};
use crate::transform::Capabilities;
use crate::utils::resolve_lenient;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

struct JobProgress {
    status: JobStatus,
    processed: usize,
    summary: Option<ApplySummary>,
}

struct Job {
    id: String,
    plan_id: String,
    destination: PathBuf,
    created_at: DateTime<Utc>,
    total: usize,
    progress: Mutex<JobProgress>,
    cancel: Arc<AtomicBool>,
    log: EventLog,
}

impl Job {
    fn snapshot(&self) -> JobSnapshot {
        let progress = lock(&self.progress);
        JobSnapshot {
            id: self.id.clone(),
            plan_id: self.plan_id.clone(),
            status: progress.status,
            destination: self.destination.clone(),
            created_at: self.created_at,
            total: self.total,
            processed: progress.processed,
            events: self.log.len(),
            summary: progress.summary.clone(),
        }
    }

    fn record(&self, event: ApplyEvent) {
        {
            let mut progress = lock(&self.progress);
            if event.is_file_event() {
                progress.processed += 1;
            }
            // Terminal status is visible before `Finished` reaches any reader.
            if let Some(summary) = event.summary() {
                progress.summary = Some(summary.clone());
                progress.status = terminal_status(summary.outcome);
            }
        }
        self.log.push(event);
    }

    fn set_status(&self, status: JobStatus) {
        let mut progress = lock(&self.progress);
        debug!("Job {}: {} -> {}", self.id, progress.status, status);
        progress.status = status;
    }
}

fn terminal_status(outcome: ApplyOutcome) -> JobStatus {
    match outcome {
        ApplyOutcome::Completed => JobStatus::Completed,
        ApplyOutcome::Cancelled => JobStatus::Cancelled,
        ApplyOutcome::Failed => JobStatus::Failed,
    }
}

struct Inner {
    jobs: Mutex<HashMap<String, Arc<Job>>>,
    busy: Mutex<HashSet<PathBuf>>,
    capabilities: Capabilities,
    options: ApplyOptions,
}

/// Releases a destination claim when the owning job ends, even by panic.
struct DestinationClaim {
    inner: Arc<Inner>,
    key: PathBuf,
}

impl Drop for DestinationClaim {
    fn drop(&mut self) {
        lock(&self.inner.busy).remove(&self.key);
    }
}

#[derive(Clone)]
pub struct JobController {
    inner: Arc<Inner>,
}

impl Default for JobController {
    fn default() -> Self {
        Self::new(Capabilities::builtin(), ApplyOptions::default())
    }
}

impl JobController {
    pub fn new(capabilities: Capabilities, options: ApplyOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                jobs: Mutex::new(HashMap::new()),
                busy: Mutex::new(HashSet::new()),
                capabilities,
                options,
            }),
        }
    }

    /// Claim the destination root. Roots nested in (or containing) an active
    /// job's root count as busy too.
    fn claim(&self, plan: &Plan) -> Result<DestinationClaim> {
        let key = resolve_lenient(&plan.destination_root)
            .map_err(|e| ExtractError::io(&plan.destination_root, e))?;
        let mut busy = lock(&self.inner.busy);
        if let Some(active) = busy.iter().find(|active| active.starts_with(&key) || key.starts_with(active)) {
            warn!("Destination {} overlaps active job root {}", key.display(), active.display());
            return Err(ExtractError::DestinationBusy { path: plan.destination_root.clone() });
        }
        busy.insert(key.clone());
        drop(busy);
        Ok(DestinationClaim { inner: Arc::clone(&self.inner), key })
    }

    fn job(&self, id: &str) -> Result<Arc<Job>> {
        lock(&self.inner.jobs)
            .get(id)
            .cloned()
            .ok_or_else(|| ExtractError::JobNotFound { id: id.to_string() })
    }

    /// Start applying `plan` on a worker thread and return the job id.
    ///
    /// Precondition failures (`DestinationBusy`, `DestinationNotEmpty`,
    /// `InvalidDestination`, `PathEscape`) are returned here and no job is created.
    pub fn start(&self, plan: Plan) -> Result<String> {
        let claim = self.claim(&plan)?;
        preflight(&plan)?;

        let job = Arc::new(Job {
            id: uuid::Uuid::new_v4().to_string(),
            plan_id: plan.id.clone(),
            destination: plan.destination_root.clone(),
            created_at: Utc::now(),
            total: plan.actions.len(),
            progress: Mutex::new(JobProgress {
                status: JobStatus::Pending,
                processed: 0,
                summary: None,
            }),
            cancel: Arc::new(AtomicBool::new(false)),
            log: EventLog::new(),
        });
        let id = job.id.clone();
        lock(&self.inner.jobs).insert(id.clone(), Arc::clone(&job));

        let worker_job = Arc::clone(&job);
        let capabilities = self.inner.capabilities.clone();
        let options = self.inner.options.clone();
        let spawned = thread::Builder::new()
            .name(format!("apply-{}", &id[..8]))
            .spawn(move || run_job(worker_job, plan, capabilities, options, claim));
        if let Err(e) = spawned {
            lock(&self.inner.jobs).remove(&id);
            return Err(ExtractError::io(&job.destination, e));
        }
        info!("Started job {} for {}", id, job.destination.display());
        Ok(id)
    }

    /// All events from `index` onward. Safe to call while the job runs.
    pub fn events_since(&self, id: &str, index: usize) -> Result<Vec<ApplyEvent>> {
        Ok(self.job(id)?.log.since(index))
    }

    /// Block up to `timeout` for events past `index`.
    pub fn wait_for_events(&self, id: &str, index: usize, timeout: Duration) -> Result<Vec<ApplyEvent>> {
        let job = self.job(id)?;
        Ok(job.log.wait_since(index, timeout))
    }

    /// Request cancellation. Takes effect before the next file; returns the new status.
    pub fn cancel(&self, id: &str) -> Result<JobStatus> {
        let job = self.job(id)?;
        let mut progress = lock(&job.progress);
        if matches!(progress.status, JobStatus::Pending | JobStatus::Running) {
            job.cancel.store(true, Ordering::SeqCst);
            progress.status = JobStatus::CancelRequested;
            info!("Cancellation requested for job {}", id);
        }
        Ok(progress.status)
    }

    pub fn status(&self, id: &str) -> Result<JobSnapshot> {
        Ok(self.job(id)?.snapshot())
    }

    /// Wait for a terminal state. With a timeout, returns the current snapshot
    /// when the job is still running at the deadline.
    pub fn wait(&self, id: &str, timeout: Option<Duration>) -> Result<JobSnapshot> {
        let job = self.job(id)?;
        job.log.wait_closed(timeout);
        Ok(job.snapshot())
    }

    /// Drop a finished job and its log.
    pub fn discard(&self, id: &str) -> Result<()> {
        let mut jobs = lock(&self.inner.jobs);
        let status = jobs
            .get(id)
            .map(|job| lock(&job.progress).status)
            .ok_or_else(|| ExtractError::JobNotFound { id: id.to_string() })?;
        if !status.is_terminal() {
            return Err(ExtractError::JobNotTerminal { id: id.to_string(), status: status.to_string() });
        }
        jobs.remove(id);
        Ok(())
    }

    /// Snapshots of every retained job, oldest first.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> =
            lock(&self.inner.jobs).values().map(|job| job.snapshot()).collect();
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        snapshots
    }
}

fn run_job(
    job: Arc<Job>,
    plan: Plan,
    capabilities: Capabilities,
    options: ApplyOptions,
    claim: DestinationClaim,
) {
    {
        let mut progress = lock(&job.progress);
        if progress.status == JobStatus::Pending {
            progress.status = JobStatus::Running;
        }
    }

    let mut claim = Some(claim);
    let result = ApplyEngine::new(&plan, &capabilities)
        .options(options)
        .cancel_flag(Arc::clone(&job.cancel))
        .run(&mut |event: ApplyEvent| {
            // A reader that sees `Finished` may immediately reuse the destination.
            if event.summary().is_some() {
                claim.take();
            }
            job.record(event);
        });

    let status = match &result {
        Ok(summary) => terminal_status(summary.outcome),
        Err(_) => JobStatus::Failed,
    };
    if let Err(error) = &result {
        // Preconditions can still fail here if the destination changed after start.
        let mut progress = lock(&job.progress);
        if progress.summary.is_none() {
            progress.summary = Some(ApplySummary::failed_before_start(job.total, error));
        }
    }
    job.set_status(status);
    info!("Job {} finished: {}", job.id, status);

    drop(claim);
    job.log.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PatternRule, TransformConfig};
    use crate::plan::build_plan;
    use crate::scan::scan_tree;
    use crate::transform::structural::{RewriteResult, StructuralRewriter};
    use std::fs;
    use std::sync::Condvar;
    use tempfile::TempDir;

    /// Structural engine that holds every file until the gate opens.
    #[derive(Default)]
    struct Gate {
        open: Mutex<bool>,
        changed: Condvar,
    }

    impl Gate {
        fn open(&self) {
            *lock(&self.open) = true;
            self.changed.notify_all();
        }
    }

    struct GatedRewriter(Arc<Gate>);

    impl StructuralRewriter for GatedRewriter {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn rewrite(&self, _content: &str, _rel_path: &str, _rule: &PatternRule) -> RewriteResult {
            let guard = lock(&self.0.open);
            let _open = self.0.changed.wait_while(guard, |open| !*open);
            RewriteResult::NoMatch
        }
    }

    fn source(files: usize) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for i in 0..files {
            fs::write(tmp.path().join(format!("f{i}.txt")), format!("file {i}\n")).unwrap();
        }
        tmp
    }

    fn gated_config() -> TransformConfig {
        TransformConfig {
            patterns: vec![PatternRule { pattern: "x".into(), rewrite: "y".into(), languages: vec![] }],
            ..Default::default()
        }
    }

    #[test]
    fn test_job_completes_and_log_replays() {
        let src = source(3);
        let dst = TempDir::new().unwrap();
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &TransformConfig::default(), &dst.path().join("out"));

        let controller = JobController::default();
        let id = controller.start(plan).unwrap();
        let snapshot = controller.wait(&id, None).unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.processed, 3);

        let all = controller.events_since(&id, 0).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(controller.events_since(&id, 4).unwrap(), all[4..].to_vec());
        assert_eq!(snapshot.summary.as_ref(), all[4].summary());
    }

    #[test]
    fn test_busy_destination_and_cancellation() {
        let src = source(4);
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("out");
        let scan = scan_tree(src.path()).unwrap();
        let plan = build_plan(&scan, &[], &gated_config(), &out);

        let gate = Arc::new(Gate::default());
        let capabilities = Capabilities::builtin().with_structural(Arc::new(GatedRewriter(Arc::clone(&gate))));
        let controller = JobController::new(capabilities, ApplyOptions::default());

        let id = controller.start(plan.clone()).unwrap();
        let err = controller.start(plan.clone()).unwrap_err();
        assert!(matches!(err, ExtractError::DestinationBusy { .. }));

        assert_eq!(controller.cancel(&id).unwrap(), JobStatus::CancelRequested);
        assert!(matches!(controller.discard(&id), Err(ExtractError::JobNotTerminal { .. })));
        gate.open();

        let snapshot = controller.wait(&id, Some(Duration::from_secs(30))).unwrap();
        assert_eq!(snapshot.status, JobStatus::Cancelled);
        let summary = snapshot.summary.unwrap();
        assert_eq!(summary.files_written + summary.failed + summary.skipped, 4);

        // The claim is released once the job ends.
        for entry in fs::read_dir(&out).unwrap().flatten() {
            fs::remove_file(entry.path()).unwrap();
        }
        let again = controller.start(plan).unwrap();
        assert_eq!(controller.wait(&again, None).unwrap().status, JobStatus::Completed);

        controller.discard(&id).unwrap();
        assert!(matches!(controller.status(&id), Err(ExtractError::JobNotFound { .. })));
    }

    #[test]
    fn test_status_is_terminal_once_finished_is_logged() {
        let src = source(2);
        let dst = TempDir::new().unwrap();
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &TransformConfig::default(), &dst.path().join("out"));

        let controller = JobController::default();
        let id = controller.start(plan).unwrap();
        let mut cursor = 0;
        loop {
            let events = controller.wait_for_events(&id, cursor, Duration::from_secs(30)).unwrap();
            assert!(!events.is_empty(), "job stalled");
            cursor += events.len();
            if events.iter().any(|e| e.summary().is_some()) {
                break;
            }
        }
        assert_eq!(controller.status(&id).unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn test_nested_destination_is_busy() {
        let src = source(2);
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("out");
        let scan = scan_tree(src.path()).unwrap();
        let plan = build_plan(&scan, &[], &gated_config(), &out);
        let inner = build_plan(&scan, &[], &TransformConfig::default(), &out.join("sub"));
        let outer = build_plan(&scan, &[], &TransformConfig::default(), dst.path());
        let sibling = build_plan(&scan, &[], &TransformConfig::default(), &dst.path().join("out-2"));

        let gate = Arc::new(Gate::default());
        let capabilities = Capabilities::builtin().with_structural(Arc::new(GatedRewriter(Arc::clone(&gate))));
        let controller = JobController::new(capabilities, ApplyOptions::default());

        let id = controller.start(plan).unwrap();
        assert!(matches!(controller.start(inner), Err(ExtractError::DestinationBusy { .. })));
        assert!(matches!(controller.start(outer), Err(ExtractError::DestinationBusy { .. })));
        gate.open();
        let other = controller.start(sibling).unwrap();

        assert_eq!(controller.wait(&id, Some(Duration::from_secs(30))).unwrap().status, JobStatus::Completed);
        assert_eq!(controller.wait(&other, Some(Duration::from_secs(30))).unwrap().status, JobStatus::Completed);
        assert!(!out.join("sub").exists());
    }

    #[test]
    fn test_precondition_failure_creates_no_job() {
        let src = source(1);
        let dst = TempDir::new().unwrap();
        fs::write(dst.path().join("taken.txt"), "x").unwrap();
        let plan = build_plan(&scan_tree(src.path()).unwrap(), &[], &TransformConfig::default(), dst.path());

        let controller = JobController::default();
        let err = controller.start(plan.clone()).unwrap_err();
        assert!(matches!(err, ExtractError::DestinationNotEmpty { .. }));
        assert!(controller.jobs().is_empty());
        // The failed start must not leave the destination claimed.
        let err = controller.start(plan).unwrap_err();
        assert!(matches!(err, ExtractError::DestinationNotEmpty { .. }));
    }
}
