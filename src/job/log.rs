//! Append-only, replayable event log for one job.
//!
//! Single writer (the job's worker thread), any number of readers. Readers
//! address events by index so a client that reconnects resumes where it left off.

use super::lock;
use crate::apply::ApplyEvent;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct LogState {
    events: Vec<ApplyEvent>,
    closed: bool,
}

#[derive(Default)]
pub struct EventLog {
    state: Mutex<LogState>,
    appended: Condvar,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: ApplyEvent) {
        lock(&self.state).events.push(event);
        self.appended.notify_all();
    }

    /// Mark the log complete. Waiters return immediately from now on.
    pub fn close(&self) {
        lock(&self.state).closed = true;
        self.appended.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    pub fn len(&self) -> usize {
        lock(&self.state).events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events from `index` onward. An index past the end yields nothing.
    pub fn since(&self, index: usize) -> Vec<ApplyEvent> {
        let state = lock(&self.state);
        state.events.get(index..).map(<[ApplyEvent]>::to_vec).unwrap_or_default()
    }

    /// Like [`since`](Self::since), but blocks up to `timeout` for at least one
    /// new event unless the log is already closed.
    pub fn wait_since(&self, index: usize, timeout: Duration) -> Vec<ApplyEvent> {
        let state = lock(&self.state);
        let (state, _) = self
            .appended
            .wait_timeout_while(state, timeout, |s| s.events.len() <= index && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        state.events.get(index..).map(<[ApplyEvent]>::to_vec).unwrap_or_default()
    }

    /// Block until the log is closed. Returns `false` on timeout.
    pub fn wait_closed(&self, timeout: Option<Duration>) -> bool {
        let state = lock(&self.state);
        match timeout {
            Some(timeout) => {
                let (state, _) = self
                    .appended
                    .wait_timeout_while(state, timeout, |s| !s.closed)
                    .unwrap_or_else(PoisonError::into_inner);
                state.closed
            }
            None => {
                let state = self
                    .appended
                    .wait_while(state, |s| !s.closed)
                    .unwrap_or_else(PoisonError::into_inner);
                state.closed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn started(total: usize) -> ApplyEvent {
        ApplyEvent::Started { total, destination: "/out".into() }
    }

    #[test]
    fn test_replay_from_index() {
        let log = EventLog::new();
        log.push(started(1));
        log.push(ApplyEvent::Cancelled { completed: 0, skipped: 1 });
        assert_eq!(log.since(0).len(), 2);
        assert_eq!(log.since(1), vec![ApplyEvent::Cancelled { completed: 0, skipped: 1 }]);
        assert!(log.since(5).is_empty());
    }

    #[test]
    fn test_wait_since_wakes_on_push() {
        let log = Arc::new(EventLog::new());
        let writer = Arc::clone(&log);
        let handle = thread::spawn(move || writer.push(started(2)));
        let events = log.wait_since(0, Duration::from_secs(5));
        handle.join().unwrap();
        assert_eq!(events, vec![started(2)]);
    }

    #[test]
    fn test_closed_log_does_not_block() {
        let log = EventLog::new();
        log.close();
        assert!(log.wait_since(0, Duration::from_secs(30)).is_empty());
        assert!(log.wait_closed(None));
    }
}
