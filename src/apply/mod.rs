//! Apply engine: preflight, per-file writes and progress events.

pub mod changelog;
pub mod engine;
pub mod events;
pub mod preflight;

pub use engine::{apply, ApplyEngine, ApplyOptions, DEFAULT_FAILURE_THRESHOLD};
pub use events::{ApplyEvent, ApplyOutcome, ApplySummary, ProgressSink};
pub use preflight::{preflight, Roots};
