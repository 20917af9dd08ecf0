//! repo-extract: carve a subset of a source tree into a fresh, de-linked copy.
//!
//! The pipeline is scan → plan → apply. Scanning and planning never write;
//! apply runs as a cancellable job that only ever writes inside an empty
//! destination root.

pub mod apply;
pub mod assist;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod job;
pub mod plan;
pub mod scan;
pub mod transform;
pub mod utils;

pub use apply::{ApplyEngine, ApplyEvent, ApplyOptions, ApplyOutcome, ApplySummary};
pub use domain::{Plan, PlanAction, ResidualReport, ScanResult, TransformConfig};
pub use error::{ErrorKind, ExtractError, Result};
pub use job::{JobController, JobSnapshot, JobStatus};
pub use plan::{build_plan, PlanBuilder};
pub use scan::{scan_tree, TreeScanner};
pub use transform::{apply_transforms, Capabilities, Pipeline, TransformOutcome};
