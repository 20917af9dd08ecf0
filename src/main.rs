//! repo-extract: extract part of a repository into a clean, rebranded copy
//!
//! Scans a source tree, builds a reviewable plan (diffs plus a residual
//! report), then applies it into an empty destination.

use anyhow::Result;

fn main() -> Result<()> {
    repo_extract::cli::run()
}
