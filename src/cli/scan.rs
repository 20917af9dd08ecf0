//! Scan command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::collections::HashSet;
use std::path::PathBuf;

use super::options::RecipeArgs;
use super::utils::format_bytes;
use crate::scan::render_tree;

#[derive(Args)]
pub struct ScanArgs {
    /// Source directory to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Maximum tree depth to print
    #[arg(short, long, default_value_t = 4)]
    pub depth: usize,

    /// Print directories only
    #[arg(long)]
    pub dirs_only: bool,

    /// Print the full scan result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub recipe: RecipeArgs,
}

pub fn run(args: ScanArgs) -> Result<()> {
    let recipe = args.recipe.resolve(&args.path)?;
    let scan = recipe
        .scanner(&args.path)
        .scan()
        .with_context(|| format!("Failed to scan {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&scan)?);
        return Ok(());
    }

    println!("Source: {}", scan.root.display());
    if let Some(revision) = &scan.revision {
        println!("Revision: {}", revision);
    }
    if !scan.stack.detected.is_empty() {
        println!("Stack: {}", scan.stack.detected.join(", "));
    }
    println!(
        "Files: {}  Directories: {}  Size: {}",
        scan.stats.files,
        scan.stats.dirs,
        format_bytes(scan.stats.total_bytes)
    );
    if scan.stats.binary_files > 0 {
        println!("Binary files: {}", scan.stats.binary_files);
    }
    if scan.stats.skipped_excluded > 0 || scan.stats.skipped_symlinks > 0 {
        println!(
            "Skipped: {} excluded, {} symlinks",
            scan.stats.skipped_excluded, scan.stats.skipped_symlinks
        );
    }
    if !scan.stats.languages.is_empty() {
        let mut langs: Vec<_> = scan.stats.languages.iter().collect();
        langs.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        println!("Languages:");
        for (lang, count) in langs {
            println!("  {}: {} files", lang, count);
        }
    }

    let selected: HashSet<String> = recipe.includes.iter().cloned().collect();
    println!("\n{}", render_tree(&scan.tree, args.depth, !args.dirs_only, &selected));
    Ok(())
}
