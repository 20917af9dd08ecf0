//! Plan command implementation

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::{Path, PathBuf};

use super::options::RecipeArgs;
use super::utils::format_bytes;
use crate::config::Recipe;
use crate::domain::{Finding, Plan};
use crate::plan::{save_plan, PlanBuilder, PlanSummary};
use crate::transform::Capabilities;
use crate::utils::resolve_lenient;

/// Where plans are saved when no `--out` is given, relative to the working directory.
pub const DEFAULT_PLAN_DIR: &str = ".repo-extract/plans";

/// Findings printed per residual category.
const MAX_FINDINGS_SHOWN: usize = 10;

#[derive(Args)]
pub struct PlanArgs {
    /// Source directory to extract from
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Paths to extract, relative to SOURCE (defaults to the recipe's includes, then everything)
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,

    /// Destination root the plan will write into
    #[arg(short, long, value_name = "DIR")]
    pub dest: PathBuf,

    /// Plan file to write (.json or .yaml)
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Print the diff of every changed file
    #[arg(long)]
    pub diff: bool,

    #[command(flatten)]
    pub recipe: RecipeArgs,
}

/// Scan `source` and build a plan with the recipe's engines.
pub(super) fn build_from_recipe(
    source: &Path,
    destination: &Path,
    recipe: &Recipe,
    paths: &[String],
) -> Result<(Plan, Capabilities)> {
    let scan = recipe
        .scanner(source)
        .scan()
        .with_context(|| format!("Failed to scan {}", source.display()))?;
    // Saved plans must not depend on the working directory.
    let destination = resolve_lenient(destination)
        .with_context(|| format!("Invalid destination {}", destination.display()))?;
    let capabilities = recipe.capabilities();
    let selected = if paths.is_empty() { recipe.includes.clone() } else { paths.to_vec() };
    let plan = PlanBuilder::new(&scan, recipe.transform_config(), destination)
        .capabilities(capabilities.clone())
        .build(&selected);
    Ok((plan, capabilities))
}

pub fn run(args: PlanArgs) -> Result<()> {
    let recipe = args.recipe.resolve(&args.source)?;
    let (plan, _) = build_from_recipe(&args.source, &args.dest, &recipe, &args.paths)?;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| Path::new(DEFAULT_PLAN_DIR).join(format!("{}.json", plan.id)));
    save_plan(&plan, &out).with_context(|| format!("Failed to save plan to {}", out.display()))?;

    print_plan(&plan);
    if args.diff {
        print_diffs(&plan);
    }
    println!("\nSaved plan to {}", out.display());
    Ok(())
}

pub(super) fn print_plan(plan: &Plan) {
    let summary = PlanSummary::of(plan);
    println!("Plan {}", plan.id);
    println!("  Source:      {}", plan.source_root.display());
    println!("  Destination: {}", plan.destination_root.display());
    println!(
        "  Files:       {} ({} transformed, {} unchanged text, {} copied verbatim), {}",
        summary.actions,
        summary.changed,
        summary.transforms - summary.changed,
        summary.copies,
        format_bytes(summary.bytes)
    );
    if !plan.directories.is_empty() {
        println!("  Empty dirs:  {}", plan.directories.len());
    }
    if summary.warnings > 0 {
        println!("  Warnings:    {}", summary.warnings);
        for action in plan.actions.iter().filter(|a| !a.warnings.is_empty()) {
            for warning in &action.warnings {
                println!("    {}: {}", action.source, warning);
            }
        }
    }

    if plan.residual.is_empty() {
        println!("  Residual:    {}", style("clean").green());
    } else {
        println!("  Residual:    {} findings", style(plan.residual.total()).yellow());
        print_findings("brand", &plan.residual.brand_tokens);
        print_findings("secret", &plan.residual.secrets);
        print_findings("import", &plan.residual.imports);
        print_findings("template", &plan.residual.template_vars);
    }

    if !plan.issues.is_empty() {
        println!("  Issues:");
        for issue in &plan.issues {
            println!("    [{}] {}: {}", style(issue.kind.as_str()).red(), issue.path, issue.message);
        }
    }
}

fn print_findings(label: &str, findings: &[Finding]) {
    for finding in findings.iter().take(MAX_FINDINGS_SHOWN) {
        println!("    {} {}:{} {}", label, finding.path, finding.line, finding.detail);
    }
    if findings.len() > MAX_FINDINGS_SHOWN {
        println!("    ... {} more {} findings", findings.len() - MAX_FINDINGS_SHOWN, label);
    }
}

fn print_diffs(plan: &Plan) {
    for action in &plan.actions {
        let Some(diff) = &action.diff else { continue };
        println!();
        for line in diff.lines() {
            if line.starts_with("+++") || line.starts_with("---") {
                println!("{}", style(line).bold());
            } else if line.starts_with('+') {
                println!("{}", style(line).green());
            } else if line.starts_with('-') {
                println!("{}", style(line).red());
            } else if line.starts_with("@@") {
                println!("{}", style(line).cyan());
            } else {
                println!("{}", line);
            }
        }
    }
}
