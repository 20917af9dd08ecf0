//! Apply command implementation

use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::options::RecipeArgs;
use super::plan::{build_from_recipe, print_plan};
use super::progress::ApplyProgress;
use crate::apply::{ApplyOutcome, ApplySummary};
use crate::config::Recipe;
use crate::domain::Plan;
use crate::job::JobController;
use crate::plan::load_plan;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Args)]
pub struct ApplyArgs {
    /// Source directory (builds a fresh plan; not needed with --plan)
    #[arg(value_name = "SOURCE", required_unless_present = "plan")]
    pub source: Option<PathBuf>,

    /// Paths to extract, relative to SOURCE
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,

    /// Destination root (required unless --plan is given)
    #[arg(short, long, value_name = "DIR", required_unless_present = "plan")]
    pub dest: Option<PathBuf>,

    /// Apply a saved plan instead of building one
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["source", "dest"])]
    pub plan: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Request cancellation after N files have been processed
    #[arg(long, value_name = "N")]
    pub cancel_after: Option<usize>,

    /// Consecutive file failures that abort the run (0 never aborts)
    #[arg(long, value_name = "N")]
    pub failure_threshold: Option<usize>,

    /// Write CHANGELOG.md into the destination after a completed run
    #[arg(long)]
    pub changelog: bool,

    /// Print every progress event as a JSON line on stdout
    #[arg(long)]
    pub json_events: bool,

    #[command(flatten)]
    pub recipe: RecipeArgs,
}

pub fn run(args: ApplyArgs) -> Result<()> {
    let (plan, recipe) = match &args.plan {
        Some(path) => {
            let plan = load_plan(path).with_context(|| format!("Failed to load plan {}", path.display()))?;
            let recipe = args.recipe.resolve(&plan.source_root)?;
            (plan, recipe)
        }
        None => {
            let (Some(source), Some(dest)) = (&args.source, &args.dest) else {
                bail!("Either --plan or both SOURCE and --dest must be specified");
            };
            let recipe = args.recipe.resolve(source)?;
            let (plan, _) = build_from_recipe(source, dest, &recipe, &args.paths)?;
            (plan, recipe)
        }
    };

    if !args.json_events {
        print_plan(&plan);
        println!();
    }
    if !confirm(&args, plan.actions.len(), &plan.destination_root)? {
        println!("Aborted; nothing was written.");
        return Ok(());
    }

    let summary = run_job(&args, plan, &recipe)?;
    if args.json_events {
        eprintln!("{}", summary.describe());
    } else {
        println!("{}", summary.describe());
    }
    match summary.outcome {
        ApplyOutcome::Failed => bail!(summary.error.unwrap_or_else(|| "apply failed".to_string())),
        ApplyOutcome::Completed | ApplyOutcome::Cancelled => Ok(()),
    }
}

fn confirm(args: &ApplyArgs, files: usize, destination: &Path) -> Result<bool> {
    if args.yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        bail!("Refusing to apply without confirmation; pass --yes for non-interactive runs");
    }
    let answer = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Write {} files into {}?", files, destination.display()))
        .default(false)
        .interact()?;
    Ok(answer)
}

fn run_job(args: &ApplyArgs, plan: Plan, recipe: &Recipe) -> Result<ApplySummary> {
    let mut options = recipe.apply_options();
    if let Some(threshold) = args.failure_threshold {
        options.failure_threshold = threshold;
    }
    if args.changelog {
        options.changelog = true;
    }

    let total = plan.actions.len();
    let controller = JobController::new(recipe.capabilities(), options);
    let id = controller.start(plan)?;
    if args.cancel_after == Some(0) {
        controller.cancel(&id)?;
    }

    let progress = ApplyProgress::new(total, !args.json_events && std::io::stderr().is_terminal());
    let mut cursor = 0;
    let mut processed = 0;
    let mut cancel_sent = args.cancel_after == Some(0);
    let summary = loop {
        let events = controller.wait_for_events(&id, cursor, POLL_INTERVAL)?;
        cursor += events.len();

        let mut finished = None;
        for event in &events {
            if args.json_events {
                println!("{}", serde_json::to_string(event)?);
            }
            progress.observe(event);
            if event.is_file_event() {
                processed += 1;
            }
            if let Some(summary) = event.summary() {
                finished = Some(summary.clone());
            }
        }
        if let Some(summary) = finished {
            break summary;
        }

        if let Some(limit) = args.cancel_after {
            if !cancel_sent && processed >= limit {
                controller.cancel(&id)?;
                cancel_sent = true;
            }
        }

        if events.is_empty() {
            let snapshot = controller.status(&id)?;
            if snapshot.status.is_terminal() && cursor >= snapshot.events {
                match snapshot.summary {
                    Some(summary) => break summary,
                    None => bail!("Job {} ended without a summary", id),
                }
            }
        }
    };
    progress.finish();
    Ok(summary)
}
