//! Review command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::assist::{plan_context, Assistant, AssistantSettings, HeuristicAssistant};
use crate::plan::load_plan;

#[derive(Args)]
pub struct ReviewArgs {
    /// Saved plan to review
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    /// Free-form request passed along with the plan
    #[arg(short, long, value_name = "TEXT", default_value = "Review this extraction plan")]
    pub message: String,

    /// Print the assistant context instead of the review
    #[arg(long)]
    pub context: bool,

    /// Context budget in estimated tokens
    #[arg(long, value_name = "TOKENS")]
    pub max_tokens: Option<usize>,
}

pub fn run(args: ReviewArgs) -> Result<()> {
    let plan = load_plan(&args.plan).with_context(|| format!("Failed to load plan {}", args.plan.display()))?;
    let mut settings = AssistantSettings::default();
    if let Some(max_tokens) = args.max_tokens {
        settings.max_context_tokens = max_tokens;
    }

    if args.context {
        println!("{}", plan_context(&args.message, &plan, settings.context_budget()));
        return Ok(());
    }

    let assistant = HeuristicAssistant;
    let review = assistant.review_plan(&args.message, &plan)?;
    println!("Review ({}):", assistant.name());
    println!("{}", review);
    Ok(())
}
