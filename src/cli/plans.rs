//! Plans command implementation

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::plan::DEFAULT_PLAN_DIR;
use super::utils::format_bytes;
use crate::plan::list_plans;

#[derive(Args)]
pub struct PlansArgs {
    /// Directory holding saved plans
    #[arg(long, value_name = "DIR", default_value = DEFAULT_PLAN_DIR)]
    pub dir: PathBuf,

    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PlansArgs) -> Result<()> {
    let plans = list_plans(&args.dir)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }
    if plans.is_empty() {
        println!("No saved plans in {}", args.dir.display());
        return Ok(());
    }
    for saved in &plans {
        println!("{}", saved.id);
        println!("  path:        {}", saved.path.display());
        println!("  created:     {}", saved.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("  files:       {}", saved.actions);
        println!("  destination: {}", saved.destination_root.display());
        println!("  size:        {}", format_bytes(saved.size));
    }
    Ok(())
}
