//! Command-line interface for repo-extract
//!
//! Provides `scan`, `plan`, `apply`, `plans`, `review`, `tools` and `completions`.

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod apply;
mod options;
mod plan;
mod plans;
mod progress;
mod review;
mod scan;
mod tools;
mod utils;

/// Extract part of a source tree into a fresh, de-branded copy
#[derive(Parser)]
#[command(name = "repo-extract")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a source tree and print its structure
    Scan(scan::ScanArgs),

    /// Build a reviewable plan with diffs and a residual report
    Plan(Box<plan::PlanArgs>),

    /// Apply a plan into an empty destination
    Apply(Box<apply::ApplyArgs>),

    /// List saved plans
    Plans(plans::PlansArgs),

    /// Offline review of a saved plan
    Review(review::ReviewArgs),

    /// Show available external tools and the selected engines
    Tools(tools::ToolsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    shell: Shell,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Wire verbose flag to the tracing log level.
    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Scan(args) => scan::run(args),
        Commands::Plan(args) => plan::run(*args),
        Commands::Apply(args) => apply::run(*args),
        Commands::Plans(args) => plans::run(args),
        Commands::Review(args) => review::run(args),
        Commands::Tools(args) => tools::run(args),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(args.shell, &mut command, name, &mut std::io::stdout());
            Ok(())
        }
    }
}
