//! Tools command implementation

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::options::RecipeArgs;
use crate::transform::imports::native::supported_languages;

#[derive(Args)]
pub struct ToolsArgs {
    /// Source directory whose recipe selects the engines
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    #[command(flatten)]
    pub recipe: RecipeArgs,
}

pub fn run(args: ToolsArgs) -> Result<()> {
    let recipe = args.recipe.resolve(&args.path)?;
    let capabilities = recipe.capabilities();

    println!("External tools:");
    match capabilities.comby_path() {
        Some(path) => println!("  comby: {}", path.display()),
        None => println!("  comby: not found"),
    }
    println!("Selected engines:");
    println!("  structural rewrite: {}", capabilities.structural_name());
    println!("  import fix: {}", capabilities.import_name());
    println!("Tree-sitter import languages: {}", supported_languages().join(", "));
    Ok(())
}
