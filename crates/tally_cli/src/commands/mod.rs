//! CLI command definitions.

use clap::{Parser, Subcommand};

pub mod breakdown;
pub mod resources;

/// Tally - cloud cost estimates from Terraform plans
#[derive(Parser)]
#[command(name = "tally")]
#[command(version, about = "Tally - cloud cost estimates from Terraform plans")]
#[command(long_about = r#"
Tally turns a Terraform plan into a cost breakdown: every resource becomes a
tree of priced line items with the catalog filters needed to look up prices.

COMMANDS:
  breakdown  → Build the cost breakdown of a plan
  resources  → List supported, free and usage-only resource types

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Input error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the cost breakdown of a Terraform plan
    Breakdown(breakdown::BreakdownArgs),

    /// List the resource types Tally knows about
    Resources(resources::ResourcesArgs),
}
