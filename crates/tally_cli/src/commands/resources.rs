//! Resources command - List supported resource types.

use anyhow::Result;
use clap::Args;

use tally_providers::{EstimateConfig, Registry};

use crate::render;

#[derive(Args)]
pub struct ResourcesArgs {
    /// Include the free resource types
    #[arg(long)]
    pub include_free: bool,
}

pub fn execute(args: ResourcesArgs) -> Result<()> {
    let registry = Registry::standard(&EstimateConfig::default());
    println!("{}", render::registry_text(&registry, args.include_free));
    Ok(())
}
