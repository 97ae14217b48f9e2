//! Breakdown command - Build the cost breakdown of a plan.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::{debug, info};

use tally_providers::{Estimate, EstimateConfig, Estimator, Registry};
use tally_schema::UsageFile;

use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct BreakdownArgs {
    /// Path to `terraform show -json` output
    #[arg(short, long)]
    pub path: PathBuf,

    /// YAML usage file keyed by resource address
    #[arg(short, long, env = "TALLY_USAGE_FILE")]
    pub usage_file: Option<PathBuf>,

    /// TOML estimate config
    #[arg(short, long, env = "TALLY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub fn execute(args: BreakdownArgs) -> Result<()> {
    let estimate = run(&args)?;

    let output = match args.format {
        OutputFormat::Text => render::estimate_text(&estimate),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&estimate).context("Failed to serialize estimate")?
        }
    };
    println!("{}", output);

    Ok(())
}

/// Load the inputs and price every resource in the plan.
pub fn run(args: &BreakdownArgs) -> Result<Estimate> {
    let config = match &args.config {
        Some(path) => EstimateConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EstimateConfig::default(),
    };
    debug!("Using estimate config: {:?}", config);

    let registry = Registry::standard(&config);

    info!("Loading plan: {}", args.path.display());
    let resources = registry
        .plan_parser(&config)
        .parse_file(&args.path)
        .with_context(|| format!("Failed to load plan {}", args.path.display()))?;

    let usage = match &args.usage_file {
        Some(path) => UsageFile::from_file(path)
            .with_context(|| format!("Failed to load usage file {}", path.display()))?,
        None => UsageFile::empty(),
    };
    debug!("Loaded usage for {} addresses", usage.len());

    Ok(Estimator::new(Arc::new(registry)).estimate(&resources, &usage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PLAN: &str = r#"{"planned_values": {"root_module": {"resources": [
        {"address": "aws_instance.web", "type": "aws_instance", "name": "web",
         "values": {"instance_type": "m5.large"}},
        {"address": "aws_vpc.main", "type": "aws_vpc", "name": "main", "values": {}}
    ]}}}"#;

    fn args(path: PathBuf) -> BreakdownArgs {
        BreakdownArgs {
            path,
            usage_file: None,
            config: None,
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn test_run_prices_plan() {
        let dir = tempdir().unwrap();
        let plan_path = dir.path().join("plan.json");
        fs::write(&plan_path, PLAN).unwrap();

        let estimate = run(&args(plan_path)).unwrap();
        assert_eq!(estimate.summary.priced_resources, 1);
        assert_eq!(estimate.summary.free_resources, 1);
    }

    #[test]
    fn test_run_applies_usage_file() {
        let dir = tempdir().unwrap();
        let plan_path = dir.path().join("plan.json");
        let usage_path = dir.path().join("usage.yml");
        fs::write(&plan_path, PLAN).unwrap();
        fs::write(
            &usage_path,
            "version: 0.1\nresource_usage:\n  aws_instance.web:\n    operating_system: rhel\n",
        )
        .unwrap();

        let mut args = args(plan_path);
        args.usage_file = Some(usage_path);
        let estimate = run(&args).unwrap();
        assert_eq!(
            estimate.resources[0].cost_components[0].name,
            "Instance usage (RHEL, on-demand, m5.large)"
        );
    }

    #[test]
    fn test_missing_plan_is_an_input_error() {
        let dir = tempdir().unwrap();
        let err = run(&args(dir.path().join("missing.json"))).unwrap_err();
        assert!(err.chain().any(|c| c.is::<tally_schema::SchemaError>()));
    }
}
