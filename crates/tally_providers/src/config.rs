//! Estimate configuration.
//!
//! Values that were historically package-level constants live here and are
//! handed to the handlers that need them when the registry is built.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Tunable defaults for cost estimation, loadable from TOML.
///
/// ```toml
/// detailed_monitoring_metric_count = 7
/// default_volume_size_gb = 8
/// default_volume_type = "gp2"
/// default_aws_region = "us-east-1"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimateConfig {
    /// CloudWatch metrics assumed for EC2 detailed monitoring.
    pub detailed_monitoring_metric_count: u32,
    /// Size of a volume whose size is not declared.
    pub default_volume_size_gb: u32,
    /// Type of a volume whose type is not declared.
    pub default_volume_type: String,
    /// Region for AWS resources when the plan's provider names none.
    pub default_aws_region: String,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            detailed_monitoring_metric_count: 7,
            default_volume_size_gb: 8,
            default_volume_type: "gp2".to_string(),
            default_aws_region: tally_schema::DEFAULT_AWS_REGION.to_string(),
        }
    }
}

impl EstimateConfig {
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        debug!("Reading estimate config from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ProviderResult<Self> {
        let config: EstimateConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ProviderResult<()> {
        if self.default_volume_type.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "default_volume_type must not be empty".to_string(),
            ));
        }
        if self.default_aws_region.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "default_aws_region must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
