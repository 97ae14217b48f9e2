//! User-supplied usage estimates.
//!
//! A usage file is YAML keyed by resource address:
//!
//! ```yaml
//! version: 0.1
//! resource_usage:
//!   aws_instance.web:
//!     operating_system: windows
//!   azurerm_key_vault_key.signing:
//!     monthly_secrets_operations: 250000
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::value::Value;

/// Usage file versions this loader understands.
pub const SUPPORTED_USAGE_VERSIONS: &[&str] = &["0.1"];

/// Usage estimates for one resource address.
///
/// A missing key means "unknown", which is different from an explicit zero.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageData {
    address: String,
    values: Value,
}

impl UsageData {
    pub fn new(address: impl Into<String>, values: impl Into<Value>) -> Self {
        Self {
            address: address.into(),
            values: values.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn get(&self, key: &str) -> &Value {
        self.values.get(key)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.values.get(key).exists()
    }
}

#[derive(Debug, Deserialize)]
struct RawUsageFile {
    version: serde_yaml::Value,
    #[serde(default)]
    resource_usage: BTreeMap<String, serde_json::Value>,
}

/// All usage estimates supplied for a run.
#[derive(Debug, Clone, Default)]
pub struct UsageFile {
    resources: BTreeMap<String, UsageData>,
}

impl UsageFile {
    /// A usage file with no estimates, used when the user supplies none.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        debug!("Reading usage file from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> SchemaResult<Self> {
        let raw: RawUsageFile = serde_yaml::from_str(content)?;

        let version = match &raw.version {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Number(n) => n.to_string(),
            other => format!("{:?}", other),
        };
        if !SUPPORTED_USAGE_VERSIONS.contains(&version.as_str()) {
            return Err(SchemaError::UnsupportedUsageVersion(version));
        }

        let mut file = Self::empty();
        for (address, values) in raw.resource_usage {
            file.insert(UsageData::new(address, values));
        }
        debug!("Loaded usage estimates for {} resources", file.len());
        Ok(file)
    }

    pub fn insert(&mut self, usage: UsageData) {
        self.resources.insert(usage.address.clone(), usage);
    }

    /// Usage for an address, falling back from `name[N]` to a `name[*]` entry.
    pub fn get(&self, address: &str) -> Option<&UsageData> {
        if let Some(usage) = self.resources.get(address) {
            return Some(usage);
        }
        wildcard_address(address).and_then(|wildcard| self.resources.get(&wildcard))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

fn wildcard_address(address: &str) -> Option<String> {
    let open = address.rfind('[')?;
    if !address.ends_with(']') {
        return None;
    }
    Some(format!("{}[*]", &address[..open]))
}
