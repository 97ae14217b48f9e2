//! Loader for `terraform show -json` plan output.
//!
//! Only managed resources are loaded. AWS resources that do not declare a
//! region inherit the provider's region. Link attributes registered with
//! [`PlanParser::with_reference_attributes`] are resolved from the
//! configuration's expression references into [`ResourceData`] snapshots.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{SchemaError, SchemaResult};
use crate::resource_data::ResourceData;
use crate::value::Value;

/// Region assumed for AWS resources when the plan names none.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

#[derive(Debug, Default, Deserialize)]
struct PlanJson {
    #[serde(default)]
    planned_values: Option<PlannedValues>,
    #[serde(default)]
    configuration: Option<Configuration>,
}

#[derive(Debug, Deserialize)]
struct PlannedValues {
    root_module: PlannedModule,
}

#[derive(Debug, Default, Deserialize)]
struct PlannedModule {
    #[serde(default)]
    resources: Vec<PlannedResource>,
    #[serde(default)]
    child_modules: Vec<PlannedModule>,
}

#[derive(Debug, Deserialize)]
struct PlannedResource {
    address: String,
    #[serde(default = "managed_mode")]
    mode: String,
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    provider_name: String,
    #[serde(default)]
    values: serde_json::Value,
}

fn managed_mode() -> String {
    "managed".to_string()
}

#[derive(Debug, Default, Deserialize)]
struct Configuration {
    #[serde(default)]
    provider_config: BTreeMap<String, ProviderConfig>,
    #[serde(default)]
    root_module: ConfigModule,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderConfig {
    #[serde(default)]
    name: String,
    #[serde(default)]
    expressions: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigModule {
    #[serde(default)]
    resources: Vec<ConfigResource>,
    #[serde(default)]
    module_calls: BTreeMap<String, ModuleCall>,
}

#[derive(Debug, Default, Deserialize)]
struct ModuleCall {
    #[serde(default)]
    module: ConfigModule,
}

#[derive(Debug, Deserialize)]
struct ConfigResource {
    address: String,
    #[serde(default)]
    expressions: HashMap<String, serde_json::Value>,
}

/// Parser turning plan JSON into resource views.
#[derive(Debug, Clone)]
pub struct PlanParser {
    reference_attributes: HashMap<String, Vec<String>>,
    default_aws_region: String,
}

impl Default for PlanParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanParser {
    pub fn new() -> Self {
        Self {
            reference_attributes: HashMap::new(),
            default_aws_region: DEFAULT_AWS_REGION.to_string(),
        }
    }

    /// Declare which attributes of `resource_type` link to other resources.
    pub fn with_reference_attributes(mut self, resource_type: impl Into<String>, attributes: &[&str]) -> Self {
        if !attributes.is_empty() {
            self.reference_attributes
                .entry(resource_type.into())
                .or_default()
                .extend(attributes.iter().map(|a| a.to_string()));
        }
        self
    }

    pub fn with_default_aws_region(mut self, region: impl Into<String>) -> Self {
        self.default_aws_region = region.into();
        self
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> SchemaResult<Vec<ResourceData>> {
        let path = path.as_ref();
        debug!("Reading plan from {:?}", path);
        let content = fs::read_to_string(path)?;
        self.parse_str(&content).map_err(|e| match e {
            SchemaError::Json(source) => SchemaError::InvalidPlan {
                path: path.to_path_buf(),
                message: source.to_string(),
            },
            SchemaError::InvalidPlan { message, .. } => SchemaError::InvalidPlan {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse plan JSON. Resources are returned in declaration order,
    /// root module first, then child modules depth-first.
    pub fn parse_str(&self, content: &str) -> SchemaResult<Vec<ResourceData>> {
        let plan: PlanJson = serde_json::from_str(content)?;

        let planned = plan.planned_values.ok_or_else(|| SchemaError::InvalidPlan {
            path: PathBuf::new(),
            message: "missing planned_values".to_string(),
        })?;
        let configuration = plan.configuration.unwrap_or_default();

        let aws_region = provider_region(&configuration.provider_config, "aws")
            .unwrap_or_else(|| self.default_aws_region.clone());

        let mut planned_resources = Vec::new();
        collect_planned(&planned.root_module, &mut planned_resources);

        let mut bases = Vec::with_capacity(planned_resources.len());
        for resource in planned_resources {
            if resource.mode != "managed" {
                debug!("Skipping {} resource {}", resource.mode, resource.address);
                continue;
            }
            let mut data = ResourceData::new(
                resource.address.clone(),
                resource.resource_type.clone(),
                Value::from(resource.values.clone()),
            )
            .with_provider_name(resource.provider_name.clone());

            if resource.resource_type.starts_with("aws_") {
                data.set_default("region", Value::from(aws_region.as_str()));
            }
            let prefix = module_prefix(&resource.address, &resource.resource_type, &resource.name);
            bases.push((data, prefix));
        }

        let mut config_resources = HashMap::new();
        collect_config(&configuration.root_module, "", &mut config_resources);

        let targets = AddressIndex::new(bases.iter().map(|(data, _)| Arc::new(data.clone())));

        let mut resources = Vec::with_capacity(bases.len());
        for (mut data, prefix) in bases {
            if let Some(attributes) = self.reference_attributes.get(&data.resource_type) {
                let config = config_resources.get(strip_index(&data.address));
                for attribute in attributes {
                    let references = config
                        .and_then(|c| c.expressions.get(attribute))
                        .map(expression_references)
                        .unwrap_or_default();

                    let mut seen = Vec::new();
                    for reference in references {
                        match targets.resolve(&prefix, &reference, index_suffix(&data.address)) {
                            Some(target) if !seen.contains(&target.address) => {
                                seen.push(target.address.clone());
                                data.add_reference(attribute.clone(), target);
                            }
                            Some(_) => {}
                            None => debug!("Unresolved reference {} on {}", reference, data.address),
                        }
                    }
                }
            }
            resources.push(data);
        }

        debug!("Parsed {} managed resources from plan", resources.len());
        Ok(resources)
    }
}

fn collect_planned<'a>(module: &'a PlannedModule, out: &mut Vec<&'a PlannedResource>) {
    out.extend(module.resources.iter());
    for child in &module.child_modules {
        collect_planned(child, out);
    }
}

fn collect_config<'a>(module: &'a ConfigModule, prefix: &str, out: &mut HashMap<String, &'a ConfigResource>) {
    for resource in &module.resources {
        out.insert(format!("{}{}", prefix, resource.address), resource);
    }
    for (name, call) in &module.module_calls {
        collect_config(&call.module, &format!("{}module.{}.", prefix, name), out);
    }
}

fn provider_region(providers: &BTreeMap<String, ProviderConfig>, provider: &str) -> Option<String> {
    let config = providers
        .get(provider)
        .or_else(|| providers.values().find(|p| p.name == provider))?;

    match config.expressions.get("region").and_then(|e| e.get("constant_value")) {
        Some(serde_json::Value::String(region)) => Some(region.clone()),
        Some(other) => {
            warn!("Ignoring non-string {} provider region: {}", provider, other);
            None
        }
        None => None,
    }
}

/// `module.a.aws_instance.web[0]` → `module.a.`
fn module_prefix(address: &str, resource_type: &str, name: &str) -> String {
    let base = strip_index(address);
    let suffix = format!("{}.{}", resource_type, name);
    base.strip_suffix(&suffix).unwrap_or("").to_string()
}

/// `aws_instance.web[0]` → `aws_instance.web`
fn strip_index(address: &str) -> &str {
    match address.rfind('[') {
        Some(open) if address.ends_with(']') => &address[..open],
        _ => address,
    }
}

fn expression_references(expression: &serde_json::Value) -> Vec<String> {
    expression
        .get("references")
        .and_then(|r| r.as_array())
        .map(|refs| {
            refs.iter()
                .filter_map(|r| r.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// `aws_instance.web[0]` → `Some("[0]")`
fn index_suffix(address: &str) -> Option<&str> {
    let base = strip_index(address);
    (base.len() < address.len()).then(|| &address[base.len()..])
}

/// Snapshots of every planned resource, by full address and by address
/// without its `[index]`.
struct AddressIndex {
    by_address: HashMap<String, Arc<ResourceData>>,
    by_base: HashMap<String, Vec<Arc<ResourceData>>>,
}

impl AddressIndex {
    fn new(snapshots: impl IntoIterator<Item = Arc<ResourceData>>) -> Self {
        let mut by_address = HashMap::new();
        let mut by_base: HashMap<String, Vec<Arc<ResourceData>>> = HashMap::new();
        for snapshot in snapshots {
            by_base
                .entry(strip_index(&snapshot.address).to_string())
                .or_default()
                .push(snapshot.clone());
            by_address.insert(snapshot.address.clone(), snapshot);
        }
        Self { by_address, by_base }
    }

    /// Resolve `azurerm_key_vault.main[1].id`, `azurerm_key_vault.main.id` or
    /// `azurerm_key_vault.main` within a module.
    ///
    /// An exact instance address always wins. A reference without an index
    /// binds only when the base address has a single instance, or when one
    /// instance shares the referencing resource's index (`count.index`).
    fn resolve(&self, prefix: &str, reference: &str, own_index: Option<&str>) -> Option<Arc<ResourceData>> {
        let mut candidate = format!("{}{}", prefix, reference);
        loop {
            if let Some(target) = self.by_address.get(&candidate) {
                return Some(target.clone());
            }
            let base = strip_index(&candidate);
            if let Some(instances) = self.by_base.get(base) {
                let target = if base.len() == candidate.len() {
                    pick_instance(instances, own_index)
                } else {
                    // Indexed reference to an instance that is not planned under that index.
                    single_instance(instances)
                };
                if target.is_some() {
                    return target;
                }
            }
            let cut = candidate.rfind('.')?;
            if cut <= prefix.len() {
                return None;
            }
            candidate.truncate(cut);
        }
    }
}

fn pick_instance(instances: &[Arc<ResourceData>], own_index: Option<&str>) -> Option<Arc<ResourceData>> {
    single_instance(instances).or_else(|| {
        let own_index = own_index?;
        instances
            .iter()
            .find(|instance| index_suffix(&instance.address) == Some(own_index))
            .cloned()
    })
}

fn single_instance(instances: &[Arc<ResourceData>]) -> Option<Arc<ResourceData>> {
    match instances {
        [only] => Some(only.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{
  "format_version": "1.1",
  "planned_values": {
    "root_module": {
      "resources": [
        {
          "address": "aws_instance.web",
          "mode": "managed",
          "type": "aws_instance",
          "name": "web",
          "provider_name": "registry.terraform.io/hashicorp/aws",
          "values": { "instance_type": "t3.micro", "tenancy": null }
        },
        {
          "address": "data.aws_ami.ubuntu",
          "mode": "data",
          "type": "aws_ami",
          "name": "ubuntu",
          "values": {}
        },
        {
          "address": "azurerm_key_vault.main",
          "mode": "managed",
          "type": "azurerm_key_vault",
          "name": "main",
          "values": { "location": "westeurope", "sku_name": "premium" }
        },
        {
          "address": "azurerm_key_vault_key.signing",
          "mode": "managed",
          "type": "azurerm_key_vault_key",
          "name": "signing",
          "values": { "key_type": "RSA", "key_size": 2048 }
        }
      ],
      "child_modules": [
        {
          "address": "module.workers",
          "resources": [
            {
              "address": "module.workers.aws_instance.worker[0]",
              "mode": "managed",
              "type": "aws_instance",
              "name": "worker",
              "index": 0,
              "values": { "instance_type": "m5.large", "region": "eu-west-1" }
            }
          ]
        }
      ]
    }
  },
  "configuration": {
    "provider_config": {
      "aws": {
        "name": "aws",
        "expressions": { "region": { "constant_value": "us-west-2" } }
      }
    },
    "root_module": {
      "resources": [
        {
          "address": "azurerm_key_vault_key.signing",
          "expressions": {
            "key_vault_id": { "references": ["azurerm_key_vault.main.id", "azurerm_key_vault.main"] }
          }
        }
      ]
    }
  }
}"#;

    fn parser() -> PlanParser {
        PlanParser::new().with_reference_attributes("azurerm_key_vault_key", &["key_vault_id"])
    }

    #[test]
    fn test_parse_managed_resources_in_order() {
        let resources = parser().parse_str(PLAN).unwrap();
        let addresses: Vec<_> = resources.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "aws_instance.web",
                "azurerm_key_vault.main",
                "azurerm_key_vault_key.signing",
                "module.workers.aws_instance.worker[0]",
            ]
        );
    }

    #[test]
    fn test_provider_region_injected() {
        let resources = parser().parse_str(PLAN).unwrap();
        assert_eq!(resources[0].get("region").string(), "us-west-2");
        assert_eq!(resources[3].get("region").string(), "eu-west-1");
        assert!(!resources[1].exists("region"));
    }

    #[test]
    fn test_default_region_without_provider_config() {
        let plan = r#"{"planned_values":{"root_module":{"resources":[
            {"address":"aws_instance.a","type":"aws_instance","name":"a","values":{}}]}}}"#;
        let resources = PlanParser::new().with_default_aws_region("ap-south-1").parse_str(plan).unwrap();
        assert_eq!(resources[0].get("region").string(), "ap-south-1");
    }

    #[test]
    fn test_references_resolved_once() {
        let resources = parser().parse_str(PLAN).unwrap();
        let key = &resources[2];
        let vaults = key.references("key_vault_id");
        assert_eq!(vaults.len(), 1);
        assert_eq!(vaults[0].get("location").string(), "westeurope");
        assert!(key.references("other").is_empty());
    }

    const INDEXED_VAULTS_PLAN: &str = r#"{
  "planned_values": {
    "root_module": {
      "resources": [
        {
          "address": "azurerm_key_vault.main[0]",
          "type": "azurerm_key_vault",
          "name": "main",
          "index": 0,
          "values": { "location": "eastus", "sku_name": "standard" }
        },
        {
          "address": "azurerm_key_vault.main[1]",
          "type": "azurerm_key_vault",
          "name": "main",
          "index": 1,
          "values": { "location": "westeurope", "sku_name": "premium" }
        },
        {
          "address": "azurerm_key_vault_key.pinned",
          "type": "azurerm_key_vault_key",
          "name": "pinned",
          "values": { "key_type": "RSA-HSM" }
        },
        {
          "address": "azurerm_key_vault_key.per_vault[0]",
          "type": "azurerm_key_vault_key",
          "name": "per_vault",
          "index": 0,
          "values": { "key_type": "RSA" }
        },
        {
          "address": "azurerm_key_vault_key.per_vault[1]",
          "type": "azurerm_key_vault_key",
          "name": "per_vault",
          "index": 1,
          "values": { "key_type": "RSA" }
        },
        {
          "address": "azurerm_key_vault_key.ambiguous",
          "type": "azurerm_key_vault_key",
          "name": "ambiguous",
          "values": { "key_type": "RSA" }
        }
      ]
    }
  },
  "configuration": {
    "root_module": {
      "resources": [
        {
          "address": "azurerm_key_vault_key.pinned",
          "expressions": {
            "key_vault_id": {
              "references": ["azurerm_key_vault.main[1].id", "azurerm_key_vault.main[1]", "azurerm_key_vault.main"]
            }
          }
        },
        {
          "address": "azurerm_key_vault_key.per_vault",
          "expressions": {
            "key_vault_id": { "references": ["azurerm_key_vault.main", "count.index"] }
          }
        },
        {
          "address": "azurerm_key_vault_key.ambiguous",
          "expressions": {
            "key_vault_id": { "references": ["azurerm_key_vault.main.id", "azurerm_key_vault.main"] }
          }
        }
      ]
    }
  }
}"#;

    fn referenced_vaults(resource: &ResourceData) -> Vec<(&str, String)> {
        resource
            .references("key_vault_id")
            .iter()
            .map(|vault| (vault.address.as_str(), vault.get("location").string()))
            .collect()
    }

    #[test]
    fn test_indexed_reference_binds_to_that_instance() {
        let resources = parser().parse_str(INDEXED_VAULTS_PLAN).unwrap();
        let pinned = resources.iter().find(|r| r.address == "azurerm_key_vault_key.pinned").unwrap();

        assert_eq!(
            referenced_vaults(pinned),
            vec![("azurerm_key_vault.main[1]", "westeurope".to_string())]
        );
    }

    #[test]
    fn test_unindexed_reference_follows_own_index() {
        let resources = parser().parse_str(INDEXED_VAULTS_PLAN).unwrap();
        let first = resources.iter().find(|r| r.address == "azurerm_key_vault_key.per_vault[0]").unwrap();
        let second = resources.iter().find(|r| r.address == "azurerm_key_vault_key.per_vault[1]").unwrap();

        assert_eq!(referenced_vaults(first), vec![("azurerm_key_vault.main[0]", "eastus".to_string())]);
        assert_eq!(
            referenced_vaults(second),
            vec![("azurerm_key_vault.main[1]", "westeurope".to_string())]
        );
    }

    #[test]
    fn test_ambiguous_reference_is_left_unresolved() {
        let resources = parser().parse_str(INDEXED_VAULTS_PLAN).unwrap();
        let ambiguous = resources.iter().find(|r| r.address == "azurerm_key_vault_key.ambiguous").unwrap();
        assert!(ambiguous.references("key_vault_id").is_empty());
    }

    #[test]
    fn test_missing_planned_values() {
        let result = PlanParser::new().parse_str("{}");
        assert!(matches!(result, Err(SchemaError::InvalidPlan { .. })));
    }

    #[test]
    fn test_address_helpers() {
        assert_eq!(strip_index("aws_instance.web[0]"), "aws_instance.web");
        assert_eq!(strip_index("aws_instance.web[\"a\"]"), "aws_instance.web");
        assert_eq!(module_prefix("module.a.aws_instance.web[0]", "aws_instance", "web"), "module.a.");
        assert_eq!(module_prefix("aws_instance.web", "aws_instance", "web"), "");
        assert_eq!(index_suffix("aws_instance.web[0]"), Some("[0]"));
        assert_eq!(index_suffix("aws_instance.web"), None);
    }
}
