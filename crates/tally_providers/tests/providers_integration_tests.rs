//! Integration tests running plans through the standard registry.

use std::fs;
use std::sync::Arc;

use rust_decimal_macros::dec;
use tally_providers::{EstimateConfig, Estimator, ProviderError, Registry};
use tally_schema::{Quantity, UsageFile};
use tempfile::tempdir;

const PLAN: &str = r#"{
  "planned_values": {
    "root_module": {
      "resources": [
        {
          "address": "azurerm_resource_group.main",
          "mode": "managed",
          "type": "azurerm_resource_group",
          "name": "main",
          "values": { "name": "rg", "location": "westeurope" }
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
          "values": { "key_type": "EC-HSM", "key_size": null }
        },
        {
          "address": "aws_instance.web",
          "mode": "managed",
          "type": "aws_instance",
          "name": "web",
          "values": { "instance_type": "t3.medium", "ebs_optimized": true }
        },
        {
          "address": "aws_instance.bastion",
          "mode": "managed",
          "type": "aws_instance",
          "name": "bastion",
          "values": { "instance_type": "m5.large", "tenancy": "host" }
        }
      ]
    }
  },
  "configuration": {
    "provider_config": {
      "aws": {
        "name": "aws",
        "expressions": { "region": { "constant_value": "eu-west-2" } }
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

const USAGE: &str = r#"
version: 0.1
resource_usage:
  azurerm_key_vault_key.signing:
    hsm_protected_keys: 600
    monthly_protected_keys_operations: 30000
  aws_instance.web:
    operating_system: windows
"#;

#[test]
fn test_estimate_plan_with_usage() {
    let dir = tempdir().unwrap();
    let plan_path = dir.path().join("plan.json");
    let usage_path = dir.path().join("tally-usage.yml");
    fs::write(&plan_path, PLAN).unwrap();
    fs::write(&usage_path, USAGE).unwrap();

    let config = EstimateConfig::default();
    let registry = Registry::standard(&config);
    let resources = registry.plan_parser(&config).parse_file(&plan_path).unwrap();
    let usage = UsageFile::from_file(&usage_path).unwrap();

    let estimate = Estimator::new(Arc::new(registry)).estimate(&resources, &usage);

    let names: Vec<_> = estimate.resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["azurerm_resource_group.main", "azurerm_key_vault_key.signing", "aws_instance.web"]
    );

    let summary = &estimate.summary;
    assert_eq!(summary.total_resources, 5);
    assert_eq!(summary.priced_resources, 2);
    assert_eq!(summary.free_resources, 1);
    assert_eq!(summary.skipped_resources, vec!["aws_instance.bastion"]);
    assert_eq!(summary.unsupported_resource_counts.get("azurerm_key_vault"), Some(&1));

    let key = &estimate.resources[1];
    let tiers: Vec<_> = key
        .cost_components
        .iter()
        .filter(|c| c.name.starts_with("HSM-protected keys ("))
        .map(|c| c.quantity.clone())
        .collect();
    assert_eq!(tiers, vec![Quantity::monthly(dec!(250)), Quantity::monthly(dec!(350))]);
    assert_eq!(
        key.cost_components.last().unwrap().quantity,
        Quantity::monthly(dec!(3))
    );
    assert!(key.validate().is_ok());

    let web = &estimate.resources[2];
    let compute = &web.cost_components[0];
    assert_eq!(compute.name, "Instance usage (Windows, on-demand, t3.medium)");
    assert_eq!(compute.catalog_filter.region.as_deref(), Some("eu-west-2"));
    assert!(web.cost_component("EBS-optimized usage").is_some());
    assert!(web.cost_component("CPU credits").is_some());
    assert_eq!(
        web.sub_resource("root_block_device").unwrap().cost_components[0].quantity,
        Quantity::monthly(dec!(8))
    );
}

#[test]
fn test_config_changes_handler_defaults() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("tally.toml");
    fs::write(
        &config_path,
        "default_volume_size_gb = 20\ndefault_volume_type = \"gp3\"\ndefault_aws_region = \"ap-south-1\"\n",
    )
    .unwrap();

    let config = EstimateConfig::from_file(&config_path).unwrap();
    let registry = Registry::standard(&config);
    let plan = r#"{"planned_values": {"root_module": {"resources": [
        {"address": "aws_ebs_volume.data", "type": "aws_ebs_volume", "name": "data", "values": {}}
    ]}}}"#;
    let resources = registry.plan_parser(&config).parse_str(plan).unwrap();

    let estimate = Estimator::new(Arc::new(registry)).estimate(&resources, &UsageFile::empty());
    let storage = &estimate.resources[0].cost_components[0];
    assert_eq!(storage.name, "General Purpose SSD storage (gp3)");
    assert_eq!(storage.quantity, Quantity::monthly(dec!(20)));
    assert_eq!(storage.catalog_filter.region.as_deref(), Some("ap-south-1"));
}

#[test]
fn test_rejects_unknown_config_keys() {
    let result = EstimateConfig::from_toml_str("volume_size = 10\n");
    assert!(matches!(result, Err(ProviderError::Toml(_))));
}

#[test]
fn test_estimate_serializes_to_json() {
    let config = EstimateConfig::default();
    let registry = Registry::standard(&config);
    let plan = r#"{"planned_values": {"root_module": {"resources": [
        {"address": "aws_vpc.main", "type": "aws_vpc", "name": "main", "values": {}}
    ]}}}"#;
    let resources = registry.plan_parser(&config).parse_str(plan).unwrap();
    let estimate = Estimator::new(Arc::new(registry)).estimate(&resources, &UsageFile::empty());

    let json = serde_json::to_value(&estimate).unwrap();
    assert_eq!(json["resources"][0]["name"], "aws_vpc.main");
    assert_eq!(json["resources"][0]["noPrice"], true);
    assert_eq!(json["summary"]["freeResources"], 1);
}
