//! Microsoft Azure resources.

pub mod key_vault_key;

use std::sync::Arc;

use crate::config::EstimateConfig;
use crate::registry::Registry;

pub use key_vault_key::KeyVaultKey;

pub(crate) const VENDOR: &str = "azure";

/// Azure types that never incur charges, grouped by service.
pub const FREE_RESOURCES: &[&str] = &[
    // Base
    "azurerm_resource_group",
    "azurerm_resource_provider_registration",
    "azurerm_subscription",
    // Blueprints
    "azurerm_blueprint_assignment",
    // Key Vault
    "azurerm_key_vault_access_policy",
    "azurerm_key_vault_certificate_data",
    "azurerm_key_vault_certificate_issuer",
    "azurerm_key_vault_secret",
    // Networking
    "azurerm_application_security_group",
    "azurerm_network_security_group",
    "azurerm_virtual_network",
    // Policy
    "azurerm_policy_assignment",
    "azurerm_policy_definition",
    "azurerm_policy_remediation",
    "azurerm_policy_set_definition",
];

pub const USAGE_ONLY_RESOURCES: &[&str] = &[];

pub fn register(registry: &mut Registry, _config: &EstimateConfig) {
    registry.register(Arc::new(KeyVaultKey::new()));
    registry.add_free_resources(FREE_RESOURCES.iter().copied());
    registry.add_usage_only_resources(USAGE_ONLY_RESOURCES.iter().copied());
}
