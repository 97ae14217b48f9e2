//! Azure Key Vault keys (`azurerm_key_vault_key`).
//!
//! Location and SKU come from the vault the key belongs to, so the handler
//! needs `key_vault_id` resolved before it runs.

use rust_decimal::Decimal;
use tracing::warn;

use tally_schema::{
    calculate_tier_buckets, tier_start_amounts, CatalogFilter, CostComponent, PriceFilter, Quantity, Resource,
    ResourceData, UsageData,
};

use crate::error::Skip;
use crate::handler::CostHandler;

use super::VENDOR;

const KEY_VAULT_ID: &str = "key_vault_id";

const TRANSACTIONS_UNIT: &str = "10K transactions";
const TRANSACTIONS_BLOCK: i64 = 10_000;

/// Widths of the HSM-protected key tiers.
const HSM_KEY_TIERS: [u64; 3] = [250, 1250, 2500];
const HSM_KEY_TIER_LABELS: [&str; 4] = ["first 250", "next 1250", "next 2500", "over 4000"];

/// The vault attributes a key is priced by.
struct Vault {
    location: String,
    sku_name: String,
}

impl Vault {
    fn resolve(data: &ResourceData) -> Result<Self, Skip> {
        let Some(vault) = data.references(KEY_VAULT_ID).first() else {
            return Err(Skip::missing_reference(KEY_VAULT_ID, "the key vault"));
        };

        let location = vault.get("location").string();
        if location.is_empty() {
            return Err(Skip::missing_reference(KEY_VAULT_ID, "the location"));
        }

        Ok(Self {
            location,
            sku_name: title_case(&vault.get("sku_name").string()),
        })
    }

    fn component(
        &self,
        name: impl Into<String>,
        unit: &str,
        meter_name: &str,
        start_usage: impl Into<String>,
        quantity: Option<Decimal>,
        block: i64,
    ) -> CostComponent {
        CostComponent::new(
            name,
            unit,
            Quantity::Monthly(quantity.map(|q| q / Decimal::from(block))),
            CatalogFilter::new()
                .vendor(VENDOR)
                .region(&self.location)
                .service("Key Vault")
                .product_family("Security")
                .attribute("productName", "Key Vault")
                .attribute("skuName", &self.sku_name)
                .attribute("meterName", meter_name),
        )
        .with_price_filter(PriceFilter::purchase_option("Consumption").with_start_usage(start_usage))
    }
}

/// `standard` becomes `Standard`, as the catalog spells SKU names.
fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whole-number usage value, or `None` when the key is not supplied or is
/// not a number. A non-numeric value is warned about and treated as unknown.
fn usage_count(usage: Option<&UsageData>, key: &str) -> Option<Decimal> {
    let usage = usage.filter(|u| u.exists(key))?;
    let value = usage.get(key);
    match value.as_i64() {
        Some(count) => Some(Decimal::from(count)),
        None => {
            warn!(
                address = usage.address(),
                "Unrecognized {} value {:?}, leaving quantity unknown", key, value.string()
            );
            None
        }
    }
}

/// Handler for `azurerm_key_vault_key`.
#[derive(Debug, Clone, Default)]
pub struct KeyVaultKey;

impl KeyVaultKey {
    pub fn new() -> Self {
        Self
    }

    fn hsm_key_components(
        &self,
        vault: &Vault,
        key_type: &str,
        key_size: &str,
        usage: Option<&UsageData>,
    ) -> Vec<CostComponent> {
        let name = "HSM-protected keys";
        let meter_name = if key_type == "RSA-HSM" && key_size == "2048" {
            "Premium HSM-protected RSA 2048-bit key"
        } else {
            "Premium HSM-protected Advanced Key"
        };

        let Some(keys) = usage_count(usage, "hsm_protected_keys") else {
            return vec![vault.component(name, "months", meter_name, "0", None, 1)];
        };

        if key_type == "RSA-HSM" && key_size == "2048" {
            return vec![vault.component(name, "months", meter_name, "0", Some(keys), 1)];
        }

        let buckets = calculate_tier_buckets(keys, &HSM_KEY_TIERS);
        let starts = tier_start_amounts(&HSM_KEY_TIERS);

        buckets
            .into_iter()
            .zip(starts)
            .zip(HSM_KEY_TIER_LABELS)
            .enumerate()
            .filter(|(index, ((quantity, _), _))| *index == 0 || *quantity > Decimal::ZERO)
            .map(|(_, ((quantity, start), label))| {
                vault.component(
                    format!("{} ({})", name, label),
                    "months",
                    meter_name,
                    start.to_string(),
                    Some(quantity),
                    1,
                )
            })
            .collect()
    }
}

impl CostHandler for KeyVaultKey {
    fn resource_type(&self) -> &str {
        "azurerm_key_vault_key"
    }

    fn reference_attributes(&self) -> &[&'static str] {
        &[KEY_VAULT_ID]
    }

    fn notes(&self) -> &[&'static str] {
        &["HSM-protected keys are only priced for Premium vaults."]
    }

    fn build(&self, data: &ResourceData, usage: Option<&UsageData>) -> Result<Resource, Skip> {
        let vault = Vault::resolve(data)?;

        let key_type = data.get("key_type").string();
        let key_size = data.get("key_size").string();
        let is_hsm = key_type.ends_with("HSM");

        let mut components = vec![
            vault.component(
                "Secrets operations",
                TRANSACTIONS_UNIT,
                "Operations",
                "0",
                usage_count(usage, "monthly_secrets_operations"),
                TRANSACTIONS_BLOCK,
            ),
            vault.component(
                "Certificate operations",
                "renewals",
                "Certificate Renewal Request",
                "0",
                usage_count(usage, "monthly_certificate_renewal_requests"),
                1,
            ),
            vault.component(
                "Certificate operations",
                TRANSACTIONS_UNIT,
                "Operations",
                "0",
                usage_count(usage, "monthly_certificate_other_operations"),
                TRANSACTIONS_BLOCK,
            ),
            vault.component(
                "Storage key rotation",
                "renewals",
                "Secret Renewal",
                "0",
                usage_count(usage, "monthly_key_rotation_renewals"),
                1,
            ),
        ];

        let operations_key = "monthly_protected_keys_operations";
        let operations_supplied = usage.map_or(false, |u| u.exists(operations_key));
        let operations = usage_count(usage, operations_key);
        let operations_meter = if key_type == "RSA" && key_size == "2048" {
            "Operations"
        } else {
            "Advanced Key Operations"
        };

        if !is_hsm {
            components.push(vault.component(
                "Software-protected keys",
                TRANSACTIONS_UNIT,
                operations_meter,
                "0",
                operations,
                TRANSACTIONS_BLOCK,
            ));
        }

        if is_hsm && vault.sku_name == "Premium" {
            components.extend(self.hsm_key_components(&vault, &key_type, &key_size, usage));

            // Only emitted when usage supplies the operation count.
            if operations_supplied {
                components.push(vault.component(
                    "HSM-protected keys",
                    TRANSACTIONS_UNIT,
                    operations_meter,
                    "0",
                    operations,
                    TRANSACTIONS_BLOCK,
                ));
            }
        }

        Ok(Resource::new(data.address.clone()).with_cost_components(components))
    }
}
