//! Cost components and the filters that locate their prices.
//!
//! Handlers build these as plain values. Monetary amounts are never computed
//! here: a pricing collaborator resolves each [`CatalogFilter`] and
//! [`PriceFilter`] to at most one price and multiplies by the quantity.

use std::collections::HashMap;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::error::{SchemaError, SchemaResult};

/// Hours used to convert hourly quantities into a month.
pub const HOURS_PER_MONTH: u32 = 730;

/// Billing period of a quantity. `None` means the amount depends on usage
/// that was not supplied and must be displayed as unknown, not zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "period", content = "amount", rename_all = "lowercase")]
pub enum Quantity {
    Hourly(Option<Decimal>),
    Monthly(Option<Decimal>),
}

impl Quantity {
    pub fn hourly(amount: Decimal) -> Self {
        Quantity::Hourly(Some(amount))
    }

    pub fn monthly(amount: Decimal) -> Self {
        Quantity::Monthly(Some(amount))
    }

    pub fn is_known(&self) -> bool {
        self.amount().is_some()
    }

    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Quantity::Hourly(amount) | Quantity::Monthly(amount) => *amount,
        }
    }

    /// The quantity over a month, converting hourly amounts.
    pub fn monthly_amount(&self) -> Option<Decimal> {
        match self {
            Quantity::Hourly(amount) => amount.map(|a| a * Decimal::from(HOURS_PER_MONTH)),
            Quantity::Monthly(amount) => *amount,
        }
    }
}

/// How a catalog attribute is compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributePredicate {
    /// Exact string match.
    Value(String),
    /// Regular expression in `/pattern/flags` form, e.g. `/EBSOptimized/`.
    ValueRegex(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeFilter {
    pub key: String,
    #[serde(flatten)]
    pub predicate: AttributePredicate,
}

impl AttributeFilter {
    pub fn value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            predicate: AttributePredicate::Value(value.into()),
        }
    }

    pub fn regex(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            predicate: AttributePredicate::ValueRegex(pattern.into()),
        }
    }

    /// Compile the regex predicate, if any.
    pub fn compiled_regex(&self) -> SchemaResult<Option<Regex>> {
        match &self.predicate {
            AttributePredicate::Value(_) => Ok(None),
            AttributePredicate::ValueRegex(pattern) => compile_slash_regex(pattern).map(Some),
        }
    }

    pub fn matches(&self, attribute: Option<&str>) -> bool {
        let Some(actual) = attribute else {
            return false;
        };
        match &self.predicate {
            AttributePredicate::Value(expected) => expected == actual,
            AttributePredicate::ValueRegex(pattern) => match compile_slash_regex(pattern) {
                Ok(regex) => regex.is_match(actual),
                Err(e) => {
                    warn!("Ignoring attribute filter on {}: {}", self.key, e);
                    false
                }
            },
        }
    }
}

/// Compile `/pattern/flags`. Only the `i` flag is recognized.
fn compile_slash_regex(pattern: &str) -> SchemaResult<Regex> {
    let (body, flags) = match pattern.strip_prefix('/').and_then(|rest| rest.rfind('/').map(|end| (rest, end))) {
        Some((rest, end)) => (&rest[..end], &rest[end + 1..]),
        None => (pattern, ""),
    };
    let source = if flags.contains('i') {
        format!("(?i){}", body)
    } else {
        body.to_string()
    };
    Regex::new(&source).map_err(|source| SchemaError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// A product as described by a pricing catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogProduct {
    pub vendor_name: String,
    pub region: String,
    pub service: String,
    pub product_family: String,
    pub attributes: HashMap<String, String>,
}

/// Predicates identifying one billing SKU in the pricing catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_family: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attribute_filters: Vec<AttributeFilter>,
}

impl CatalogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor_name = Some(vendor.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn product_family(mut self, family: impl Into<String>) -> Self {
        self.product_family = Some(family.into());
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribute_filters.push(AttributeFilter::value(key, value));
        self
    }

    pub fn attribute_regex(mut self, key: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.attribute_filters.push(AttributeFilter::regex(key, pattern));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.vendor_name.is_none()
            && self.region.is_none()
            && self.service.is_none()
            && self.product_family.is_none()
            && self.attribute_filters.is_empty()
    }

    /// Whether `product` satisfies every predicate of this filter.
    pub fn matches(&self, product: &CatalogProduct) -> bool {
        let exact = |expected: &Option<String>, actual: &str| {
            expected.as_deref().map_or(true, |e| e == actual)
        };

        exact(&self.vendor_name, &product.vendor_name)
            && exact(&self.region, &product.region)
            && exact(&self.service, &product.service)
            && exact(&self.product_family, &product.product_family)
            && self
                .attribute_filters
                .iter()
                .all(|f| f.matches(product.attributes.get(&f.key).map(String::as_str)))
    }
}

/// Narrows a matched product to a single price record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_usage_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_offering_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_purchase_option: Option<String>,
}

impl PriceFilter {
    pub fn purchase_option(option: impl Into<String>) -> Self {
        Self {
            purchase_option: Some(option.into()),
            ..Self::default()
        }
    }

    pub fn start_usage(amount: impl Into<String>) -> Self {
        Self {
            start_usage_amount: Some(amount.into()),
            ..Self::default()
        }
    }

    pub fn with_start_usage(mut self, amount: impl Into<String>) -> Self {
        self.start_usage_amount = Some(amount.into());
        self
    }
}

/// One priced line item of a resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostComponent {
    pub name: String,
    pub unit: String,
    pub unit_multiplier: u32,
    pub quantity: Quantity,
    pub catalog_filter: CatalogFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_filter: Option<PriceFilter>,
    /// When set, a missing catalog price drops this component instead of failing the resource.
    pub ignore_if_missing_price: bool,
}

impl CostComponent {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, quantity: Quantity, catalog_filter: CatalogFilter) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            unit_multiplier: 1,
            quantity,
            catalog_filter,
            price_filter: None,
            ignore_if_missing_price: false,
        }
    }

    pub fn with_price_filter(mut self, price_filter: PriceFilter) -> Self {
        self.price_filter = Some(price_filter);
        self
    }

    pub fn with_unit_multiplier(mut self, multiplier: u32) -> Self {
        self.unit_multiplier = multiplier;
        self
    }

    pub fn ignore_if_missing_price(mut self) -> Self {
        self.ignore_if_missing_price = true;
        self
    }

    /// Check that the catalog filter is usable: non-empty and with valid regexes.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.catalog_filter.is_empty() {
            return Err(SchemaError::InvalidComponent {
                component: self.name.clone(),
                message: "catalog filter is empty".to_string(),
            });
        }
        for filter in &self.catalog_filter.attribute_filters {
            filter.compiled_regex()?;
        }
        Ok(())
    }
}
