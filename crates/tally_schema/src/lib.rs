//! # tally_schema
//!
//! Resource, usage and cost component model for Tally.
//!
//! This crate holds everything cost handlers read and produce, without any
//! provider-specific knowledge.
//!
//! ## Features
//!
//! - **Attribute trees**: path-addressed [`Value`] lookups that never fail
//! - **Resource views**: [`ResourceData`] with resolved link attributes
//! - **Usage views**: [`UsageData`] and YAML [`UsageFile`] loading
//! - **Cost model**: [`CostComponent`], [`CatalogFilter`], [`PriceFilter`], [`Resource`] trees
//! - **Tiered pricing**: [`calculate_tier_buckets`] and [`tier_start_amounts`]
//! - **Plan loading**: [`PlanParser`] for `terraform show -json` output
//!
//! ## Example
//!
//! ```rust,no_run
//! use tally_schema::{PlanParser, UsageFile};
//!
//! let resources = PlanParser::new()
//!     .with_reference_attributes("azurerm_key_vault_key", &["key_vault_id"])
//!     .parse_file("plan.json")
//!     .unwrap();
//! let usage = UsageFile::from_file("tally-usage.yml").unwrap();
//!
//! for resource in &resources {
//!     println!("{} has usage: {}", resource.address, usage.get(&resource.address).is_some());
//! }
//! ```

pub mod cost;
pub mod error;
pub mod plan;
pub mod resource;
pub mod resource_data;
pub mod tiers;
pub mod usage_data;
pub mod value;

pub use cost::{
    AttributeFilter, AttributePredicate, CatalogFilter, CatalogProduct, CostComponent, PriceFilter, Quantity,
    HOURS_PER_MONTH,
};
pub use error::{SchemaError, SchemaResult};
pub use plan::{PlanParser, DEFAULT_AWS_REGION};
pub use resource::Resource;
pub use resource_data::ResourceData;
pub use tiers::{calculate_tier_buckets, tier_start_amounts};
pub use usage_data::{UsageData, UsageFile, SUPPORTED_USAGE_VERSIONS};
pub use value::Value;
