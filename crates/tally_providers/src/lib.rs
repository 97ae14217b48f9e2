//! # tally_providers
//!
//! Cost handlers for cloud resources and the engine that runs them.
//!
//! ## Features
//!
//! - **Handler trait**: [`CostHandler`] maps one resource type to a cost tree
//! - **Registry**: [`Registry`] with free and usage-only type lists
//! - **Engine**: [`Estimator`] prices a plan and summarizes the run
//! - **Configuration**: [`EstimateConfig`] loaded from TOML
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tally_providers::{EstimateConfig, Estimator, Registry};
//! use tally_schema::UsageFile;
//!
//! let config = EstimateConfig::default();
//! let registry = Registry::standard(&config);
//! let resources = registry.plan_parser(&config).parse_file("plan.json").unwrap();
//!
//! let estimate = Estimator::new(Arc::new(registry)).estimate(&resources, &UsageFile::empty());
//! println!("{} resources priced", estimate.summary.priced_resources);
//! ```

pub mod aws;
pub mod azure;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod registry;

pub use config::EstimateConfig;
pub use engine::{Estimate, Estimator, Outcome, Summary};
pub use error::{ProviderError, ProviderResult, Skip};
pub use handler::CostHandler;
pub use registry::{Coverage, Registry};
