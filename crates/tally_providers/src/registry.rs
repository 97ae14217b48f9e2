//! Registry of resource cost handlers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tally_schema::PlanParser;
use tracing::debug;

use crate::aws;
use crate::azure;
use crate::config::EstimateConfig;
use crate::handler::CostHandler;

/// How the registry treats a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Known to cost nothing; no handler is invoked.
    Free,
    /// Costs depend entirely on usage with no base charge; no handler is invoked.
    UsageOnly,
    /// A handler prices this type.
    Priced,
    /// Nothing is known about this type.
    Unsupported,
}

/// A registry of cost handlers plus the free and usage-only type lists.
///
/// The registry maps resource type names to their handlers. Free and
/// usage-only lists are consulted first, so a type listed there never
/// reaches a handler.
#[derive(Default)]
pub struct Registry {
    handlers: BTreeMap<String, Arc<dyn CostHandler>>,
    free_resources: BTreeSet<String>,
    usage_only_resources: BTreeSet<String>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in AWS and Azure handler.
    pub fn standard(config: &EstimateConfig) -> Self {
        let mut registry = Self::new();
        aws::register(&mut registry, config);
        azure::register(&mut registry, config);
        debug!(
            "Built standard registry with {} handlers, {} free types",
            registry.len(),
            registry.free_resources.len()
        );
        registry
    }

    /// Register a handler under its `resource_type()`.
    ///
    /// A handler already registered for the same type is replaced.
    pub fn register(&mut self, handler: Arc<dyn CostHandler>) {
        let name = handler.resource_type().to_string();
        debug!("Registering cost handler: {}", name);
        self.handlers.insert(name, handler);
    }

    pub fn add_free_resources<I, S>(&mut self, resource_types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.free_resources.extend(resource_types.into_iter().map(Into::into));
    }

    pub fn add_usage_only_resources<I, S>(&mut self, resource_types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.usage_only_resources
            .extend(resource_types.into_iter().map(Into::into));
    }

    /// Get a handler by resource type.
    pub fn get(&self, resource_type: &str) -> Option<Arc<dyn CostHandler>> {
        self.handlers.get(resource_type).cloned()
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.handlers.contains_key(resource_type)
    }

    pub fn is_free(&self, resource_type: &str) -> bool {
        self.free_resources.contains(resource_type)
    }

    pub fn is_usage_only(&self, resource_type: &str) -> bool {
        self.usage_only_resources.contains(resource_type)
    }

    pub fn coverage(&self, resource_type: &str) -> Coverage {
        if self.is_free(resource_type) {
            Coverage::Free
        } else if self.is_usage_only(resource_type) {
            Coverage::UsageOnly
        } else if self.contains(resource_type) {
            Coverage::Priced
        } else {
            Coverage::Unsupported
        }
    }

    /// Registered handlers, sorted by resource type.
    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn CostHandler>> {
        self.handlers.values()
    }

    /// Registered resource types, sorted.
    pub fn resource_types(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }

    pub fn free_resources(&self) -> Vec<&str> {
        self.free_resources.iter().map(|s| s.as_str()).collect()
    }

    pub fn usage_only_resources(&self) -> Vec<&str> {
        self.usage_only_resources.iter().map(|s| s.as_str()).collect()
    }

    /// A plan parser that resolves every link attribute a registered handler
    /// declares, defaulting AWS regions from `config`.
    pub fn plan_parser(&self, config: &EstimateConfig) -> PlanParser {
        self.handlers
            .iter()
            .filter(|(_, handler)| !handler.reference_attributes().is_empty())
            .fold(
                PlanParser::new().with_default_aws_region(config.default_aws_region.clone()),
                |parser, (resource_type, handler)| {
                    parser.with_reference_attributes(resource_type.clone(), handler.reference_attributes())
                },
            )
    }

    /// Get the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("free_resources", &self.free_resources.len())
            .field("usage_only_resources", &self.usage_only_resources.len())
            .finish()
    }
}
