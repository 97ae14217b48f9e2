//! Priced resource trees produced by cost handlers.

use serde::Serialize;

use crate::cost::CostComponent;
use crate::error::SchemaResult;

/// A resource's cost breakdown: its own components plus nested sub-resources
/// such as attached volumes. Sub-resources keep declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cost_components: Vec<CostComponent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_resources: Vec<Resource>,
    /// Set for resources known to be free of charge.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_price: bool,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A zero-cost resource with no components.
    pub fn free(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            no_price: true,
            ..Self::default()
        }
    }

    pub fn with_cost_components(mut self, components: Vec<CostComponent>) -> Self {
        self.cost_components = components;
        self
    }

    pub fn with_sub_resources(mut self, sub_resources: Vec<Resource>) -> Self {
        self.sub_resources = sub_resources;
        self
    }

    /// Find a direct sub-resource by name.
    pub fn sub_resource(&self, name: &str) -> Option<&Resource> {
        self.sub_resources.iter().find(|r| r.name == name)
    }

    /// Find a direct cost component by name.
    pub fn cost_component(&self, name: &str) -> Option<&CostComponent> {
        self.cost_components.iter().find(|c| c.name == name)
    }

    /// Number of cost components in this tree, sub-resources included.
    pub fn component_count(&self) -> usize {
        self.cost_components.len()
            + self
                .sub_resources
                .iter()
                .map(Resource::component_count)
                .sum::<usize>()
    }

    /// Validate every component in the tree.
    pub fn validate(&self) -> SchemaResult<()> {
        for component in &self.cost_components {
            component.validate()?;
        }
        for sub in &self.sub_resources {
            sub.validate()?;
        }
        Ok(())
    }
}
