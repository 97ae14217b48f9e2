//! Read-only view over a single resource's planned configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::value::Value;

/// A Terraform resource instance as seen by cost handlers.
///
/// Referenced resources are snapshots taken without their own references,
/// so following a reference never leads back into a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceData {
    /// Unique resource address, e.g. `aws_instance.web[0]`.
    pub address: String,
    /// Resource type tag, e.g. `aws_instance`.
    pub resource_type: String,
    /// Terraform provider source, e.g. `registry.terraform.io/hashicorp/aws`.
    pub provider_name: String,
    values: Value,
    references: BTreeMap<String, Vec<Arc<ResourceData>>>,
}

impl ResourceData {
    pub fn new(address: impl Into<String>, resource_type: impl Into<String>, values: impl Into<Value>) -> Self {
        Self {
            address: address.into(),
            resource_type: resource_type.into(),
            provider_name: String::new(),
            values: values.into(),
            references: BTreeMap::new(),
        }
    }

    pub fn with_provider_name(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = provider_name.into();
        self
    }

    /// Record that `attribute` links to `target`. Targets keep declaration order.
    pub fn with_reference(mut self, attribute: impl Into<String>, target: ResourceData) -> Self {
        self.add_reference(attribute, Arc::new(target));
        self
    }

    pub(crate) fn add_reference(&mut self, attribute: impl Into<String>, target: Arc<ResourceData>) {
        self.references.entry(attribute.into()).or_default().push(target);
    }

    /// Value at a dotted attribute path, or [`Value::Absent`].
    pub fn get(&self, path: &str) -> &Value {
        self.values.get(path)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.values.get(path).exists()
    }

    /// Resources linked through `attribute`, empty when unresolved.
    pub fn references(&self, attribute: &str) -> &[Arc<ResourceData>] {
        self.references
            .get(attribute)
            .map(|targets| targets.as_slice())
            .unwrap_or(&[])
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Set a top-level attribute unless the configuration already declares it.
    pub(crate) fn set_default(&mut self, key: &str, value: Value) {
        if !self.values.get(key).exists() {
            self.values.insert(key, value);
        }
    }
}
