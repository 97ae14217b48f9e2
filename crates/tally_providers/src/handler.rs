//! The capability every resource cost handler implements.

use tally_schema::{Resource, ResourceData, UsageData};

use crate::error::Skip;

/// Maps one resource type to its cost components.
///
/// Implementations are pure: the same resource and usage always produce the
/// same tree, nothing is cached between calls, and inputs are never mutated.
/// Handlers are `Send + Sync` so callers may price resources in parallel.
pub trait CostHandler: Send + Sync {
    /// Terraform resource type handled, e.g. `aws_instance`.
    fn resource_type(&self) -> &str;

    /// Human-readable caveats about how this resource is priced.
    fn notes(&self) -> &[&'static str] {
        &[]
    }

    /// Attributes that link to other resources and must be resolved before
    /// [`CostHandler::build`] runs.
    fn reference_attributes(&self) -> &[&'static str] {
        &[]
    }

    /// Build the resource's cost tree, or explain why it is skipped.
    fn build(&self, data: &ResourceData, usage: Option<&UsageData>) -> Result<Resource, Skip>;
}
