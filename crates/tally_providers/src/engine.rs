//! Runs the registry over a plan's resources.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use tally_schema::{Resource, ResourceData, UsageData, UsageFile};

use crate::registry::{Coverage, Registry};

/// Result of pricing a single resource instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A handler produced a cost tree.
    Priced(Resource),
    /// The type is free; the resource carries no components.
    Free(Resource),
    /// The type is billed only by usage; the resource carries no base components.
    UsageOnly(Resource),
    /// The handler declined the configuration. A warning has been logged.
    Skipped,
    /// No handler is registered for the type.
    Unsupported,
}

impl Outcome {
    pub fn resource(&self) -> Option<&Resource> {
        match self {
            Outcome::Priced(r) | Outcome::Free(r) | Outcome::UsageOnly(r) => Some(r),
            Outcome::Skipped | Outcome::Unsupported => None,
        }
    }

    pub fn into_resource(self) -> Option<Resource> {
        match self {
            Outcome::Priced(r) | Outcome::Free(r) | Outcome::UsageOnly(r) => Some(r),
            Outcome::Skipped | Outcome::Unsupported => None,
        }
    }
}

/// Counts of how each resource in a run was treated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_resources: usize,
    pub priced_resources: usize,
    pub free_resources: usize,
    pub usage_only_resources: usize,
    /// Addresses of resources skipped for unsupported configuration.
    pub skipped_resources: Vec<String>,
    /// Unsupported resource types with the number of instances of each.
    pub unsupported_resource_counts: BTreeMap<String, usize>,
}

/// Cost trees for every resource of a run, in plan order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub generated_at: DateTime<Utc>,
    pub resources: Vec<Resource>,
    pub summary: Summary,
}

/// Prices resources using a [`Registry`].
#[derive(Debug, Clone)]
pub struct Estimator {
    registry: Arc<Registry>,
}

impl Estimator {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Price a single resource.
    pub fn estimate_resource(&self, data: &ResourceData, usage: Option<&UsageData>) -> Outcome {
        match self.registry.coverage(&data.resource_type) {
            Coverage::Free => Outcome::Free(Resource::free(data.address.clone())),
            Coverage::UsageOnly => Outcome::UsageOnly(Resource::new(data.address.clone())),
            Coverage::Unsupported => {
                debug!("No cost handler for {} ({})", data.address, data.resource_type);
                Outcome::Unsupported
            }
            Coverage::Priced => {
                let Some(handler) = self.registry.get(&data.resource_type) else {
                    return Outcome::Unsupported;
                };
                match handler.build(data, usage) {
                    Ok(resource) => Outcome::Priced(resource),
                    Err(skip) => {
                        warn!(address = %data.address, "Skipping resource {}: {}", data.address, skip);
                        Outcome::Skipped
                    }
                }
            }
        }
    }

    /// Price every resource, looking up usage by address.
    pub fn estimate(&self, resources: &[ResourceData], usage: &UsageFile) -> Estimate {
        let mut summary = Summary {
            total_resources: resources.len(),
            ..Summary::default()
        };
        let mut priced = Vec::with_capacity(resources.len());

        for data in resources {
            let outcome = self.estimate_resource(data, usage.get(&data.address));
            match &outcome {
                Outcome::Priced(_) => summary.priced_resources += 1,
                Outcome::Free(_) => summary.free_resources += 1,
                Outcome::UsageOnly(_) => summary.usage_only_resources += 1,
                Outcome::Skipped => summary.skipped_resources.push(data.address.clone()),
                Outcome::Unsupported => {
                    *summary
                        .unsupported_resource_counts
                        .entry(data.resource_type.clone())
                        .or_default() += 1;
                }
            }
            if let Some(resource) = outcome.into_resource() {
                priced.push(resource);
            }
        }

        info!(
            "Estimated {} resources: {} priced, {} free, {} usage-only, {} skipped, {} unsupported",
            summary.total_resources,
            summary.priced_resources,
            summary.free_resources,
            summary.usage_only_resources,
            summary.skipped_resources.len(),
            summary.unsupported_resource_counts.values().sum::<usize>()
        );

        Estimate {
            generated_at: Utc::now(),
            resources: priced,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Skip;
    use crate::handler::CostHandler;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Handler double that counts invocations.
    struct CountingHandler {
        resource_type: &'static str,
        calls: AtomicUsize,
        skip: bool,
    }

    impl CountingHandler {
        fn new(resource_type: &'static str) -> Arc<Self> {
            Arc::new(Self {
                resource_type,
                calls: AtomicUsize::new(0),
                skip: false,
            })
        }

        fn skipping(resource_type: &'static str) -> Arc<Self> {
            Arc::new(Self {
                resource_type,
                calls: AtomicUsize::new(0),
                skip: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CostHandler for CountingHandler {
        fn resource_type(&self) -> &str {
            self.resource_type
        }

        fn build(&self, data: &ResourceData, _usage: Option<&UsageData>) -> Result<Resource, Skip> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.skip {
                return Err(Skip::unsupported("test feature"));
            }
            Ok(Resource::new(data.address.clone()))
        }
    }

    fn resource(address: &str, resource_type: &str) -> ResourceData {
        ResourceData::new(address, resource_type, json!({}))
    }

    #[test]
    fn test_free_resource_never_invokes_handler() {
        let handler = CountingHandler::new("aws_vpc");
        let mut registry = Registry::new();
        registry.register(handler.clone());
        registry.add_free_resources(["aws_vpc"]);

        let estimator = Estimator::new(Arc::new(registry));
        let outcome = estimator.estimate_resource(&resource("aws_vpc.main", "aws_vpc"), None);

        assert_eq!(handler.calls(), 0);
        let free = outcome.resource().unwrap();
        assert!(free.no_price);
        assert_eq!(free.component_count(), 0);
    }

    #[test]
    fn test_usage_only_resource_never_invokes_handler() {
        let handler = CountingHandler::new("aws_sqs_queue");
        let mut registry = Registry::new();
        registry.register(handler.clone());
        registry.add_usage_only_resources(["aws_sqs_queue"]);

        let estimator = Estimator::new(Arc::new(registry));
        let outcome = estimator.estimate_resource(&resource("aws_sqs_queue.jobs", "aws_sqs_queue"), None);

        assert_eq!(handler.calls(), 0);
        assert!(matches!(outcome, Outcome::UsageOnly(_)));
    }

    #[test]
    fn test_skip_yields_no_resource() {
        let mut registry = Registry::new();
        registry.register(CountingHandler::skipping("aws_instance"));

        let estimator = Estimator::new(Arc::new(registry));
        let outcome = estimator.estimate_resource(&resource("aws_instance.web", "aws_instance"), None);

        assert_eq!(outcome, Outcome::Skipped);
        assert!(outcome.into_resource().is_none());
    }

    #[test]
    fn test_estimate_summary() {
        let mut registry = Registry::new();
        registry.register(CountingHandler::new("aws_instance"));
        registry.register(CountingHandler::skipping("aws_ebs_volume"));
        registry.add_free_resources(["aws_vpc"]);

        let resources = vec![
            resource("aws_instance.a", "aws_instance"),
            resource("aws_vpc.main", "aws_vpc"),
            resource("aws_ebs_volume.data", "aws_ebs_volume"),
            resource("aws_lambda_function.f", "aws_lambda_function"),
            resource("aws_lambda_function.g", "aws_lambda_function"),
            resource("aws_instance.b", "aws_instance"),
        ];

        let estimate = Estimator::new(Arc::new(registry)).estimate(&resources, &UsageFile::empty());

        let names: Vec<_> = estimate.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["aws_instance.a", "aws_vpc.main", "aws_instance.b"]);
        assert_eq!(estimate.summary.total_resources, 6);
        assert_eq!(estimate.summary.priced_resources, 2);
        assert_eq!(estimate.summary.free_resources, 1);
        assert_eq!(estimate.summary.skipped_resources, vec!["aws_ebs_volume.data"]);
        assert_eq!(estimate.summary.unsupported_resource_counts.get("aws_lambda_function"), Some(&2));
    }
}
