//! Amazon Web Services resources.

pub mod ebs_volume;
pub mod instance;

use std::sync::Arc;

use crate::config::EstimateConfig;
use crate::registry::Registry;

pub use ebs_volume::EbsVolume;
pub use instance::Instance;

pub(crate) const VENDOR: &str = "aws";

/// AWS types that never incur charges, grouped by service.
pub const FREE_RESOURCES: &[&str] = &[
    // IAM
    "aws_iam_group",
    "aws_iam_group_policy",
    "aws_iam_policy",
    "aws_iam_role",
    "aws_iam_role_policy",
    "aws_iam_role_policy_attachment",
    "aws_iam_user",
    "aws_iam_user_policy",
    // EC2
    "aws_key_pair",
    "aws_launch_template",
    "aws_volume_attachment",
    // VPC
    "aws_internet_gateway",
    "aws_network_acl",
    "aws_route",
    "aws_route_table",
    "aws_route_table_association",
    "aws_security_group",
    "aws_security_group_rule",
    "aws_subnet",
    "aws_vpc",
];

/// AWS types billed purely on usage. None are tracked yet.
pub const USAGE_ONLY_RESOURCES: &[&str] = &[];

pub fn register(registry: &mut Registry, config: &EstimateConfig) {
    registry.register(Arc::new(EbsVolume::new(config)));
    registry.register(Arc::new(Instance::on_demand(config)));
    registry.register(Arc::new(Instance::spot(config)));
    registry.add_free_resources(FREE_RESOURCES.iter().copied());
    registry.add_usage_only_resources(USAGE_ONLY_RESOURCES.iter().copied());
}
