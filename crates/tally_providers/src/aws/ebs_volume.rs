//! EBS volumes, standalone (`aws_ebs_volume`) or attached as instance block devices.

use rust_decimal::Decimal;
use tally_schema::{CatalogFilter, CostComponent, Quantity, Resource, ResourceData, UsageData, Value};

use crate::config::EstimateConfig;
use crate::error::Skip;
use crate::handler::CostHandler;

use super::VENDOR;

const SERVICE: &str = "AmazonEC2";

/// gp3 volumes include this much throughput (MBps) and IOPS at no charge.
const GP3_FREE_THROUGHPUT: u64 = 125;
const GP3_FREE_IOPS: u64 = 3000;

/// I/O requests on magnetic volumes are billed per million.
const IO_REQUEST_BLOCK: u64 = 1_000_000;

/// Fallbacks for volumes that omit their type or size.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VolumeDefaults {
    pub volume_type: String,
    pub size_gb: Decimal,
}

impl VolumeDefaults {
    pub(crate) fn from_config(config: &EstimateConfig) -> Self {
        Self {
            volume_type: config.default_volume_type.clone(),
            size_gb: Decimal::from(config.default_volume_size_gb),
        }
    }
}

/// The priced attributes of one volume.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VolumeSpec {
    pub volume_type: String,
    pub size_gb: Decimal,
    pub iops: Option<Decimal>,
    pub throughput: Option<Decimal>,
}

impl VolumeSpec {
    /// Read a volume from a block such as `root_block_device.0`.
    /// The type attribute is `volume_type` on block devices and `type` on `aws_ebs_volume`.
    pub(crate) fn from_block(block: &Value, type_key: &str, size_key: &str, defaults: &VolumeDefaults) -> Self {
        let volume_type = block
            .get(type_key)
            .as_str()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| defaults.volume_type.clone());

        Self {
            volume_type,
            size_gb: block.get(size_key).as_decimal().unwrap_or(defaults.size_gb),
            iops: block.get("iops").as_decimal(),
            throughput: block.get("throughput").as_decimal(),
        }
    }
}

fn storage_label(volume_type: &str) -> String {
    match volume_type {
        "gp2" => "General Purpose SSD storage (gp2)".to_string(),
        "gp3" => "General Purpose SSD storage (gp3)".to_string(),
        "io1" => "Provisioned IOPS SSD storage (io1)".to_string(),
        "io2" => "Provisioned IOPS SSD storage (io2)".to_string(),
        "st1" => "Throughput Optimized HDD storage (st1)".to_string(),
        "sc1" => "Cold HDD storage (sc1)".to_string(),
        "standard" => "Magnetic storage".to_string(),
        other => format!("Storage ({})", other),
    }
}

fn ec2_filter(region: &str, product_family: &str) -> CatalogFilter {
    CatalogFilter::new()
        .vendor(VENDOR)
        .region(region)
        .service(SERVICE)
        .product_family(product_family)
}

/// Cost components of one volume. `io_requests` is the monthly request count
/// for magnetic volumes; `None` leaves that component's quantity unknown.
pub(crate) fn ebs_volume_cost_components(region: &str, volume: &VolumeSpec, io_requests: Option<Decimal>) -> Vec<CostComponent> {
    let volume_type = volume.volume_type.as_str();

    let mut components = vec![CostComponent::new(
        storage_label(volume_type),
        "GB",
        Quantity::monthly(volume.size_gb),
        ec2_filter(region, "Storage").attribute("volumeApiName", volume_type),
    )];

    match volume_type {
        "io1" | "io2" => {
            let usage_type = if volume_type == "io1" {
                "/EBS:VolumeP-IOPS.piops/"
            } else {
                "/EBS:VolumeP-IOPS.io2/"
            };
            components.push(CostComponent::new(
                "Provisioned IOPS",
                "IOPS",
                Quantity::monthly(volume.iops.unwrap_or(Decimal::ZERO)),
                ec2_filter(region, "System Operation")
                    .attribute("volumeApiName", volume_type)
                    .attribute_regex("usagetype", usage_type),
            ));
        }
        "gp3" => {
            let extra_throughput = volume
                .throughput
                .map(|t| t - Decimal::from(GP3_FREE_THROUGHPUT))
                .filter(|t| *t > Decimal::ZERO);
            if let Some(throughput) = extra_throughput {
                components.push(CostComponent::new(
                    "Provisioned throughput",
                    "Mbps",
                    Quantity::monthly(throughput),
                    ec2_filter(region, "Provisioned Throughput")
                        .attribute("volumeApiName", volume_type)
                        .attribute_regex("usagetype", "/EBS:VolumeP-Throughput.gp3/"),
                ));
            }

            let extra_iops = volume
                .iops
                .map(|i| i - Decimal::from(GP3_FREE_IOPS))
                .filter(|i| *i > Decimal::ZERO);
            if let Some(iops) = extra_iops {
                components.push(CostComponent::new(
                    "Provisioned IOPS",
                    "IOPS",
                    Quantity::monthly(iops),
                    ec2_filter(region, "System Operation")
                        .attribute("volumeApiName", volume_type)
                        .attribute_regex("usagetype", "/EBS:VolumeP-IOPS.gp3/"),
                ));
            }
        }
        "standard" => {
            components.push(CostComponent::new(
                "I/O requests",
                "1M request",
                Quantity::Monthly(io_requests.map(|r| r / Decimal::from(IO_REQUEST_BLOCK))),
                ec2_filter(region, "System Operation")
                    .attribute("volumeApiName", volume_type)
                    .attribute_regex("usagetype", "/EBS:VolumeIOUsage/"),
            ));
        }
        _ => {}
    }

    components
}

/// Handler for `aws_ebs_volume`.
#[derive(Debug, Clone)]
pub struct EbsVolume {
    defaults: VolumeDefaults,
}

impl EbsVolume {
    pub fn new(config: &EstimateConfig) -> Self {
        Self {
            defaults: VolumeDefaults::from_config(config),
        }
    }
}

impl CostHandler for EbsVolume {
    fn resource_type(&self) -> &str {
        "aws_ebs_volume"
    }

    fn notes(&self) -> &[&'static str] {
        &["Volumes created from snapshots without an explicit size use the configured default size."]
    }

    fn build(&self, data: &ResourceData, usage: Option<&UsageData>) -> Result<Resource, Skip> {
        let region = data.get("region").string();
        let volume = VolumeSpec::from_block(data.values(), "type", "size", &self.defaults);

        let io_requests = usage
            .filter(|u| u.exists("monthly_standard_io_requests"))
            .and_then(|u| u.get("monthly_standard_io_requests").as_decimal());

        Ok(Resource::new(data.address.clone())
            .with_cost_components(ebs_volume_cost_components(&region, &volume, io_requests)))
    }
}
