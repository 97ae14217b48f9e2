//! EC2 instances (`aws_instance`) and spot requests (`aws_spot_instance_request`).

use rust_decimal::Decimal;
use tracing::{debug, warn};

use tally_schema::{CatalogFilter, CostComponent, PriceFilter, Quantity, Resource, ResourceData, UsageData};

use crate::config::EstimateConfig;
use crate::error::Skip;
use crate::handler::CostHandler;

use super::ebs_volume::{ebs_volume_cost_components, VolumeDefaults, VolumeSpec};
use super::VENDOR;

const INSTANCE_NOTES: &[&str] = &[
    "Costs associated with marketplace AMIs are not supported.",
    "For non-standard Linux AMIs such as Windows and RHEL, the operating system should be specified in usage file.",
    "EC2 detailed monitoring assumes the standard 7 metrics and the lowest tier of prices for CloudWatch.",
    "If a root volume is not specified then an 8Gi gp2 volume is assumed.",
];

/// Burstable families that run in unlimited CPU credit mode unless told otherwise.
const UNLIMITED_BY_DEFAULT_PREFIXES: &[&str] = &["t3.", "t4g."];

/// Instance placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tenancy {
    Shared,
    Dedicated,
}

impl Tenancy {
    pub fn catalog_value(&self) -> &'static str {
        match self {
            Tenancy::Shared => "Shared",
            Tenancy::Dedicated => "Dedicated",
        }
    }
}

/// Operating system, taken from usage until it can be read from the AMI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystem {
    Linux,
    Windows,
    Rhel,
    Suse,
}

impl OperatingSystem {
    pub fn from_usage_value(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "linux" => Some(OperatingSystem::Linux),
            "windows" => Some(OperatingSystem::Windows),
            "rhel" => Some(OperatingSystem::Rhel),
            "suse" => Some(OperatingSystem::Suse),
            _ => None,
        }
    }

    /// Label used in component names.
    pub fn label(&self) -> &'static str {
        match self {
            OperatingSystem::Linux => "Linux/UNIX",
            OperatingSystem::Windows => "Windows",
            OperatingSystem::Rhel => "RHEL",
            OperatingSystem::Suse => "SUSE",
        }
    }

    pub fn catalog_value(&self) -> &'static str {
        match self {
            OperatingSystem::Linux => "Linux",
            OperatingSystem::Windows => "Windows",
            OperatingSystem::Rhel => "RHEL",
            OperatingSystem::Suse => "SUSE",
        }
    }
}

/// How compute hours are bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOption {
    OnDemand,
    Spot,
    Reserved,
}

impl PurchaseOption {
    pub fn label(&self) -> &'static str {
        match self {
            PurchaseOption::OnDemand => "on-demand",
            PurchaseOption::Spot => "spot",
            PurchaseOption::Reserved => "reserved",
        }
    }

    pub fn catalog_value(&self) -> &'static str {
        match self {
            PurchaseOption::OnDemand => "on_demand",
            PurchaseOption::Spot => "spot",
            PurchaseOption::Reserved => "reserved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedTerm {
    OneYear,
    ThreeYear,
}

impl ReservedTerm {
    pub fn from_usage_value(value: &str) -> Option<Self> {
        match value {
            "1_year" => Some(ReservedTerm::OneYear),
            "3_year" => Some(ReservedTerm::ThreeYear),
            _ => None,
        }
    }

    pub fn catalog_value(&self) -> &'static str {
        match self {
            ReservedTerm::OneYear => "1yr",
            ReservedTerm::ThreeYear => "3yr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedPaymentOption {
    NoUpfront,
    PartialUpfront,
    AllUpfront,
}

impl ReservedPaymentOption {
    pub fn from_usage_value(value: &str) -> Option<Self> {
        match value {
            "no_upfront" => Some(ReservedPaymentOption::NoUpfront),
            "partial_upfront" => Some(ReservedPaymentOption::PartialUpfront),
            "all_upfront" => Some(ReservedPaymentOption::AllUpfront),
            _ => None,
        }
    }

    pub fn catalog_value(&self) -> &'static str {
        match self {
            ReservedPaymentOption::NoUpfront => "No Upfront",
            ReservedPaymentOption::PartialUpfront => "Partial Upfront",
            ReservedPaymentOption::AllUpfront => "All Upfront",
        }
    }
}

/// Reserved instance terms requested through usage.
///
/// Unrecognized term or payment values are left unset (and warned about)
/// rather than guessed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reservation {
    offering_class: String,
    term: Option<ReservedTerm>,
    payment_option: Option<ReservedPaymentOption>,
}

/// Look up an enumerated usage value: `Ok(None)` when the key is not
/// supplied, `Err(raw)` when it is supplied but not recognized.
fn usage_choice<T>(usage: &UsageData, key: &str, parse: fn(&str) -> Option<T>) -> Result<Option<T>, String> {
    if !usage.exists(key) {
        return Ok(None);
    }
    let raw = usage.get(key).string();
    parse(&raw).map(Some).ok_or(raw)
}

impl Reservation {
    /// Reservation requested by a non-empty `reserved_instance_type`.
    fn from_usage(address: &str, usage: &UsageData) -> Option<Self> {
        let offering_class = usage.get("reserved_instance_type").string();
        if offering_class.is_empty() {
            return None;
        }

        let term = match usage_choice(usage, "reserved_instance_term", ReservedTerm::from_usage_value) {
            Ok(term) => term,
            Err(raw) => {
                warn!(address, "Unrecognized reserved_instance_term {:?}, leaving term length unset", raw);
                None
            }
        };
        let payment_option = match usage_choice(
            usage,
            "reserved_instance_payment_option",
            ReservedPaymentOption::from_usage_value,
        ) {
            Ok(payment_option) => payment_option,
            Err(raw) => {
                warn!(
                    address,
                    "Unrecognized reserved_instance_payment_option {:?}, leaving payment option unset", raw
                );
                None
            }
        };

        if term.is_none() || payment_option.is_none() {
            debug!(address, "Reserved instance usage without a complete term and payment option");
        }

        Some(Self {
            offering_class,
            term,
            payment_option,
        })
    }

    fn price_filter(&self) -> PriceFilter {
        PriceFilter {
            start_usage_amount: Some("0".to_string()),
            term_offering_class: Some(self.offering_class.clone()),
            term_length: self.term.map(|t| t.catalog_value().to_string()),
            term_purchase_option: self.payment_option.map(|p| p.catalog_value().to_string()),
            ..PriceFilter::default()
        }
    }
}

/// Handler for EC2 instances bought on-demand or as spot requests.
#[derive(Debug, Clone)]
pub struct Instance {
    resource_type: &'static str,
    purchase_option: PurchaseOption,
    monitoring_metric_count: u32,
    volume_defaults: VolumeDefaults,
}

impl Instance {
    /// `aws_instance`, billed on-demand unless usage requests a reservation.
    pub fn on_demand(config: &EstimateConfig) -> Self {
        Self::with_purchase_option("aws_instance", PurchaseOption::OnDemand, config)
    }

    /// `aws_spot_instance_request`, billed at spot prices.
    pub fn spot(config: &EstimateConfig) -> Self {
        Self::with_purchase_option("aws_spot_instance_request", PurchaseOption::Spot, config)
    }

    fn with_purchase_option(resource_type: &'static str, purchase_option: PurchaseOption, config: &EstimateConfig) -> Self {
        Self {
            resource_type,
            purchase_option,
            monitoring_metric_count: config.detailed_monitoring_metric_count,
            volume_defaults: VolumeDefaults::from_config(config),
        }
    }

    fn compute_cost_component(
        &self,
        data: &ResourceData,
        usage: Option<&UsageData>,
        tenancy: Tenancy,
    ) -> CostComponent {
        let region = data.get("region").string();
        let instance_type = data.get("instance_type").string();

        let os = match usage.map(|u| usage_choice(u, "operating_system", OperatingSystem::from_usage_value)) {
            Some(Ok(Some(os))) => os,
            Some(Err(value)) => {
                warn!(
                    address = %data.address,
                    "Unrecognized operating system {}, defaulting to Linux/UNIX", value
                );
                OperatingSystem::Linux
            }
            _ => OperatingSystem::Linux,
        };

        let reservation = usage.and_then(|u| Reservation::from_usage(&data.address, u));
        let (purchase_option, price_filter) = match &reservation {
            Some(reservation) => (PurchaseOption::Reserved, reservation.price_filter()),
            None => (
                self.purchase_option,
                PriceFilter::purchase_option(self.purchase_option.catalog_value()),
            ),
        };

        CostComponent::new(
            format!("Instance usage ({}, {}, {})", os.label(), purchase_option.label(), instance_type),
            "hours",
            Quantity::hourly(Decimal::ONE),
            CatalogFilter::new()
                .vendor(VENDOR)
                .region(&region)
                .service("AmazonEC2")
                .product_family("Compute Instance")
                .attribute("instanceType", &instance_type)
                .attribute("tenancy", tenancy.catalog_value())
                .attribute("operatingSystem", os.catalog_value())
                .attribute("preInstalledSw", "NA")
                .attribute("capacitystatus", "Used"),
        )
        .with_price_filter(price_filter)
    }

    fn ebs_optimized_cost_component(&self, region: &str, instance_type: &str) -> CostComponent {
        CostComponent::new(
            "EBS-optimized usage",
            "hours",
            Quantity::hourly(Decimal::ONE),
            CatalogFilter::new()
                .vendor(VENDOR)
                .region(region)
                .service("AmazonEC2")
                .product_family("Compute Instance")
                .attribute("instanceType", instance_type)
                .attribute_regex("usagetype", "/EBSOptimized/"),
        )
        .ignore_if_missing_price()
    }

    fn detailed_monitoring_cost_component(&self, region: &str) -> CostComponent {
        CostComponent::new(
            "EC2 detailed monitoring",
            "metrics",
            Quantity::monthly(Decimal::from(self.monitoring_metric_count)),
            CatalogFilter::new()
                .vendor(VENDOR)
                .region(region)
                .service("AmazonCloudWatch")
                .product_family("Metric"),
        )
        .with_price_filter(PriceFilter::start_usage("0"))
        .ignore_if_missing_price()
    }

    fn cpu_credits_cost_component(&self, data: &ResourceData, region: &str, instance_type: &str) -> Option<CostComponent> {
        let mut cpu_credits = data.get("credit_specification.0.cpu_credits").string();
        if cpu_credits.is_empty()
            && UNLIMITED_BY_DEFAULT_PREFIXES
                .iter()
                .any(|prefix| instance_type.starts_with(prefix))
        {
            cpu_credits = "unlimited".to_string();
        }

        if cpu_credits != "unlimited" {
            return None;
        }

        let family = instance_type.split('.').next().unwrap_or(instance_type);

        Some(CostComponent::new(
            "CPU credits",
            "vCPU-hours",
            Quantity::Hourly(None),
            CatalogFilter::new()
                .vendor(VENDOR)
                .region(region)
                .service("AmazonEC2")
                .product_family("CPU Credits")
                .attribute("operatingSystem", "Linux")
                .attribute_regex("usagetype", format!("/CPUCredits:{}$/", family)),
        ))
    }

    fn block_devices(&self, data: &ResourceData, region: &str) -> Vec<Resource> {
        let root = VolumeSpec::from_block(
            data.get("root_block_device.0"),
            "volume_type",
            "volume_size",
            &self.volume_defaults,
        );
        let mut devices = vec![Resource::new("root_block_device")
            .with_cost_components(ebs_volume_cost_components(region, &root, None))];

        for (index, block) in data.get("ebs_block_device").array().into_iter().enumerate() {
            let volume = VolumeSpec::from_block(block, "volume_type", "volume_size", &self.volume_defaults);
            devices.push(
                Resource::new(format!("ebs_block_device[{}]", index))
                    .with_cost_components(ebs_volume_cost_components(region, &volume, None)),
            );
        }

        devices
    }
}

impl CostHandler for Instance {
    fn resource_type(&self) -> &str {
        self.resource_type
    }

    fn notes(&self) -> &[&'static str] {
        INSTANCE_NOTES
    }

    fn build(&self, data: &ResourceData, usage: Option<&UsageData>) -> Result<Resource, Skip> {
        let tenancy = match data.get("tenancy").as_str() {
            Some("host") => return Err(Skip::unsupported("host tenancy for AWS EC2 instances")),
            Some("dedicated") => Tenancy::Dedicated,
            _ => Tenancy::Shared,
        };

        let region = data.get("region").string();
        let instance_type = data.get("instance_type").string();

        let mut components = vec![self.compute_cost_component(data, usage, tenancy)];
        if data.get("ebs_optimized").as_bool() {
            components.push(self.ebs_optimized_cost_component(&region, &instance_type));
        }
        if data.get("monitoring").as_bool() {
            components.push(self.detailed_monitoring_cost_component(&region));
        }
        if let Some(credits) = self.cpu_credits_cost_component(data, &region, &instance_type) {
            components.push(credits);
        }

        Ok(Resource::new(data.address.clone())
            .with_cost_components(components)
            .with_sub_resources(self.block_devices(data, &region)))
    }
}
