//! Plain-text rendering of estimates and the registry.

use std::fmt::Write;

use rust_decimal::Decimal;
use tally_providers::{Estimate, Registry};
use tally_schema::{CostComponent, Resource};

const NAME_WIDTH: usize = 60;

/// Render every resource as an indented tree of components with their
/// monthly quantities, followed by the run summary.
pub fn estimate_text(estimate: &Estimate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<NAME_WIDTH$} {:>14}  UNIT", "NAME", "MONTHLY QTY");

    for resource in &estimate.resources {
        write_resource(&mut out, resource, 0);
        out.push('\n');
    }

    let summary = &estimate.summary;
    let _ = writeln!(
        out,
        "{} resources: {} priced, {} free, {} usage-only, {} skipped, {} unsupported",
        summary.total_resources,
        summary.priced_resources,
        summary.free_resources,
        summary.usage_only_resources,
        summary.skipped_resources.len(),
        summary.unsupported_resource_counts.values().sum::<usize>()
    );
    for address in &summary.skipped_resources {
        let _ = writeln!(out, "  skipped: {}", address);
    }
    for (resource_type, count) in &summary.unsupported_resource_counts {
        let _ = writeln!(out, "  unsupported: {} x {}", count, resource_type);
    }

    out
}

fn write_resource(out: &mut String, resource: &Resource, depth: usize) {
    let indent = "  ".repeat(depth);
    let label = if resource.no_price {
        format!("{}{} (free)", indent, resource.name)
    } else {
        format!("{}{}", indent, resource.name)
    };
    let _ = writeln!(out, "{}", label);

    for component in &resource.cost_components {
        write_component(out, component, depth + 1);
    }
    for sub in &resource.sub_resources {
        write_resource(out, sub, depth + 1);
    }
}

fn write_component(out: &mut String, component: &CostComponent, depth: usize) {
    let name = format!("{}{}", "  ".repeat(depth), component.name);
    let quantity = component
        .quantity
        .monthly_amount()
        .map(format_quantity)
        .unwrap_or_else(|| "unknown".to_string());
    let _ = writeln!(out, "{:<NAME_WIDTH$} {:>14}  {}", name, quantity, component.unit);
}

fn format_quantity(amount: Decimal) -> String {
    amount.round_dp(4).normalize().to_string()
}

/// Render the registered, usage-only and (optionally) free resource types.
pub fn registry_text(registry: &Registry, include_free: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Supported resources ({}):", registry.len());
    for handler in registry.handlers() {
        let _ = writeln!(out, "  {}", handler.resource_type());
        for note in handler.notes() {
            let _ = writeln!(out, "    - {}", note);
        }
    }

    let usage_only = registry.usage_only_resources();
    if !usage_only.is_empty() {
        let _ = writeln!(out, "\nUsage-only resources ({}):", usage_only.len());
        for resource_type in usage_only {
            let _ = writeln!(out, "  {}", resource_type);
        }
    }

    let free = registry.free_resources();
    if include_free {
        let _ = writeln!(out, "\nFree resources ({}):", free.len());
        for resource_type in free {
            let _ = writeln!(out, "  {}", resource_type);
        }
    } else {
        let _ = writeln!(out, "\n{} free resource types (use --include-free to list them)", free.len());
    }

    out
}
