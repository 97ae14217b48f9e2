//! Allocation of a quantity across volume-priced tiers.

use rust_decimal::Decimal;

/// Split `total` across tiers of the given widths.
///
/// Widths are tier sizes, not absolute thresholds: `[250, 1250, 2500]`
/// describes `[0, 250)`, `[250, 1500)`, `[1500, 4000)` and an unbounded
/// `[4000, ∞)`. The result has `widths.len() + 1` buckets in ascending tier
/// order and sums to `total`. Negative totals allocate nothing.
pub fn calculate_tier_buckets(total: Decimal, widths: &[u64]) -> Vec<Decimal> {
    let mut remaining = total.max(Decimal::ZERO);
    let mut buckets = Vec::with_capacity(widths.len() + 1);

    for width in widths {
        let width = Decimal::from(*width);
        let allocated = remaining.min(width);
        buckets.push(allocated);
        remaining -= allocated;
    }
    buckets.push(remaining);

    buckets
}

/// Absolute start amount of each tier: `[250, 1250, 2500]` gives `0, 250, 1500, 4000`.
pub fn tier_start_amounts(widths: &[u64]) -> Vec<Decimal> {
    let mut starts = Vec::with_capacity(widths.len() + 1);
    let mut cumulative = Decimal::ZERO;
    starts.push(cumulative);
    for width in widths {
        cumulative += Decimal::from(*width);
        starts.push(cumulative);
    }
    starts
}
