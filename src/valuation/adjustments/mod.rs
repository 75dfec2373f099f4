//! Ordered adjustment pipeline applied on top of the resolved base value.

mod rules;
mod tables;

pub use rules::{AdjustmentContext, EXPECTED_MILES_PER_YEAR};
pub use tables::{AdjustmentTables, MAX_FEATURE_BONUS_PCT};

use crate::valuation::domain::Adjustment;

/// Runs every rule in its fixed order. Rules are independent (each computes
/// against the same base value) but the order is part of the audit contract:
/// mileage, condition, location, fuel, trim, accidents, features.
pub fn run_pipeline(ctx: &AdjustmentContext<'_>, tables: &AdjustmentTables) -> Vec<Adjustment> {
    vec![
        rules::mileage(ctx, tables),
        rules::condition(ctx, tables),
        rules::location(ctx, tables),
        rules::fuel_type(ctx, tables),
        rules::trim(ctx, tables),
        rules::accidents(ctx, tables),
        rules::features(ctx, tables),
    ]
}
