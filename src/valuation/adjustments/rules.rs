//! The seven adjustment rules. Each always yields an [`Adjustment`]; missing
//! input degrades to a zero-impact entry whose description says what was
//! missing, so the audit trail stays complete.

use crate::valuation::domain::{Adjustment, FuelType, ValuationRequest};
use crate::valuation::sources::FuelPrice;

use super::tables::AdjustmentTables;

/// Average miles a US vehicle accrues per year.
pub const EXPECTED_MILES_PER_YEAR: f64 = 12_000.0;

const EXCESS_MILES_GRACE: f64 = 10_000.0;
const LOW_MILES_GRACE: f64 = 5_000.0;
const PENALTY_PER_MILE: f64 = 0.12;
const BONUS_PER_MILE: f64 = 0.08;
const MILEAGE_PENALTY_CAP_PCT: f64 = 0.10;
const MILEAGE_BONUS_CAP_PCT: f64 = 0.05;

/// Everything a rule may consult. Rules read, never write.
pub struct AdjustmentContext<'a> {
    pub request: &'a ValuationRequest,
    pub base_value: f64,
    pub as_of_year: i32,
    pub fuel_price: Option<&'a FuelPrice>,
}

pub fn mileage(ctx: &AdjustmentContext<'_>, _tables: &AdjustmentTables) -> Adjustment {
    const FACTOR: &str = "Mileage";

    let Some(actual) = ctx.request.mileage else {
        return Adjustment::neutral(FACTOR, "no mileage reported; no adjustment".to_string());
    };

    let age = ctx.request.vehicle_age(ctx.as_of_year);
    let expected = age as f64 * EXPECTED_MILES_PER_YEAR;
    let diff = actual - expected;

    if diff > EXCESS_MILES_GRACE {
        let penalty = (diff * PENALTY_PER_MILE).min(ctx.base_value * MILEAGE_PENALTY_CAP_PCT);
        Adjustment::new(
            FACTOR,
            -penalty,
            format!(
                "{} mi vs {} mi expected for a {age}-year-old vehicle",
                group_miles(actual),
                group_miles(expected)
            ),
            ctx.base_value,
        )
    } else if diff < -LOW_MILES_GRACE {
        let bonus = (-diff * BONUS_PER_MILE).min(ctx.base_value * MILEAGE_BONUS_CAP_PCT);
        Adjustment::new(
            FACTOR,
            bonus,
            format!(
                "{} mi, below the {} mi expected for a {age}-year-old vehicle",
                group_miles(actual),
                group_miles(expected)
            ),
            ctx.base_value,
        )
    } else {
        Adjustment::neutral(
            FACTOR,
            format!(
                "{} mi is within the normal band around {} mi expected",
                group_miles(actual),
                group_miles(expected)
            ),
        )
    }
}

pub fn condition(ctx: &AdjustmentContext<'_>, _tables: &AdjustmentTables) -> Adjustment {
    const FACTOR: &str = "Condition";

    let Some(condition) = ctx.request.condition else {
        return Adjustment::neutral(
            FACTOR,
            "no condition reported; assuming good".to_string(),
        );
    };

    let pct = AdjustmentTables::condition_pct(condition);
    if pct == 0.0 {
        return Adjustment::neutral(
            FACTOR,
            format!("{} condition is the pricing baseline", condition.label()),
        );
    }
    Adjustment::new(
        FACTOR,
        ctx.base_value * pct,
        format!(
            "{} condition ({:+.0}% of base value)",
            condition.label(),
            pct * 100.0
        ),
        ctx.base_value,
    )
}

pub fn location(ctx: &AdjustmentContext<'_>, tables: &AdjustmentTables) -> Adjustment {
    const FACTOR: &str = "Location";

    let Some(zip) = ctx.request.zip_code.as_deref() else {
        return Adjustment::neutral(FACTOR, "no ZIP provided; no regional adjustment".to_string());
    };

    match tables.demand_pct(zip) {
        Some((pct, tier)) => Adjustment::new(
            FACTOR,
            ctx.base_value * pct,
            format!("ZIP {zip} is a {tier} market ({:+.0}%)", pct * 100.0),
            ctx.base_value,
        ),
        None => Adjustment::neutral(
            FACTOR,
            format!("ZIP {zip} shows average regional demand"),
        ),
    }
}

pub fn fuel_type(ctx: &AdjustmentContext<'_>, _tables: &AdjustmentTables) -> Adjustment {
    const FACTOR: &str = "Fuel type";

    let Some(fuel) = ctx.request.fuel_type else {
        return Adjustment::neutral(FACTOR, "no fuel type reported; no adjustment".to_string());
    };

    match ctx.fuel_price {
        Some(price) => {
            let regional = price.cost_per_unit;
            let pct = match fuel {
                FuelType::Electric => {
                    if regional > 4.00 {
                        0.035
                    } else {
                        0.025
                    }
                }
                FuelType::Hybrid => {
                    if regional > 3.50 {
                        0.025
                    } else {
                        0.02
                    }
                }
                FuelType::Diesel => {
                    if regional > 4.50 {
                        -0.01
                    } else {
                        0.005
                    }
                }
                FuelType::Premium => -0.01,
                FuelType::Gasoline => 0.0,
            };
            if pct == 0.0 {
                return Adjustment::neutral(
                    FACTOR,
                    format!(
                        "gasoline baseline at ${regional:.2}/gal regional price"
                    ),
                );
            }
            Adjustment::new(
                FACTOR,
                ctx.base_value * pct,
                format!(
                    "{} demand at ${regional:.2}/gal regional fuel price ({:+.1}%)",
                    fuel.label(),
                    pct * 100.0
                ),
                ctx.base_value,
            )
        }
        None => {
            let pct = AdjustmentTables::fuel_fallback_pct(fuel);
            if pct == 0.0 {
                return Adjustment::neutral(
                    FACTOR,
                    format!("{} baseline; no regional price available", fuel.label()),
                );
            }
            Adjustment::new(
                FACTOR,
                ctx.base_value * pct,
                format!(
                    "{} flat adjustment ({:+.1}%); no regional price available",
                    fuel.label(),
                    pct * 100.0
                ),
                ctx.base_value,
            )
        }
    }
}

pub fn trim(ctx: &AdjustmentContext<'_>, tables: &AdjustmentTables) -> Adjustment {
    const FACTOR: &str = "Trim";

    let Some(trim) = ctx.request.trim.as_deref() else {
        return Adjustment::neutral(FACTOR, "no trim reported; no adjustment".to_string());
    };

    match tables.trim_pct(trim) {
        Some((pct, keyword)) => Adjustment::new(
            FACTOR,
            ctx.base_value * pct,
            format!("{trim} trim matches \"{keyword}\" tier ({:+.0}%)", pct * 100.0),
            ctx.base_value,
        ),
        None => Adjustment::neutral(
            FACTOR,
            format!("{trim} trim has no premium or discount on record"),
        ),
    }
}

pub fn accidents(ctx: &AdjustmentContext<'_>, _tables: &AdjustmentTables) -> Adjustment {
    const FACTOR: &str = "Accident history";

    let Some(count) = ctx.request.accidents else {
        return Adjustment::neutral(
            FACTOR,
            "no accident history reported; no adjustment".to_string(),
        );
    };

    if count == 0 {
        return Adjustment::neutral(FACTOR, "clean accident history".to_string());
    }

    let pct = AdjustmentTables::accident_pct(count);
    Adjustment::new(
        FACTOR,
        ctx.base_value * pct,
        format!(
            "{count} reported accident{} ({:+.0}%)",
            if count == 1 { "" } else { "s" },
            pct * 100.0
        ),
        ctx.base_value,
    )
}

pub fn features(ctx: &AdjustmentContext<'_>, tables: &AdjustmentTables) -> Adjustment {
    const FACTOR: &str = "Premium features";

    if ctx.request.features.is_empty() {
        return Adjustment::neutral(FACTOR, "no premium features reported".to_string());
    }

    let mut total_pct = 0.0;
    let mut matched: Vec<&'static str> = Vec::new();
    for feature in &ctx.request.features {
        if let Some((pct, keyword)) = tables.feature_pct(feature) {
            // Each catalog entry counts once per vehicle.
            if !matched.contains(&keyword) {
                total_pct += pct;
                matched.push(keyword);
            }
        }
    }

    if matched.is_empty() {
        return Adjustment::neutral(
            FACTOR,
            "no reported features are in the premium catalog".to_string(),
        );
    }

    let capped = total_pct.min(tables.max_feature_bonus_pct);
    let note = if capped < total_pct {
        format!(
            "{} premium features, capped at {:+.0}% of base value",
            matched.len(),
            capped * 100.0
        )
    } else {
        format!("{} ({:+.1}%)", matched.join(", "), capped * 100.0)
    };
    Adjustment::new(FACTOR, ctx.base_value * capped, note, ctx.base_value)
}

/// Thousands-grouped miles for descriptions, e.g. `84,000`.
fn group_miles(miles: f64) -> String {
    let whole = miles.round() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if whole < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
