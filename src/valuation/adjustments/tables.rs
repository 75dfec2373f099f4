//! Versioned adjustment tables, injected into the pipeline so percentages can
//! change without touching rule logic.

use crate::valuation::domain::{Condition, FuelType};

/// Total feature bonus never exceeds this share of base value.
pub const MAX_FEATURE_BONUS_PCT: f64 = 0.15;

#[derive(Debug, Clone)]
pub struct AdjustmentTables {
    /// 3-digit ZIP prefixes of hot metro markets.
    pub high_demand_zip_prefixes: Vec<&'static str>,
    /// 3-digit ZIP prefixes of soft rural markets.
    pub low_demand_zip_prefixes: Vec<&'static str>,
    pub high_demand_pct: f64,
    pub low_demand_pct: f64,
    /// Trim keyword → percent of base value.
    pub trim_keywords: Vec<(&'static str, f64)>,
    /// Feature keyword → percent of base value; summed then capped.
    pub feature_catalog: Vec<(&'static str, f64)>,
    pub max_feature_bonus_pct: f64,
}

impl Default for AdjustmentTables {
    fn default() -> Self {
        Self {
            high_demand_zip_prefixes: vec![
                "100", "900", "902", "941", "980", "787", "330", "331", "802", "852",
            ],
            low_demand_zip_prefixes: vec!["585", "590", "690", "798", "820", "045"],
            high_demand_pct: 0.03,
            low_demand_pct: -0.02,
            trim_keywords: vec![
                ("platinum", 0.08),
                ("limited", 0.06),
                ("lariat", 0.05),
                ("touring", 0.04),
                ("denali", 0.08),
                ("trd", 0.05),
                ("sport", 0.03),
                ("premium", 0.03),
                ("base", -0.02),
            ],
            feature_catalog: vec![
                ("sunroof", 0.015),
                ("moonroof", 0.015),
                ("leather", 0.02),
                ("navigation", 0.01),
                ("towing", 0.02),
                ("awd", 0.025),
                ("4wd", 0.025),
                ("four wheel drive", 0.025),
                ("third row", 0.015),
                ("heated seats", 0.01),
                ("premium audio", 0.01),
                ("adaptive cruise", 0.015),
                ("backup camera", 0.005),
                ("bed liner", 0.005),
            ],
            max_feature_bonus_pct: MAX_FEATURE_BONUS_PCT,
        }
    }
}

impl AdjustmentTables {
    /// Percent-of-base multiplier for a reported condition.
    pub const fn condition_pct(condition: Condition) -> f64 {
        match condition {
            Condition::Excellent => 0.05,
            Condition::VeryGood => 0.02,
            Condition::Good => 0.0,
            Condition::Fair => -0.15,
            Condition::Poor => -0.30,
        }
    }

    /// Accident-history percentage by reported count.
    pub const fn accident_pct(count: u8) -> f64 {
        match count {
            0 => 0.0,
            1 => -0.06,
            2 => -0.12,
            _ => -0.20,
        }
    }

    /// Flat fuel-type percentages used when no regional price is available.
    pub const fn fuel_fallback_pct(fuel: FuelType) -> f64 {
        match fuel {
            FuelType::Electric => 0.025,
            FuelType::Hybrid => 0.02,
            FuelType::Diesel => 0.005,
            FuelType::Premium => -0.01,
            FuelType::Gasoline => 0.0,
        }
    }

    pub fn demand_pct(&self, zip: &str) -> Option<(f64, &'static str)> {
        let prefix: String = zip.trim().chars().take(3).collect();
        if self.high_demand_zip_prefixes.contains(&prefix.as_str()) {
            Some((self.high_demand_pct, "high-demand"))
        } else if self.low_demand_zip_prefixes.contains(&prefix.as_str()) {
            Some((self.low_demand_pct, "low-demand"))
        } else {
            None
        }
    }

    pub fn trim_pct(&self, trim: &str) -> Option<(f64, &'static str)> {
        let lowered = trim.trim().to_ascii_lowercase();
        self.trim_keywords
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(keyword, pct)| (*pct, *keyword))
    }

    pub fn feature_pct(&self, feature: &str) -> Option<(f64, &'static str)> {
        let lowered = feature.trim().to_ascii_lowercase();
        self.feature_catalog
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(keyword, pct)| (*pct, *keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_table_matches_contract() {
        assert_eq!(AdjustmentTables::condition_pct(Condition::Excellent), 0.05);
        assert_eq!(AdjustmentTables::condition_pct(Condition::Good), 0.0);
        assert_eq!(AdjustmentTables::condition_pct(Condition::Poor), -0.30);
    }

    #[test]
    fn accident_tiers_saturate_at_three() {
        assert_eq!(AdjustmentTables::accident_pct(0), 0.0);
        assert_eq!(AdjustmentTables::accident_pct(1), -0.06);
        assert_eq!(AdjustmentTables::accident_pct(2), -0.12);
        assert_eq!(AdjustmentTables::accident_pct(3), -0.20);
        assert_eq!(AdjustmentTables::accident_pct(9), -0.20);
    }

    #[test]
    fn demand_lookup_uses_zip_prefix() {
        let tables = AdjustmentTables::default();
        assert_eq!(tables.demand_pct("90012"), Some((0.03, "high-demand")));
        assert_eq!(tables.demand_pct("59044"), Some((-0.02, "low-demand")));
        assert_eq!(tables.demand_pct("60601"), None);
    }

    #[test]
    fn trim_and_feature_lookup_are_keyword_based() {
        let tables = AdjustmentTables::default();
        assert_eq!(tables.trim_pct("Lariat SuperCrew"), Some((0.05, "lariat")));
        assert_eq!(tables.trim_pct("XLT"), None);
        assert_eq!(
            tables.feature_pct("Towing Package"),
            Some((0.02, "towing"))
        );
        assert_eq!(tables.feature_pct("cup holders"), None);
    }
}
