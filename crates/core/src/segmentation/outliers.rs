use serde::{Deserialize, Serialize};

use super::CustomerAggregate;

/// Inclusive range; values equal to either bound are inside.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Normal-population box in the Frequency/Sales plane. Recency plays no part
/// in outlier gating.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub frequency: Bounds,
    pub sales: Bounds,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationProfile {
    Normal,
    Outlier,
}

impl PopulationProfile {
    pub const ALL: [PopulationProfile; 2] = [PopulationProfile::Normal, PopulationProfile::Outlier];

    pub fn classify(aggregate: &CustomerAggregate, thresholds: &ThresholdConfig) -> Self {
        if is_outlier(aggregate, thresholds) {
            Self::Outlier
        } else {
            Self::Normal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Outlier => "outlier",
        }
    }
}

pub fn is_outlier(aggregate: &CustomerAggregate, thresholds: &ThresholdConfig) -> bool {
    !thresholds.frequency.contains(f64::from(aggregate.frequency))
        || !thresholds.sales.contains(aggregate.sales_f64())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{is_outlier, Bounds, PopulationProfile, ThresholdConfig};
    use crate::segmentation::{CustomerAggregate, CustomerId};

    fn thresholds() -> ThresholdConfig {
        ThresholdConfig {
            frequency: Bounds { lower: 1.0, upper: 10.0 },
            sales: Bounds { lower: 20.0, upper: 5_000.0 },
        }
    }

    fn aggregate(frequency: u32, sales: i64, recency: i64) -> CustomerAggregate {
        CustomerAggregate {
            customer_id: CustomerId("u-1".to_owned()),
            sales: Decimal::new(sales, 0),
            frequency,
            recency,
        }
    }

    #[test]
    fn boundary_values_are_normal() {
        assert!(!is_outlier(&aggregate(10, 100, 3), &thresholds()));
        assert!(!is_outlier(&aggregate(1, 100, 3), &thresholds()));
        assert!(!is_outlier(&aggregate(5, 20, 3), &thresholds()));
        assert!(!is_outlier(&aggregate(5, 5_000, 3), &thresholds()));
    }

    #[test]
    fn one_unit_past_a_bound_is_an_outlier() {
        assert!(is_outlier(&aggregate(11, 100, 3), &thresholds()));
        assert!(is_outlier(&aggregate(5, 5_001, 3), &thresholds()));
        assert!(is_outlier(&aggregate(5, 19, 3), &thresholds()));
    }

    #[test]
    fn recency_never_gates_outliers() {
        assert!(!is_outlier(&aggregate(5, 100, 10_000), &thresholds()));
        assert!(!is_outlier(&aggregate(5, 100, -4), &thresholds()));
    }

    #[test]
    fn classify_maps_to_profiles() {
        assert_eq!(
            PopulationProfile::classify(&aggregate(50, 100, 1), &thresholds()),
            PopulationProfile::Outlier
        );
        assert_eq!(
            PopulationProfile::classify(&aggregate(2, 100, 1), &thresholds()),
            PopulationProfile::Normal
        );
    }
}
