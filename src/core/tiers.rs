use serde::Serialize;

use super::error::EstimatorError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateTier {
    pub upper_bound: f64,
    pub max_rate: f64,
}

/// Ascending price thresholds mapped to the maximum fixed annual rate.
///
/// A whole-unit price falls into the first tier whose threshold is strictly
/// greater than it, so a price equal to a threshold lands in the following
/// tier. The last tier absorbs every price past the end of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RateTierTable {
    tiers: Vec<RateTier>,
}

impl RateTierTable {
    pub fn new(tiers: Vec<RateTier>) -> Result<Self, EstimatorError> {
        if tiers.is_empty() {
            return Err(EstimatorError::InvalidConfig(
                "rate tier table must contain at least one tier".to_string(),
            ));
        }
        for tier in &tiers {
            if !tier.upper_bound.is_finite() || !tier.max_rate.is_finite() {
                return Err(EstimatorError::InvalidConfig(format!(
                    "rate tier ({}, {}) must be finite",
                    tier.upper_bound, tier.max_rate
                )));
            }
            if tier.max_rate < 0.0 {
                return Err(EstimatorError::InvalidConfig(format!(
                    "rate tier {} has a negative max rate",
                    tier.upper_bound
                )));
            }
        }
        if tiers
            .windows(2)
            .any(|pair| pair[0].upper_bound >= pair[1].upper_bound)
        {
            return Err(EstimatorError::InvalidConfig(
                "rate tier thresholds must be strictly ascending".to_string(),
            ));
        }
        Ok(Self { tiers })
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, EstimatorError> {
        Self::new(
            pairs
                .iter()
                .map(|&(upper_bound, max_rate)| RateTier {
                    upper_bound,
                    max_rate,
                })
                .collect(),
        )
    }

    pub fn tiers(&self) -> &[RateTier] {
        &self.tiers
    }

    pub fn resolve(&self, purchase_price: f64) -> f64 {
        self.tiers[self.tier_index(purchase_price)].max_rate
    }

    fn tier_index(&self, purchase_price: f64) -> usize {
        let key = purchase_price.floor();
        // Right-biased insertion point: count of thresholds <= key.
        let insertion = self.tiers.partition_point(|tier| tier.upper_bound <= key);
        insertion.min(self.tiers.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert_eq, proptest};

    fn latest_table() -> RateTierTable {
        RateTierTable::from_pairs(&[
            (6.0, 0.40),
            (7.0, 0.38),
            (8.0, 0.36),
            (9.0, 0.34),
            (10.0, 0.32),
            (11.0, 0.30),
        ])
        .expect("valid table")
    }

    #[test]
    fn price_past_every_threshold_uses_last_tier() {
        let table = latest_table();
        assert_eq!(table.resolve(12.0), 0.30);
        assert_eq!(table.resolve(250.0), 0.30);
    }

    #[test]
    fn price_equal_to_threshold_falls_into_following_tier() {
        let table = RateTierTable::from_pairs(&[(15.0, 0.4), (1_000_000_000.0, 0.6)])
            .expect("valid table");
        assert_eq!(table.resolve(14.0), 0.4);
        assert_eq!(table.resolve(14.99), 0.4);
        assert_eq!(table.resolve(15.0), 0.6);
        assert_eq!(table.resolve(15.7), 0.6);
    }

    #[test]
    fn fractional_price_is_floored_before_lookup() {
        let table = latest_table();
        assert_eq!(table.resolve(6.9), 0.38);
        assert_eq!(table.resolve(5.99), 0.40);
    }

    #[test]
    fn rejects_empty_and_unordered_tables() {
        assert!(RateTierTable::new(Vec::new()).is_err());
        assert!(RateTierTable::from_pairs(&[(10.0, 0.3), (10.0, 0.2)]).is_err());
        assert!(RateTierTable::from_pairs(&[(10.0, 0.3), (5.0, 0.2)]).is_err());
        assert!(RateTierTable::from_pairs(&[(f64::NAN, 0.3)]).is_err());
        assert!(RateTierTable::from_pairs(&[(10.0, -0.1)]).is_err());
    }

    proptest! {
        #[test]
        fn prop_price_below_every_threshold_resolves_first_tier(price_cents in 1u32..600) {
            let table = latest_table();
            prop_assert_eq!(table.resolve(price_cents as f64 / 100.0), 0.40);
        }

        #[test]
        fn prop_single_tier_table_always_resolves_its_rate(
            price_cents in 1u64..1_000_000_000,
            threshold in 1u32..100
        ) {
            let table = RateTierTable::from_pairs(&[(threshold as f64, 0.27)]).expect("valid table");
            prop_assert_eq!(table.resolve(price_cents as f64 / 100.0), 0.27);
        }

        #[test]
        fn prop_resolved_rate_is_non_increasing_for_descending_tables(
            low_cents in 1u32..2_000,
            delta_cents in 0u32..2_000
        ) {
            let table = latest_table();
            let low = low_cents as f64 / 100.0;
            let high = low + delta_cents as f64 / 100.0;
            proptest::prop_assert!(table.resolve(high) <= table.resolve(low));
        }
    }
}
