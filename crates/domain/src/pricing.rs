//! Fare and surge formulas (§4.4, §4.5). Pure functions — no I/O, no clock
//! reads — so matching, the trip engine, and tests all share one
//! implementation of "what does this ride cost."

use std::collections::HashMap;

use shared::money::round2;

use crate::models::driver::Tier;

/// Per-tier base fare and per-km rate, configured per §6.
#[derive(Debug, Clone, Copy)]
pub struct TierRates {
    pub base_fare: f64,
    pub per_km_rate: f64,
}

/// `base_fare[tier]` / `per_km_rate[tier]` lookup table (§6 defaults).
#[derive(Debug, Clone)]
pub struct FareTable {
    rates: HashMap<Tier, TierRates>,
}

impl FareTable {
    pub fn new(rates: HashMap<Tier, TierRates>) -> Self {
        Self { rates }
    }

    /// The §6 default table: `standard: {50, 12}`, `premium: {100, 25}`,
    /// `xl: {80, 18}`.
    pub fn defaults() -> Self {
        let mut rates = HashMap::new();
        rates.insert(Tier::Standard, TierRates { base_fare: 50.0, per_km_rate: 12.0 });
        rates.insert(Tier::Premium, TierRates { base_fare: 100.0, per_km_rate: 25.0 });
        rates.insert(Tier::Xl, TierRates { base_fare: 80.0, per_km_rate: 18.0 });
        Self { rates }
    }

    pub fn rates_for(&self, tier: Tier) -> TierRates {
        *self
            .rates
            .get(&tier)
            .unwrap_or_else(|| panic!("no fare rates configured for tier {tier}"))
    }
}

/// `final_fare = round2(base_fare[tier] + distance_km * per_km_rate[tier] * surge)` (§4.4).
pub fn compute_fare(table: &FareTable, tier: Tier, distance_km: f64, surge_multiplier: f64) -> f64 {
    let rates = table.rates_for(tier);
    round2(rates.base_fare + distance_km * rates.per_km_rate * surge_multiplier)
}

/// `multiplier = clamp(1.0 + 0.5 * max(0, demand/max(supply,1) - 1.0), 1.0, 5.0)` (§4.5).
pub fn surge_multiplier(demand: u64, supply: u64) -> f64 {
    let ratio = demand as f64 / (supply.max(1) as f64);
    let raw = 1.0 + 0.5 * (ratio - 1.0).max(0.0);
    raw.clamp(1.0, 5.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fare_scenario_1_happy_path() {
        let table = FareTable::defaults();
        // base 50 + 294.3 * 12 * 1.0 = 3581.6 (scenario 1 in the testable properties).
        let fare = compute_fare(&table, Tier::Standard, 294.3, 1.0);
        assert!((fare - 3581.6).abs() < 0.05, "got {fare}");
    }

    #[test]
    fn test_fare_rounds_to_2dp() {
        let table = FareTable::defaults();
        let fare = compute_fare(&table, Tier::Standard, 1.0 / 3.0, 1.0);
        assert_eq!((fare * 100.0).round(), fare * 100.0);
    }

    #[test]
    fn test_surge_scenario_6() {
        // 10 demand, 2 supply over 5 min -> ratio = 5, multiplier = clamp(1+0.5*4,1,5) = 3.0.
        let m = surge_multiplier(10, 2);
        assert!((m - 3.0).abs() < 1e-9, "got {m}");
    }

    #[test]
    fn test_surge_floor_is_one() {
        assert_eq!(surge_multiplier(0, 10), 1.0);
        assert_eq!(surge_multiplier(1, 10), 1.0);
    }

    #[test]
    fn test_surge_clamped_to_max() {
        let m = surge_multiplier(1000, 1);
        assert_eq!(m, 5.0);
    }

    #[test]
    fn test_surge_no_supply_does_not_divide_by_zero() {
        let m = surge_multiplier(3, 0);
        assert!(m.is_finite());
        assert!((m - 2.0).abs() < 1e-9);
    }
}
