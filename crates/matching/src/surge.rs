//! Rolling demand/supply counters per spatial cell and the surge multiplier
//! derived from them (§4.5). Counters are rolling windows of timestamped
//! events; the multiplier itself is computed on demand, never materialized.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domain::models::GeoPoint;
use domain::pricing::surge_multiplier;
use uuid::Uuid;

use crate::config::SurgeConfig;
use crate::geohash;

/// Per-cell rolling event log. `demand` records a timestamp per ride
/// request; `supply` records the last-seen timestamp per distinct driver,
/// so a driver observed repeatedly within the window still counts once.
#[derive(Default)]
struct Cell {
    demand: Vec<DateTime<Utc>>,
    supply: HashMap<Uuid, DateTime<Utc>>,
}

pub struct SurgeTracker {
    cells: DashMap<String, RwLock<Cell>>,
    config: SurgeConfig,
}

impl SurgeTracker {
    pub fn new(config: SurgeConfig) -> Self {
        Self { cells: DashMap::new(), config }
    }

    fn cell_key(&self, point: GeoPoint) -> String {
        geohash::encode(point, self.config.cell_geohash_length)
    }

    /// Record a ride request at `pickup` (demand signal).
    pub fn record_demand(&self, pickup: GeoPoint) {
        let key = self.cell_key(pickup);
        let cell = self.cells.entry(key).or_default();
        cell.write().unwrap().demand.push(Utc::now());
    }

    /// Record an available driver observed at `location` (supply signal).
    /// Called by the periodic geo-index sweep (§4.5, §B.6).
    pub fn record_supply(&self, location: GeoPoint, driver_id: Uuid) {
        let key = self.cell_key(location);
        let cell = self.cells.entry(key).or_default();
        cell.write().unwrap().supply.insert(driver_id, Utc::now());
    }

    /// Compute the surge multiplier for `pickup`'s cell from the rolling
    /// window, pruning expired events as it goes.
    pub fn multiplier_at(&self, pickup: GeoPoint) -> f64 {
        let key = self.cell_key(pickup);
        let Some(cell) = self.cells.get(&key) else {
            return surge_multiplier(0, 0);
        };

        let cutoff = Utc::now() - chrono::Duration::seconds(self.config.window_seconds);
        let mut guard = cell.write().unwrap();
        guard.demand.retain(|t| *t >= cutoff);
        guard.supply.retain(|_, t| *t >= cutoff);

        let demand = guard.demand.len() as u64;
        let supply = guard.supply.len() as u64;
        surge_multiplier(demand, supply).min(self.config.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt() -> GeoPoint {
        GeoPoint { lat: 12.9716, lng: 77.5946 }
    }

    #[test]
    fn test_no_data_yields_floor_multiplier() {
        let tracker = SurgeTracker::new(SurgeConfig::default());
        assert_eq!(tracker.multiplier_at(pt()), 1.0);
    }

    #[test]
    fn test_scenario_6_surge_3x() {
        let tracker = SurgeTracker::new(SurgeConfig::default());
        for _ in 0..10 {
            tracker.record_demand(pt());
        }
        for _ in 0..2 {
            tracker.record_supply(pt(), Uuid::new_v4());
        }
        assert_eq!(tracker.multiplier_at(pt()), 3.0);
    }

    #[test]
    fn test_repeated_supply_observations_count_once() {
        let tracker = SurgeTracker::new(SurgeConfig::default());
        let driver = Uuid::new_v4();
        for _ in 0..5 {
            tracker.record_supply(pt(), driver);
        }
        for _ in 0..10 {
            tracker.record_demand(pt());
        }
        // ratio = 10 / 1 = 10 -> clamp(1 + 0.5*9, 1, 5) = 5.0
        assert_eq!(tracker.multiplier_at(pt()), 5.0);
    }

    #[test]
    fn test_different_cells_are_independent() {
        let tracker = SurgeTracker::new(SurgeConfig::default());
        let far = GeoPoint { lat: 13.0827, lng: 80.2707 };
        for _ in 0..10 {
            tracker.record_demand(pt());
        }
        assert_eq!(tracker.multiplier_at(far), 1.0);
    }
}
