//! In-memory per-tier spatial index of available drivers (§4.2).
//!
//! Membership here is authoritative only for "currently broadcasting
//! location for this tier" — the state store remains authoritative for
//! "currently eligible for assignment." The matching engine always
//! intersects a `search_by_radius` hit against a state-store check before
//! committing an assignment.

use dashmap::DashMap;
use domain::geo::haversine_km;
use domain::models::{Tier, GeoPoint};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Spatial index keyed `drivers:geo:{tier}` (one bucket per driver tier).
#[derive(Default)]
pub struct GeoIndex {
    tiers: DashMap<Tier, DashMap<Uuid, Location>>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self { tiers: DashMap::new() }
    }

    /// Insert or move a driver to its latest broadcast location. Called
    /// synchronously on the location-ingest hot path (§4.8) and on a driver
    /// transitioning `on_trip -> available` (§4.2).
    pub fn upsert(&self, tier: Tier, driver_id: Uuid, lat: f64, lng: f64) {
        self.tiers
            .entry(tier)
            .or_default()
            .insert(driver_id, Location { lat, lng });
    }

    /// Drop a driver from its tier bucket. Called on `available -> on_trip`
    /// and on the driver going offline/unavailable (§4.2).
    pub fn remove(&self, tier: Tier, driver_id: Uuid) {
        if let Some(bucket) = self.tiers.get(&tier) {
            bucket.remove(&driver_id);
        }
    }

    /// Candidates within `radius_km` of `pickup`, nearest-first, capped to
    /// `limit` (§4.2).
    pub fn search_by_radius(
        &self,
        tier: Tier,
        pickup: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Vec<(Uuid, f64)> {
        let Some(bucket) = self.tiers.get(&tier) else {
            return Vec::new();
        };

        let mut hits: Vec<(Uuid, f64)> = bucket
            .iter()
            .filter_map(|entry| {
                let loc = *entry.value();
                let distance = haversine_km(pickup, GeoPoint { lat: loc.lat, lng: loc.lng });
                (distance <= radius_km).then_some((*entry.key(), distance))
            })
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(limit);
        hits
    }

    /// Number of drivers currently broadcasting for `tier` — the supply
    /// signal the surge sweep (§4.5) reads.
    pub fn len(&self, tier: Tier) -> usize {
        self.tiers.get(&tier).map(|b| b.len()).unwrap_or(0)
    }

    /// Snapshot of every broadcasting driver's location for `tier`. Read by
    /// the periodic surge sweep (§4.5, §B.6) to feed `SurgeTracker::record_supply`.
    pub fn locations(&self, tier: Tier) -> Vec<(Uuid, GeoPoint)> {
        let Some(bucket) = self.tiers.get(&tier) else {
            return Vec::new();
        };
        bucket
            .iter()
            .map(|entry| (*entry.key(), GeoPoint { lat: entry.value().lat, lng: entry.value().lng }))
            .collect()
    }

    pub fn is_empty(&self, tier: Tier) -> bool {
        self.len(tier) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    #[test]
    fn test_upsert_and_search() {
        let idx = GeoIndex::new();
        let d1 = Uuid::new_v4();
        idx.upsert(Tier::Standard, d1, 12.9716, 77.5946);

        let hits = idx.search_by_radius(Tier::Standard, pt(12.9716, 77.5946), 1.0, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, d1);
        assert!(hits[0].1 < 0.01);
    }

    #[test]
    fn test_search_excludes_out_of_radius() {
        let idx = GeoIndex::new();
        let near = Uuid::new_v4();
        let far = Uuid::new_v4();
        idx.upsert(Tier::Standard, near, 12.9716, 77.5946);
        idx.upsert(Tier::Standard, far, 13.0827, 80.2707); // Chennai, ~290km away

        let hits = idx.search_by_radius(Tier::Standard, pt(12.9716, 77.5946), 5.0, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, near);
    }

    #[test]
    fn test_search_is_nearest_first() {
        let idx = GeoIndex::new();
        let pickup = pt(12.9716, 77.5946);
        let closer = Uuid::new_v4();
        let farther = Uuid::new_v4();
        idx.upsert(Tier::Standard, farther, 12.99, 77.60);
        idx.upsert(Tier::Standard, closer, 12.972, 77.595);

        let hits = idx.search_by_radius(Tier::Standard, pickup, 10.0, 10);
        assert_eq!(hits[0].0, closer);
        assert!(hits[0].1 <= hits[1].1);
    }

    #[test]
    fn test_search_respects_limit() {
        let idx = GeoIndex::new();
        for _ in 0..5 {
            idx.upsert(Tier::Standard, Uuid::new_v4(), 12.9716, 77.5946);
        }
        let hits = idx.search_by_radius(Tier::Standard, pt(12.9716, 77.5946), 10.0, 2);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_remove() {
        let idx = GeoIndex::new();
        let d1 = Uuid::new_v4();
        idx.upsert(Tier::Standard, d1, 12.9716, 77.5946);
        idx.remove(Tier::Standard, d1);
        assert!(idx.search_by_radius(Tier::Standard, pt(12.9716, 77.5946), 10.0, 10).is_empty());
    }

    #[test]
    fn test_tiers_are_isolated() {
        let idx = GeoIndex::new();
        let d1 = Uuid::new_v4();
        idx.upsert(Tier::Premium, d1, 12.9716, 77.5946);
        assert!(idx.search_by_radius(Tier::Standard, pt(12.9716, 77.5946), 10.0, 10).is_empty());
        assert_eq!(idx.len(Tier::Premium), 1);
        assert_eq!(idx.len(Tier::Standard), 0);
    }

    #[test]
    fn test_locations_snapshot() {
        let idx = GeoIndex::new();
        let d1 = Uuid::new_v4();
        idx.upsert(Tier::Standard, d1, 12.9716, 77.5946);
        let locs = idx.locations(Tier::Standard);
        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].0, d1);
        assert_eq!(locs[0].1.lat, 12.9716);
    }

    #[test]
    fn test_empty_tier_search() {
        let idx = GeoIndex::new();
        assert!(idx.is_empty(Tier::Xl));
        assert!(idx.search_by_radius(Tier::Xl, pt(0.0, 0.0), 5.0, 10).is_empty());
    }
}
