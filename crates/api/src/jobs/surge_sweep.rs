//! Periodic supply-side surge sweep (§4.5): scans the geo index for every
//! tier and records each broadcasting driver as a supply observation in the
//! matching surge tracker's rolling window.

use std::sync::Arc;

use domain::models::Tier;
use matching::{GeoIndex, SurgeTracker};

use super::scheduler::{Job, JobFrequency};

pub struct SurgeSweepJob {
    geo_index: Arc<GeoIndex>,
    surge_tracker: Arc<SurgeTracker>,
}

impl SurgeSweepJob {
    pub fn new(geo_index: Arc<GeoIndex>, surge_tracker: Arc<SurgeTracker>) -> Self {
        Self { geo_index, surge_tracker }
    }
}

#[async_trait::async_trait]
impl Job for SurgeSweepJob {
    fn name(&self) -> &'static str {
        "surge_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(30)
    }

    async fn execute(&self) -> Result<(), String> {
        for tier in Tier::all() {
            for (driver_id, location) in self.geo_index.locations(tier) {
                self.surge_tracker.record_supply(location, driver_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matching::{GeoIndex, SurgeConfig, SurgeTracker};

    #[tokio::test]
    async fn test_sweep_feeds_supply_from_geo_index() {
        let geo = Arc::new(GeoIndex::new());
        geo.upsert(Tier::Standard, uuid::Uuid::new_v4(), 12.9716, 77.5946);
        let surge = Arc::new(SurgeTracker::new(SurgeConfig::default()));

        let job = SurgeSweepJob::new(geo, surge.clone());
        job.execute().await.unwrap();

        let point = domain::models::GeoPoint { lat: 12.9716, lng: 77.5946 };
        assert_eq!(surge.multiplier_at(point), 1.0);
    }
}
