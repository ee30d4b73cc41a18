//! The matching engine (§4.3): candidate selection, allocation-lock
//! acquisition, durable assignment, backoff and failure recovery.
//!
//! Triggered asynchronously after `create_ride` commits — not a periodic
//! job, but a supervised task reading off a bounded queue (§9 redesign
//! flag), wired by the `api` crate's dispatcher rather than spawned ad-hoc
//! from the request handler.

use std::sync::Arc;
use std::time::Duration;

use domain::models::{Tier, GeoPoint};
use metrics::{counter, histogram};
use persistence::repositories::{AssignOutcome, StateStoreRepository};
use tracing::{info, warn};
use uuid::Uuid;

use crate::allocation_lock::AllocationLock;
use crate::config::MatchConfig;
use crate::geo_index::GeoIndex;
use crate::ride_status_cache::RideStatusCache;

/// Outcome of one `attempt_match` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched { driver_id: Uuid, trip_id: Uuid },
    /// Budget exhausted, or the ride was cancelled mid-attempt
    /// (`ride_conflict`, §4.3 step 2b).
    NoDriverFound,
}

pub struct MatchingEngine {
    geo_index: Arc<GeoIndex>,
    allocation_lock: Arc<AllocationLock>,
    state_store: Arc<StateStoreRepository>,
    ride_status_cache: Arc<RideStatusCache>,
    config: MatchConfig,
}

impl MatchingEngine {
    pub fn new(
        geo_index: Arc<GeoIndex>,
        allocation_lock: Arc<AllocationLock>,
        state_store: Arc<StateStoreRepository>,
        ride_status_cache: Arc<RideStatusCache>,
        config: MatchConfig,
    ) -> Self {
        Self { geo_index, allocation_lock, state_store, ride_status_cache, config }
    }

    /// Runs the algorithm in §4.3: grows the search radius by `backoff`
    /// each sweep, attempting nearest-first assignment, until a driver is
    /// assigned, the radius exceeds `max_radius_km`, or the overall
    /// `budget_ms` elapses.
    pub async fn attempt_match(&self, ride_id: Uuid, tier: Tier, pickup: GeoPoint) -> MatchOutcome {
        let started = std::time::Instant::now();
        let outcome = self.attempt_match_inner(ride_id, tier, pickup).await;

        histogram!("match_attempt_duration_seconds").record(started.elapsed().as_secs_f64());
        match outcome {
            MatchOutcome::Matched { .. } => counter!("match_attempts_total", "result" => "matched").increment(1),
            MatchOutcome::NoDriverFound => counter!("match_attempts_total", "result" => "no_driver_found").increment(1),
        }
        outcome
    }

    async fn attempt_match_inner(&self, ride_id: Uuid, tier: Tier, pickup: GeoPoint) -> MatchOutcome {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(self.config.budget_ms);
        let mut radius_km = self.config.initial_radius_km;

        while radius_km <= self.config.max_radius_km {
            if tokio::time::Instant::now() >= deadline {
                break;
            }

            let candidates =
                self.geo_index.search_by_radius(tier, pickup, radius_km, self.config.candidate_limit);

            for (driver_id, _distance_km) in candidates {
                if !self
                    .allocation_lock
                    .acquire(driver_id, Duration::from_secs(self.config.lock_ttl_secs))
                {
                    continue;
                }

                match self.state_store.assign_ride_atomic(ride_id, driver_id).await {
                    Ok(AssignOutcome::Ok { trip_id }) => {
                        // Lock is released on driver-accept or TTL expiry
                        // (§4.3), not here — it still protects against a
                        // second concurrent attempt targeting this driver
                        // while the assignment settles.
                        self.ride_status_cache.invalidate(ride_id);
                        info!(ride_id = %ride_id, driver_id = %driver_id, trip_id = %trip_id, "ride matched");
                        return MatchOutcome::Matched { driver_id, trip_id };
                    }
                    Ok(AssignOutcome::DriverConflict) => {
                        self.allocation_lock.release(driver_id);
                        continue;
                    }
                    Ok(AssignOutcome::RideConflict) => {
                        self.allocation_lock.release(driver_id);
                        warn!(ride_id = %ride_id, "ride conflict mid-match, aborting attempt");
                        self.ride_status_cache.invalidate(ride_id);
                        return MatchOutcome::NoDriverFound;
                    }
                    Err(err) => {
                        self.allocation_lock.release(driver_id);
                        warn!(ride_id = %ride_id, driver_id = %driver_id, error = %err, "assign_ride_atomic failed, continuing sweep");
                    }
                }
            }

            radius_km *= self.config.backoff;
            tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
        }

        let _ = self.state_store.mark_no_driver_found(ride_id).await;
        self.ride_status_cache.invalidate(ride_id);
        MatchOutcome::NoDriverFound
    }

    /// Release the allocation lock held for `driver_id`. Called on the
    /// driver's `accept_ride` confirmation, or by the TTL itself expiring
    /// (§4.3).
    pub fn release_lock(&self, driver_id: Uuid) {
        self.allocation_lock.release(driver_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_outcome_eq() {
        let driver_id = Uuid::new_v4();
        let trip_id = Uuid::new_v4();
        assert_eq!(
            MatchOutcome::Matched { driver_id, trip_id },
            MatchOutcome::Matched { driver_id, trip_id }
        );
        assert_ne!(MatchOutcome::NoDriverFound, MatchOutcome::Matched { driver_id, trip_id });
    }
}
