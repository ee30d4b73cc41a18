//! Cache-aside read cache over `get_ride` (§4.7). Key: `ride_status:{id}`.
//! Invalidated on every §4.1 transition; a stale read just before
//! invalidation is acceptable and bounded by the TTL.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domain::models::{Ride, RideSnapshot};
use persistence::repositories::StateStoreRepository;
use uuid::Uuid;

use crate::config::RideStatusCacheConfig;

struct Entry {
    snapshot: RideSnapshot,
    expires_at: DateTime<Utc>,
}

pub struct RideStatusCache {
    entries: DashMap<Uuid, Entry>,
    state_store: Arc<StateStoreRepository>,
    config: RideStatusCacheConfig,
}

impl RideStatusCache {
    pub fn new(state_store: Arc<StateStoreRepository>, config: RideStatusCacheConfig) -> Self {
        Self { entries: DashMap::new(), state_store, config }
    }

    /// `get_ride(ride_id)`, served from cache when fresh.
    pub async fn get(&self, ride_id: Uuid) -> Result<Option<RideSnapshot>, sqlx::Error> {
        if let Some(entry) = self.entries.get(&ride_id) {
            if entry.expires_at > Utc::now() {
                return Ok(Some(entry.snapshot.clone()));
            }
        }

        let Some(ride) = self.state_store.get_ride(ride_id).await? else {
            self.entries.remove(&ride_id);
            return Ok(None);
        };

        let snapshot = RideSnapshot::from(ride);
        self.entries.insert(
            ride_id,
            Entry {
                snapshot: snapshot.clone(),
                expires_at: Utc::now() + chrono::Duration::seconds(self.config.ttl_seconds),
            },
        );
        Ok(Some(snapshot))
    }

    /// Remove the cached entry for `ride_id`. Called after every transition
    /// in §4.1 commits.
    pub fn invalidate(&self, ride_id: Uuid) {
        self.entries.remove(&ride_id);
    }

    /// Populate the cache directly from a freshly-loaded `Ride`, skipping
    /// the read-through path — used right after a write that already has
    /// the row in hand.
    pub fn prime(&self, ride: Ride) {
        let ride_id = ride.id;
        let snapshot = RideSnapshot::from(ride);
        self.entries.insert(
            ride_id,
            Entry {
                snapshot,
                expires_at: Utc::now() + chrono::Duration::seconds(self.config.ttl_seconds),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expiry_window() {
        let now = Utc::now();
        let expires = now + chrono::Duration::seconds(30);
        assert!(expires > now);
    }
}
