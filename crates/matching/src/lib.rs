//! The in-memory matching/dispatch layer for the ride-dispatch engine.
//!
//! Everything here is volatile, per-process state that coordinates with the
//! durable store (`persistence::repositories::StateStoreRepository`) rather
//! than replacing it: the geo index (§4.2), the matching engine (§4.3), the
//! surge signal (§4.5), the idempotency singleflight cache (§4.6), the
//! ride-status read cache (§4.7), and the location-ingest buffer (§4.8).

pub mod allocation_lock;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo_index;
pub mod geohash;
pub mod idempotency_cache;
pub mod location_ingest;
pub mod ride_status_cache;
pub mod surge;

pub use allocation_lock::AllocationLock;
pub use config::{IdempotencyConfig, LocationConfig, MatchConfig, RideStatusCacheConfig, SurgeConfig};
pub use engine::{MatchOutcome, MatchingEngine};
pub use error::MatchingError;
pub use geo_index::GeoIndex;
pub use idempotency_cache::{IdempotencyCache, IdempotencyOutcome};
pub use location_ingest::LocationIngest;
pub use ride_status_cache::RideStatusCache;
pub use surge::SurgeTracker;
