//! Tunable parameters for the matching/dispatch components (§6 configuration
//! table). These are plain, independently-deserializable structs so the
//! `api` crate's layered `Config` can nest them with the same
//! `#[serde(default = "...")]` convention the rest of that config uses.

use serde::Deserialize;

/// §4.3 matching engine parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub initial_radius_km: f64,
    pub max_radius_km: f64,
    pub backoff: f64,
    pub retry_delay_ms: u64,
    pub budget_ms: u64,
    /// Allocation lock TTL (§4.3's "single-writer lock ... with TTL").
    pub lock_ttl_secs: u64,
    /// Candidates considered per radius sweep (§4.3 step 2a, `limit=20`).
    pub candidate_limit: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            initial_radius_km: 2.0,
            max_radius_km: 10.0,
            backoff: 1.5,
            retry_delay_ms: 200,
            budget_ms: 30_000,
            lock_ttl_secs: 10,
            candidate_limit: 20,
        }
    }
}

/// §4.5 surge pricing parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SurgeConfig {
    pub cell_geohash_length: usize,
    pub window_seconds: i64,
    pub max: f64,
}

impl Default for SurgeConfig {
    fn default() -> Self {
        Self {
            cell_geohash_length: 5,
            window_seconds: 300,
            max: 5.0,
        }
    }
}

/// §4.6 idempotency cache parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    pub ttl_seconds: i64,
    pub inflight_wait_ms: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 86_400,
            inflight_wait_ms: 10_000,
        }
    }
}

/// §4.8 location-ingest parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub flush_interval_ms: u64,
    pub flush_batch: usize,
    pub buffer_capacity: usize,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 500,
            flush_batch: 1_000,
            buffer_capacity: 10_000,
        }
    }
}

/// §4.7 ride-status read cache parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RideStatusCacheConfig {
    pub ttl_seconds: i64,
}

impl Default for RideStatusCacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 30 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_config_defaults_match_spec() {
        let c = MatchConfig::default();
        assert_eq!(c.initial_radius_km, 2.0);
        assert_eq!(c.max_radius_km, 10.0);
        assert_eq!(c.backoff, 1.5);
        assert_eq!(c.retry_delay_ms, 200);
        assert_eq!(c.budget_ms, 30_000);
    }

    #[test]
    fn test_surge_config_defaults_match_spec() {
        let c = SurgeConfig::default();
        assert_eq!(c.cell_geohash_length, 5);
        assert_eq!(c.window_seconds, 300);
        assert_eq!(c.max, 5.0);
    }

    #[test]
    fn test_idempotency_config_defaults_match_spec() {
        let c = IdempotencyConfig::default();
        assert_eq!(c.ttl_seconds, 86_400);
        assert_eq!(c.inflight_wait_ms, 10_000);
    }

    #[test]
    fn test_location_config_defaults_match_spec() {
        let c = LocationConfig::default();
        assert_eq!(c.flush_interval_ms, 500);
        assert_eq!(c.flush_batch, 1_000);
        assert_eq!(c.buffer_capacity, 10_000);
    }

    #[test]
    fn test_ride_status_cache_config_defaults_match_spec() {
        assert_eq!(RideStatusCacheConfig::default().ttl_seconds, 30);
    }
}
