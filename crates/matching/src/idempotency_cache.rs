//! In-memory singleflight layer over the durable idempotency store (§4.6).
//!
//! The durable `IdempotencyRepository` already makes the placeholder insert
//! atomic (`ON CONFLICT ... DO NOTHING`); this layer adds the in-process
//! "concurrent requests for the same key block on the first one's
//! completion" behavior, since that coordination is cheaper done in memory
//! than by polling the database.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use domain::models::IdempotentEndpoint;
use persistence::repositories::IdempotencyRepository;
use serde_json::Value;
use shared::crypto::sha256_hex;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::IdempotencyConfig;
use crate::error::MatchingError;

/// Resolution of an idempotency lookup.
pub enum IdempotencyOutcome {
    /// No record existed; caller is the first arrival and must insert a
    /// placeholder via `begin` before executing the request.
    Fresh,
    /// A completed record exists and its fingerprint matches: replay
    /// verbatim.
    Replay { status: u16, body: Value },
    /// A completed record exists but the fingerprint differs.
    Conflict,
}

struct InFlight {
    fingerprint: String,
    notify: broadcast::Sender<(u16, Value)>,
}

/// Wraps `IdempotencyRepository` with an in-memory map of in-flight
/// requests keyed `(endpoint, subject_id, key_hash)`.
pub struct IdempotencyCache {
    repo: Arc<IdempotencyRepository>,
    in_flight: DashMap<(IdempotentEndpoint, Uuid, String), InFlight>,
    config: IdempotencyConfig,
}

impl IdempotencyCache {
    pub fn new(repo: Arc<IdempotencyRepository>, config: IdempotencyConfig) -> Self {
        Self { repo, in_flight: DashMap::new(), config }
    }

    fn fingerprint(body: &str) -> String {
        sha256_hex(body)
    }

    /// Look up `client_key`'s record. If another request for the same key
    /// is in flight, blocks (bounded by `inflight_wait_ms`) for its
    /// completion and returns its response.
    pub async fn lookup(
        &self,
        endpoint: IdempotentEndpoint,
        subject_id: Uuid,
        client_key: &str,
        canonical_body: &str,
    ) -> Result<IdempotencyOutcome, MatchingError> {
        let key_hash = sha256_hex(client_key);
        let fingerprint = Self::fingerprint(canonical_body);

        if let Some(existing) = self.repo.find(endpoint, subject_id, &key_hash).await? {
            if existing.response_status == 0 {
                return self.wait_for_in_flight(endpoint, subject_id, key_hash, fingerprint).await;
            }
            return Ok(if existing.request_fingerprint == fingerprint {
                IdempotencyOutcome::Replay {
                    status: existing.response_status as u16,
                    body: existing.response_body,
                }
            } else {
                IdempotencyOutcome::Conflict
            });
        }

        Ok(IdempotencyOutcome::Fresh)
    }

    /// Insert the durable placeholder and register the in-memory in-flight
    /// entry. Call after `lookup` returns `Fresh`, before doing the work.
    pub async fn begin(
        &self,
        endpoint: IdempotentEndpoint,
        subject_id: Uuid,
        client_key: &str,
        canonical_body: &str,
    ) -> Result<bool, MatchingError> {
        let key_hash = sha256_hex(client_key);
        let fingerprint = Self::fingerprint(canonical_body);

        let inserted = self
            .repo
            .insert_placeholder(endpoint, subject_id, &key_hash, &fingerprint, self.config.ttl_seconds)
            .await?;

        if inserted {
            let (tx, _rx) = broadcast::channel(1);
            self.in_flight.insert((endpoint, subject_id, key_hash), InFlight { fingerprint, notify: tx });
        }

        Ok(inserted)
    }

    /// Complete a placeholder this caller started with `begin`, persisting
    /// the final response and waking any waiters.
    pub async fn complete(
        &self,
        endpoint: IdempotentEndpoint,
        subject_id: Uuid,
        client_key: &str,
        status: u16,
        body: Value,
    ) -> Result<(), MatchingError> {
        let key_hash = sha256_hex(client_key);
        self.repo
            .complete(endpoint, subject_id, &key_hash, status, body.clone())
            .await?;

        if let Some((_, entry)) = self.in_flight.remove(&(endpoint, subject_id, key_hash)) {
            let _ = entry.notify.send((status, body));
        }

        Ok(())
    }

    /// Abandon a placeholder this caller started with `begin`, without
    /// recording a completed response. Used when the underlying work ended
    /// in an indeterminate state (e.g. a PSP call that timed out) so a
    /// retry with the same `client_key` is treated as `Fresh` rather than
    /// replaying a response that was never actually final.
    pub async fn abandon(
        &self,
        endpoint: IdempotentEndpoint,
        subject_id: Uuid,
        client_key: &str,
    ) -> Result<(), MatchingError> {
        let key_hash = sha256_hex(client_key);
        self.repo.delete_placeholder(endpoint, subject_id, &key_hash).await?;
        self.in_flight.remove(&(endpoint, subject_id, key_hash));
        Ok(())
    }

    async fn wait_for_in_flight(
        &self,
        endpoint: IdempotentEndpoint,
        subject_id: Uuid,
        key_hash: String,
        fingerprint: String,
    ) -> Result<IdempotencyOutcome, MatchingError> {
        let key = (endpoint, subject_id, key_hash.clone());
        let mut rx = match self.in_flight.get(&key) {
            Some(entry) => {
                if entry.fingerprint != fingerprint {
                    return Ok(IdempotencyOutcome::Conflict);
                }
                entry.notify.subscribe()
            }
            // Another process holds the placeholder; we have no local
            // broadcaster to wait on, so poll the durable store once after
            // the bound elapses.
            None => {
                tokio::time::sleep(Duration::from_millis(self.config.inflight_wait_ms)).await;
                return self.lookup_completed_only(endpoint, subject_id, &key_hash, &fingerprint).await;
            }
        };

        match tokio::time::timeout(Duration::from_millis(self.config.inflight_wait_ms), rx.recv()).await {
            Ok(Ok((status, body))) => Ok(IdempotencyOutcome::Replay { status, body }),
            _ => Err(MatchingError::SingleflightTimeout),
        }
    }

    async fn lookup_completed_only(
        &self,
        endpoint: IdempotentEndpoint,
        subject_id: Uuid,
        key_hash: &str,
        fingerprint: &str,
    ) -> Result<IdempotencyOutcome, MatchingError> {
        match self.repo.find(endpoint, subject_id, key_hash).await? {
            Some(rec) if rec.response_status != 0 && rec.request_fingerprint == fingerprint => {
                Ok(IdempotencyOutcome::Replay { status: rec.response_status as u16, body: rec.response_body })
            }
            Some(rec) if rec.response_status != 0 => Ok(IdempotencyOutcome::Conflict),
            _ => Err(MatchingError::SingleflightTimeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(IdempotencyCache::fingerprint("abc"), IdempotencyCache::fingerprint("abc"));
        assert_ne!(IdempotencyCache::fingerprint("abc"), IdempotencyCache::fingerprint("abd"));
    }
}
