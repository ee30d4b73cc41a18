//! Hot-path location ingest (§4.8): a two-tier write — synchronous to the
//! geo index, buffered-and-batched to the durable store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::models::Tier;
use persistence::repositories::{DriverRepository, LocationSample};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::config::LocationConfig;
use crate::geo_index::GeoIndex;

#[derive(Debug, Clone, Copy)]
pub struct BufferedUpdate {
    driver_id: Uuid,
    lat: f64,
    lng: f64,
    #[allow(dead_code)]
    at: DateTime<Utc>,
}

/// The ingest front door: `record` is called from the `location_update`
/// request handler. The geo-index write happens inline (must be
/// sub-millisecond); the durable write is deferred to the bounded channel
/// drained by `run_flush_loop`.
#[derive(Clone)]
pub struct LocationIngest {
    geo_index: Arc<GeoIndex>,
    sender: mpsc::Sender<BufferedUpdate>,
}

impl LocationIngest {
    /// Returns the ingest handle plus the receiver the background flush
    /// worker owns — wiring mirrors the teacher's named-worker jobs, except
    /// this one runs off a channel rather than a fixed interval.
    pub fn new(geo_index: Arc<GeoIndex>, config: &LocationConfig) -> (Self, mpsc::Receiver<BufferedUpdate>) {
        let (sender, receiver) = mpsc::channel(config.buffer_capacity);
        (Self { geo_index, sender }, receiver)
    }

    /// `location_update(driver_id, lat, lng)` (§6): upserts the geo index
    /// synchronously, then enqueues for the durable batch flush. If the
    /// buffer is full the update is dropped — the geo index remains
    /// authoritative for matching, so this is a lossy-OK per §6's request
    /// surface table.
    pub fn record(&self, tier: Tier, driver_id: Uuid, lat: f64, lng: f64) {
        self.geo_index.upsert(tier, driver_id, lat, lng);

        let update = BufferedUpdate { driver_id, lat, lng, at: Utc::now() };
        if self.sender.try_send(update).is_err() {
            warn!(driver_id = %driver_id, "location ingest buffer full, dropping durable-store update");
        }
    }
}

/// Background flush worker (§4.8, §B.6): drains the buffer in batches,
/// every `flush_interval_ms` or `flush_batch` updates, whichever comes
/// first, and upserts the latest sample per driver via a single multi-row
/// write. Retries its batch once on failure; on a second failure the batch
/// is dropped, since the geo index is already authoritative for real-time
/// matching (§7).
pub async fn run_flush_loop(
    mut receiver: mpsc::Receiver<BufferedUpdate>,
    driver_repo: Arc<DriverRepository>,
    config: LocationConfig,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut batch: Vec<BufferedUpdate> = Vec::with_capacity(config.flush_batch);
    let mut interval = tokio::time::interval(Duration::from_millis(config.flush_interval_ms));

    loop {
        tokio::select! {
            maybe_update = receiver.recv() => {
                match maybe_update {
                    Some(update) => {
                        batch.push(update);
                        if batch.len() >= config.flush_batch {
                            flush(&driver_repo, &mut batch).await;
                        }
                    }
                    None => break,
                }
            }
            _ = interval.tick() => {
                if !batch.is_empty() {
                    flush(&driver_repo, &mut batch).await;
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    if !batch.is_empty() {
                        flush(&driver_repo, &mut batch).await;
                    }
                    break;
                }
            }
        }
    }
}

async fn flush(driver_repo: &DriverRepository, batch: &mut Vec<BufferedUpdate>) {
    if batch.is_empty() {
        return;
    }

    let samples = dedupe_latest(batch);
    let attempt = driver_repo.upsert_locations_batch(&samples).await;
    if attempt.is_err() {
        // One retry on failure (§7); a second failure drops the batch.
        if driver_repo.upsert_locations_batch(&samples).await.is_err() {
            warn!(batch_size = samples.len(), "location flush failed twice, dropping batch");
        }
    }
    batch.clear();
}

/// Only the latest sample per driver in the batch needs to be written.
fn dedupe_latest(batch: &[BufferedUpdate]) -> Vec<LocationSample> {
    let mut latest: std::collections::HashMap<Uuid, BufferedUpdate> = std::collections::HashMap::new();
    for update in batch {
        latest
            .entry(update.driver_id)
            .and_modify(|existing| {
                if update.at >= existing.at {
                    *existing = *update;
                }
            })
            .or_insert(*update);
    }
    latest
        .into_values()
        .map(|u| LocationSample { driver_id: u.driver_id, lat: u.lat, lng: u.lng })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_latest_keeps_newest() {
        let driver = Uuid::new_v4();
        let older = BufferedUpdate { driver_id: driver, lat: 1.0, lng: 1.0, at: Utc::now() - chrono::Duration::seconds(5) };
        let newer = BufferedUpdate { driver_id: driver, lat: 2.0, lng: 2.0, at: Utc::now() };
        let samples = dedupe_latest(&[older, newer]);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].lat, 2.0);
    }

    #[test]
    fn test_dedupe_latest_keeps_distinct_drivers() {
        let d1 = Uuid::new_v4();
        let d2 = Uuid::new_v4();
        let a = BufferedUpdate { driver_id: d1, lat: 1.0, lng: 1.0, at: Utc::now() };
        let b = BufferedUpdate { driver_id: d2, lat: 2.0, lng: 2.0, at: Utc::now() };
        let samples = dedupe_latest(&[a, b]);
        assert_eq!(samples.len(), 2);
    }

    #[tokio::test]
    async fn test_record_upserts_geo_index_synchronously() {
        let geo = Arc::new(GeoIndex::new());
        let (ingest, _rx) = LocationIngest::new(geo.clone(), &LocationConfig::default());
        let driver = Uuid::new_v4();
        ingest.record(Tier::Standard, driver, 12.9716, 77.5946);
        assert_eq!(geo.len(Tier::Standard), 1);
    }
}
