//! Driver repository for registration, status, and the location-ingest batch
//! flush (§4.8). The hot-path `geo.upsert` write lives in the matching
//! crate's in-memory index; this is the "historical convenience" durable
//! side of a location update.

use domain::models::{Driver, DriverStatus, Tier};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::DriverEntity;
use crate::metrics::QueryTimer;

/// One sample in a location-ingest batch flush (§4.8).
#[derive(Debug, Clone, Copy)]
pub struct LocationSample {
    pub driver_id: Uuid,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone)]
pub struct DriverRepository {
    pool: PgPool,
}

impl DriverRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn register_driver(
        &self,
        name: &str,
        phone: &str,
        tier: Tier,
    ) -> Result<Driver, sqlx::Error> {
        let timer = QueryTimer::new("register_driver");
        let entity = sqlx::query_as::<_, DriverEntity>(
            r#"
            INSERT INTO drivers (id, name, phone, tier, status)
            VALUES ($1, $2, $3, $4, 'offline')
            RETURNING id, name, phone, tier, status, last_lat, last_lng, last_seen_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(phone)
        .bind(tier.as_str())
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        Ok(entity.into())
    }

    pub async fn get_driver(&self, driver_id: Uuid) -> Result<Option<Driver>, sqlx::Error> {
        let timer = QueryTimer::new("get_driver_by_id");
        let entity = sqlx::query_as::<_, DriverEntity>(
            r#"
            SELECT id, name, phone, tier, status, last_lat, last_lng, last_seen_at, created_at, updated_at
            FROM drivers WHERE id = $1
            "#,
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(entity.map(Into::into))
    }

    /// `set_driver_status`. Status transitions into/out of `available` are
    /// the driver's own trigger for geo-index membership (§4.2); the caller
    /// is responsible for mirroring that into the in-memory index.
    pub async fn set_status(&self, driver_id: Uuid, new_status: DriverStatus) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("set_driver_status");
        let result = sqlx::query("UPDATE drivers SET status = $2, updated_at = now() WHERE id = $1")
            .bind(driver_id)
            .bind(new_status.as_str())
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Background batch flush: one multi-row upsert per drain cycle (§4.8).
    /// Only the latest sample per driver in the batch need be passed in —
    /// callers should dedupe before calling.
    pub async fn upsert_locations_batch(&self, samples: &[LocationSample]) -> Result<u64, sqlx::Error> {
        if samples.is_empty() {
            return Ok(0);
        }
        let timer = QueryTimer::new("upsert_locations_batch");

        let ids: Vec<Uuid> = samples.iter().map(|s| s.driver_id).collect();
        let lats: Vec<f64> = samples.iter().map(|s| s.lat).collect();
        let lngs: Vec<f64> = samples.iter().map(|s| s.lng).collect();

        let result = sqlx::query(
            r#"
            UPDATE drivers AS d
            SET last_lat = u.lat, last_lng = u.lng, last_seen_at = now(), updated_at = now()
            FROM UNNEST($1::uuid[], $2::float8[], $3::float8[]) AS u(driver_id, lat, lng)
            WHERE d.id = u.driver_id
            "#,
        )
        .bind(&ids)
        .bind(&lats)
        .bind(&lngs)
        .execute(&self.pool)
        .await?;

        timer.record();
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_sample_copy() {
        let s = LocationSample { driver_id: Uuid::new_v4(), lat: 1.0, lng: 2.0 };
        let s2 = s;
        assert_eq!(s.lat, s2.lat);
    }
}
