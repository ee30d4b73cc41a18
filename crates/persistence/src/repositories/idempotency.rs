//! Idempotency record repository (§4.6). Durable side of the cache; the
//! matching crate's `idempotency_cache` layers an in-memory singleflight on
//! top of this for the in-flight-placeholder behavior.

use chrono::{DateTime, Utc};
use domain::models::IdempotentEndpoint;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::IdempotencyRecordEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct IdempotencyRepository {
    pool: PgPool,
}

impl IdempotencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Find a record by its scoping key `(endpoint, subject_id, key_hash)`.
    pub async fn find(
        &self,
        endpoint: IdempotentEndpoint,
        subject_id: Uuid,
        key_hash: &str,
    ) -> Result<Option<IdempotencyRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("idempotency_find");
        let record = sqlx::query_as::<_, IdempotencyRecordEntity>(
            r#"
            SELECT endpoint, subject_id, key_hash, request_fingerprint, response_status,
                   response_body, created_at, expires_at
            FROM idempotency_records
            WHERE endpoint = $1 AND subject_id = $2 AND key_hash = $3 AND expires_at > NOW()
            "#,
        )
        .bind(endpoint.as_str())
        .bind(subject_id)
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(record)
    }

    /// Insert a placeholder row for the in-flight request (singleflight,
    /// §4.6). `response_status = 0` marks "not yet completed." Returns
    /// `false` if a record for this key already exists (in-flight or
    /// completed) rather than erroring, so the caller can fall into the
    /// wait-for-completion path.
    pub async fn insert_placeholder(
        &self,
        endpoint: IdempotentEndpoint,
        subject_id: Uuid,
        key_hash: &str,
        request_fingerprint: &str,
        ttl_seconds: i64,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("idempotency_insert_placeholder");
        let result = sqlx::query(
            r#"
            INSERT INTO idempotency_records
                (endpoint, subject_id, key_hash, request_fingerprint, response_status, response_body, expires_at)
            VALUES ($1, $2, $3, $4, 0, 'null'::jsonb, NOW() + make_interval(secs => $5))
            ON CONFLICT (endpoint, subject_id, key_hash) DO NOTHING
            "#,
        )
        .bind(endpoint.as_str())
        .bind(subject_id)
        .bind(key_hash)
        .bind(request_fingerprint)
        .bind(ttl_seconds as f64)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Complete a previously-inserted placeholder with the final response.
    pub async fn complete(
        &self,
        endpoint: IdempotentEndpoint,
        subject_id: Uuid,
        key_hash: &str,
        response_status: u16,
        response_body: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE idempotency_records
            SET response_status = $4, response_body = $5
            WHERE endpoint = $1 AND subject_id = $2 AND key_hash = $3
            "#,
        )
        .bind(endpoint.as_str())
        .bind(subject_id)
        .bind(key_hash)
        .bind(response_status as i16)
        .bind(response_body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a still-in-flight placeholder row (`response_status = 0`)
    /// without erroring if it was already completed or removed. Used when
    /// the work it guarded ended indeterminately, so a retry with the same
    /// key is treated as a fresh request.
    pub async fn delete_placeholder(
        &self,
        endpoint: IdempotentEndpoint,
        subject_id: Uuid,
        key_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            DELETE FROM idempotency_records
            WHERE endpoint = $1 AND subject_id = $2 AND key_hash = $3 AND response_status = 0
            "#,
        )
        .bind(endpoint.as_str())
        .bind(subject_id)
        .bind(key_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete expired records. Returns the number of rows removed.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM idempotency_records WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_repository_shape_compiles() {
        // Exercised by integration tests against a real database; this
        // module only needs to compile and expose the right surface here.
        assert!(true);
    }
}
