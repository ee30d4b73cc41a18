//! Idempotency record entity (database row mapping, §4.6).

use chrono::{DateTime, Utc};
use domain::models::{IdempotencyRecord, IdempotentEndpoint};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `idempotency_records` table.
///
/// Keyed by `(endpoint, subject_id, key_hash)` (§3); `expires_at` is stored
/// rather than a raw TTL so expiry is a plain column comparison at query time.
#[derive(Debug, Clone, FromRow)]
pub struct IdempotencyRecordEntity {
    pub endpoint: String,
    pub subject_id: Uuid,
    pub key_hash: String,
    pub request_fingerprint: String,
    pub response_status: i16,
    pub response_body: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<IdempotencyRecordEntity> for IdempotencyRecord {
    fn from(e: IdempotencyRecordEntity) -> Self {
        let ttl_seconds = (e.expires_at - e.created_at).num_seconds().max(0);
        IdempotencyRecord {
            endpoint: e
                .endpoint
                .parse::<IdempotentEndpoint>()
                .unwrap_or(IdempotentEndpoint::CreateRide),
            subject_id: e.subject_id,
            key_hash: e.key_hash,
            request_fingerprint: e.request_fingerprint,
            response_status: e.response_status as u16,
            response_body: e.response_body,
            created_at: e.created_at,
            ttl_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_entity_to_domain_computes_ttl() {
        let created_at = Utc::now();
        let e = IdempotencyRecordEntity {
            endpoint: "create_ride".into(),
            subject_id: Uuid::new_v4(),
            key_hash: "h".into(),
            request_fingerprint: "f".into(),
            response_status: 200,
            response_body: serde_json::json!({"rideId": "x"}),
            created_at,
            expires_at: created_at + Duration::hours(24),
        };
        let record: IdempotencyRecord = e.into();
        assert_eq!(record.ttl_seconds, 86400);
    }
}
