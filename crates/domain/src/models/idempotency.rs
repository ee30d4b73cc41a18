//! Idempotency record domain model (§4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The non-retry-safe endpoints the idempotency cache wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdempotentEndpoint {
    CreateRide,
    CapturePayment,
}

impl IdempotentEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdempotentEndpoint::CreateRide => "create_ride",
            IdempotentEndpoint::CapturePayment => "capture_payment",
        }
    }
}

impl std::str::FromStr for IdempotentEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_ride" => Ok(IdempotentEndpoint::CreateRide),
            "capture_payment" => Ok(IdempotentEndpoint::CapturePayment),
            _ => Err(format!("Invalid idempotent endpoint: {}", s)),
        }
    }
}

/// An idempotency record. Key is scoped by `(endpoint, subject_id, key)`
/// per §4.6; `key_hash`/`fingerprint_hash` store SHA-256 digests rather than
/// raw values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub endpoint: IdempotentEndpoint,
    pub subject_id: Uuid,
    pub key_hash: String,
    pub request_fingerprint: String,
    pub response_status: u16,
    pub response_body: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

impl IdempotencyRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at).num_seconds() > self.ttl_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(created_at: DateTime<Utc>, ttl_seconds: i64) -> IdempotencyRecord {
        IdempotencyRecord {
            endpoint: IdempotentEndpoint::CreateRide,
            subject_id: Uuid::new_v4(),
            key_hash: "hash".into(),
            request_fingerprint: "fp".into(),
            response_status: 200,
            response_body: serde_json::json!({}),
            created_at,
            ttl_seconds,
        }
    }

    #[test]
    fn test_is_expired() {
        let rec = record(Utc::now() - Duration::hours(25), 86400);
        assert!(rec.is_expired(Utc::now()));

        let fresh = record(Utc::now() - Duration::hours(1), 86400);
        assert!(!fresh.is_expired(Utc::now()));
    }
}
