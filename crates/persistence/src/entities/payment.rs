//! Payment entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Payment, PaymentMethod, PaymentStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `payments` table.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub amount: f64,
    pub method: String,
    pub status: String,
    pub psp_ref: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentEntity> for Payment {
    fn from(e: PaymentEntity) -> Self {
        Payment {
            id: e.id,
            trip_id: e.trip_id,
            amount: e.amount,
            method: e.method.parse::<PaymentMethod>().unwrap_or(PaymentMethod::Cash),
            status: e.status.parse::<PaymentStatus>().unwrap_or(PaymentStatus::Pending),
            psp_ref: e.psp_ref,
            idempotency_key: e.idempotency_key,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_to_domain() {
        let e = PaymentEntity {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            amount: 3581.6,
            method: "card".into(),
            status: "pending".into(),
            psp_ref: None,
            idempotency_key: Some("K".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let payment: Payment = e.into();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, 3581.6);
    }
}
