//! Ride entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{GeoPoint, PaymentMethod, Ride, RideStatus, Tier};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `rides` table.
#[derive(Debug, Clone, FromRow)]
pub struct RideEntity {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub tier: String,
    pub payment_method: String,
    pub status: String,
    pub assigned_driver_id: Option<Uuid>,
    pub estimated_fare: f64,
    pub surge_multiplier_at_request: f64,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RideEntity> for Ride {
    fn from(e: RideEntity) -> Self {
        Ride {
            id: e.id,
            rider_id: e.rider_id,
            pickup: GeoPoint { lat: e.pickup_lat, lng: e.pickup_lng },
            dest: GeoPoint { lat: e.dest_lat, lng: e.dest_lng },
            tier: e.tier.parse::<Tier>().unwrap_or(Tier::Standard),
            payment_method: e.payment_method.parse::<PaymentMethod>().unwrap_or(PaymentMethod::Cash),
            status: e.status.parse::<RideStatus>().unwrap_or(RideStatus::Requested),
            assigned_driver_id: e.assigned_driver_id,
            estimated_fare: e.estimated_fare,
            surge_multiplier_at_request: e.surge_multiplier_at_request,
            idempotency_key: e.idempotency_key,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> RideEntity {
        RideEntity {
            id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            pickup_lat: 12.9716,
            pickup_lng: 77.5946,
            dest_lat: 13.0827,
            dest_lng: 80.2707,
            tier: "standard".into(),
            payment_method: "card".into(),
            status: "requested".into(),
            assigned_driver_id: None,
            estimated_fare: 3581.6,
            surge_multiplier_at_request: 1.0,
            idempotency_key: Some("K".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_entity_to_domain() {
        let e = entity();
        let ride: Ride = e.into();
        assert_eq!(ride.status, RideStatus::Requested);
        assert_eq!(ride.pickup.lat, 12.9716);
    }
}
