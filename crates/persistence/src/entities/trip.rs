//! Trip entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Trip, TripStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `trips` table.
#[derive(Debug, Clone, FromRow)]
pub struct TripEntity {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub final_lat: Option<f64>,
    pub final_lng: Option<f64>,
    pub distance_km: Option<f64>,
    pub final_fare: Option<f64>,
    pub driver_confirmed_at: Option<DateTime<Utc>>,
}

impl From<TripEntity> for Trip {
    fn from(e: TripEntity) -> Self {
        Trip {
            id: e.id,
            ride_id: e.ride_id,
            driver_id: e.driver_id,
            status: e.status.parse::<TripStatus>().unwrap_or(TripStatus::Active),
            started_at: e.started_at,
            ended_at: e.ended_at,
            final_lat: e.final_lat,
            final_lng: e.final_lng,
            distance_km: e.distance_km,
            final_fare: e.final_fare,
            driver_confirmed_at: e.driver_confirmed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_to_domain() {
        let e = TripEntity {
            id: Uuid::new_v4(),
            ride_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            status: "active".into(),
            started_at: Utc::now(),
            ended_at: None,
            final_lat: None,
            final_lng: None,
            distance_km: None,
            final_fare: None,
            driver_confirmed_at: None,
        };
        let trip: Trip = e.into();
        assert_eq!(trip.status, TripStatus::Active);
    }
}
