//! Trip domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a trip. Created exclusively by the matching commit;
/// exactly one trip per ride (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Active,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Active => "active",
            TripStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TripStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TripStatus::Active),
            "completed" => Ok(TripStatus::Completed),
            _ => Err(format!("Invalid trip status: {}", s)),
        }
    }
}

/// A trip, created when a ride is matched to a driver and closed when the
/// rider reaches their destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub status: TripStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub final_lat: Option<f64>,
    pub final_lng: Option<f64>,
    pub distance_km: Option<f64>,
    pub final_fare: Option<f64>,
    /// Set by `accept_ride` (§9 design note): an additional driver
    /// confirmation distinct from the atomic matching commit. Matching
    /// alone already transitions ride/driver state; this timestamp is
    /// informational for deployments that want an explicit ack.
    pub driver_confirmed_at: Option<DateTime<Utc>>,
}

/// Request payload for `end_trip`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTripRequest {
    pub trip_id: Uuid,
    pub final_lat: f64,
    pub final_lng: f64,
}

/// Response payload for `end_trip`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTripResponse {
    pub trip_id: Uuid,
    pub distance_km: f64,
    pub final_fare: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_status_round_trip() {
        assert_eq!("active".parse::<TripStatus>().unwrap(), TripStatus::Active);
        assert_eq!(
            "completed".parse::<TripStatus>().unwrap(),
            TripStatus::Completed
        );
        assert!("bogus".parse::<TripStatus>().is_err());
    }

    #[test]
    fn test_trip_status_display() {
        assert_eq!(TripStatus::Active.to_string(), "active");
    }
}
