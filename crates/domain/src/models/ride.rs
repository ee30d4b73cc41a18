//! Ride domain model and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::driver::Tier;

/// Method used to settle the trip's fare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Wallet => "wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "cash" => Ok(PaymentMethod::Cash),
            "wallet" => Ok(PaymentMethod::Wallet),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// Lifecycle state of a ride (§3, §4.1).
///
/// `NoDriverFound` is this implementation's documented resolution of the
/// open "no-driver-found terminal state" design note (§9): matching
/// exhaustion moves the ride to a dedicated terminal status rather than
/// reusing `Cancelled`, so downstream analytics can distinguish
/// operator/rider cancellation from dispatch failure while still satisfying
/// "deterministic and observable via `get_ride`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Requested,
    Matched,
    Started,
    Completed,
    Cancelled,
    NoDriverFound,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Requested => "requested",
            RideStatus::Matched => "matched",
            RideStatus::Started => "started",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
            RideStatus::NoDriverFound => "no_driver_found",
        }
    }

    /// True once a driver must be assigned to this ride (invariant 2 in §3).
    pub fn requires_assigned_driver(&self) -> bool {
        matches!(
            self,
            RideStatus::Matched | RideStatus::Started | RideStatus::Completed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RideStatus::Completed | RideStatus::Cancelled | RideStatus::NoDriverFound
        )
    }

    pub fn can_transition_to(&self, target: RideStatus) -> bool {
        use RideStatus::*;
        matches!(
            (self, target),
            (Requested, Matched)
                | (Requested, Cancelled)
                | (Requested, NoDriverFound)
                | (Matched, Started)
                | (Matched, Cancelled)
                | (Started, Completed)
        )
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(RideStatus::Requested),
            "matched" => Ok(RideStatus::Matched),
            "started" => Ok(RideStatus::Started),
            "completed" => Ok(RideStatus::Completed),
            "cancelled" => Ok(RideStatus::Cancelled),
            "no_driver_found" => Ok(RideStatus::NoDriverFound),
            _ => Err(format!("Invalid ride status: {}", s)),
        }
    }
}

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A ride, from request through completion or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub pickup: GeoPoint,
    pub dest: GeoPoint,
    pub tier: Tier,
    pub payment_method: PaymentMethod,
    pub status: RideStatus,
    pub assigned_driver_id: Option<Uuid>,
    pub estimated_fare: f64,
    pub surge_multiplier_at_request: f64,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for `create_ride`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub pickup_lat: f64,
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub pickup_lng: f64,
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub dest_lat: f64,
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub dest_lng: f64,

    pub tier: Tier,
    pub payment_method: PaymentMethod,

    #[validate(length(min = 1, max = 200, message = "clientKey must be 1-200 characters"))]
    pub client_key: String,
}

/// Response payload for `create_ride`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideResponse {
    pub ride_id: Uuid,
    pub estimated_fare: f64,
    pub surge: f64,
}

/// Response payload for `get_ride` — the ride-status read cache caches this
/// verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideSnapshot {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub status: RideStatus,
    pub assigned_driver_id: Option<Uuid>,
    pub pickup: GeoPoint,
    pub dest: GeoPoint,
    pub tier: Tier,
    pub estimated_fare: f64,
    pub surge_multiplier_at_request: f64,
    pub updated_at: DateTime<Utc>,
}

impl From<Ride> for RideSnapshot {
    fn from(ride: Ride) -> Self {
        Self {
            id: ride.id,
            rider_id: ride.rider_id,
            status: ride.status,
            assigned_driver_id: ride.assigned_driver_id,
            pickup: ride.pickup,
            dest: ride.dest,
            tier: ride.tier,
            estimated_fare: ride.estimated_fare,
            surge_multiplier_at_request: ride.surge_multiplier_at_request,
            updated_at: ride.updated_at,
        }
    }
}

/// Request payload for `accept_ride` (driver confirmation, §9).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRideRequest {
    pub driver_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ride_status_transitions() {
        use RideStatus::*;
        assert!(Requested.can_transition_to(Matched));
        assert!(Requested.can_transition_to(Cancelled));
        assert!(Requested.can_transition_to(NoDriverFound));
        assert!(Matched.can_transition_to(Started));
        assert!(Matched.can_transition_to(Cancelled));
        assert!(Started.can_transition_to(Completed));

        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Started.can_transition_to(Matched));
        assert!(!NoDriverFound.can_transition_to(Matched));
        assert!(!Requested.can_transition_to(Started));
    }

    #[test]
    fn test_ride_status_requires_assigned_driver() {
        assert!(RideStatus::Matched.requires_assigned_driver());
        assert!(RideStatus::Started.requires_assigned_driver());
        assert!(RideStatus::Completed.requires_assigned_driver());
        assert!(!RideStatus::Requested.requires_assigned_driver());
        assert!(!RideStatus::NoDriverFound.requires_assigned_driver());
    }

    #[test]
    fn test_ride_status_is_terminal() {
        assert!(RideStatus::Completed.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
        assert!(RideStatus::NoDriverFound.is_terminal());
        assert!(!RideStatus::Requested.is_terminal());
        assert!(!RideStatus::Matched.is_terminal());
    }

    #[test]
    fn test_payment_method_round_trip() {
        for pm in [PaymentMethod::Card, PaymentMethod::Cash, PaymentMethod::Wallet] {
            assert_eq!(pm.as_str().parse::<PaymentMethod>().unwrap(), pm);
        }
    }

    #[test]
    fn test_create_ride_request_validation() {
        let req = CreateRideRequest {
            pickup_lat: 12.9716,
            pickup_lng: 77.5946,
            dest_lat: 13.0827,
            dest_lng: 80.2707,
            tier: Tier::Standard,
            payment_method: PaymentMethod::Card,
            client_key: "abc-123".into(),
        };
        assert!(req.validate().is_ok());
    }
}
