//! Driver domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Driver/vehicle service class. Drives pricing and candidate filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Standard,
    Premium,
    Xl,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Standard => "standard",
            Tier::Premium => "premium",
            Tier::Xl => "xl",
        }
    }

    pub fn all() -> [Tier; 3] {
        [Tier::Standard, Tier::Premium, Tier::Xl]
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Tier::Standard),
            "premium" => Ok(Tier::Premium),
            "xl" => Ok(Tier::Xl),
            _ => Err(format!("Invalid tier: {}. Must be one of: standard, premium, xl", s)),
        }
    }
}

/// Lifecycle state of a driver. Only matching, location ingest and the
/// driver themself (via `set_driver_status`) mutate this on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Offline,
    Available,
    OnTrip,
    Unavailable,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Offline => "offline",
            DriverStatus::Available => "available",
            DriverStatus::OnTrip => "on_trip",
            DriverStatus::Unavailable => "unavailable",
        }
    }

    /// Is this driver broadcasting location for matching purposes?
    pub fn is_geo_indexed(&self) -> bool {
        matches!(self, DriverStatus::Available)
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DriverStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(DriverStatus::Offline),
            "available" => Ok(DriverStatus::Available),
            "on_trip" => Ok(DriverStatus::OnTrip),
            "unavailable" => Ok(DriverStatus::Unavailable),
            _ => Err(format!("Invalid driver status: {}", s)),
        }
    }
}

/// A registered driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub tier: Tier,
    pub status: DriverStatus,
    pub last_lat: Option<f64>,
    pub last_lng: Option<f64>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for `register_driver`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDriverRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,

    #[validate(custom(function = "shared::validation::validate_phone"))]
    pub phone: String,

    pub tier: Tier,
}

/// Response payload for `register_driver`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDriverResponse {
    pub driver_id: Uuid,
}

/// Request payload for `set_driver_status`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetDriverStatusRequest {
    pub new_status: DriverStatus,
}

/// Request payload for `location_update`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdateRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub lng: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_round_trip() {
        for tier in Tier::all() {
            assert_eq!(tier.as_str().parse::<Tier>().unwrap(), tier);
        }
    }

    #[test]
    fn test_driver_status_is_geo_indexed() {
        assert!(DriverStatus::Available.is_geo_indexed());
        assert!(!DriverStatus::OnTrip.is_geo_indexed());
        assert!(!DriverStatus::Offline.is_geo_indexed());
        assert!(!DriverStatus::Unavailable.is_geo_indexed());
    }

    #[test]
    fn test_driver_status_from_str_invalid() {
        assert!("nonsense".parse::<DriverStatus>().is_err());
    }

    #[test]
    fn test_register_driver_request_validation() {
        let req = RegisterDriverRequest {
            name: "Alice".into(),
            phone: "+15550100".into(),
            tier: Tier::Standard,
        };
        assert!(req.validate().is_ok());

        let bad = RegisterDriverRequest {
            name: "".into(),
            phone: "+15550100".into(),
            tier: Tier::Standard,
        };
        assert!(bad.validate().is_err());
    }
}
