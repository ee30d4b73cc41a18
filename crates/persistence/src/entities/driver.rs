//! Driver entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Driver, DriverStatus, Tier};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `drivers` table.
#[derive(Debug, Clone, FromRow)]
pub struct DriverEntity {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub tier: String,
    pub status: String,
    pub last_lat: Option<f64>,
    pub last_lng: Option<f64>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DriverEntity> for Driver {
    fn from(e: DriverEntity) -> Self {
        Driver {
            id: e.id,
            name: e.name,
            phone: e.phone,
            tier: e.tier.parse::<Tier>().unwrap_or(Tier::Standard),
            status: e.status.parse::<DriverStatus>().unwrap_or(DriverStatus::Offline),
            last_lat: e.last_lat,
            last_lng: e.last_lng,
            last_seen_at: e.last_seen_at,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> DriverEntity {
        DriverEntity {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            phone: "+15550100".into(),
            tier: "standard".into(),
            status: "available".into(),
            last_lat: Some(12.97),
            last_lng: Some(77.59),
            last_seen_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_entity_to_domain() {
        let e = entity();
        let id = e.id;
        let d: Driver = e.into();
        assert_eq!(d.id, id);
        assert_eq!(d.tier, Tier::Standard);
        assert_eq!(d.status, DriverStatus::Available);
    }

    #[test]
    fn test_unknown_status_defaults_to_offline() {
        let mut e = entity();
        e.status = "bogus".into();
        let d: Driver = e.into();
        assert_eq!(d.status, DriverStatus::Offline);
    }
}
