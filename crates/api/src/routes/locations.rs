//! Hot-path driver location ingest (§4.8, §6).

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::LocationUpdateRequest;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::DriverSubject;

#[derive(Debug, Serialize)]
pub struct LocationAck {
    pub ack: bool,
}

/// `location_update(driver_id, lat, lng) -> ack`. Lossy-OK: a full ingest
/// buffer drops the durable write but still acks, since the geo-index
/// write it always performs synchronously is what matching relies on.
pub async fn location_update(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    DriverSubject(subject_id): DriverSubject,
    Json(request): Json<LocationUpdateRequest>,
) -> Result<Json<LocationAck>, ApiError> {
    if subject_id != driver_id {
        return Err(ApiError::Forbidden("driver can only report their own location".into()));
    }
    request.validate()?;

    let tier = match state.driver_tiers.get(&driver_id) {
        Some(tier) => *tier,
        None => {
            let driver = state
                .driver_repo
                .get_driver(driver_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("driver not found".into()))?;
            state.driver_tiers.insert(driver_id, driver.tier);
            driver.tier
        }
    };

    state.location_ingest.record(tier, driver_id, request.lat, request.lng);
    Ok(Json(LocationAck { ack: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_update_request_validates() {
        let req = LocationUpdateRequest { lat: 12.9716, lng: 77.5946 };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_location_update_request_rejects_out_of_range() {
        let req = LocationUpdateRequest { lat: 200.0, lng: 77.5946 };
        assert!(req.validate().is_err());
    }
}
