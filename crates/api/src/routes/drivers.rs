//! Driver registration and status handlers (§6).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    DriverStatus, RegisterDriverRequest, RegisterDriverResponse, SetDriverStatusRequest,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::DriverSubject;

/// `register_driver(name, phone, tier) -> driver_id` (§6). No auth: this is
/// how a driver identity comes into being in the first place.
pub async fn register_driver(
    State(state): State<AppState>,
    Json(request): Json<RegisterDriverRequest>,
) -> Result<(StatusCode, Json<RegisterDriverResponse>), ApiError> {
    request.validate()?;

    let driver = state
        .driver_repo
        .register_driver(&request.name, &request.phone, request.tier)
        .await?;

    tracing::info!(driver_id = %driver.id, tier = %driver.tier, "driver registered");
    Ok((StatusCode::CREATED, Json(RegisterDriverResponse { driver_id: driver.id })))
}

/// `set_driver_status(driver_id, new_status) -> ok` (§6). Driver-scoped:
/// only the driver themself can change their own status. Mirrors the
/// transition into the geo index so matching sees it on the next sweep.
pub async fn set_driver_status(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    DriverSubject(subject_id): DriverSubject,
    Json(request): Json<SetDriverStatusRequest>,
) -> Result<StatusCode, ApiError> {
    if subject_id != driver_id {
        return Err(ApiError::Forbidden("driver can only set their own status".into()));
    }

    let driver = state
        .driver_repo
        .get_driver(driver_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("driver not found".into()))?;

    let updated = state.driver_repo.set_status(driver_id, request.new_status).await?;
    if !updated {
        return Err(ApiError::NotFound("driver not found".into()));
    }

    match request.new_status {
        DriverStatus::Available => {
            if let (Some(lat), Some(lng)) = (driver.last_lat, driver.last_lng) {
                state.geo_index.upsert(driver.tier, driver_id, lat, lng);
            }
        }
        _ => state.geo_index.remove(driver.tier, driver_id),
    }

    tracing::info!(driver_id = %driver_id, new_status = %request.new_status, "driver status updated");
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::Tier;

    #[test]
    fn test_register_driver_request_deserializes() {
        let req = RegisterDriverRequest {
            name: "Asha".into(),
            phone: "+15550123".into(),
            tier: Tier::Premium,
        };
        assert!(req.validate().is_ok());
    }
}
