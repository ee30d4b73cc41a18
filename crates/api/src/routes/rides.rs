//! Ride lifecycle handlers: `create_ride`, `get_ride`, `accept_ride` (§6).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::geo::haversine_km;
use domain::models::{
    AcceptRideRequest, CreateRideRequest, CreateRideResponse, GeoPoint, IdempotentEndpoint,
};
use domain::pricing::compute_fare;
use matching::IdempotencyOutcome;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AuthSubject, DriverSubject, RiderSubject};

/// `create_ride(pickup, dest, tier, payment_method, client_key) ->
/// ride_id, estimated_fare, surge` (§6). Idempotent on `client_key`, scoped
/// to the calling rider.
pub async fn create_ride(
    State(state): State<AppState>,
    RiderSubject(rider_id): RiderSubject,
    Json(request): Json<CreateRideRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    let canonical_body = serde_json::json!({
        "pickupLat": request.pickup_lat,
        "pickupLng": request.pickup_lng,
        "destLat": request.dest_lat,
        "destLng": request.dest_lng,
        "tier": request.tier.as_str(),
        "paymentMethod": request.payment_method.as_str(),
    })
    .to_string();

    let mut outcome = state
        .idempotency_cache
        .lookup(IdempotentEndpoint::CreateRide, rider_id, &request.client_key, &canonical_body)
        .await?;

    if matches!(outcome, IdempotencyOutcome::Fresh) {
        let began = state
            .idempotency_cache
            .begin(IdempotentEndpoint::CreateRide, rider_id, &request.client_key, &canonical_body)
            .await?;
        if !began {
            outcome = state
                .idempotency_cache
                .lookup(IdempotentEndpoint::CreateRide, rider_id, &request.client_key, &canonical_body)
                .await?;
        }
    }

    match outcome {
        IdempotencyOutcome::Conflict => {
            return Err(ApiError::Conflict(
                "idempotency key reuse with a different request body".into(),
            ))
        }
        IdempotencyOutcome::Replay { status, body } => {
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
            return Ok((code, Json(body)).into_response());
        }
        IdempotencyOutcome::Fresh => {}
    }

    let pickup = GeoPoint { lat: request.pickup_lat, lng: request.pickup_lng };
    let dest = GeoPoint { lat: request.dest_lat, lng: request.dest_lng };

    state.surge_tracker.record_demand(pickup);
    let surge = state.surge_tracker.multiplier_at(pickup);
    let distance_km = haversine_km(pickup, dest);
    let estimated_fare = compute_fare(&state.fare_table, request.tier, distance_km, surge);

    let ride = state
        .state_store
        .create_ride(
            rider_id,
            request.pickup_lat,
            request.pickup_lng,
            request.dest_lat,
            request.dest_lng,
            request.tier,
            request.payment_method,
            estimated_fare,
            surge,
            Some(&request.client_key),
        )
        .await?;

    state.ride_status_cache.prime(ride.clone());
    state.match_dispatcher.dispatch(ride.id, ride.tier, pickup);

    let response = CreateRideResponse { ride_id: ride.id, estimated_fare, surge };
    let response_json = serde_json::to_value(&response)
        .map_err(|e| ApiError::Internal(format!("failed to serialize response: {e}")))?;

    state
        .idempotency_cache
        .complete(
            IdempotentEndpoint::CreateRide,
            rider_id,
            &request.client_key,
            StatusCode::CREATED.as_u16(),
            response_json,
        )
        .await?;

    tracing::info!(ride_id = %ride.id, rider_id = %rider_id, surge, "ride requested");
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// `get_ride(ride_id) -> ride` (§6), served from the read-through status
/// cache.
pub async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
    AuthSubject(_subject): AuthSubject,
) -> Result<Response, ApiError> {
    let snapshot = state
        .ride_status_cache
        .get(ride_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("ride not found".into()))?;

    Ok(Json(snapshot).into_response())
}

/// `accept_ride(ride_id, driver_id) -> ok` (§9 design note): matching
/// already committed the `REQUESTED -> MATCHED` transition atomically;
/// this only records the driver's explicit confirmation and releases the
/// allocation lock so a future attempt for this driver isn't blocked by a
/// stale hold.
pub async fn accept_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
    DriverSubject(driver_id): DriverSubject,
    Json(request): Json<AcceptRideRequest>,
) -> Result<StatusCode, ApiError> {
    if request.driver_id != driver_id {
        return Err(ApiError::Forbidden("driver can only accept on their own behalf".into()));
    }

    let confirmed = state.state_store.confirm_driver(ride_id, driver_id).await?;
    if !confirmed {
        return Err(ApiError::Conflict(
            "ride not assigned to this driver, or already confirmed".into(),
        ));
    }

    state.matching_engine.release_lock(driver_id);
    tracing::info!(ride_id = %ride_id, driver_id = %driver_id, "driver confirmed ride");
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{PaymentMethod, Tier};

    #[test]
    fn test_create_ride_request_validates() {
        let req = CreateRideRequest {
            pickup_lat: 12.9716,
            pickup_lng: 77.5946,
            dest_lat: 13.0827,
            dest_lng: 80.2707,
            tier: Tier::Standard,
            payment_method: PaymentMethod::Card,
            client_key: "key-1".into(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_ride_request_rejects_empty_client_key() {
        let req = CreateRideRequest {
            pickup_lat: 12.9716,
            pickup_lng: 77.5946,
            dest_lat: 13.0827,
            dest_lng: 80.2707,
            tier: Tier::Standard,
            payment_method: PaymentMethod::Card,
            client_key: "".into(),
        };
        assert!(req.validate().is_err());
    }
}
