//! Trip lifecycle handler: `end_trip` (§4.1, §6).

use axum::{extract::State, Json};
use domain::geo::haversine_km;
use domain::models::{EndTripRequest, EndTripResponse, GeoPoint};
use domain::pricing::compute_fare;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthSubject;

/// `end_trip(trip_id, final_lat, final_lng) -> trip_id, distance_km,
/// final_fare` (§6). Distance is the great-circle distance between the
/// ride's pickup and the reported final location; fare reuses the surge
/// multiplier frozen at `create_ride` time.
pub async fn end_trip(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    Json(request): Json<EndTripRequest>,
) -> Result<Json<EndTripResponse>, ApiError> {
    let trip = state
        .state_store
        .get_trip(request.trip_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("trip not found".into()))?;

    let ride = state
        .state_store
        .get_ride(trip.ride_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("ride not found".into()))?;

    if subject.id != ride.rider_id && subject.id != trip.driver_id {
        return Err(ApiError::Forbidden("not a participant in this trip".into()));
    }

    let final_point = GeoPoint { lat: request.final_lat, lng: request.final_lng };
    let distance_km = haversine_km(ride.pickup, final_point);
    let final_fare = compute_fare(&state.fare_table, ride.tier, distance_km, ride.surge_multiplier_at_request);

    let payment_id = state
        .state_store
        .end_trip(request.trip_id, request.final_lat, request.final_lng, distance_km, final_fare)
        .await?
        .ok_or_else(|| ApiError::Conflict("trip is not active".into()))?;

    state.ride_status_cache.invalidate(ride.id);

    tracing::info!(
        trip_id = %request.trip_id,
        ride_id = %ride.id,
        payment_id = %payment_id,
        distance_km,
        final_fare,
        "trip ended"
    );

    Ok(Json(EndTripResponse { trip_id: request.trip_id, distance_km, final_fare }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_trip_response_serializes() {
        let response = EndTripResponse {
            trip_id: uuid::Uuid::new_v4(),
            distance_km: 294.3,
            final_fare: 3581.6,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("distanceKm"));
        assert!(json.contains("finalFare"));
    }
}
