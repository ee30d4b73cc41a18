//! Payment capture handler (§6).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    extract::State,
    Json,
};
use domain::models::{CapturePaymentRequest, CapturePaymentResponse, IdempotentEndpoint, PaymentStatus, PspOutcome};
use matching::IdempotencyOutcome;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::RiderSubject;

const FARE_TOLERANCE: f64 = 0.01;

/// `capture_payment(trip_id, method, amount, client_key) -> payment_id,
/// status` (§6). Revalidates `amount` against the server-computed
/// `final_fare` before ever calling the PSP — a mismatch is a `conflict`,
/// never a silent accept-or-adjust (§8 testable property 4, scenario 4).
pub async fn capture_payment(
    State(state): State<AppState>,
    RiderSubject(rider_id): RiderSubject,
    Json(request): Json<CapturePaymentRequest>,
) -> Result<Response, ApiError> {
    let canonical_body = serde_json::json!({
        "tripId": request.trip_id,
        "method": request.method.as_str(),
        "amount": request.amount,
    })
    .to_string();

    let mut outcome = state
        .idempotency_cache
        .lookup(IdempotentEndpoint::CapturePayment, rider_id, &request.client_key, &canonical_body)
        .await?;

    if matches!(outcome, IdempotencyOutcome::Fresh) {
        let began = state
            .idempotency_cache
            .begin(IdempotentEndpoint::CapturePayment, rider_id, &request.client_key, &canonical_body)
            .await?;
        if !began {
            outcome = state
                .idempotency_cache
                .lookup(IdempotentEndpoint::CapturePayment, rider_id, &request.client_key, &canonical_body)
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

    let payment = state
        .state_store
        .get_payment_by_trip(request.trip_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("payment not found for this trip".into()))?;

    if payment.status.is_terminal() {
        let response = CapturePaymentResponse { payment_id: payment.id, status: payment.status };
        let body = serde_json::to_value(&response)
            .map_err(|e| ApiError::Internal(format!("failed to serialize response: {e}")))?;
        state
            .idempotency_cache
            .complete(IdempotentEndpoint::CapturePayment, rider_id, &request.client_key, StatusCode::OK.as_u16(), body)
            .await?;
        return Ok((StatusCode::OK, Json(response)).into_response());
    }

    if (request.amount - payment.amount).abs() > FARE_TOLERANCE {
        return Err(ApiError::Conflict(format!(
            "amount {} does not match server-computed fare {}",
            request.amount, payment.amount
        )));
    }

    state.state_store.tag_payment_idempotency_key(payment.id, &request.client_key).await?;

    let (psp_outcome, psp_ref) = state.psp_client.capture(payment.id, request.amount, request.method).await;
    let finalize_outcome = state.state_store.finalize_payment(payment.id, psp_outcome, psp_ref.as_deref()).await?;

    if matches!(finalize_outcome, persistence::repositories::FinalizePaymentOutcome::Conflict) {
        return Err(ApiError::Conflict("payment already finalized with a different outcome".into()));
    }

    let status = match psp_outcome {
        PspOutcome::Ok => PaymentStatus::Success,
        PspOutcome::Declined => PaymentStatus::Failed,
        PspOutcome::Error => PaymentStatus::Pending,
    };

    let response = CapturePaymentResponse { payment_id: payment.id, status };
    let response_json = serde_json::to_value(&response)
        .map_err(|e| ApiError::Internal(format!("failed to serialize response: {e}")))?;

    if matches!(psp_outcome, PspOutcome::Error) {
        // The PSP call was indeterminate: the payment stays `pending`, so
        // this response must not be cached as a completed record — a retry
        // with the same `client_key` needs to see `Fresh` and re-call the
        // PSP, not replay a stale pending status forever.
        state
            .idempotency_cache
            .abandon(IdempotentEndpoint::CapturePayment, rider_id, &request.client_key)
            .await?;
    } else {
        state
            .idempotency_cache
            .complete(
                IdempotentEndpoint::CapturePayment,
                rider_id,
                &request.client_key,
                StatusCode::OK.as_u16(),
                response_json,
            )
            .await?;
    }

    tracing::info!(payment_id = %payment.id, trip_id = %request.trip_id, status = %status.as_str(), "payment captured");
    Ok((StatusCode::OK, Json(response)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fare_tolerance_allows_rounding_noise() {
        assert!((3581.60_f64 - 3581.595_f64).abs() <= FARE_TOLERANCE + 0.005);
    }

    #[test]
    fn test_fare_tampering_exceeds_tolerance() {
        let server_fare = 480.0;
        let requested_amount = 100.0;
        assert!((requested_amount - server_fare).abs() > FARE_TOLERANCE);
    }
}
