//! The durable transactional state store (§4.1).
//!
//! Bundles the multi-row commits from the design notes' `UnitOfWork` guidance
//! (§9): `assign_ride_atomic` and `end_trip` each touch more than one table
//! and must commit-or-rollback as a unit. Row-lock acquisition (`FOR UPDATE
//! SKIP LOCKED`) is an explicit flag on the read, not hidden behind an ORM.

use domain::models::{
    Driver, DriverStatus, Payment, PaymentMethod, PaymentStatus, PspOutcome, Ride, RideStatus,
    Tier, Trip, TripStatus,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::{DriverEntity, PaymentEntity, RideEntity, TripEntity};
use crate::metrics::QueryTimer;

/// Outcome of `assign_ride_atomic` (§4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    Ok { trip_id: Uuid },
    RideConflict,
    DriverConflict,
}

/// Outcome of `finalize_payment` (§4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizePaymentOutcome {
    Ok,
    /// Already terminal with a different outcome than requested.
    Conflict,
}

#[derive(Clone)]
pub struct StateStoreRepository {
    pool: PgPool,
}

impl StateStoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `create_ride(rider_id, pickup, dest, tier, payment_method, estimated_fare, surge) -> ride_id`.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_ride(
        &self,
        rider_id: Uuid,
        pickup_lat: f64,
        pickup_lng: f64,
        dest_lat: f64,
        dest_lng: f64,
        tier: Tier,
        payment_method: PaymentMethod,
        estimated_fare: f64,
        surge_multiplier_at_request: f64,
        idempotency_key: Option<&str>,
    ) -> Result<Ride, sqlx::Error> {
        let timer = QueryTimer::new("create_ride");

        let entity = sqlx::query_as::<_, RideEntity>(
            r#"
            INSERT INTO rides (
                id, rider_id, pickup_lat, pickup_lng, dest_lat, dest_lng,
                tier, payment_method, status, estimated_fare,
                surge_multiplier_at_request, idempotency_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'requested', $9, $10, $11)
            RETURNING id, rider_id, pickup_lat, pickup_lng, dest_lat, dest_lng,
                      tier, payment_method, status, assigned_driver_id, estimated_fare,
                      surge_multiplier_at_request, idempotency_key, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(rider_id)
        .bind(pickup_lat)
        .bind(pickup_lng)
        .bind(dest_lat)
        .bind(dest_lng)
        .bind(tier.as_str())
        .bind(payment_method.as_str())
        .bind(estimated_fare)
        .bind(surge_multiplier_at_request)
        .bind(idempotency_key)
        .fetch_one(&self.pool)
        .await?;

        timer.record();
        Ok(entity.into())
    }

    /// `assign_ride_atomic(ride_id, driver_id) -> {ok | ride_conflict | driver_conflict}` (§4.1).
    ///
    /// Takes non-blocking `FOR UPDATE SKIP LOCKED` exclusive locks on the
    /// ride and driver rows so a contending matching worker fails fast
    /// instead of queueing behind another attempt for the same driver.
    pub async fn assign_ride_atomic(
        &self,
        ride_id: Uuid,
        driver_id: Uuid,
    ) -> Result<AssignOutcome, sqlx::Error> {
        let timer = QueryTimer::new("assign_ride_atomic");
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let ride_status: Option<String> =
            sqlx::query_scalar("SELECT status FROM rides WHERE id = $1 FOR UPDATE SKIP LOCKED")
                .bind(ride_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(ride_status) = ride_status else {
            tx.rollback().await?;
            timer.record();
            return Ok(AssignOutcome::RideConflict);
        };
        if ride_status != RideStatus::Requested.as_str() {
            tx.rollback().await?;
            timer.record();
            return Ok(AssignOutcome::RideConflict);
        }

        let driver_status: Option<String> =
            sqlx::query_scalar("SELECT status FROM drivers WHERE id = $1 FOR UPDATE SKIP LOCKED")
                .bind(driver_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(driver_status) = driver_status else {
            tx.rollback().await?;
            timer.record();
            return Ok(AssignOutcome::DriverConflict);
        };
        if driver_status != DriverStatus::Available.as_str() {
            tx.rollback().await?;
            timer.record();
            return Ok(AssignOutcome::DriverConflict);
        }

        sqlx::query(
            "UPDATE rides SET status = 'matched', assigned_driver_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(ride_id)
        .bind(driver_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE drivers SET status = 'on_trip', updated_at = now() WHERE id = $1")
            .bind(driver_id)
            .execute(&mut *tx)
            .await?;

        let trip_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO trips (id, ride_id, driver_id, status, started_at) VALUES ($1, $2, $3, 'active', now())",
        )
        .bind(trip_id)
        .bind(ride_id)
        .bind(driver_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(AssignOutcome::Ok { trip_id })
    }

    /// `start_trip(ride_id)`: `MATCHED -> STARTED`.
    pub async fn start_trip(&self, ride_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("start_trip");
        let result = sqlx::query(
            "UPDATE rides SET status = 'started', updated_at = now() WHERE id = $1 AND status = 'matched'",
        )
        .bind(ride_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// `accept_ride`: sets `driver_confirmed_at` on the ride's trip without
    /// changing any status (§9 design note).
    pub async fn confirm_driver(&self, ride_id: Uuid, driver_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("confirm_driver");
        let result = sqlx::query(
            "UPDATE trips SET driver_confirmed_at = now() WHERE ride_id = $1 AND driver_id = $2 AND driver_confirmed_at IS NULL",
        )
        .bind(ride_id)
        .bind(driver_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// `end_trip(trip_id, final_lat, final_lng, distance_km, final_fare)` (§4.1).
    ///
    /// Requires `trip.status == active`; transitions trip to `completed`,
    /// ride to `COMPLETED`, driver back to `available`, and inserts a
    /// `pending` payment row. Returns the new payment id, or `None` if the
    /// trip was not active (already ended, or does not exist).
    pub async fn end_trip(
        &self,
        trip_id: Uuid,
        final_lat: f64,
        final_lng: f64,
        distance_km: f64,
        final_fare: f64,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("end_trip");
        let mut tx = self.pool.begin().await?;

        let trip: Option<(Uuid, Uuid, String)> = sqlx::query_as(
            "SELECT ride_id, driver_id, status FROM trips WHERE id = $1 FOR UPDATE SKIP LOCKED",
        )
        .bind(trip_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((ride_id, driver_id, status)) = trip else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };
        if status != TripStatus::Active.as_str() {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        }

        sqlx::query(
            r#"
            UPDATE trips SET
                status = 'completed', ended_at = now(),
                final_lat = $2, final_lng = $3, distance_km = $4, final_fare = $5
            WHERE id = $1
            "#,
        )
        .bind(trip_id)
        .bind(final_lat)
        .bind(final_lng)
        .bind(distance_km)
        .bind(final_fare)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE rides SET status = 'completed', updated_at = now() WHERE id = $1")
            .bind(ride_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE drivers SET status = 'available', updated_at = now() WHERE id = $1")
            .bind(driver_id)
            .execute(&mut *tx)
            .await?;

        let payment_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO payments (id, trip_id, amount, method, status) SELECT $1, $2, $3, rides.payment_method, 'pending' FROM rides WHERE rides.id = $4",
        )
        .bind(payment_id)
        .bind(trip_id)
        .bind(final_fare)
        .bind(ride_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(payment_id))
    }

    /// `finalize_payment(payment_id, psp_outcome, psp_ref)` (§4.1).
    ///
    /// Idempotent terminal transition: no-op if already terminal with the
    /// same outcome; `Conflict` if already terminal with a different one.
    pub async fn finalize_payment(
        &self,
        payment_id: Uuid,
        outcome: PspOutcome,
        psp_ref: Option<&str>,
    ) -> Result<FinalizePaymentOutcome, sqlx::Error> {
        let timer = QueryTimer::new("finalize_payment");
        let target_status = match outcome {
            PspOutcome::Ok => PaymentStatus::Success,
            PspOutcome::Declined => PaymentStatus::Failed,
            PspOutcome::Error => PaymentStatus::Pending,
        };

        let mut tx = self.pool.begin().await?;
        let current_status: Option<String> =
            sqlx::query_scalar("SELECT status FROM payments WHERE id = $1 FOR UPDATE")
                .bind(payment_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(current_status) = current_status else {
            tx.rollback().await?;
            timer.record();
            return Ok(FinalizePaymentOutcome::Conflict);
        };

        if current_status == target_status.as_str() {
            tx.commit().await?;
            timer.record();
            return Ok(FinalizePaymentOutcome::Ok);
        }
        if current_status == PaymentStatus::Success.as_str() || current_status == PaymentStatus::Failed.as_str() {
            tx.rollback().await?;
            timer.record();
            return Ok(FinalizePaymentOutcome::Conflict);
        }

        sqlx::query("UPDATE payments SET status = $2, psp_ref = $3, updated_at = now() WHERE id = $1")
            .bind(payment_id)
            .bind(target_status.as_str())
            .bind(psp_ref)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(FinalizePaymentOutcome::Ok)
    }

    pub async fn get_ride(&self, ride_id: Uuid) -> Result<Option<Ride>, sqlx::Error> {
        let timer = QueryTimer::new("get_ride");
        let entity = sqlx::query_as::<_, RideEntity>(
            r#"
            SELECT id, rider_id, pickup_lat, pickup_lng, dest_lat, dest_lng,
                   tier, payment_method, status, assigned_driver_id, estimated_fare,
                   surge_multiplier_at_request, idempotency_key, created_at, updated_at
            FROM rides WHERE id = $1
            "#,
        )
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(entity.map(Into::into))
    }

    pub async fn get_driver(&self, driver_id: Uuid) -> Result<Option<Driver>, sqlx::Error> {
        let timer = QueryTimer::new("get_driver");
        let entity = sqlx::query_as::<_, DriverEntity>(
            r#"
            SELECT id, name, phone, tier, status, last_lat, last_lng, last_seen_at, created_at, updated_at
            FROM drivers WHERE id = $1
            "#,
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(entity.map(Into::into))
    }

    pub async fn get_trip_by_ride(&self, ride_id: Uuid) -> Result<Option<Trip>, sqlx::Error> {
        let timer = QueryTimer::new("get_trip_by_ride");
        let entity = sqlx::query_as::<_, TripEntity>(
            r#"
            SELECT id, ride_id, driver_id, status, started_at, ended_at,
                   final_lat, final_lng, distance_km, final_fare, driver_confirmed_at
            FROM trips WHERE ride_id = $1
            "#,
        )
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(entity.map(Into::into))
    }

    /// `end_trip`'s caller only has `trip_id` (§6); this resolves it to the
    /// trip row so the handler can look up the parent ride for pickup
    /// coordinates and tier before computing distance and fare.
    pub async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>, sqlx::Error> {
        let timer = QueryTimer::new("get_trip");
        let entity = sqlx::query_as::<_, TripEntity>(
            r#"
            SELECT id, ride_id, driver_id, status, started_at, ended_at,
                   final_lat, final_lng, distance_km, final_fare, driver_confirmed_at
            FROM trips WHERE id = $1
            "#,
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(entity.map(Into::into))
    }

    pub async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
        let timer = QueryTimer::new("get_payment");
        let entity = sqlx::query_as::<_, PaymentEntity>(
            r#"
            SELECT id, trip_id, amount, method, status, psp_ref, idempotency_key, created_at, updated_at
            FROM payments WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(entity.map(Into::into))
    }

    /// `capture_payment`'s caller only has `trip_id` (§6); `end_trip` creates
    /// exactly one payment row per trip, so this resolves it.
    pub async fn get_payment_by_trip(&self, trip_id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
        let timer = QueryTimer::new("get_payment_by_trip");
        let entity = sqlx::query_as::<_, PaymentEntity>(
            r#"
            SELECT id, trip_id, amount, method, status, psp_ref, idempotency_key, created_at, updated_at
            FROM payments WHERE trip_id = $1
            "#,
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(entity.map(Into::into))
    }

    /// Mark the ride `no_driver_found` on matching-budget exhaustion (§4.3 step 3).
    pub async fn mark_no_driver_found(&self, ride_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("mark_no_driver_found");
        let result = sqlx::query(
            "UPDATE rides SET status = 'no_driver_found', updated_at = now() WHERE id = $1 AND status = 'requested'",
        )
        .bind(ride_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Stamp the idempotency key onto an existing payment row so duplicate
    /// `capture_payment` calls with the same `client_key` resolve to the
    /// same row.
    pub async fn tag_payment_idempotency_key(
        &self,
        payment_id: Uuid,
        client_key: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE payments SET idempotency_key = $2 WHERE id = $1")
            .bind(payment_id)
            .bind(client_key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_outcome_eq() {
        let trip_id = Uuid::new_v4();
        assert_eq!(AssignOutcome::Ok { trip_id }, AssignOutcome::Ok { trip_id });
        assert_ne!(AssignOutcome::RideConflict, AssignOutcome::DriverConflict);
    }
}
