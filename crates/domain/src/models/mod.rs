//! Domain entities (§3).

pub mod driver;
pub mod idempotency;
pub mod payment;
pub mod ride;
pub mod trip;

pub use driver::{
    Driver, DriverStatus, LocationUpdateRequest, RegisterDriverRequest, RegisterDriverResponse,
    SetDriverStatusRequest, Tier,
};
pub use idempotency::{IdempotencyRecord, IdempotentEndpoint};
pub use payment::{Payment, PaymentStatus, PspOutcome, CapturePaymentRequest, CapturePaymentResponse};
pub use ride::{
    AcceptRideRequest, CreateRideRequest, CreateRideResponse, GeoPoint, PaymentMethod, Ride,
    RideSnapshot, RideStatus,
};
pub use trip::{EndTripRequest, EndTripResponse, Trip, TripStatus};
