//! Database entity definitions.
//!
//! Entities are direct mappings to database rows; `From<Entity> for domain::models::*`
//! converts them into domain types at the repository boundary.

pub mod driver;
pub mod idempotency;
pub mod payment;
pub mod ride;
pub mod trip;

pub use driver::DriverEntity;
pub use idempotency::IdempotencyRecordEntity;
pub use payment::PaymentEntity;
pub use ride::RideEntity;
pub use trip::TripEntity;
