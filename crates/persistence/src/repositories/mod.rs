//! Repository implementations for database operations.

pub mod driver;
pub mod idempotency;
pub mod state_store;

pub use driver::{DriverRepository, LocationSample};
pub use idempotency::IdempotencyRepository;
pub use state_store::{AssignOutcome, FinalizePaymentOutcome, StateStoreRepository};
