//! Background job scheduler and job implementations.

mod idempotency_cleanup;
mod pool_metrics;
mod scheduler;
mod surge_sweep;

pub use idempotency_cleanup::IdempotencyCleanupJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
pub use surge_sweep::SurgeSweepJob;
