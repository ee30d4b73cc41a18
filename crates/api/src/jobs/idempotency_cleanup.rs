//! Background job to purge expired idempotency records (§4.6 TTL).

use std::sync::Arc;

use chrono::Utc;
use persistence::repositories::IdempotencyRepository;
use tracing::info;

use super::scheduler::{Job, JobFrequency};

/// Periodically deletes idempotency records past their 24h TTL.
pub struct IdempotencyCleanupJob {
    repo: Arc<IdempotencyRepository>,
}

impl IdempotencyCleanupJob {
    pub fn new(repo: Arc<IdempotencyRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait::async_trait]
impl Job for IdempotencyCleanupJob {
    fn name(&self) -> &'static str {
        "idempotency_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(15)
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = self
            .repo
            .delete_expired(Utc::now())
            .await
            .map_err(|e| e.to_string())?;

        if deleted > 0 {
            info!(deleted, "purged expired idempotency records");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_frequency() {
        assert_eq!(JobFrequency::Minutes(15).duration().as_secs(), 900);
    }
}
