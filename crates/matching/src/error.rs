//! Internal error type for the matching/dispatch layer.
//!
//! `LockContention` is deliberately never surfaced at the HTTP boundary
//! (§7): the matching engine retries it internally and only a budget
//! exhaustion ever becomes externally observable, as a `no_driver_found`
//! ride status rather than an error response.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("allocation lock held elsewhere for driver {0}")]
    LockContention(uuid::Uuid),

    #[error("dependency deadline exceeded: {0}")]
    Timeout(&'static str),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(#[from] sqlx::Error),

    #[error("idempotency fingerprint mismatch for existing record")]
    IdempotencyConflict,

    #[error("singleflight wait exceeded bound for in-flight request")]
    SingleflightTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_contention_display() {
        let id = uuid::Uuid::nil();
        let err = MatchingError::LockContention(id);
        assert!(err.to_string().contains("allocation lock"));
    }
}
