//! The per-driver allocation lock (§4.3): a single-writer, TTL-bounded claim
//! held outside the state-store transaction. It filters out obviously
//! contended drivers cheaply before the heavier transactional
//! `assign_ride_atomic` call — the row lock alone would serialize all
//! matching attempts through the database.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// `lock:driver:{id}` compare-and-set lock. Acquisition is a compare-and-set
/// against the stored expiry; release is unconditional by the holder.
#[derive(Default)]
pub struct AllocationLock {
    locks: DashMap<Uuid, DateTime<Utc>>,
}

impl AllocationLock {
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    /// Attempt to acquire the lock for `driver_id` with the given `ttl`.
    /// Succeeds if the lock is unheld or its previous holder's TTL expired.
    pub fn acquire(&self, driver_id: Uuid, ttl: Duration) -> bool {
        let now = Utc::now();
        let expires_at = now
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(10));

        match self.locks.entry(driver_id) {
            Entry::Vacant(e) => {
                e.insert(expires_at);
                true
            }
            Entry::Occupied(mut e) => {
                if *e.get() <= now {
                    e.insert(expires_at);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Unconditional release by the holder (§4.3: "release is unconditional
    /// by the holder").
    pub fn release(&self, driver_id: Uuid) {
        self.locks.remove(&driver_id);
    }

    pub fn is_locked(&self, driver_id: Uuid) -> bool {
        self.locks
            .get(&driver_id)
            .map(|expiry| *expiry > Utc::now())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_when_unheld() {
        let lock = AllocationLock::new();
        let driver = Uuid::new_v4();
        assert!(lock.acquire(driver, Duration::from_secs(10)));
        assert!(lock.is_locked(driver));
    }

    #[test]
    fn test_second_acquire_fails_while_held() {
        let lock = AllocationLock::new();
        let driver = Uuid::new_v4();
        assert!(lock.acquire(driver, Duration::from_secs(10)));
        assert!(!lock.acquire(driver, Duration::from_secs(10)));
    }

    #[test]
    fn test_release_then_reacquire_succeeds() {
        let lock = AllocationLock::new();
        let driver = Uuid::new_v4();
        lock.acquire(driver, Duration::from_secs(10));
        lock.release(driver);
        assert!(!lock.is_locked(driver));
        assert!(lock.acquire(driver, Duration::from_secs(10)));
    }

    #[test]
    fn test_expired_lock_can_be_reacquired() {
        let lock = AllocationLock::new();
        let driver = Uuid::new_v4();
        lock.locks.insert(driver, Utc::now() - chrono::Duration::seconds(1));
        assert!(lock.acquire(driver, Duration::from_secs(10)));
    }

    #[test]
    fn test_independent_drivers_do_not_contend() {
        let lock = AllocationLock::new();
        let d1 = Uuid::new_v4();
        let d2 = Uuid::new_v4();
        assert!(lock.acquire(d1, Duration::from_secs(10)));
        assert!(lock.acquire(d2, Duration::from_secs(10)));
    }
}
