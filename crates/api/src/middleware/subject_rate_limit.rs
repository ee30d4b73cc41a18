//! Per-subject rate limiting.
//!
//! Same governor-backed sliding window as `rate_limit`, keyed by the
//! authenticated subject's id instead of an API key id — riders and
//! drivers share one limiter pool since both hit the same budget in
//! `security.rate_limit_per_minute`.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovRateLimiter,
};
use serde_json::json;
use shared::jwt::Subject;
use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{Arc, RwLock},
};
use uuid::Uuid;

use crate::app::AppState;

type KeyRateLimiter = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct SubjectRateLimiterState {
    limiters: RwLock<HashMap<Uuid, Arc<KeyRateLimiter>>>,
    rate_limit_per_minute: u32,
}

impl SubjectRateLimiterState {
    pub fn new(rate_limit_per_minute: u32) -> Self {
        Self { limiters: RwLock::new(HashMap::new()), rate_limit_per_minute }
    }

    fn get_or_create_limiter(&self, subject_id: Uuid) -> Arc<KeyRateLimiter> {
        {
            let limiters = self.limiters.read().unwrap();
            if let Some(limiter) = limiters.get(&subject_id) {
                return limiter.clone();
            }
        }

        let mut limiters = self.limiters.write().unwrap();
        if let Some(limiter) = limiters.get(&subject_id) {
            return limiter.clone();
        }

        let quota = Quota::per_minute(
            NonZeroU32::new(self.rate_limit_per_minute).unwrap_or(NonZeroU32::new(100).unwrap()),
        );
        let limiter = Arc::new(GovRateLimiter::direct(quota));
        limiters.insert(subject_id, limiter.clone());
        limiter
    }

    pub fn check(&self, subject_id: Uuid) -> Result<(), u64> {
        let limiter = self.get_or_create_limiter(subject_id);
        match limiter.check() {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait_time = not_until
                    .wait_time_from(governor::clock::Clock::now(&governor::clock::DefaultClock::default()));
                Err(wait_time.as_secs().max(1))
            }
        }
    }
}

impl std::fmt::Debug for SubjectRateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubjectRateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("active_limiters", &self.limiters.read().unwrap().len())
            .finish()
    }
}

/// Runs after `require_auth`/`optional_auth` so the subject id is already
/// in request extensions. Requests with no subject (routes that skip auth
/// entirely) pass through unlimited.
pub async fn subject_rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let subject_id = match req.extensions().get::<Subject>() {
        Some(subject) => subject.id,
        None => return next.run(req).await,
    };

    if let Some(ref limiter) = state.subject_rate_limiter {
        if let Err(retry_after) = limiter.check(subject_id) {
            return rate_limited_response(state.config.security.rate_limit_per_minute, retry_after);
        }
    }

    next.run(req).await
}

fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, retry_after.to_string().parse().unwrap());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_first_request() {
        let state = SubjectRateLimiterState::new(100);
        assert!(state.check(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_rate_limiter_keys_independent() {
        let state = SubjectRateLimiterState::new(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(state.check(a).is_ok());
        assert!(state.check(b).is_ok());
    }

    #[test]
    fn test_rate_limiter_exhausts_quota() {
        let state = SubjectRateLimiterState::new(1);
        let id = Uuid::new_v4();
        assert!(state.check(id).is_ok());
        assert!(state.check(id).is_err());
    }

    #[test]
    fn test_rate_limited_response_headers() {
        let response = rate_limited_response(100, 30);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "30");
    }
}
