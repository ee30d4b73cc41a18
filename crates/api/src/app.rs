//! Application wiring (§9: dependency-injected components at startup, no
//! module-level singletons on the request path). `create_app` assembles the
//! ride-dispatch `AppState` — the durable repositories, the in-memory
//! matching/concurrency layer, and the external PSP client — and mounts the
//! eight §6 request-surface operations onto the axum router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use domain::models::Tier;
use domain::pricing::FareTable;
use matching::{AllocationLock, GeoIndex, IdempotencyCache, LocationIngest, MatchingEngine, RideStatusCache, SurgeTracker};
use persistence::repositories::{DriverRepository, IdempotencyRepository, StateStoreRepository};
use sqlx::PgPool;
use tokio::sync::watch;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::config::Config;
use crate::dispatch::MatchDispatcher;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_auth, security_headers_middleware,
    subject_rate_limit_middleware, trace_id, SubjectRateLimiterState,
};
use crate::routes::{drivers, health, locations, payments, rides, trips};
use crate::services::psp::PspClient;

/// Shared application state, dependency-injected into every handler and
/// extractor (§9). Each component owns its own concurrency (Arc + internal
/// locking); `AppState` itself is a cheap `Clone` of handles.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt_config: Arc<shared::jwt::JwtConfig>,

    pub state_store: Arc<StateStoreRepository>,
    pub driver_repo: Arc<DriverRepository>,

    pub geo_index: Arc<GeoIndex>,
    pub surge_tracker: Arc<SurgeTracker>,
    pub idempotency_cache: Arc<IdempotencyCache>,
    pub ride_status_cache: Arc<RideStatusCache>,
    pub location_ingest: Arc<LocationIngest>,

    pub matching_engine: Arc<MatchingEngine>,
    pub match_dispatcher: MatchDispatcher,

    pub fare_table: Arc<FareTable>,
    pub psp_client: Arc<PspClient>,

    /// Caches each driver's tier so `location_update` (§6, a hot path) can
    /// avoid a round-trip to the driver row on every call.
    pub driver_tiers: Arc<DashMap<Uuid, Tier>>,

    pub subject_rate_limiter: Option<Arc<SubjectRateLimiterState>>,
}

/// Everything `create_app` builds that also needs a running task: the
/// location-flush loop and the match-dispatch loop. The caller (`main`)
/// owns these handles so it can wait on them during graceful shutdown.
pub struct Background {
    pub shutdown_tx: watch::Sender<bool>,
    pub flush_loop: tokio::task::JoinHandle<()>,
    pub dispatch_loop: tokio::task::JoinHandle<()>,
    pub scheduler: crate::jobs::JobScheduler,
}

/// Builds the ride-dispatch `AppState`, spawns its background workers, and
/// returns the assembled router plus the worker handles for shutdown.
pub fn create_app(config: Config, pool: PgPool) -> (Router, Background) {
    let config = Arc::new(config);

    let jwt_config = Arc::new(if config.jwt.private_key == "test-private-key" {
        shared::jwt::JwtConfig::new_hmac(&config.jwt.private_key, config.jwt.access_token_expiry_secs)
    } else {
        shared::jwt::JwtConfig::new_rsa(
            &config.jwt.private_key,
            &config.jwt.public_key,
            config.jwt.access_token_expiry_secs,
        )
        .expect("invalid JWT key configuration")
    });

    let state_store = Arc::new(StateStoreRepository::new(pool.clone()));
    let driver_repo = Arc::new(DriverRepository::new(pool.clone()));
    let idempotency_repo = Arc::new(IdempotencyRepository::new(pool.clone()));

    let geo_index = Arc::new(GeoIndex::new());
    let allocation_lock = Arc::new(AllocationLock::new());
    let surge_tracker = Arc::new(SurgeTracker::new(config.surge));
    let idempotency_cache = Arc::new(IdempotencyCache::new(idempotency_repo.clone(), config.idempotency));
    let ride_status_cache = Arc::new(RideStatusCache::new(state_store.clone(), config.ride_status_cache));

    let (location_ingest, flush_rx) = LocationIngest::new(geo_index.clone(), &config.location);
    let location_ingest = Arc::new(location_ingest);

    let matching_engine = Arc::new(MatchingEngine::new(
        geo_index.clone(),
        allocation_lock,
        state_store.clone(),
        ride_status_cache.clone(),
        config.r#match,
    ));

    let (match_dispatcher, dispatch_rx) = MatchDispatcher::new(matching_engine.clone(), 1_024);

    let fare_table = Arc::new(config.fares.to_fare_table());
    let psp_client = Arc::new(PspClient::new(&config.psp));

    let subject_rate_limiter = if config.security.rate_limit_per_minute > 0 {
        Some(Arc::new(SubjectRateLimiterState::new(config.security.rate_limit_per_minute)))
    } else {
        None
    };

    let geo_index_for_jobs = geo_index.clone();
    let surge_tracker_for_jobs = surge_tracker.clone();

    let state = AppState {
        pool,
        config: config.clone(),
        jwt_config,
        state_store,
        driver_repo: driver_repo.clone(),
        geo_index,
        surge_tracker,
        idempotency_cache,
        ride_status_cache,
        location_ingest,
        matching_engine: matching_engine.clone(),
        match_dispatcher,
        fare_table,
        psp_client,
        driver_tiers: Arc::new(DashMap::new()),
        subject_rate_limiter,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let flush_loop = tokio::spawn(matching::location_ingest::run_flush_loop(
        flush_rx,
        driver_repo,
        config.location,
        shutdown_rx.clone(),
    ));
    let dispatch_loop = tokio::spawn(crate::dispatch::run_dispatch_loop(
        dispatch_rx,
        matching_engine,
        shutdown_rx,
    ));

    let mut scheduler = crate::jobs::JobScheduler::new();
    scheduler.register(crate::jobs::SurgeSweepJob::new(geo_index_for_jobs, surge_tracker_for_jobs));
    scheduler.register(crate::jobs::IdempotencyCleanupJob::new(idempotency_repo));
    scheduler.register(crate::jobs::PoolMetricsJob::new(state.pool.clone()));
    scheduler.start();

    let background = Background { shutdown_tx, flush_loop, dispatch_loop, scheduler };

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .route("/metrics", get(metrics_handler))
        .route("/drivers", post(drivers::register_driver));

    let protected_routes = Router::new()
        .route("/drivers/:driver_id/status", post(drivers::set_driver_status))
        .route("/drivers/:driver_id/location", post(locations::location_update))
        .route("/rides", post(rides::create_ride))
        .route("/rides/:ride_id", get(rides::get_ride))
        .route("/rides/:ride_id/accept", post(rides::accept_ride))
        .route("/trips/end", post(trips::end_trip))
        .route("/payments/capture", post(payments::capture_payment))
        .layer(middleware::from_fn_with_state(state.clone(), subject_rate_limit_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<_> = config.security.cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(tower_http::cors::AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(middleware::from_fn(trace_id))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .with_state(state);

    (router, background)
}
