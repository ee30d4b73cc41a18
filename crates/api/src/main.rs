use anyhow::Result;
use std::time::Duration;
use tracing::info;

mod app;
mod config;
mod dispatch;
mod error;
mod extractors;
mod jobs;
mod middleware;
mod routes;
mod services;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::load()?;

    // Initialize logging
    middleware::logging::init_logging(&config.logging);

    // Initialize Prometheus metrics
    middleware::metrics::init_metrics();
    info!("Prometheus metrics initialized");

    info!("Starting ride-dispatch engine v{}", env!("CARGO_PKG_VERSION"));

    // Create database pool
    let db_config = persistence::db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connect_timeout_secs: config.database.connect_timeout_secs,
        idle_timeout_secs: config.database.idle_timeout_secs,
    };
    let pool = persistence::db::create_pool(&db_config).await?;

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    // Build application: the ride-hailing `AppState`, its event-driven
    // workers (location-ingest flush, match dispatch), and its periodic job
    // scheduler (surge sweep, idempotency cleanup, pool metrics).
    let (app_router, background) = app::create_app(config.clone(), pool);

    // Start server
    let addr = config.socket_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Handle shutdown gracefully
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal");
    };

    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    // Drain background workers: signal shutdown, then wait for the
    // location-flush and match-dispatch loops to finish their current batch.
    let _ = background.shutdown_tx.send(true);
    let _ = background.flush_loop.await;
    let _ = background.dispatch_loop.await;

    // Shutdown the periodic job scheduler.
    let mut scheduler = background.scheduler;
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;

    info!("Server shutdown complete");
    Ok(())
}
