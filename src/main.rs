mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{discovery::LinkDiscovery, extractor::ExtractorClient};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing siteharvest server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("crawl_jobs_total", "Total crawl jobs submitted");
    metrics::describe_counter!("crawl_jobs_completed", "Total crawl jobs that completed");
    metrics::describe_counter!(
        "crawl_jobs_partial",
        "Total crawl jobs that finished with partial results"
    );
    metrics::describe_counter!("crawl_jobs_failed", "Total crawl jobs that failed");
    metrics::describe_counter!("crawl_pages_scraped", "Total pages extracted into items");
    metrics::describe_histogram!(
        "crawl_job_duration_seconds",
        "Wall-clock duration of a crawl job"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize the remote extraction endpoint client
    tracing::info!(base_url = %config.extractor_base_url, "Initializing extraction client");
    let extractor = ExtractorClient::new(
        &config.extractor_base_url,
        config.extractor_api_key.clone(),
    )
    .expect("Failed to initialize extraction client");

    // Initialize link discovery
    let discovery = LinkDiscovery::new().expect("Failed to initialize link discovery");

    // Create shared application state
    let state = AppState::new(db_pool, extractor, discovery);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/api/v1/crawl",
            post(routes::crawl::start_crawl).get(routes::crawl::list_jobs),
        )
        .route("/api/v1/crawl/{job_id}", get(routes::crawl::get_job_status))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // 64 KB limit

    tracing::info!("Starting siteharvest on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
