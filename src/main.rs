use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use dispatch_rs::{
    config::Config,
    health::health,
    routes::balances::get_customer_balance,
    routes::complete::complete_request,
    routes::requests::{cancel_request, create_request, get_request, list_requests, mark_processing},
    routes::stock::{get_stock_history, get_stock_level, record_inward},
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting dispatch service...");

    // Load configuration from environment
    let config = Config::from_env()
        .expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}",
        config.host,
        config.port
    );

    // Database connection
    tracing::info!("Connecting to database...");
    let pool = dispatch_rs::db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Build the application router
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/dispatch/requests", post(create_request).get(list_requests))
        .route("/api/dispatch/requests/{request_id}", get(get_request))
        .route("/api/dispatch/requests/{request_id}/processing", post(mark_processing))
        .route("/api/dispatch/requests/{request_id}/cancel", post(cancel_request))
        .route("/api/dispatch/requests/{request_id}/complete", post(complete_request))
        .route("/api/stock", get(get_stock_level))
        .route("/api/stock/history", get(get_stock_history))
        .route("/api/stock/inward", post(record_inward))
        .route("/api/customers/{customer_id}/balance", get(get_customer_balance))
        .with_state(Arc::new(pool.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    // Bind to the configured address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Dispatch service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    // Start the server
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
