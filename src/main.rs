use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_leads_api::config::Config;
use rust_leads_api::db::Database;
use rust_leads_api::executor::{QueryExecutor, RetryPolicy};
use rust_leads_api::leads::LeadFunnelService;
use rust_leads_api::storage::UserStore;
use rust_leads_api::{handlers, schema};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the connection pool and the query
/// executor, validates the static storage schemas, then starts the Axum
/// server with CORS, request-size and rate limits.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_leads_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // The static schemas gate every repository read and write; a bad
    // declaration must stop the process before it serves traffic.
    schema::validate_all()?;
    tracing::info!("Storage schemas validated");

    // Initialize database connection pool
    let db = Database::new(&config).await?;
    tracing::info!("Database connection pool established");

    // Single executor handle threaded through every repository.
    let executor = Arc::new(QueryExecutor::new(
        db.pool.clone(),
        RetryPolicy::from_config(&config),
    ));

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        service: LeadFunnelService::new(Arc::clone(&executor)),
        users: UserStore::new(Arc::clone(&executor)),
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route(
            "/leads/getCustomerDisbursement",
            get(handlers::get_customer_disbursement),
        )
        .route("/leads/step/:step", post(handlers::submit_lead_step))
        .route("/users/", get(handlers::get_user))
        .layer(
            ServiceBuilder::new()
                // Step payloads are small forms; 1MB is generous.
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
