//! BeautyOn API Server
//!
//! Exposes the billing orchestrators over HTTP: checkout and plan changes,
//! cancellation, forced downgrades, subscription status resolution, the
//! expiry sweep trigger, resource-limit validation, and credit-gated
//! transactional email.

use std::net::SocketAddr;
use std::sync::Arc;

use beautyon_api::routes::create_router;
use beautyon_api::{AppState, Config};
use beautyon_billing::BillingService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,beautyon_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BeautyOn API Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool and bring the schema up to date
    tracing::info!("Connecting to database...");
    let pool = beautyon_shared::create_pool(&config.database_url).await?;
    beautyon_shared::run_migrations(&pool).await?;
    tracing::info!("Database connection established");

    // Billing service: Stripe + Resend wiring over the shared pool
    let billing = Arc::new(BillingService::from_env(pool.clone())?);
    tracing::info!("Billing service initialized");

    if config.sweep_token.is_none() {
        tracing::warn!("SWEEP_TOKEN not set - the sweep endpoint is unauthenticated");
    }

    // Create application state
    let state = AppState::new(pool, config.clone(), billing);

    // The booking widgets are embedded on customers' own sites, so the API
    // answers any origin; preflight requests get an empty 200.
    let app = create_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Parse bind address
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Starting server on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
