//! Helix Backend
//!
//! Health-coaching service connecting clients, doctors and administrators.
//!
//! ## Architecture
//!
//! The backend follows a layered architecture:
//! - Routes: HTTP and websocket handling
//! - Services: business rules and authorization
//! - Repositories: the storage port, backed by PostgreSQL or memory
//! - Database: PostgreSQL with SQLx

use anyhow::Result;
use helix_backend::{
    ai, config, db,
    metrics::install_recorder,
    repositories::{MemoryStore, PgStore, Storage},
    routes,
    services::SeedService,
    state::AppState,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if config::AppConfig::is_production() { "production" } else { "development" },
        "Starting Helix backend"
    );

    if config::AppConfig::is_production() {
        validate_production_config(&config)?;
    }

    let store = connect_store(&config).await?;

    SeedService::run(store.as_ref(), &config.seed).await?;

    let generator = ai::from_config(&config.ai)?;
    let mut state = AppState::new(store, config.clone()).with_generator(generator);

    match install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!("Metrics exporter disabled: {}", e),
    }

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Build the storage adapter named by the database URL
///
/// `memory://` keeps everything in process and is lost on restart.
async fn connect_store(config: &config::AppConfig) -> Result<Arc<dyn Storage>> {
    if config.database.is_memory() {
        warn!("Using in-memory storage; data will not survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    info!("Connecting to database...");
    let pool = db::create_pool(&config.database).await?;

    // Production deployments run migrations as a separate job
    if !config::AppConfig::is_production() {
        info!("Running database migrations...");
        db::run_migrations(&pool).await?;
    }

    Ok(Arc::new(PgStore::new(pool)))
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config::AppConfig::is_production() {
            "helix_backend=info,tower_http=info".into()
        } else {
            "helix_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config::AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Validate configuration for production deployment
fn validate_production_config(config: &config::AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.jwt.secret.contains("development") || config.jwt.secret.len() < 32 {
        errors.push("JWT secret must be at least 32 characters and not contain 'development'");
    }

    if config.database.is_memory() {
        errors.push("In-memory storage is not allowed in production");
    }

    if config.database.url.contains("localhost") || config.database.url.contains("127.0.0.1") {
        warn!("Database URL contains localhost - ensure this is intentional for production");
    }

    if config.seed.admin_password.as_deref().is_some_and(|p| p.len() < 12) {
        warn!("Bootstrap admin password is short; rotate it after first login");
    }

    if !errors.is_empty() {
        for err in &errors {
            error!("Configuration error: {}", err);
        }
        anyhow::bail!("Invalid production configuration");
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
