//! Database connection and pool management
//!
//! Pool creation retries a few times on startup so the server can come up
//! alongside a database container that is still initialising.

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Pool tuning on top of [`DatabaseConfig`]
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub connect_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_connections: 1,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
            connect_attempts: 5,
            retry_delay_ms: 500,
        }
    }
}

impl PoolSettings {
    /// Delay before retry `attempt` (1-based), doubling each time
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(6);
        Duration::from_millis(self.retry_delay_ms.saturating_mul(factor))
    }
}

/// Create a PostgreSQL connection pool
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    create_pool_with_settings(config, &PoolSettings::default()).await
}

pub async fn create_pool_with_settings(
    config: &DatabaseConfig,
    settings: &PoolSettings,
) -> Result<PgPool> {
    let connect_options = PgConnectOptions::from_str(&config.url)
        .context("invalid database URL")?
        .application_name("helix-backend");

    let mut attempt = 1;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(settings.min_connections.min(config.max_connections))
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(settings.max_lifetime_secs))
            .test_before_acquire(true)
            .connect_with(connect_options.clone())
            .await;

        match result {
            Ok(pool) => {
                info!(
                    max = config.max_connections,
                    attempt, "Database pool created"
                );
                return Ok(pool);
            }
            Err(e) if attempt < settings.connect_attempts => {
                let delay = settings.backoff(attempt);
                warn!(error = %e, attempt, ?delay, "Database connection failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e).context("could not connect to database"),
        }
    }
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed successfully");
    Ok(())
}

/// Check database health
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| {
            warn!("Database health check failed: {}", e);
            e.into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_settings() {
        let settings = PoolSettings::default();
        assert_eq!(settings.min_connections, 1);
        assert_eq!(settings.acquire_timeout_secs, 30);
        assert_eq!(settings.connect_attempts, 5);
    }

    #[test]
    fn test_backoff_doubles() {
        let settings = PoolSettings::default();
        assert_eq!(settings.backoff(1), Duration::from_millis(500));
        assert_eq!(settings.backoff(2), Duration::from_millis(1000));
        assert_eq!(settings.backoff(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_fast() {
        let config = DatabaseConfig {
            url: "not a url".to_string(),
            max_connections: 1,
        };
        assert!(create_pool(&config).await.is_err());
    }
}
