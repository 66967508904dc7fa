//! Startup seeding
//!
//! Installs the default package catalog and, when configured, a bootstrap
//! admin account. Both steps are idempotent.

use crate::auth::PasswordService;
use crate::config::SeedConfig;
use crate::repositories::{NewUser, Storage};
use crate::services::package::PackageService;
use crate::services::user::avatar_url;
use anyhow::{Context, Result};
use helix_shared::validation::{normalize_email, validate_email, validate_password};
use helix_shared::Role;
use tracing::{info, warn};

pub struct SeedService;

impl SeedService {
    pub async fn run(store: &dyn Storage, config: &SeedConfig) -> Result<()> {
        if config.default_packages {
            PackageService::seed_defaults(store)
                .await
                .map_err(|e| anyhow::anyhow!("seeding packages failed: {e}"))?;
        }

        match (&config.admin_email, &config.admin_password) {
            (Some(email), Some(password)) => {
                Self::bootstrap_admin(store, email, password, &config.admin_name).await?
            }
            (Some(_), None) | (None, Some(_)) => {
                warn!("Bootstrap admin needs both seed.admin_email and seed.admin_password");
            }
            (None, None) => {}
        }
        Ok(())
    }

    async fn bootstrap_admin(
        store: &dyn Storage,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<()> {
        let email = normalize_email(email);
        validate_email(&email).map_err(anyhow::Error::msg)?;
        validate_password(password).map_err(anyhow::Error::msg)?;

        if store.find_user_by_email(&email).await?.is_some() {
            info!(%email, "Bootstrap admin already present");
            return Ok(());
        }

        let password_hash = PasswordService::hash_async(password.to_string())
            .await
            .context("hashing bootstrap admin password")?;
        let created = store
            .insert_user(NewUser {
                email: email.clone(),
                password_hash,
                name: name.to_string(),
                role: Role::Admin,
                avatar: Some(avatar_url(name)),
            })
            .await?;

        if let Some(admin) = created {
            info!(user_id = %admin.id, %email, "Bootstrap admin created");
        }
        Ok(())
    }
}
