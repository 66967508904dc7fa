//! Package catalog and subscriptions

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::repositories::{NewPackage, PackageRecord, PackageUpdate, Storage};
use crate::services::user::user_response;
use chrono::{DateTime, Duration, Utc};
use helix_shared::types::{
    CreatePackageRequest, PackageResponse, UpdatePackageRequest, UserResponse,
};
use helix_shared::Role;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

impl From<PackageRecord> for PackageResponse {
    fn from(record: PackageRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            duration_days: record.duration_days,
            price: record.price,
            features: record.features,
            is_active: record.is_active,
        }
    }
}

/// Catalog installed on first start
pub fn default_packages() -> Vec<NewPackage> {
    vec![
        NewPackage {
            name: "Basic Start".to_string(),
            duration_days: 30,
            price: Decimal::new(2999, 2),
            features: vec!["AI Diet Plan".to_string(), "Weekly Progress".to_string()],
        },
        NewPackage {
            name: "Premium Health".to_string(),
            duration_days: 90,
            price: Decimal::new(7999, 2),
            features: vec![
                "AI Diet Plan".to_string(),
                "Daily Chat Support".to_string(),
                "Priority Doctor Review".to_string(),
            ],
        },
    ]
}

/// Trimmed, non-empty feature lines
fn clean_features(features: Vec<String>) -> Vec<String> {
    features
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

fn check_price(price: Decimal) -> Result<(), ApiError> {
    if price.is_sign_negative() {
        return Err(ApiError::Validation("Price must not be negative".to_string()));
    }
    Ok(())
}

pub struct PackageService;

impl PackageService {
    /// Public catalog: active packages by price, then name
    pub async fn list_active(store: &dyn Storage) -> Result<Vec<PackageResponse>, ApiError> {
        let packages = store.list_packages(true).await?;
        Ok(packages.into_iter().map(PackageResponse::from).collect())
    }

    pub async fn create(
        store: &dyn Storage,
        actor: &AuthUser,
        request: CreatePackageRequest,
    ) -> Result<PackageResponse, ApiError> {
        actor.require_role(Role::Admin)?;
        request.validate()?;
        check_price(request.price)?;

        let package = store
            .insert_package(NewPackage {
                name: request.name.trim().to_string(),
                duration_days: request.duration_days,
                price: request.price,
                features: clean_features(request.features),
            })
            .await?;

        info!(package_id = %package.id, name = %package.name, "Package created");
        Ok(package.into())
    }

    pub async fn update(
        store: &dyn Storage,
        actor: &AuthUser,
        id: Uuid,
        request: UpdatePackageRequest,
    ) -> Result<PackageResponse, ApiError> {
        actor.require_role(Role::Admin)?;
        request.validate()?;
        if let Some(price) = request.price {
            check_price(price)?;
        }

        let package = store
            .update_package(
                id,
                PackageUpdate {
                    name: request.name.map(|n| n.trim().to_string()),
                    duration_days: request.duration_days,
                    price: request.price,
                    features: request.features.map(clean_features),
                    is_active: request.is_active,
                },
            )
            .await?
            .ok_or(ApiError::PackageNotFound)?;

        info!(package_id = %id, "Package updated");
        Ok(package.into())
    }

    /// Soft delete; existing subscriptions keep their reference
    pub async fn delete(store: &dyn Storage, actor: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        actor.require_role(Role::Admin)?;

        if !store.deactivate_package(id).await? {
            return Err(ApiError::PackageNotFound);
        }

        info!(package_id = %id, "Package deactivated");
        Ok(())
    }

    pub async fn subscribe(
        store: &dyn Storage,
        user_id: Uuid,
        package_id: Uuid,
    ) -> Result<UserResponse, ApiError> {
        Self::subscribe_at(store, user_id, package_id, Utc::now()).await
    }

    /// Subscribe as of `now`; expiry is `now + duration_days`
    pub async fn subscribe_at(
        store: &dyn Storage,
        user_id: Uuid,
        package_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<UserResponse, ApiError> {
        let package = store
            .find_package(package_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(ApiError::PackageNotFound)?;

        let expires_at = now + Duration::days(i64::from(package.duration_days));
        let user = store
            .set_user_package(user_id, package.id, expires_at)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        info!(%user_id, package_id = %package.id, %expires_at, "Subscription started");
        Ok(user_response(user, Some(package)))
    }

    /// Install the default catalog when no package exists yet
    pub async fn seed_defaults(store: &dyn Storage) -> Result<usize, ApiError> {
        if store.count_packages().await? > 0 {
            return Ok(0);
        }

        let defaults = default_packages();
        let count = defaults.len();
        for package in defaults {
            store.insert_package(package).await?;
        }

        info!(count, "Seeded default packages");
        Ok(count)
    }
}
