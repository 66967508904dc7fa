//! Package catalog repository

use super::{PackageStore, PgStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Package record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PackageRecord {
    pub id: Uuid,
    pub name: String,
    pub duration_days: i32,
    pub price: Decimal,
    pub features: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a package
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub name: String,
    pub duration_days: i32,
    pub price: Decimal,
    pub features: Vec<String>,
}

/// Partial package update
#[derive(Debug, Clone, Default)]
pub struct PackageUpdate {
    pub name: Option<String>,
    pub duration_days: Option<i32>,
    pub price: Option<Decimal>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

const PACKAGE_COLUMNS: &str =
    "id, name, duration_days, price, features, is_active, created_at, updated_at";

#[async_trait]
impl PackageStore for PgStore {
    async fn insert_package(&self, package: NewPackage) -> Result<PackageRecord> {
        let record = sqlx::query_as::<_, PackageRecord>(&format!(
            r#"
            INSERT INTO packages (name, duration_days, price, features)
            VALUES ($1, $2, $3, $4)
            RETURNING {PACKAGE_COLUMNS}
            "#
        ))
        .bind(&package.name)
        .bind(package.duration_days)
        .bind(package.price)
        .bind(&package.features)
        .fetch_one(self.pool())
        .await?;

        Ok(record)
    }

    async fn find_package(&self, id: Uuid) -> Result<Option<PackageRecord>> {
        let record = sqlx::query_as::<_, PackageRecord>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(record)
    }

    async fn list_packages(&self, active_only: bool) -> Result<Vec<PackageRecord>> {
        let records = sqlx::query_as::<_, PackageRecord>(&format!(
            r#"
            SELECT {PACKAGE_COLUMNS}
            FROM packages
            WHERE is_active OR NOT $1
            ORDER BY price, name
            "#
        ))
        .bind(active_only)
        .fetch_all(self.pool())
        .await?;

        Ok(records)
    }

    async fn update_package(
        &self,
        id: Uuid,
        update: PackageUpdate,
    ) -> Result<Option<PackageRecord>> {
        let record = sqlx::query_as::<_, PackageRecord>(&format!(
            r#"
            UPDATE packages SET
                name = COALESCE($2, name),
                duration_days = COALESCE($3, duration_days),
                price = COALESCE($4, price),
                features = COALESCE($5, features),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PACKAGE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.duration_days)
        .bind(update.price)
        .bind(update.features)
        .bind(update.is_active)
        .fetch_optional(self.pool())
        .await?;

        Ok(record)
    }

    async fn deactivate_package(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE packages SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_packages(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM packages")
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }
}
