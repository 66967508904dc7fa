//! User repository for database operations

use super::{PgStore, UserStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helix_shared::Role;
use uuid::Uuid;

/// User record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub avatar: Option<String>,
    pub active_package_id: Option<Uuid>,
    pub package_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub avatar: Option<String>,
}

/// Admin-driven changes; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub role: Option<Role>,
    pub active_package_id: Option<Uuid>,
    pub package_end_date: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str = "id, email, password_hash, name, role, avatar, \
     active_package_id, package_end_date, created_at, updated_at";

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, role, avatar)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.avatar)
        .fetch_optional(self.pool())
        .await?;

        Ok(record)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        Ok(record)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY name, email"
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(records)
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users SET
                role = COALESCE($2, role),
                active_package_id = COALESCE($3, active_package_id),
                package_end_date = COALESCE($4, package_end_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.active_package_id)
        .bind(update.package_end_date)
        .fetch_optional(self.pool())
        .await?;

        Ok(record)
    }

    async fn set_user_package(
        &self,
        id: Uuid,
        package_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users SET
                active_package_id = $2,
                package_end_date = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(package_id)
        .bind(expires_at)
        .fetch_optional(self.pool())
        .await?;

        Ok(record)
    }
}
