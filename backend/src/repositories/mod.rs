//! Storage port
//!
//! One async trait per entity, combined into [`Storage`]. Services only see
//! `&dyn Storage`; [`PgStore`] backs it with PostgreSQL and [`MemoryStore`]
//! with in-process maps (tests and `memory://` demo mode).
//!
//! Adapters return `anyhow::Result`; `Ok(None)` from a conditional write
//! means the row did not match the expected state.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use helix_shared::types::DraftTask;
use helix_shared::PlanStatus;
use sqlx::PgPool;
use uuid::Uuid;

pub mod chat;
pub mod memory;
pub mod package;
pub mod plan_request;
pub mod task;
pub mod user;

pub use chat::{ChatMessageRecord, NewChatMessage};
pub use memory::MemoryStore;
pub use package::{NewPackage, PackageRecord, PackageUpdate};
pub use plan_request::{CareLink, NewPlanRequest, PlanRequestRecord, RequestScope};
pub use task::{DailyTaskRecord, NewDailyTask};
pub use user::{NewUser, UserRecord, UserUpdate};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `None` when the email is already taken
    async fn insert_user(&self, user: NewUser) -> Result<Option<UserRecord>>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    async fn list_users(&self) -> Result<Vec<UserRecord>>;
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<UserRecord>>;
    /// Writes package and expiry together
    async fn set_user_package(
        &self,
        id: Uuid,
        package_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<UserRecord>>;
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn insert_package(&self, package: NewPackage) -> Result<PackageRecord>;
    async fn find_package(&self, id: Uuid) -> Result<Option<PackageRecord>>;
    async fn list_packages(&self, active_only: bool) -> Result<Vec<PackageRecord>>;
    async fn update_package(&self, id: Uuid, update: PackageUpdate)
        -> Result<Option<PackageRecord>>;
    /// Soft delete; `false` when the package does not exist
    async fn deactivate_package(&self, id: Uuid) -> Result<bool>;
    async fn count_packages(&self) -> Result<i64>;
}

#[async_trait]
pub trait PlanRequestStore: Send + Sync {
    /// `None` when the client already holds an open request
    async fn insert_plan_request(&self, request: NewPlanRequest)
        -> Result<Option<PlanRequestRecord>>;
    async fn find_plan_request(&self, id: Uuid) -> Result<Option<PlanRequestRecord>>;
    /// Newest first
    async fn list_plan_requests(&self, scope: RequestScope) -> Result<Vec<PlanRequestRecord>>;
    async fn find_open_request(&self, client_id: Uuid) -> Result<Option<PlanRequestRecord>>;
    /// Sets the doctor and moves to PROCESSING when the status is one of `from`
    async fn assign_doctor(
        &self,
        id: Uuid,
        doctor_id: Uuid,
        from: &[PlanStatus],
    ) -> Result<Option<PlanRequestRecord>>;
    /// Stores the draft and moves PROCESSING -> PENDING_APPROVAL for the assigned doctor
    async fn save_draft(
        &self,
        id: Uuid,
        doctor_id: Uuid,
        tasks: Vec<DraftTask>,
    ) -> Result<Option<PlanRequestRecord>>;
    /// Inserts every task, marks the request ACTIVE and clears its draft as
    /// one unit. Nothing is written on error or when the request has left
    /// PENDING_APPROVAL.
    async fn publish_plan(
        &self,
        id: Uuid,
        tasks: Vec<NewDailyTask>,
    ) -> Result<Option<PlanRequestRecord>>;
    /// Doctor/client pairs the user takes part in
    async fn care_links_for(&self, user_id: Uuid) -> Result<Vec<CareLink>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Ordered by date, then publish order within a day
    async fn list_tasks(&self, client_id: Uuid, date: Option<NaiveDate>)
        -> Result<Vec<DailyTaskRecord>>;
    async fn list_tasks_between(
        &self,
        client_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyTaskRecord>>;
    async fn find_task(&self, id: Uuid) -> Result<Option<DailyTaskRecord>>;
    /// Flip PENDING <-> COMPLETED in a single write
    async fn toggle_task_status(&self, id: Uuid) -> Result<Option<DailyTaskRecord>>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn insert_message(&self, message: NewChatMessage) -> Result<ChatMessageRecord>;
    /// Both directions between the pair, oldest first
    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<ChatMessageRecord>>;
}

/// Everything the services need from persistence
#[async_trait]
pub trait Storage: UserStore + PackageStore + PlanRequestStore + TaskStore + ChatStore {
    async fn health_check(&self) -> Result<()>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Storage for PgStore {
    async fn health_check(&self) -> Result<()> {
        crate::db::health_check(&self.pool).await
    }
}
