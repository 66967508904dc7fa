//! In-process storage
//!
//! Backs the `memory://` database URL and the integration tests. All state
//! sits behind one mutex, so every trait method is atomic with respect to
//! the others.

use super::{
    CareLink, ChatMessageRecord, ChatStore, DailyTaskRecord, NewChatMessage, NewDailyTask,
    NewPackage, NewPlanRequest, NewUser, PackageRecord, PackageStore, PackageUpdate,
    PlanRequestRecord, PlanRequestStore, RequestScope, Storage, TaskStore, UserRecord,
    UserStore, UserUpdate,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use helix_shared::types::DraftTask;
use helix_shared::{PlanStatus, TaskStatus};
use sqlx::types::Json;
use std::collections::HashSet;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: Vec<UserRecord>,
    packages: Vec<PackageRecord>,
    requests: Vec<PlanRequestRecord>,
    tasks: Vec<DailyTaskRecord>,
    messages: Vec<ChatMessageRecord>,
    #[cfg(any(test, feature = "test-util"))]
    fail_next_publish: bool,
}

impl Inner {
    fn doctor_name(&self, doctor_id: Option<Uuid>) -> Option<String> {
        let id = doctor_id?;
        self.users.iter().find(|u| u.id == id).map(|u| u.name.clone())
    }

    /// Requests carry the doctor's current name, as the SQL join does
    fn joined(&self, record: &PlanRequestRecord) -> PlanRequestRecord {
        PlanRequestRecord {
            doctor_name: self.doctor_name(record.doctor_id),
            ..record.clone()
        }
    }

    fn request_mut(&mut self, id: Uuid) -> Option<&mut PlanRequestRecord> {
        self.requests.iter_mut().find(|r| r.id == id)
    }

    #[cfg(any(test, feature = "test-util"))]
    fn take_injected_failure(&mut self) -> bool {
        std::mem::take(&mut self.fail_next_publish)
    }

    #[cfg(not(any(test, feature = "test-util")))]
    fn take_injected_failure(&mut self) -> bool {
        false
    }
}

/// Storage held entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `publish_plan` fail after staging its tasks
    ///
    /// Test-only failure injection; absent unless built with `test-util`.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn fail_next_publish(&self) {
        self.inner.lock().await.fail_next_publish = true;
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<Option<UserRecord>> {
        let mut inner = self.inner.lock().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Ok(None);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            avatar: user.avatar,
            active_package_id: None,
            package_end_date: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(record.clone());
        Ok(Some(record))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let inner = self.inner.lock().await;
        let mut users = inner.users.clone();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<UserRecord>> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(package_id) = update.active_package_id {
            user.active_package_id = Some(package_id);
        }
        if let Some(end) = update.package_end_date {
            user.package_end_date = Some(end);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_user_package(
        &self,
        id: Uuid,
        package_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<UserRecord>> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        user.active_package_id = Some(package_id);
        user.package_end_date = Some(expires_at);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl PackageStore for MemoryStore {
    async fn insert_package(&self, package: NewPackage) -> Result<PackageRecord> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let record = PackageRecord {
            id: Uuid::new_v4(),
            name: package.name,
            duration_days: package.duration_days,
            price: package.price,
            features: package.features,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.packages.push(record.clone());
        Ok(record)
    }

    async fn find_package(&self, id: Uuid) -> Result<Option<PackageRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.packages.iter().find(|p| p.id == id).cloned())
    }

    async fn list_packages(&self, active_only: bool) -> Result<Vec<PackageRecord>> {
        let inner = self.inner.lock().await;
        let mut packages: Vec<_> = inner
            .packages
            .iter()
            .filter(|p| p.is_active || !active_only)
            .cloned()
            .collect();
        packages.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
        Ok(packages)
    }

    async fn update_package(
        &self,
        id: Uuid,
        update: PackageUpdate,
    ) -> Result<Option<PackageRecord>> {
        let mut inner = self.inner.lock().await;
        let Some(package) = inner.packages.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            package.name = name;
        }
        if let Some(days) = update.duration_days {
            package.duration_days = days;
        }
        if let Some(price) = update.price {
            package.price = price;
        }
        if let Some(features) = update.features {
            package.features = features;
        }
        if let Some(active) = update.is_active {
            package.is_active = active;
        }
        package.updated_at = Utc::now();
        Ok(Some(package.clone()))
    }

    async fn deactivate_package(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner.packages.iter_mut().find(|p| p.id == id) {
            Some(package) => {
                package.is_active = false;
                package.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_packages(&self) -> Result<i64> {
        let inner = self.inner.lock().await;
        Ok(inner.packages.len() as i64)
    }
}

#[async_trait]
impl PlanRequestStore for MemoryStore {
    async fn insert_plan_request(
        &self,
        request: NewPlanRequest,
    ) -> Result<Option<PlanRequestRecord>> {
        let mut inner = self.inner.lock().await;
        if inner
            .requests
            .iter()
            .any(|r| r.client_id == request.client_id && r.status.is_open())
        {
            return Ok(None);
        }

        let now = Utc::now();
        let intake = request.intake;
        let record = PlanRequestRecord {
            id: Uuid::new_v4(),
            client_id: request.client_id,
            client_name: request.client_name,
            doctor_id: None,
            doctor_name: None,
            status: PlanStatus::Requested,
            goals: intake.goals,
            current_weight: intake.current_weight,
            target_weight: intake.target_weight,
            height: intake.height,
            age: intake.age,
            gender: intake.gender,
            activity_level: intake.activity_level,
            allergies: intake.allergies,
            preferred_meals: intake.preferred_meals,
            draft_tasks: Json(Vec::new()),
            created_at: now,
            updated_at: now,
        };
        inner.requests.push(record.clone());
        Ok(Some(record))
    }

    async fn find_plan_request(&self, id: Uuid) -> Result<Option<PlanRequestRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .requests
            .iter()
            .find(|r| r.id == id)
            .map(|r| inner.joined(r)))
    }

    async fn list_plan_requests(&self, scope: RequestScope) -> Result<Vec<PlanRequestRecord>> {
        let inner = self.inner.lock().await;
        // insertion order is creation order
        Ok(inner
            .requests
            .iter()
            .rev()
            .filter(|r| match scope {
                RequestScope::All => true,
                RequestScope::Client(id) => r.client_id == id,
                RequestScope::Doctor(id) => r.doctor_id == Some(id),
            })
            .map(|r| inner.joined(r))
            .collect())
    }

    async fn find_open_request(&self, client_id: Uuid) -> Result<Option<PlanRequestRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .requests
            .iter()
            .rev()
            .find(|r| r.client_id == client_id && r.status.is_open())
            .map(|r| inner.joined(r)))
    }

    async fn assign_doctor(
        &self,
        id: Uuid,
        doctor_id: Uuid,
        from: &[PlanStatus],
    ) -> Result<Option<PlanRequestRecord>> {
        let mut inner = self.inner.lock().await;
        let Some(request) = inner.request_mut(id) else {
            return Ok(None);
        };
        if !from.contains(&request.status) {
            return Ok(None);
        }

        request.doctor_id = Some(doctor_id);
        request.status = PlanStatus::Processing;
        request.updated_at = Utc::now();
        let request = request.clone();
        Ok(Some(inner.joined(&request)))
    }

    async fn save_draft(
        &self,
        id: Uuid,
        doctor_id: Uuid,
        tasks: Vec<DraftTask>,
    ) -> Result<Option<PlanRequestRecord>> {
        let mut inner = self.inner.lock().await;
        let Some(request) = inner.request_mut(id) else {
            return Ok(None);
        };
        if request.doctor_id != Some(doctor_id) || request.status != PlanStatus::Processing {
            return Ok(None);
        }

        request.draft_tasks = Json(tasks);
        request.status = PlanStatus::PendingApproval;
        request.updated_at = Utc::now();
        let request = request.clone();
        Ok(Some(inner.joined(&request)))
    }

    async fn publish_plan(
        &self,
        id: Uuid,
        tasks: Vec<NewDailyTask>,
    ) -> Result<Option<PlanRequestRecord>> {
        let mut inner = self.inner.lock().await;
        match inner.requests.iter().find(|r| r.id == id) {
            Some(r) if r.status == PlanStatus::PendingApproval => {}
            _ => return Ok(None),
        }

        let now = Utc::now();
        let staged: Vec<DailyTaskRecord> = tasks
            .into_iter()
            .map(|task| DailyTaskRecord {
                id: Uuid::new_v4(),
                client_id: task.client_id,
                request_id: task.request_id,
                date: task.date,
                title: task.title,
                description: task.description,
                task_type: task.task_type,
                time_label: task.time,
                calories: task.calories,
                status: TaskStatus::Pending,
                created_at: now,
            })
            .collect();

        if inner.take_injected_failure() {
            anyhow::bail!("simulated storage failure while publishing plan {id}");
        }

        inner.tasks.extend(staged);
        let Some(request) = inner.request_mut(id) else {
            return Ok(None);
        };
        request.status = PlanStatus::Active;
        request.draft_tasks = Json(Vec::new());
        request.updated_at = now;
        let request = request.clone();
        Ok(Some(inner.joined(&request)))
    }

    async fn care_links_for(&self, user_id: Uuid) -> Result<Vec<CareLink>> {
        let inner = self.inner.lock().await;
        let links: HashSet<CareLink> = inner
            .requests
            .iter()
            .filter_map(|r| {
                r.doctor_id.map(|doctor_id| CareLink {
                    client_id: r.client_id,
                    doctor_id,
                })
            })
            .filter(|link| link.client_id == user_id || link.doctor_id == user_id)
            .collect();
        Ok(links.into_iter().collect())
    }
}

fn sort_tasks(tasks: &mut [DailyTaskRecord]) {
    // stable: a day keeps the order the plan was published in
    tasks.sort_by_key(|task| task.date);
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(
        &self,
        client_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<DailyTaskRecord>> {
        let inner = self.inner.lock().await;
        let mut tasks: Vec<_> = inner
            .tasks
            .iter()
            .filter(|t| t.client_id == client_id && date.map_or(true, |d| t.date == d))
            .cloned()
            .collect();
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    async fn list_tasks_between(
        &self,
        client_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyTaskRecord>> {
        let inner = self.inner.lock().await;
        let mut tasks: Vec<_> = inner
            .tasks
            .iter()
            .filter(|t| t.client_id == client_id && t.date >= start && t.date <= end)
            .cloned()
            .collect();
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<DailyTaskRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn toggle_task_status(&self, id: Uuid) -> Result<Option<DailyTaskRecord>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.tasks.iter_mut().find(|t| t.id == id).map(|task| {
            task.status = task.status.toggled();
            task.clone()
        }))
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn insert_message(&self, message: NewChatMessage) -> Result<ChatMessageRecord> {
        let mut inner = self.inner.lock().await;
        let record = ChatMessageRecord {
            id: Uuid::new_v4(),
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            text: message.text,
            timestamp: message.timestamp,
            read: false,
        };
        inner.messages.push(record.clone());
        Ok(record)
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<ChatMessageRecord>> {
        let inner = self.inner.lock().await;
        let mut messages: Vec<_> = inner
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.receiver_id == b)
                    || (m.sender_id == b && m.receiver_id == a)
            })
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
