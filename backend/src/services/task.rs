//! Daily task tracker
//!
//! Clients tick off their own tasks for the current day only. Doctors see
//! the tasks of clients assigned to them; admins see everyone's.

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::metrics as names;
use crate::repositories::{DailyTaskRecord, Storage};
use chrono::{NaiveDate, Utc};
use helix_shared::types::{DailyTaskResponse, TaskQuery};
use helix_shared::Role;
use tracing::info;
use uuid::Uuid;

impl From<DailyTaskRecord> for DailyTaskResponse {
    fn from(record: DailyTaskRecord) -> Self {
        Self {
            id: record.id,
            client_id: record.client_id,
            date: record.date,
            title: record.title,
            description: record.description,
            task_type: record.task_type,
            time: record.time_label,
            calories: record.calories,
            status: record.status,
            request_id: record.request_id,
        }
    }
}

/// Whose tasks the actor is asking about.
///
/// Clients always resolve to themselves and may not name anyone else.
/// Doctors need a care link to the named client. `Ok(None)` means a
/// doctor or admin named no client.
pub async fn resolve_client(
    store: &dyn Storage,
    actor: &AuthUser,
    client_id: Option<Uuid>,
) -> Result<Option<Uuid>, ApiError> {
    match actor.role {
        Role::Client => match client_id {
            Some(id) if id != actor.user_id => Err(ApiError::Forbidden(
                "Clients can only access their own tasks".to_string(),
            )),
            _ => Ok(Some(actor.user_id)),
        },
        Role::Doctor => {
            let Some(id) = client_id else {
                return Ok(None);
            };
            let assigned = store
                .care_links_for(actor.user_id)
                .await?
                .iter()
                .any(|link| link.doctor_id == actor.user_id && link.client_id == id);
            if assigned {
                Ok(Some(id))
            } else {
                Err(ApiError::Forbidden(
                    "This client is not assigned to you".to_string(),
                ))
            }
        }
        Role::Admin => Ok(client_id),
    }
}

pub struct TaskService;

impl TaskService {
    pub async fn list_tasks(
        store: &dyn Storage,
        actor: &AuthUser,
        query: TaskQuery,
    ) -> Result<Vec<DailyTaskResponse>, ApiError> {
        let Some(client_id) = resolve_client(store, actor, query.client_id).await? else {
            return Ok(Vec::new());
        };

        let tasks = store.list_tasks(client_id, query.date).await?;
        Ok(tasks.into_iter().map(DailyTaskResponse::from).collect())
    }

    pub async fn toggle(
        store: &dyn Storage,
        actor: &AuthUser,
        task_id: Uuid,
    ) -> Result<DailyTaskResponse, ApiError> {
        Self::toggle_at(store, actor, task_id, Utc::now().date_naive()).await
    }

    /// Flip a task's completion; only the owner, only on `today`
    pub async fn toggle_at(
        store: &dyn Storage,
        actor: &AuthUser,
        task_id: Uuid,
        today: NaiveDate,
    ) -> Result<DailyTaskResponse, ApiError> {
        let task = store
            .find_task(task_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

        if task.client_id != actor.user_id {
            return Err(ApiError::Forbidden(
                "Only the client can update their tasks".to_string(),
            ));
        }
        if task.date != today {
            return Err(ApiError::ImmutableHistoricalTask);
        }

        let updated = store
            .toggle_task_status(task_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

        metrics::counter!(names::TASK_TOGGLES).increment(1);
        info!(%task_id, client_id = %actor.user_id, status = %updated.status, "Task toggled");
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{
        MemoryStore, NewDailyTask, NewPlanRequest, PlanRequestStore, TaskStore,
    };
    use chrono::Duration;
    use helix_shared::types::IntakeForm;
    use helix_shared::{PlanStatus, TaskStatus, TaskType};

    fn actor(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    /// Publishes one task per date for `client`, linked to `doctor`
    async fn seed(store: &MemoryStore, client: Uuid, doctor: Uuid, dates: &[NaiveDate]) {
        let request = store
            .insert_plan_request(NewPlanRequest {
                client_id: client,
                client_name: "Alice".to_string(),
                intake: IntakeForm {
                    goals: "Fit".to_string(),
                    ..Default::default()
                },
            })
            .await
            .unwrap()
            .unwrap();
        store
            .assign_doctor(request.id, doctor, &[PlanStatus::Requested])
            .await
            .unwrap();
        store.save_draft(request.id, doctor, Vec::new()).await.unwrap();
        let tasks = dates
            .iter()
            .map(|date| NewDailyTask {
                client_id: client,
                request_id: Some(request.id),
                date: *date,
                title: "Walk".to_string(),
                description: String::new(),
                task_type: TaskType::Activity,
                time: Some("07:00 AM".to_string()),
                calories: None,
            })
            .collect();
        store.publish_plan(request.id, tasks).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_status() {
        let store = MemoryStore::new();
        let client = actor(Role::Client);
        seed(&store, client.user_id, Uuid::new_v4(), &[today()]).await;
        let task = TaskService::list_tasks(&store, &client, TaskQuery::default())
            .await
            .unwrap()
            .remove(0);

        let once = TaskService::toggle_at(&store, &client, task.id, today()).await.unwrap();
        assert_eq!(once.status, TaskStatus::Completed);
        let twice = TaskService::toggle_at(&store, &client, task.id, today()).await.unwrap();
        assert_eq!(twice.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_toggle_check_order() {
        let store = MemoryStore::new();
        let client = actor(Role::Client);
        let yesterday = today() - Duration::days(1);
        seed(&store, client.user_id, Uuid::new_v4(), &[yesterday]).await;
        let task = TaskService::list_tasks(&store, &client, TaskQuery::default())
            .await
            .unwrap()
            .remove(0);

        let err = TaskService::toggle_at(&store, &client, Uuid::new_v4(), today())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = TaskService::toggle_at(&store, &actor(Role::Client), task.id, yesterday)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = TaskService::toggle_at(&store, &client, task.id, today())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ImmutableHistoricalTask));

        let unchanged = store.find_task(task.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_listing_access_by_role() {
        let store = MemoryStore::new();
        let client = actor(Role::Client);
        let doctor = actor(Role::Doctor);
        seed(&store, client.user_id, doctor.user_id, &[today()]).await;

        let query = |client_id: Option<Uuid>| TaskQuery {
            client_id,
            date: None,
        };

        let err = TaskService::list_tasks(&store, &client, query(Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let own = TaskService::list_tasks(&store, &doctor, query(Some(client.user_id)))
            .await
            .unwrap();
        assert_eq!(own.len(), 1);

        let err = TaskService::list_tasks(&store, &actor(Role::Doctor), query(Some(client.user_id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let admin = actor(Role::Admin);
        assert_eq!(
            TaskService::list_tasks(&store, &admin, query(Some(client.user_id)))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(TaskService::list_tasks(&store, &admin, query(None))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_date_filter() {
        let store = MemoryStore::new();
        let client = actor(Role::Client);
        let dates = [today() - Duration::days(1), today(), today() + Duration::days(1)];
        seed(&store, client.user_id, Uuid::new_v4(), &dates).await;

        let tasks = TaskService::list_tasks(
            &store,
            &client,
            TaskQuery {
                client_id: None,
                date: Some(today()),
            },
        )
        .await
        .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].date, today());
    }
}
