//! Progress statistics over a rolling window

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::repositories::Storage;
use crate::services::task::resolve_client;
use chrono::{NaiveDate, Utc};
use helix_shared::errors::FieldError;
use helix_shared::progress::{daily_stats, window_bounds, ProgressStat};
use helix_shared::{Role, StatsRange};
use uuid::Uuid;

/// Missing means week; anything but `week`/`month` is a field error
pub fn parse_range(range: Option<&str>) -> Result<StatsRange, ApiError> {
    match range.map(str::trim) {
        None | Some("") => Ok(StatsRange::default()),
        Some(value) => value.parse().map_err(|_| {
            ApiError::InvalidFields(vec![FieldError::new(
                "range",
                "Range must be either week or month",
            )])
        }),
    }
}

pub struct ProgressService;

impl ProgressService {
    pub async fn get_stats(
        store: &dyn Storage,
        actor: &AuthUser,
        client_id: Uuid,
        range: Option<&str>,
    ) -> Result<Vec<ProgressStat>, ApiError> {
        Self::get_stats_at(store, actor, client_id, range, Utc::now().date_naive()).await
    }

    /// One entry per day ending at `today`, oldest first. A client always
    /// gets their own numbers whatever id they ask for.
    pub async fn get_stats_at(
        store: &dyn Storage,
        actor: &AuthUser,
        client_id: Uuid,
        range: Option<&str>,
        today: NaiveDate,
    ) -> Result<Vec<ProgressStat>, ApiError> {
        let range = parse_range(range)?;
        let requested = if actor.is(Role::Client) {
            None
        } else {
            Some(client_id)
        };
        let target = resolve_client(store, actor, requested)
            .await?
            .unwrap_or(client_id);

        let (start, end) = window_bounds(range, today);
        let tasks = store.list_tasks_between(target, start, end).await?;

        Ok(daily_stats(
            range,
            today,
            tasks.into_iter().map(|t| (t.date, t.status)),
        ))
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
    use helix_shared::{PlanStatus, TaskType};
    use rstest::rstest;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    #[rstest]
    #[case(None, StatsRange::Week)]
    #[case(Some(""), StatsRange::Week)]
    #[case(Some("week"), StatsRange::Week)]
    #[case(Some("month"), StatsRange::Month)]
    fn test_parse_range(#[case] raw: Option<&str>, #[case] expected: StatsRange) {
        assert_eq!(parse_range(raw).unwrap(), expected);
    }

    #[test]
    fn test_parse_range_rejects_unknown() {
        assert!(matches!(
            parse_range(Some("year")),
            Err(ApiError::InvalidFields(_))
        ));
    }

    #[tokio::test]
    async fn test_week_counts_completed_tasks() {
        let store = MemoryStore::new();
        let client = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Client,
        };
        let doctor = Uuid::new_v4();
        let request = store
            .insert_plan_request(NewPlanRequest {
                client_id: client.user_id,
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

        // three tasks on each of the last seven days
        let tasks = (0..7)
            .flat_map(|offset| {
                (0..3).map(move |n| NewDailyTask {
                    client_id: client.user_id,
                    request_id: Some(request.id),
                    date: today() - Duration::days(offset),
                    title: format!("Task {n}"),
                    description: String::new(),
                    task_type: TaskType::Meal,
                    time: None,
                    calories: None,
                })
            })
            .collect();
        store.publish_plan(request.id, tasks).await.unwrap().unwrap();

        let todays = store.list_tasks(client.user_id, Some(today())).await.unwrap();
        store.toggle_task_status(todays[0].id).await.unwrap();
        store.toggle_task_status(todays[1].id).await.unwrap();

        let stats = ProgressService::get_stats_at(&store, &client, Uuid::new_v4(), None, today())
            .await
            .unwrap();

        assert_eq!(stats.len(), 7);
        assert_eq!(stats[0].date, today() - Duration::days(6));
        assert!(stats.iter().all(|s| s.total == 3));
        let last = stats.last().unwrap();
        assert_eq!(last.completed, 2);
        assert_eq!(last.rate, 67);
        assert_eq!(last.display_date, "Wed 12");
        assert!(stats[..6].iter().all(|s| s.rate == 0));
    }
}
