//! Daily task repository

use super::{PgStore, TaskStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use helix_shared::{TaskStatus, TaskType};
use uuid::Uuid;

/// Daily task record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyTaskRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub request_id: Option<Uuid>,
    #[sqlx(rename = "task_date")]
    pub date: NaiveDate,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub task_type: TaskType,
    pub time_label: Option<String>,
    pub calories: Option<i32>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// A task about to be written by a plan publish
#[derive(Debug, Clone)]
pub struct NewDailyTask {
    pub client_id: Uuid,
    pub request_id: Option<Uuid>,
    pub date: NaiveDate,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub time: Option<String>,
    pub calories: Option<i32>,
}

const TASK_COLUMNS: &str = "id, client_id, request_id, task_date, title, description, \
     task_type, time_label, calories, status, created_at";

#[async_trait]
impl TaskStore for PgStore {
    async fn list_tasks(
        &self,
        client_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<DailyTaskRecord>> {
        let records = sqlx::query_as::<_, DailyTaskRecord>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM daily_tasks
            WHERE client_id = $1 AND ($2::date IS NULL OR task_date = $2)
            ORDER BY task_date, seq
            "#
        ))
        .bind(client_id)
        .bind(date)
        .fetch_all(self.pool())
        .await?;

        Ok(records)
    }

    async fn list_tasks_between(
        &self,
        client_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyTaskRecord>> {
        let records = sqlx::query_as::<_, DailyTaskRecord>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM daily_tasks
            WHERE client_id = $1 AND task_date BETWEEN $2 AND $3
            ORDER BY task_date, seq
            "#
        ))
        .bind(client_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        Ok(records)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<DailyTaskRecord>> {
        let record = sqlx::query_as::<_, DailyTaskRecord>(&format!(
            "SELECT {TASK_COLUMNS} FROM daily_tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(record)
    }

    async fn toggle_task_status(&self, id: Uuid) -> Result<Option<DailyTaskRecord>> {
        let record = sqlx::query_as::<_, DailyTaskRecord>(&format!(
            r#"
            UPDATE daily_tasks SET
                status = CASE status WHEN 'COMPLETED' THEN 'PENDING' ELSE 'COMPLETED' END
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(record)
    }
}
