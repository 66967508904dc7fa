//! Plan request repository
//!
//! Every read joins the assigned doctor's display name. Status-changing
//! writes are conditional on the current status so that two racing admins
//! cannot both move a request along the same edge.

use super::{NewDailyTask, PgStore, PlanRequestStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use helix_shared::types::{DraftTask, IntakeForm};
use helix_shared::PlanStatus;
use sqlx::types::Json;
use uuid::Uuid;

/// Plan request record, joined with the doctor's name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlanRequestRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub doctor_id: Option<Uuid>,
    pub doctor_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: PlanStatus,
    pub goals: String,
    pub current_weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub height: Option<f64>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    pub allergies: Option<String>,
    pub preferred_meals: Option<String>,
    pub draft_tasks: Json<Vec<DraftTask>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanRequestRecord {
    /// The intake snapshot taken at submission
    pub fn intake(&self) -> IntakeForm {
        IntakeForm {
            goals: self.goals.clone(),
            current_weight: self.current_weight,
            target_weight: self.target_weight,
            height: self.height,
            age: self.age,
            gender: self.gender.clone(),
            activity_level: self.activity_level.clone(),
            allergies: self.allergies.clone(),
            preferred_meals: self.preferred_meals.clone(),
        }
    }

    pub fn draft(&self) -> &[DraftTask] {
        &self.draft_tasks.0
    }
}

/// Input for creating a plan request
#[derive(Debug, Clone)]
pub struct NewPlanRequest {
    pub client_id: Uuid,
    pub client_name: String,
    pub intake: IntakeForm,
}

/// Which requests a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScope {
    All,
    Client(Uuid),
    Doctor(Uuid),
}

/// A doctor assigned to a client through some request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::FromRow)]
pub struct CareLink {
    pub client_id: Uuid,
    pub doctor_id: Uuid,
}

/// `SELECT` list over a source aliased `r`
fn select_from(source: &str) -> String {
    format!(
        r#"
        SELECT r.id, r.client_id, r.client_name, r.doctor_id, d.name AS doctor_name,
               r.status, r.goals, r.current_weight, r.target_weight, r.height, r.age,
               r.gender, r.activity_level, r.allergies, r.preferred_meals,
               r.draft_tasks, r.created_at, r.updated_at
        FROM {source} r
        LEFT JOIN users d ON d.id = r.doctor_id
        "#
    )
}

#[async_trait]
impl PlanRequestStore for PgStore {
    async fn insert_plan_request(
        &self,
        request: NewPlanRequest,
    ) -> Result<Option<PlanRequestRecord>> {
        let intake = request.intake;
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO plan_requests (
                    client_id, client_name, status, goals, current_weight, target_weight,
                    height, age, gender, activity_level, allergies, preferred_meals
                )
                VALUES ($1, $2, 'REQUESTED', $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT (client_id) WHERE status <> 'ACTIVE' DO NOTHING
                RETURNING *
            )
            {}
            "#,
            select_from("inserted")
        );

        let record = sqlx::query_as::<_, PlanRequestRecord>(&sql)
            .bind(request.client_id)
            .bind(&request.client_name)
            .bind(&intake.goals)
            .bind(intake.current_weight)
            .bind(intake.target_weight)
            .bind(intake.height)
            .bind(intake.age)
            .bind(&intake.gender)
            .bind(&intake.activity_level)
            .bind(&intake.allergies)
            .bind(&intake.preferred_meals)
            .fetch_optional(self.pool())
            .await?;

        Ok(record)
    }

    async fn find_plan_request(&self, id: Uuid) -> Result<Option<PlanRequestRecord>> {
        let sql = format!("{} WHERE r.id = $1", select_from("plan_requests"));
        let record = sqlx::query_as::<_, PlanRequestRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(record)
    }

    async fn list_plan_requests(&self, scope: RequestScope) -> Result<Vec<PlanRequestRecord>> {
        let (client, doctor) = match scope {
            RequestScope::All => (None, None),
            RequestScope::Client(id) => (Some(id), None),
            RequestScope::Doctor(id) => (None, Some(id)),
        };

        let sql = format!(
            r#"
            {}
            WHERE ($1::uuid IS NULL OR r.client_id = $1)
              AND ($2::uuid IS NULL OR r.doctor_id = $2)
            ORDER BY r.created_at DESC
            "#,
            select_from("plan_requests")
        );
        let records = sqlx::query_as::<_, PlanRequestRecord>(&sql)
            .bind(client)
            .bind(doctor)
            .fetch_all(self.pool())
            .await?;

        Ok(records)
    }

    async fn find_open_request(&self, client_id: Uuid) -> Result<Option<PlanRequestRecord>> {
        let sql = format!(
            r#"
            {}
            WHERE r.client_id = $1 AND r.status <> 'ACTIVE'
            ORDER BY r.created_at DESC
            LIMIT 1
            "#,
            select_from("plan_requests")
        );
        let record = sqlx::query_as::<_, PlanRequestRecord>(&sql)
            .bind(client_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(record)
    }

    async fn assign_doctor(
        &self,
        id: Uuid,
        doctor_id: Uuid,
        from: &[PlanStatus],
    ) -> Result<Option<PlanRequestRecord>> {
        let from: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE plan_requests SET
                    doctor_id = $2,
                    status = 'PROCESSING',
                    updated_at = NOW()
                WHERE id = $1 AND status = ANY($3)
                RETURNING *
            )
            {}
            "#,
            select_from("updated")
        );

        let record = sqlx::query_as::<_, PlanRequestRecord>(&sql)
            .bind(id)
            .bind(doctor_id)
            .bind(&from)
            .fetch_optional(self.pool())
            .await?;

        Ok(record)
    }

    async fn save_draft(
        &self,
        id: Uuid,
        doctor_id: Uuid,
        tasks: Vec<DraftTask>,
    ) -> Result<Option<PlanRequestRecord>> {
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE plan_requests SET
                    draft_tasks = $3,
                    status = 'PENDING_APPROVAL',
                    updated_at = NOW()
                WHERE id = $1 AND doctor_id = $2 AND status = 'PROCESSING'
                RETURNING *
            )
            {}
            "#,
            select_from("updated")
        );

        let record = sqlx::query_as::<_, PlanRequestRecord>(&sql)
            .bind(id)
            .bind(doctor_id)
            .bind(Json(tasks))
            .fetch_optional(self.pool())
            .await?;

        Ok(record)
    }

    async fn publish_plan(
        &self,
        id: Uuid,
        tasks: Vec<NewDailyTask>,
    ) -> Result<Option<PlanRequestRecord>> {
        let mut tx = self.pool().begin().await?;

        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM plan_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if status.as_deref() != Some(PlanStatus::PendingApproval.as_str()) {
            tx.rollback().await?;
            return Ok(None);
        }

        let mut client_ids: Vec<Uuid> = Vec::with_capacity(tasks.len());
        let mut request_ids: Vec<Option<Uuid>> = Vec::with_capacity(tasks.len());
        let mut dates: Vec<NaiveDate> = Vec::with_capacity(tasks.len());
        let mut titles: Vec<String> = Vec::with_capacity(tasks.len());
        let mut descriptions: Vec<String> = Vec::with_capacity(tasks.len());
        let mut types: Vec<&'static str> = Vec::with_capacity(tasks.len());
        let mut times: Vec<Option<String>> = Vec::with_capacity(tasks.len());
        let mut calories: Vec<Option<i32>> = Vec::with_capacity(tasks.len());
        for task in tasks {
            client_ids.push(task.client_id);
            request_ids.push(task.request_id);
            dates.push(task.date);
            titles.push(task.title);
            descriptions.push(task.description);
            types.push(task.task_type.as_str());
            times.push(task.time);
            calories.push(task.calories);
        }

        sqlx::query(
            r#"
            INSERT INTO daily_tasks (
                client_id, request_id, task_date, title, description,
                task_type, time_label, calories, status
            )
            SELECT u.client_id, u.request_id, u.task_date, u.title, u.description,
                   u.task_type, u.time_label, u.calories, 'PENDING'
            FROM UNNEST(
                $1::uuid[], $2::uuid[], $3::date[], $4::text[],
                $5::text[], $6::text[], $7::text[], $8::int4[]
            ) WITH ORDINALITY AS u(client_id, request_id, task_date, title, description,
                   task_type, time_label, calories, ord)
            ORDER BY u.ord
            "#,
        )
        .bind(&client_ids)
        .bind(&request_ids)
        .bind(&dates)
        .bind(&titles)
        .bind(&descriptions)
        .bind(&types)
        .bind(&times)
        .bind(&calories)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE plan_requests SET
                status = 'ACTIVE',
                draft_tasks = '[]'::jsonb,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_plan_request(id).await
    }

    async fn care_links_for(&self, user_id: Uuid) -> Result<Vec<CareLink>> {
        let links = sqlx::query_as::<_, CareLink>(
            r#"
            SELECT DISTINCT client_id, doctor_id
            FROM plan_requests
            WHERE doctor_id IS NOT NULL
              AND (client_id = $1 OR doctor_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(links)
    }
}
