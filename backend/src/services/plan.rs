//! Plan request workflow
//!
//! ```text
//! client submits       -> REQUESTED
//! admin assigns doctor -> PROCESSING        (also PROCESSING -> PROCESSING)
//! doctor saves draft   -> PENDING_APPROVAL
//! admin publishes      -> ACTIVE            (draft becomes daily tasks)
//! ```
//!
//! Every operation checks the caller's role and ownership before touching
//! storage. The storage writes are conditional on the expected status, so
//! a request that moved underneath us surfaces as `InvalidTransition`.

use crate::ai::{DateRange, PlanGenerator};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::metrics as names;
use crate::policy::{filter_visible, Visible};
use crate::repositories::{
    NewDailyTask, NewPlanRequest, PlanRequestRecord, RequestScope, Storage,
};
use chrono::{DateTime, Utc};
use helix_shared::errors::FieldError;
use helix_shared::types::{
    DraftTask, GeneratePlanRequest, GenerationOutcome, IntakeForm, PlanRequestResponse,
    PublishResponse,
};
use helix_shared::validation::validate_draft_tasks;
use helix_shared::{PlanStatus, Role};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

impl From<PlanRequestRecord> for PlanRequestResponse {
    fn from(record: PlanRequestRecord) -> Self {
        let intake = record.intake();
        Self {
            id: record.id,
            client_id: record.client_id,
            client_name: record.client_name,
            doctor_id: record.doctor_id,
            doctor_name: record.doctor_name,
            status: record.status,
            request_date: record.created_at,
            intake,
            draft_tasks: record.draft_tasks.0,
        }
    }
}

/// Trim free-text intake fields and drop the empty ones
fn clean_intake(intake: IntakeForm) -> IntakeForm {
    let clean = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    IntakeForm {
        goals: intake.goals.trim().to_string(),
        gender: clean(intake.gender),
        activity_level: clean(intake.activity_level),
        allergies: clean(intake.allergies),
        preferred_meals: clean(intake.preferred_meals),
        ..intake
    }
}

fn draft_errors(tasks: &[DraftTask]) -> Result<(), ApiError> {
    validate_draft_tasks(tasks).map_err(ApiError::InvalidFields)
}

pub struct PlanService;

impl PlanService {
    pub async fn submit_request(
        store: &dyn Storage,
        actor: &AuthUser,
        intake: IntakeForm,
    ) -> Result<PlanRequestResponse, ApiError> {
        Self::submit_request_at(store, actor, intake, Utc::now()).await
    }

    /// Submit an intake form; the subscription is checked against `now`
    pub async fn submit_request_at(
        store: &dyn Storage,
        actor: &AuthUser,
        intake: IntakeForm,
        now: DateTime<Utc>,
    ) -> Result<PlanRequestResponse, ApiError> {
        actor.require_role(Role::Client)?;
        intake.validate()?;
        let intake = clean_intake(intake);
        if intake.goals.is_empty() {
            return Err(ApiError::InvalidFields(vec![FieldError::new(
                "goals",
                "Goals are required",
            )]));
        }

        let client = store
            .find_user_by_id(actor.user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        if client.active_package_id.is_none() {
            return Err(ApiError::SubscriptionRequired);
        }
        match client.package_end_date {
            Some(end) if end > now => {}
            _ => return Err(ApiError::SubscriptionExpired),
        }

        if store.find_open_request(client.id).await?.is_some() {
            return Err(ApiError::OpenRequestExists);
        }

        let request = store
            .insert_plan_request(NewPlanRequest {
                client_id: client.id,
                client_name: client.name,
                intake,
            })
            .await?
            // lost a race with a concurrent submit
            .ok_or(ApiError::OpenRequestExists)?;

        metrics::counter!(names::REQUESTS_SUBMITTED).increment(1);
        info!(request_id = %request.id, client_id = %request.client_id, "Plan request submitted");
        Ok(request.into())
    }

    /// Requests visible to the actor, newest first
    pub async fn list_requests(
        store: &dyn Storage,
        actor: &AuthUser,
    ) -> Result<Vec<PlanRequestResponse>, ApiError> {
        let scope = match actor.role {
            Role::Admin => RequestScope::All,
            Role::Doctor => RequestScope::Doctor(actor.user_id),
            Role::Client => RequestScope::Client(actor.user_id),
        };

        let requests = filter_visible(store.list_plan_requests(scope).await?, actor);
        Ok(requests.into_iter().map(PlanRequestResponse::from).collect())
    }

    pub async fn get_request(
        store: &dyn Storage,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<PlanRequestResponse, ApiError> {
        let request = Self::load_visible(store, actor, id).await?;
        Ok(request.into())
    }

    pub async fn assign_doctor(
        store: &dyn Storage,
        actor: &AuthUser,
        id: Uuid,
        doctor_id: Uuid,
    ) -> Result<PlanRequestResponse, ApiError> {
        actor.require_role(Role::Admin)?;

        let request = Self::load(store, id).await?;
        store
            .find_user_by_id(doctor_id)
            .await?
            .filter(|u| u.role == Role::Doctor)
            .ok_or_else(|| ApiError::NotFound("Doctor not found".to_string()))?;

        if !PlanStatus::can_transition(request.status, PlanStatus::Processing) {
            return Err(ApiError::InvalidTransition {
                from: request.status,
                action: "assign a doctor to",
            });
        }

        let updated = match store
            .assign_doctor(id, doctor_id, &[PlanStatus::Requested, PlanStatus::Processing])
            .await?
        {
            Some(updated) => updated,
            None => return Err(Self::moved_on(store, id, "assign a doctor to").await),
        };

        info!(
            request_id = %id,
            %doctor_id,
            from = %request.status,
            to = %updated.status,
            "Doctor assigned"
        );
        Ok(updated.into())
    }

    /// Assigned doctor stores a draft and hands it to admin review
    pub async fn submit_draft(
        store: &dyn Storage,
        actor: &AuthUser,
        id: Uuid,
        tasks: Vec<DraftTask>,
    ) -> Result<PlanRequestResponse, ApiError> {
        actor.require_role(Role::Doctor)?;

        let request = Self::load(store, id).await?;
        if request.doctor_id != Some(actor.user_id) {
            return Err(ApiError::Forbidden(
                "Only the assigned doctor can submit a draft".to_string(),
            ));
        }
        if !PlanStatus::can_transition(request.status, PlanStatus::PendingApproval) {
            return Err(ApiError::InvalidTransition {
                from: request.status,
                action: "submit a draft for",
            });
        }
        draft_errors(&tasks)?;

        let task_count = tasks.len();
        let updated = match store.save_draft(id, actor.user_id, tasks).await? {
            Some(updated) => updated,
            None => return Err(Self::moved_on(store, id, "submit a draft for").await),
        };

        info!(request_id = %id, doctor_id = %actor.user_id, task_count, "Draft submitted");
        Ok(updated.into())
    }

    /// Ask the generator for a candidate draft. Never writes; failures come
    /// back as an empty outcome with a reason.
    pub async fn generate_draft(
        store: &dyn Storage,
        generator: &dyn PlanGenerator,
        actor: &AuthUser,
        id: Uuid,
        request: GeneratePlanRequest,
    ) -> Result<GenerationOutcome, ApiError> {
        actor.require_role(Role::Doctor)?;

        let plan_request = Self::load(store, id).await?;
        if plan_request.doctor_id != Some(actor.user_id) {
            return Err(ApiError::Forbidden(
                "Only the assigned doctor can generate a draft".to_string(),
            ));
        }
        request.validate()?;
        let range = DateRange::new(request.start_date, request.end_date)
            .map_err(|message| ApiError::InvalidFields(vec![FieldError::new("endDate", message)]))?;

        match generator.generate_plan(&request.notes, range).await {
            Ok(tasks) => {
                metrics::counter!(names::PLAN_GENERATIONS, "outcome" => "success").increment(1);
                info!(request_id = %id, task_count = tasks.len(), "Draft generated");
                Ok(GenerationOutcome {
                    tasks,
                    fallback_reason: None,
                })
            }
            Err(e) => {
                metrics::counter!(names::PLAN_GENERATIONS, "outcome" => e.outcome()).increment(1);
                warn!(request_id = %id, error = %e, "Draft generation fell back to empty plan");
                Ok(GenerationOutcome {
                    tasks: Vec::new(),
                    fallback_reason: Some(e.to_string()),
                })
            }
        }
    }

    /// Materialize the approved plan as daily tasks and activate the request.
    ///
    /// `override_tasks`, when present and non-empty, replaces the stored
    /// draft.
    pub async fn publish(
        store: &dyn Storage,
        actor: &AuthUser,
        id: Uuid,
        override_tasks: Option<Vec<DraftTask>>,
    ) -> Result<PublishResponse, ApiError> {
        actor.require_role(Role::Admin)?;

        let request = Self::load(store, id).await?;
        if !PlanStatus::can_transition(request.status, PlanStatus::Active) {
            return Err(ApiError::InvalidTransition {
                from: request.status,
                action: "publish",
            });
        }

        let tasks = match override_tasks {
            Some(tasks) if !tasks.is_empty() => {
                draft_errors(&tasks)?;
                tasks
            }
            _ => request.draft().to_vec(),
        };
        if tasks.is_empty() {
            return Err(ApiError::DraftNotFound);
        }

        let new_tasks: Vec<NewDailyTask> = tasks
            .into_iter()
            .map(|task| NewDailyTask {
                client_id: request.client_id,
                request_id: Some(request.id),
                date: task.date,
                title: task.title.trim().to_string(),
                description: task.description,
                task_type: task.task_type,
                time: task.time,
                calories: task.calories,
            })
            .collect();
        let tasks_created = new_tasks.len();

        let published = match store.publish_plan(id, new_tasks).await? {
            Some(published) => published,
            None => return Err(Self::moved_on(store, id, "publish").await),
        };

        metrics::counter!(names::PLANS_PUBLISHED).increment(1);
        metrics::counter!(names::TASKS_PUBLISHED).increment(tasks_created as u64);
        info!(
            request_id = %id,
            client_id = %published.client_id,
            tasks_created,
            "Plan published"
        );

        Ok(PublishResponse {
            success: true,
            tasks_created,
            request: published.into(),
        })
    }

    async fn load(store: &dyn Storage, id: Uuid) -> Result<PlanRequestRecord, ApiError> {
        store
            .find_plan_request(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Plan request not found".to_string()))
    }

    async fn load_visible(
        store: &dyn Storage,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<PlanRequestRecord, ApiError> {
        let request = Self::load(store, id).await?;
        if !request.visible_to(actor) {
            return Err(ApiError::Forbidden(
                "You cannot view this plan request".to_string(),
            ));
        }
        Ok(request)
    }

    /// Error for a conditional write that matched nothing
    async fn moved_on(store: &dyn Storage, id: Uuid, action: &'static str) -> ApiError {
        match store.find_plan_request(id).await {
            Ok(Some(current)) => ApiError::InvalidTransition {
                from: current.status,
                action,
            },
            Ok(None) => ApiError::NotFound("Plan request not found".to_string()),
            Err(e) => ApiError::Internal(e),
        }
    }
}
