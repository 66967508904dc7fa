//! Plan request workflow routes
//!
//! Thin wrappers over [`PlanService`]; every role and status check lives
//! in the service.

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::PlanService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use helix_shared::types::{
    AssignDoctorRequest, GeneratePlanRequest, GenerationOutcome, IntakeForm, PlanRequestResponse,
    PublishRequest, PublishResponse, SubmitDraftRequest,
};
use uuid::Uuid;

pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests).post(submit_request))
        .route("/:id", get(get_request))
        .route("/:id/assign", put(assign_doctor))
        .route("/:id/draft", put(submit_draft))
        .route("/:id/generate", post(generate_draft))
        .route("/:id/publish", post(publish))
}

/// GET /api/v1/requests
async fn list_requests(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<Vec<PlanRequestResponse>>> {
    let requests = PlanService::list_requests(state.store(), &auth_user).await?;
    Ok(Json(requests))
}

/// Submit the intake form (clients with a live subscription)
///
/// POST /api/v1/requests
async fn submit_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(intake): Json<IntakeForm>,
) -> ApiResult<(StatusCode, Json<PlanRequestResponse>)> {
    let request = PlanService::submit_request(state.store(), &auth_user, intake).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/v1/requests/:id
async fn get_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PlanRequestResponse>> {
    let request = PlanService::get_request(state.store(), &auth_user, id).await?;
    Ok(Json(request))
}

/// PUT /api/v1/requests/:id/assign
async fn assign_doctor(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignDoctorRequest>,
) -> ApiResult<Json<PlanRequestResponse>> {
    let request = PlanService::assign_doctor(state.store(), &auth_user, id, req.doctor_id).await?;
    Ok(Json(request))
}

/// PUT /api/v1/requests/:id/draft
async fn submit_draft(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitDraftRequest>,
) -> ApiResult<Json<PlanRequestResponse>> {
    let request = PlanService::submit_draft(state.store(), &auth_user, id, req.tasks).await?;
    Ok(Json(request))
}

/// Ask the configured generator for a draft; never changes the request
///
/// POST /api/v1/requests/:id/generate
async fn generate_draft(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<GeneratePlanRequest>,
) -> ApiResult<Json<GenerationOutcome>> {
    let outcome =
        PlanService::generate_draft(state.store(), state.generator(), &auth_user, id, req).await?;
    Ok(Json(outcome))
}

/// Publish the stored draft, or the override list when a body carries one
///
/// POST /api/v1/requests/:id/publish
async fn publish(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    body: Option<Json<PublishRequest>>,
) -> ApiResult<Json<PublishResponse>> {
    let draft_override = body.and_then(|Json(req)| req.draft_tasks);
    let response = PlanService::publish(state.store(), &auth_user, id, draft_override).await?;
    Ok(Json(response))
}
