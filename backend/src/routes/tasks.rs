//! Daily task routes

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::TaskService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use helix_shared::types::{DailyTaskResponse, TaskQuery};
use uuid::Uuid;

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks))
        .route("/:id/toggle", put(toggle_task))
}

/// GET /api/v1/tasks?clientId=&date=
async fn list_tasks(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<DailyTaskResponse>>> {
    let tasks = TaskService::list_tasks(state.store(), &auth_user, query).await?;
    Ok(Json(tasks))
}

/// Flip a task between PENDING and COMPLETED; only today's tasks
///
/// PUT /api/v1/tasks/:id/toggle
async fn toggle_task(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DailyTaskResponse>> {
    let task = TaskService::toggle(state.store(), &auth_user, id).await?;
    Ok(Json(task))
}
