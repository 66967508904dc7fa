//! User directory routes

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::UserService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use helix_shared::types::{UpdateUserRequest, UserResponse};
use uuid::Uuid;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", put(update_user))
}

/// Users the caller is allowed to see
///
/// GET /api/v1/users
async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = UserService::list_users(state.store(), &auth_user).await?;
    Ok(Json(users))
}

/// Change role or subscription (admin only)
///
/// PUT /api/v1/users/:id
async fn update_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = UserService::update_user(state.store(), &auth_user, id, req).await?;
    Ok(Json(user))
}
