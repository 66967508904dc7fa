//! Authentication routes
//!
//! Registration, login, token refresh and the current-user lookup. Password
//! hashing runs on the blocking pool inside the service.

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::UserService;
use crate::state::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use helix_shared::types::{
    AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, UserResponse,
};

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/me", get(me))
}

/// Register a new client account
///
/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = UserService::register(state.store(), state.jwt(), req).await?;
    Ok(Json(response))
}

/// Login with email, password and optionally the expected role
///
/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = UserService::login(state.store(), state.jwt(), req).await?;
    Ok(Json(response))
}

/// POST /api/v1/auth/refresh
async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = UserService::refresh(state.store(), state.jwt(), &req.refresh_token).await?;
    Ok(Json(response))
}

/// Current user, with the active package resolved
///
/// GET /api/v1/auth/me
async fn me(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<Json<UserResponse>> {
    let user = UserService::me(state.store(), auth_user.user_id).await?;
    Ok(Json(user))
}
