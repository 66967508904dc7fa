//! Package catalog and subscription routes

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::PackageService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use helix_shared::types::{
    CreatePackageRequest, PackageResponse, SubscribeRequest, UpdatePackageRequest, UserResponse,
};
use uuid::Uuid;

pub fn package_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_packages).post(create_package))
        .route("/subscribe", post(subscribe))
        .route("/:id", put(update_package).delete(delete_package))
}

/// Active packages; no authentication required
///
/// GET /api/v1/packages
async fn list_packages(State(state): State<AppState>) -> ApiResult<Json<Vec<PackageResponse>>> {
    let packages = PackageService::list_active(state.store()).await?;
    Ok(Json(packages))
}

/// POST /api/v1/packages
async fn create_package(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CreatePackageRequest>,
) -> ApiResult<(StatusCode, Json<PackageResponse>)> {
    let package = PackageService::create(state.store(), &auth_user, req).await?;
    Ok((StatusCode::CREATED, Json(package)))
}

/// PUT /api/v1/packages/:id
async fn update_package(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePackageRequest>,
) -> ApiResult<Json<PackageResponse>> {
    let package = PackageService::update(state.store(), &auth_user, id, req).await?;
    Ok(Json(package))
}

/// Soft delete: the package disappears from the catalog but existing
/// subscriptions keep resolving it
///
/// DELETE /api/v1/packages/:id
async fn delete_package(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    PackageService::delete(state.store(), &auth_user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Subscribe the caller to a package
///
/// POST /api/v1/packages/subscribe
async fn subscribe(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<SubscribeRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = PackageService::subscribe(state.store(), auth_user.user_id, req.package_id).await?;
    Ok(Json(user))
}
