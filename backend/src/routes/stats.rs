//! Progress statistics routes

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::ProgressService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use helix_shared::types::StatsQuery;
use helix_shared::ProgressStat;
use uuid::Uuid;

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/:client_id", get(get_stats))
}

/// GET /api/v1/stats/:clientId?range=week|month
async fn get_stats(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(client_id): Path<Uuid>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Vec<ProgressStat>>> {
    let stats =
        ProgressService::get_stats(state.store(), &auth_user, client_id, query.range.as_deref())
            .await?;
    Ok(Json(stats))
}
