//! Chat REST routes
//!
//! History and contacts, plus a plain HTTP send for clients without a
//! websocket. Sends made here are still pushed to live connections.

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::ChatService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use helix_shared::types::{ChatMessageResponse, SendMessageRequest, UserResponse};
use uuid::Uuid;

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(contacts))
        .route("/:user_id", get(history).post(send_message))
}

/// GET /api/v1/chat/contacts
async fn contacts(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let contacts = ChatService::contacts(state.store(), &auth_user).await?;
    Ok(Json(contacts))
}

/// GET /api/v1/chat/:userId
async fn history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ChatMessageResponse>>> {
    let messages = ChatService::history(state.store(), &auth_user, user_id).await?;
    Ok(Json(messages))
}

/// POST /api/v1/chat/:userId
async fn send_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<ChatMessageResponse>)> {
    let message =
        ChatService::send(state.store(), &state.chat, &auth_user, user_id, &req.text).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
