//! Live chat websocket
//!
//! `GET /api/v1/ws?token=...` (or an `Authorization: Bearer` header)
//! upgrades to a socket bound to the token's user. The socket may only
//! join its own user id, and every send goes through [`ChatService`] so
//! the contact rules and persistence match the REST path.

use crate::auth::{authenticate, AuthUser};
use crate::chat_hub::ConnectionId;
use crate::error::ApiError;
use crate::services::ChatService;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use helix_shared::types::{ClientEvent, ServerEvent};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    token: Option<String>,
}

/// GET /api/v1/ws
pub async fn chat_socket(
    State(state): State<AppState>,
    Query(params): Query<SocketParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let header_token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let token = params
        .token
        .as_deref()
        .or(header_token)
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;
    let user = authenticate(state.jwt(), token)?;

    Ok(ws.on_upgrade(move |socket| run_socket(socket, state, user)))
}

async fn run_socket(socket: WebSocket, state: AppState, user: AuthUser) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode chat event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    info!(user_id = %user.user_id, "Chat socket opened");
    let mut session = Session::new(state, user, outbox);

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => session.handle_text(&text).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Chat socket read error: {}", e);
                break;
            }
        }
    }

    session.close().await;
    writer.abort();
    info!(user_id = %user.user_id, "Chat socket closed");
}

/// Per-socket state, independent of the transport
pub(crate) struct Session {
    state: AppState,
    user: AuthUser,
    outbox: mpsc::UnboundedSender<ServerEvent>,
    joined: Option<(ConnectionId, JoinHandle<()>)>,
}

impl Session {
    pub(crate) fn new(
        state: AppState,
        user: AuthUser,
        outbox: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        Self {
            state,
            user,
            outbox,
            joined: None,
        }
    }

    pub(crate) async fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => self.reply_error(ApiError::BadRequest(format!("Malformed event: {}", e))),
        }
    }

    pub(crate) async fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Join { user_id } => self.join(user_id).await,
            ClientEvent::Send {
                sender_id,
                receiver_id,
                text,
            } => {
                if sender_id.is_some_and(|id| id != self.user.user_id) {
                    self.reply_error(ApiError::Forbidden(
                        "senderId does not match the session user".into(),
                    ));
                    return;
                }
                self.send(receiver_id, &text).await;
            }
        }
    }

    async fn join(&mut self, user_id: Uuid) {
        if user_id != self.user.user_id {
            warn!(
                session_user = %self.user.user_id,
                requested = %user_id,
                "Rejected chat join for another user"
            );
            self.reply_error(ApiError::Forbidden(
                "a socket can only join its own user id".into(),
            ));
            return;
        }

        if self.joined.is_none() {
            let (connection, mut events) = self.state.chat.join(user_id).await;
            let outbox = self.outbox.clone();
            let forward = tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    if outbox.send(event).is_err() {
                        break;
                    }
                }
            });
            self.joined = Some((connection, forward));
        }

        let _ = self.outbox.send(ServerEvent::Joined { user_id });
    }

    async fn send(&mut self, receiver_id: Uuid, text: &str) {
        let result = ChatService::send(
            self.state.store(),
            &self.state.chat,
            &self.user,
            receiver_id,
            text,
        )
        .await;

        match result {
            // Joined sockets get the echo through the hub
            Ok(message) if self.joined.is_none() => {
                let _ = self.outbox.send(ServerEvent::MessageSent { message });
            }
            Ok(_) => {}
            Err(e) => self.reply_error(e),
        }
    }

    fn reply_error(&self, error: ApiError) {
        let detail = error.detail();
        let _ = self.outbox.send(ServerEvent::Error {
            code: detail.code,
            message: detail.message,
        });
    }

    pub(crate) async fn close(self) {
        if let Some((connection, forward)) = self.joined {
            self.state.chat.leave(self.user.user_id, connection).await;
            forward.abort();
        }
    }
}
