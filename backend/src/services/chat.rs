//! Messaging relay
//!
//! A message is stored before anyone is told about it; live delivery
//! through the [`ChatHub`] is best-effort on top of that.

use crate::auth::AuthUser;
use crate::chat_hub::ChatHub;
use crate::error::ApiError;
use crate::metrics as names;
use crate::policy::{allowed_contacts, is_linked, ContactCandidate, Visible};
use crate::repositories::{ChatMessageRecord, NewChatMessage, Storage, UserRecord};
use crate::services::user::user_response;
use chrono::Utc;
use helix_shared::types::{ChatMessageResponse, ServerEvent, UserResponse};
use helix_shared::validation::validate_message_text;
use tracing::{debug, info};
use uuid::Uuid;

impl From<ChatMessageRecord> for ChatMessageResponse {
    fn from(record: ChatMessageRecord) -> Self {
        Self {
            id: record.id,
            sender_id: record.sender_id,
            receiver_id: record.receiver_id,
            text: record.text,
            timestamp: record.timestamp,
            read: record.read,
        }
    }
}

pub struct ChatService;

impl ChatService {
    /// Users the actor may message, recomputed from current assignments
    pub async fn contacts(
        store: &dyn Storage,
        actor: &AuthUser,
    ) -> Result<Vec<UserResponse>, ApiError> {
        let users = store.list_users().await?;
        let links = store.care_links_for(actor.user_id).await?;

        Ok(allowed_contacts(actor, users, &links)
            .into_iter()
            .map(|user| user_response(user, None))
            .collect())
    }

    /// Conversation between the actor and `other`, oldest first
    pub async fn history(
        store: &dyn Storage,
        actor: &AuthUser,
        other: Uuid,
    ) -> Result<Vec<ChatMessageResponse>, ApiError> {
        store
            .find_user_by_id(other)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let messages = store.conversation(actor.user_id, other).await?;
        Ok(messages.into_iter().map(ChatMessageResponse::from).collect())
    }

    pub async fn send(
        store: &dyn Storage,
        hub: &ChatHub,
        actor: &AuthUser,
        receiver_id: Uuid,
        text: &str,
    ) -> Result<ChatMessageResponse, ApiError> {
        Self::send_at(store, hub, actor, receiver_id, text, Utc::now().timestamp_millis()).await
    }

    /// Persist a message stamped `timestamp` (epoch millis), then push it to
    /// both parties' live connections
    pub async fn send_at(
        store: &dyn Storage,
        hub: &ChatHub,
        actor: &AuthUser,
        receiver_id: Uuid,
        text: &str,
        timestamp: i64,
    ) -> Result<ChatMessageResponse, ApiError> {
        let text = validate_message_text(text).map_err(ApiError::Validation)?;

        let receiver = store
            .find_user_by_id(receiver_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Recipient not found".to_string()))?;
        Self::ensure_contact(store, actor, &receiver).await?;

        let record = store
            .insert_message(NewChatMessage {
                sender_id: actor.user_id,
                receiver_id,
                text,
                timestamp,
            })
            .await?;
        metrics::counter!(names::CHAT_MESSAGES).increment(1);
        info!(message_id = %record.id, sender_id = %actor.user_id, %receiver_id, "Chat message stored");

        let message = ChatMessageResponse::from(record);
        let received = hub
            .deliver(
                receiver_id,
                &ServerEvent::MessageReceived {
                    message: message.clone(),
                },
            )
            .await;
        hub.deliver(
            actor.user_id,
            &ServerEvent::MessageSent {
                message: message.clone(),
            },
        )
        .await;
        debug!(message_id = %message.id, live_receivers = received, "Chat message relayed");

        Ok(message)
    }

    async fn ensure_contact(
        store: &dyn Storage,
        actor: &AuthUser,
        receiver: &UserRecord,
    ) -> Result<(), ApiError> {
        let links = store.care_links_for(actor.user_id).await?;
        let candidate = ContactCandidate {
            user: receiver,
            linked: is_linked(&links, actor.user_id, receiver.id),
        };
        if candidate.visible_to(actor) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "You cannot message this user".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MemoryStore, NewPlanRequest, NewUser, PlanRequestStore, UserStore};
    use helix_shared::types::IntakeForm;
    use helix_shared::{PlanStatus, Role};

    async fn user(store: &MemoryStore, name: &str, role: Role) -> AuthUser {
        let record = store
            .insert_user(NewUser {
                email: format!("{name}@example.com"),
                password_hash: String::new(),
                name: name.to_string(),
                role,
                avatar: None,
            })
            .await
            .unwrap()
            .unwrap();
        AuthUser {
            user_id: record.id,
            role,
        }
    }

    async fn link(store: &MemoryStore, client: &AuthUser, doctor: &AuthUser) {
        let request = store
            .insert_plan_request(NewPlanRequest {
                client_id: client.user_id,
                client_name: "client".to_string(),
                intake: IntakeForm {
                    goals: "Fit".to_string(),
                    ..Default::default()
                },
            })
            .await
            .unwrap()
            .unwrap();
        store
            .assign_doctor(request.id, doctor.user_id, &[PlanStatus::Requested])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_persists_then_delivers() {
        let store = MemoryStore::new();
        let hub = ChatHub::new();
        let client = user(&store, "alice", Role::Client).await;
        let doctor = user(&store, "sarah", Role::Doctor).await;
        link(&store, &client, &doctor).await;

        let (_, mut doctor_rx) = hub.join(doctor.user_id).await;
        let (_, mut client_rx) = hub.join(client.user_id).await;

        let sent = ChatService::send_at(&store, &hub, &client, doctor.user_id, "  hello  ", 1_000)
            .await
            .unwrap();
        assert_eq!(sent.text, "hello");

        assert!(matches!(
            doctor_rx.try_recv().unwrap(),
            ServerEvent::MessageReceived { message } if message.id == sent.id
        ));
        assert!(matches!(
            client_rx.try_recv().unwrap(),
            ServerEvent::MessageSent { message } if message.id == sent.id
        ));

        let history = ChatService::history(&store, &doctor, client.user_id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_history_ordered_by_timestamp() {
        let store = MemoryStore::new();
        let hub = ChatHub::new();
        let client = user(&store, "alice", Role::Client).await;
        let admin = user(&store, "admin", Role::Admin).await;

        ChatService::send_at(&store, &hub, &client, admin.user_id, "second", 2_000)
            .await
            .unwrap();
        ChatService::send_at(&store, &hub, &admin, client.user_id, "first", 1_000)
            .await
            .unwrap();

        let texts: Vec<_> = ChatService::history(&store, &client, admin.user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_unlinked_pairs_forbidden() {
        let store = MemoryStore::new();
        let hub = ChatHub::new();
        let client = user(&store, "alice", Role::Client).await;
        let other_client = user(&store, "bob", Role::Client).await;
        let doctor = user(&store, "sarah", Role::Doctor).await;

        for receiver in [doctor.user_id, other_client.user_id, client.user_id] {
            let err = ChatService::send_at(&store, &hub, &client, receiver, "hi", 1)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Forbidden(_)));
        }
    }

    #[tokio::test]
    async fn test_message_text_bounds() {
        let store = MemoryStore::new();
        let hub = ChatHub::new();
        let client = user(&store, "alice", Role::Client).await;
        let admin = user(&store, "admin", Role::Admin).await;

        for text in ["   ".to_string(), "x".repeat(2001)] {
            let err = ChatService::send_at(&store, &hub, &client, admin.user_id, &text, 1)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
        assert!(
            ChatService::send_at(&store, &hub, &client, admin.user_id, &"x".repeat(2000), 1)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_contacts_recomputed_after_reassignment() {
        let store = MemoryStore::new();
        let client = user(&store, "alice", Role::Client).await;
        let doctor = user(&store, "sarah", Role::Doctor).await;
        let admin = user(&store, "admin", Role::Admin).await;

        let before: Vec<Uuid> = ChatService::contacts(&store, &client)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(before, vec![admin.user_id]);

        link(&store, &client, &doctor).await;
        let after = ChatService::contacts(&store, &client).await.unwrap();
        assert!(after.iter().any(|u| u.id == doctor.user_id));
    }
}
