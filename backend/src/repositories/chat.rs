//! Chat message repository

use super::{ChatStore, PgStore};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Stored chat message; `timestamp` is epoch milliseconds
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatMessageRecord {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: String,
    #[sqlx(rename = "sent_at_ms")]
    pub timestamp: i64,
    pub read: bool,
}

#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: String,
    pub timestamp: i64,
}

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, text, sent_at_ms, read";

#[async_trait]
impl ChatStore for PgStore {
    async fn insert_message(&self, message: NewChatMessage) -> Result<ChatMessageRecord> {
        let record = sqlx::query_as::<_, ChatMessageRecord>(&format!(
            r#"
            INSERT INTO chat_messages (sender_id, receiver_id, text, sent_at_ms)
            VALUES ($1, $2, $3, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.text)
        .bind(message.timestamp)
        .fetch_one(self.pool())
        .await?;

        Ok(record)
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<ChatMessageRecord>> {
        // seq breaks ties between messages sent in the same millisecond
        let records = sqlx::query_as::<_, ChatMessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM chat_messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY sent_at_ms, seq
            "#
        ))
        .bind(a)
        .bind(b)
        .fetch_all(self.pool())
        .await?;

        Ok(records)
    }
}
