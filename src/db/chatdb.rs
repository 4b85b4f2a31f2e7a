// db/chatdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::{DBClient, StoreError};
use crate::models::chatmodels::*;

const CHAT_COLUMNS: &str = "id, job_id, employer_id, worker_id, employer_name, worker_name, \
     last_message, last_message_time, unread_count, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, chat_id, sender_id, sender_name, content, message_type, read, timestamp";

#[async_trait]
pub trait ChatExt: Send + Sync {
    /// Returns the chat for the (job, employer, worker) triple, creating it if
    /// needed. A single atomic upsert.
    async fn get_or_create_chat(&self, chat: NewChat) -> Result<Chat, StoreError>;

    async fn get_chat_by_id(&self, chat_id: Uuid) -> Result<Option<Chat>, StoreError>;

    async fn get_user_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, StoreError>;

    /// Appends the message and refreshes the chat summary in one atomic write.
    async fn send_message(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// The latest `limit` messages, oldest first.
    async fn get_chat_messages(&self, chat_id: Uuid, limit: i64)
        -> Result<Vec<Message>, StoreError>;

    async fn get_all_chat_messages(&self, chat_id: Uuid) -> Result<Vec<Message>, StoreError>;

    /// Marks messages from the other participant as read and resets the unread
    /// counter. Returns how many messages changed.
    async fn mark_messages_as_read(&self, chat_id: Uuid, user_id: Uuid)
        -> Result<u64, StoreError>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn get_or_create_chat(&self, chat: NewChat) -> Result<Chat, StoreError> {
        // The no-op DO UPDATE makes RETURNING yield the existing row on conflict.
        let chat = sqlx::query_as::<_, Chat>(&format!(
            r#"
            INSERT INTO chats (job_id, employer_id, worker_id, employer_name, worker_name)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (job_id, employer_id, worker_id)
            DO UPDATE SET job_id = EXCLUDED.job_id
            RETURNING {}
            "#,
            CHAT_COLUMNS
        ))
        .bind(chat.job_id)
        .bind(chat.employer_id)
        .bind(chat.worker_id)
        .bind(chat.employer_name)
        .bind(chat.worker_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(chat)
    }

    async fn get_chat_by_id(&self, chat_id: Uuid) -> Result<Option<Chat>, StoreError> {
        let chat = sqlx::query_as::<_, Chat>(&format!(
            "SELECT {} FROM chats WHERE id = $1",
            CHAT_COLUMNS
        ))
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chat)
    }

    async fn get_user_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, StoreError> {
        let chats = sqlx::query_as::<_, Chat>(&format!(
            r#"
            SELECT {}
            FROM chats
            WHERE employer_id = $1 OR worker_id = $1
            ORDER BY updated_at DESC
            "#,
            CHAT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(chats)
    }

    async fn send_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises senders on the same chat.
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM chats WHERE id = $1 FOR UPDATE")
            .bind(message.chat_id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Err(StoreError::not_found("chats", message.chat_id));
        }

        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (chat_id, sender_id, sender_name, content, message_type, timestamp)
            VALUES ($1, $2, $3, $4, $5, clock_timestamp())
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(message.sender_name)
        .bind(message.content)
        .bind(message.message_type)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE chats
            SET last_message = $2,
                last_message_time = $3,
                updated_at = $3,
                unread_count = unread_count + 1
            WHERE id = $1
            "#,
        )
        .bind(message.chat_id)
        .bind(&message.content)
        .bind(message.timestamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn get_chat_messages(
        &self,
        chat_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Message>, StoreError> {
        let mut messages = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE chat_id = $1
            ORDER BY timestamp DESC, id DESC
            LIMIT $2
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    async fn get_all_chat_messages(&self, chat_id: Uuid) -> Result<Vec<Message>, StoreError> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE chat_id = $1
            ORDER BY timestamp ASC, id ASC
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn mark_messages_as_read(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE messages
            SET read = true
            WHERE chat_id = $1
              AND sender_id != $2
              AND read = false
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE chats
            SET unread_count = 0, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
