// service/messaging_service.rs
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{
    db::{ChatExt, JobExt, Store, UserExt},
    dtos::chatdtos::{validate_message, ChatWithDetails, SendMessageDto},
    models::{
        chatmodels::*,
        usermodel::{User, UserRole},
    },
    service::error::ServiceError,
};

pub const DEFAULT_MESSAGE_LIMIT: i64 = 50;
const CHANNEL_CAPACITY: usize = 16;

/// Per-chat change signals. Payload-free: subscribers re-read the chat, so a
/// lagged receiver still ends up with the latest list.
// TODO: fan out through Postgres LISTEN/NOTIFY once more than one instance serves /api.
#[derive(Debug, Default)]
pub struct MessageHub {
    channels: Mutex<HashMap<Uuid, broadcast::Sender<()>>>,
}

impl MessageHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, chat_id: Uuid) -> broadcast::Receiver<()> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn notify(&self, chat_id: Uuid) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = channels.get(&chat_id) {
            // No receivers left: drop the channel.
            if sender.send(()).is_err() {
                channels.remove(&chat_id);
            }
        }
    }

    /// Called by a departing subscriber whose receiver is still alive, so a
    /// count of one means nobody else is listening.
    fn release(&self, chat_id: Uuid) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if channels
            .get(&chat_id)
            .is_some_and(|sender| sender.receiver_count() <= 1)
        {
            channels.remove(&chat_id);
        }
    }

    #[cfg(test)]
    fn channel_count(&self) -> usize {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Live view of one chat's messages.
pub struct MessageSubscription {
    db_client: Arc<dyn Store>,
    hub: Arc<MessageHub>,
    chat_id: Uuid,
    receiver: broadcast::Receiver<()>,
    primed: bool,
}

impl MessageSubscription {
    pub fn chat_id(&self) -> Uuid {
        self.chat_id
    }

    /// The full ordered message list: immediately on the first call, then
    /// after each change. `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<Result<Vec<Message>, ServiceError>> {
        if self.primed {
            match self.receiver.recv().await {
                Ok(()) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("subscription to chat {} skipped {} signals", self.chat_id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
        self.primed = true;

        Some(
            self.db_client
                .get_all_chat_messages(self.chat_id)
                .await
                .map_err(ServiceError::from),
        )
    }

    pub fn cancel(self) {
        tracing::debug!("subscription to chat {} cancelled", self.chat_id);
    }
}

impl Drop for MessageSubscription {
    fn drop(&mut self) {
        self.hub.release(self.chat_id);
    }
}

#[derive(Debug, Clone)]
pub struct MessagingService {
    db_client: Arc<dyn Store>,
    hub: Arc<MessageHub>,
}

impl MessagingService {
    pub fn new(db_client: Arc<dyn Store>) -> Self {
        Self {
            db_client,
            hub: Arc::new(MessageHub::new()),
        }
    }

    pub async fn get_or_create_chat(&self, chat: NewChat) -> Result<Chat, ServiceError> {
        Ok(self.db_client.get_or_create_chat(chat).await?)
    }

    /// Opens the chat between `actor` and `other_user_id` about `job_id`. One of
    /// the two must be the job's employer and the other a worker.
    pub async fn open_chat(
        &self,
        actor: &User,
        job_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Chat, ServiceError> {
        let job = self
            .db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let other = self
            .db_client
            .get_user(Some(other_user_id), None)
            .await?
            .ok_or(ServiceError::UserNotFound(other_user_id))?;

        let (employer, worker) = if actor.id == job.employer_id {
            (actor, &other)
        } else if other.id == job.employer_id {
            (&other, actor)
        } else {
            return Err(ServiceError::UnauthorizedJobAccess(actor.id, job_id));
        };

        if worker.role != UserRole::Worker {
            return Err(ServiceError::Validation(
                "A chat needs the job's employer and a worker".to_string(),
            ));
        }

        let chat = self
            .get_or_create_chat(NewChat {
                job_id,
                employer_id: employer.id,
                worker_id: worker.id,
                employer_name: employer.name.clone(),
                worker_name: worker.name.clone(),
            })
            .await?;

        tracing::debug!("chat {} ready for job {}", chat.id, job_id);
        Ok(chat)
    }

    async fn participant_chat(&self, actor_id: Uuid, chat_id: Uuid) -> Result<Chat, ServiceError> {
        let chat = self
            .db_client
            .get_chat_by_id(chat_id)
            .await?
            .ok_or(ServiceError::ChatNotFound(chat_id))?;

        if !chat.is_participant(actor_id) {
            return Err(ServiceError::NotChatParticipant(actor_id, chat_id));
        }
        Ok(chat)
    }

    pub async fn get_chat(&self, actor_id: Uuid, chat_id: Uuid) -> Result<ChatWithDetails, ServiceError> {
        let chat = self.participant_chat(actor_id, chat_id).await?;
        Ok(ChatWithDetails::for_user(chat, actor_id))
    }

    pub async fn user_chats(&self, user_id: Uuid) -> Result<Vec<ChatWithDetails>, ServiceError> {
        let chats = self.db_client.get_user_chats(user_id).await?;

        Ok(chats
            .into_iter()
            .map(|chat| ChatWithDetails::for_user(chat, user_id))
            .collect())
    }

    pub async fn send_message(
        &self,
        sender: &User,
        chat_id: Uuid,
        dto: SendMessageDto,
    ) -> Result<Message, ServiceError> {
        let errors = validate_message(&dto.content);
        if !errors.is_empty() {
            return Err(ServiceError::InvalidInput(errors));
        }

        self.participant_chat(sender.id, chat_id).await?;

        let message = self
            .db_client
            .send_message(NewMessage {
                chat_id,
                sender_id: sender.id,
                sender_name: sender.name.clone(),
                content: dto.content,
                message_type: dto.message_type,
            })
            .await?;

        self.hub.notify(chat_id);
        Ok(message)
    }

    pub async fn get_messages(
        &self,
        actor_id: Uuid,
        chat_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, ServiceError> {
        self.participant_chat(actor_id, chat_id).await?;

        let limit = limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);
        Ok(self.db_client.get_chat_messages(chat_id, limit).await?)
    }

    pub async fn subscribe(
        &self,
        actor_id: Uuid,
        chat_id: Uuid,
    ) -> Result<MessageSubscription, ServiceError> {
        self.participant_chat(actor_id, chat_id).await?;

        Ok(MessageSubscription {
            db_client: self.db_client.clone(),
            hub: self.hub.clone(),
            chat_id,
            receiver: self.hub.subscribe(chat_id),
            primed: false,
        })
    }

    pub async fn mark_messages_as_read(&self, actor_id: Uuid, chat_id: Uuid) -> Result<u64, ServiceError> {
        self.participant_chat(actor_id, chat_id).await?;

        let changed = self.db_client.mark_messages_as_read(chat_id, actor_id).await?;
        if changed > 0 {
            self.hub.notify(chat_id);
        }
        Ok(changed)
    }
}
