use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::chatmodels::{Chat, MessageType};

pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const MESSAGE_REQUIRED: &str = "Message content is required";
pub const MESSAGE_TOO_LONG: &str = "Message is too long (max 1000 characters)";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateChatDto {
    pub job_id: Uuid,
    pub other_user_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendMessageDto {
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct MessagesQuery {
    #[validate(range(min = 1, max = 200, message = "Limit must be between 1 and 200"))]
    pub limit: Option<i64>,
}

pub fn validate_message(content: &str) -> Vec<&'static str> {
    let mut errors = Vec::new();

    if content.trim().is_empty() {
        errors.push(MESSAGE_REQUIRED);
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        errors.push(MESSAGE_TOO_LONG);
    }

    errors
}

/// A chat as seen by one participant.
#[derive(Debug, Serialize, Clone)]
pub struct ChatWithDetails {
    #[serde(flatten)]
    pub chat: Chat,
    pub other_party_name: String,
    pub is_employer: bool,
    pub has_unread_messages: bool,
}

impl ChatWithDetails {
    pub fn for_user(chat: Chat, user_id: Uuid) -> Self {
        let is_employer = chat.employer_id == user_id;
        let other_party_name = if is_employer {
            chat.worker_name.clone()
        } else {
            chat.employer_name.clone()
        };

        ChatWithDetails {
            has_unread_messages: chat.unread_count > 0,
            chat,
            other_party_name,
            is_employer,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReadReceiptDto {
    pub marked_read: u64,
}
