use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db::db::StoreError,
    error::HttpError,
    models::usermodel::UserRole,
    service::storage_service::StorageError,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Job not found")]
    JobNotFound(Uuid),

    #[error("Application not found")]
    ApplicationNotFound(Uuid),

    #[error("Chat not found")]
    ChatNotFound(Uuid),

    #[error("User not found")]
    UserNotFound(Uuid),

    #[error("User {0} is not authorized to perform this action on job {1}")]
    UnauthorizedJobAccess(Uuid, Uuid),

    #[error("User {0} is not a participant in chat {1}")]
    NotChatParticipant(Uuid, Uuid),

    #[error("User {0} is not allowed to modify {1}")]
    NotPathOwner(Uuid, String),

    #[error("Only {} accounts can {}", .0.to_str(), .1)]
    RoleRequired(UserRole, &'static str),

    #[error("{}", .0.join(", "))]
    InvalidInput(Vec<&'static str>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::JobNotFound(_)
            | ServiceError::ApplicationNotFound(_)
            | ServiceError::ChatNotFound(_)
            | ServiceError::UserNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::UnauthorizedJobAccess(_, _)
            | ServiceError::NotChatParticipant(_, _)
            | ServiceError::NotPathOwner(_, _)
            | ServiceError::RoleRequired(_, _) => StatusCode::FORBIDDEN,

            ServiceError::InvalidInput(_) | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServiceError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            ServiceError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,

            ServiceError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Storage(StorageError::InvalidPath(_))
            | ServiceError::Storage(StorageError::Rejected(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Storage(StorageError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!("service error: {}", error);
        }
        HttpError::new(error.to_string(), status)
    }
}
