use std::{convert::Infallible, sync::Arc};

use async_stream::stream;
use axum::{
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    routing::{get, put},
    Extension, Json, Router,
};
use futures::Stream;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{chatdtos::*, ApiResponse},
    error::HttpError,
    extract::{AppJson, AppPath, AppQuery},
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/chats", get(get_user_chats).post(create_chat))
        .route("/chats/:chat_id", get(get_chat_details))
        .route("/chats/:chat_id/messages", get(get_messages).post(send_message))
        .route("/chats/:chat_id/read", put(mark_chat_as_read))
        .route("/chats/:chat_id/stream", get(stream_messages))
}

pub async fn create_chat(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppJson(body): AppJson<CreateChatDto>,
) -> Result<impl IntoResponse, HttpError> {
    let chat = app_state
        .messaging_service
        .open_chat(&auth.user, body.job_id, body.other_user_id)
        .await?;

    let response = ChatWithDetails::for_user(chat, auth.user.id);

    Ok(Json(ApiResponse::success(response)))
}

pub async fn get_user_chats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let chats = app_state.messaging_service.user_chats(auth.user.id).await?;

    Ok(Json(ApiResponse::success(chats)))
}

pub async fn get_chat_details(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(chat_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let chat = app_state
        .messaging_service
        .get_chat(auth.user.id, chat_id)
        .await?;

    Ok(Json(ApiResponse::success(chat)))
}

pub async fn get_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(chat_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<MessagesQuery>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let messages = app_state
        .messaging_service
        .get_messages(auth.user.id, chat_id, query.limit)
        .await?;

    Ok(Json(ApiResponse::success(messages)))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(chat_id): AppPath<Uuid>,
    AppJson(body): AppJson<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    let message = app_state
        .messaging_service
        .send_message(&auth.user, chat_id, body)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(message))))
}

pub async fn mark_chat_as_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(chat_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let marked_read = app_state
        .messaging_service
        .mark_messages_as_read(auth.user.id, chat_id)
        .await?;

    Ok(Json(ApiResponse::success(ReadReceiptDto { marked_read })))
}

/// Server-sent `messages` events, each carrying the chat's full ordered list.
/// The subscription is dropped when the client disconnects.
pub async fn stream_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(chat_id): AppPath<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HttpError> {
    let mut subscription = app_state
        .messaging_service
        .subscribe(auth.user.id, chat_id)
        .await?;

    tracing::debug!("user {} streaming chat {}", auth.user.id, subscription.chat_id());

    let stream = stream! {
        while let Some(update) = subscription.next().await {
            match update {
                Ok(messages) => match Event::default().event("messages").json_data(&messages) {
                    Ok(event) => yield Ok::<Event, Infallible>(event),
                    Err(e) => {
                        tracing::error!("could not encode messages for chat {}: {}", chat_id, e);
                        break;
                    }
                },
                Err(e) => {
                    yield Ok(Event::default().event("error").data(e.to_string()));
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
