// routes.rs
use std::{path::Path, sync::Arc};

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    dtos::ApiResponse,
    handler::{
        auth::auth_handler,
        chat::chat_handler,
        jobs::jobs_handler,
        storage::{download_document, storage_handler},
        users::users_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(json!({
        "status": "ok",
        "message": "Server is running"
    })))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest(
            "/users",
            users_handler()
                .layer(middleware::from_fn(auth))
        )
        .merge(jobs_handler())
        .merge(
            chat_handler()
                .route_layer(middleware::from_fn(auth))
        )
        .merge(
            storage_handler(app_state.env.max_upload_bytes)
                .route_layer(middleware::from_fn(auth))
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state.clone()));

    // Images are public; documents need the owner's session.
    let storage_dir = Path::new(&app_state.env.storage_dir);
    let files_route = Router::new()
        .route("/files/documents/*path", get(download_document))
        .route_layer(middleware::from_fn(auth))
        .layer(Extension(app_state.clone()));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
        .merge(files_route)
        .nest_service(
            "/files/profile-images",
            ServeDir::new(storage_dir.join("profile-images")),
        )
        .nest_service(
            "/files/job-images",
            ServeDir::new(storage_dir.join("job-images")),
        )
}
