use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    dtos::{storagedtos::*, ApiResponse},
    error::HttpError,
    extract::{AppPath, AppQuery},
    middleware::JWTAuthMiddeware,
    service::storage_service::UploadedFile,
    AppState,
};

/// Job images arrive several to a request.
const MAX_FILES_PER_REQUEST: usize = 10;

pub fn storage_handler(max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/storage/profile-image", post(upload_profile_image))
        .route("/storage/jobs/:job_id/images", post(upload_job_images))
        .route("/storage/documents/:doc_type", post(upload_document))
        .route("/storage/url", get(get_file_url))
        .route("/storage/file", delete(delete_file))
        .route("/storage/folder", delete(delete_folder))
        .layer(DefaultBodyLimit::max(max_upload_bytes * MAX_FILES_PER_REQUEST + 64 * 1024))
}

async fn read_files(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<UploadedFile>, HttpError> {
    let mut multipart = multipart?;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| HttpError::bad_request(e.to_string()))?;

        files.push(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Ok(files)
}

async fn read_single_file(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedFile, HttpError> {
    read_files(multipart)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| HttpError::bad_request("A file is required"))
}

pub async fn upload_profile_image(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let file = read_single_file(multipart).await?;

    let stored = app_state
        .storage_service
        .upload_profile_image(auth.user.id, file)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(stored))))
}

pub async fn upload_job_images(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(job_id): AppPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let files = read_files(multipart).await?;
    if files.len() > MAX_FILES_PER_REQUEST {
        return Err(HttpError::bad_request(format!(
            "At most {} images can be uploaded at once",
            MAX_FILES_PER_REQUEST
        )));
    }

    let stored = app_state
        .storage_service
        .upload_job_images(auth.user.id, job_id, files)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(stored))))
}

pub async fn upload_document(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(doc_type): AppPath<DocumentType>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let file = read_single_file(multipart).await?;

    let stored = app_state
        .storage_service
        .upload_document(auth.user.id, doc_type, file)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(stored))))
}

pub async fn get_file_url(
    Extension(app_state): Extension<Arc<AppState>>,
    AppQuery(query): AppQuery<StoragePathQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let url = app_state.storage_service.file_url(&query.path).await?;

    Ok(Json(ApiResponse::success(FileUrlDto { url })))
}

pub async fn delete_file(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppQuery(query): AppQuery<StoragePathQuery>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .storage_service
        .delete_file(auth.user.id, &query.path)
        .await?;

    Ok(Json(ApiResponse::success(DeletedDto { deleted: 1 })))
}

pub async fn delete_folder(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppQuery(query): AppQuery<StoragePathQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let deleted = app_state
        .storage_service
        .delete_folder(auth.user.id, &query.path)
        .await?;

    Ok(Json(ApiResponse::success(DeletedDto { deleted })))
}

/// Serves `/files/documents/*path` to the uploading user only.
pub async fn download_document(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(path): AppPath<String>,
) -> Result<impl IntoResponse, HttpError> {
    let (bytes, content_type) = app_state
        .storage_service
        .read_document(auth.user.id, &format!("documents/{}", path))
        .await?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
