use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};
use validator::Validate;

use crate::{
    dtos::{userdtos::*, ApiResponse},
    error::HttpError,
    extract::AppJson,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/me/jobs", get(get_my_jobs))
        .route("/me/applications", get(get_my_applications))
}

pub async fn get_me(
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let user = FilterUserDto::filter_user(&auth.user);

    Ok(Json(ApiResponse::success(UserData { user })))
}

pub async fn update_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppJson(body): AppJson<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .auth_service
        .update_profile(auth.user.id, body)
        .await?;

    Ok(Json(ApiResponse::success(UserData { user })))
}

pub async fn get_my_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.job_service.jobs_by_employer(auth.user.id).await?;

    Ok(Json(ApiResponse::success(jobs)))
}

pub async fn get_my_applications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let applications = app_state
        .job_service
        .applications_by_worker(auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success(applications)))
}
