use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{jobdtos::*, userdtos::Response, ApiResponse},
    error::HttpError,
    extract::{AppJson, AppPath, AppQuery},
    middleware::{auth, JWTAuthMiddeware},
    AppState,
};

pub fn jobs_handler() -> Router {
    let public_routes = Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job));

    let protected_routes = Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/:job_id", put(update_job).delete(delete_job))
        .route(
            "/jobs/:job_id/applications",
            get(get_job_applications).post(apply_for_job),
        )
        .route(
            "/applications/:application_id/status",
            put(update_application_status),
        )
        .route_layer(middleware::from_fn(auth));

    Router::new().merge(public_routes).merge(protected_routes)
}

pub async fn list_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    AppQuery(query): AppQuery<JobQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = app_state
        .job_service
        .list_jobs(&query.filter(), query.page_size, query.cursor.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(page)))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.get_job(job_id).await?;

    Ok(Json(ApiResponse::success(job)))
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppJson(body): AppJson<CreateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.create_job(&auth.user, body).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(job))))
}

pub async fn update_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(job_id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .update_job(auth.user.id, job_id, body)
        .await?;

    Ok(Json(ApiResponse::success(job)))
}

pub async fn delete_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.job_service.delete_job(auth.user.id, job_id).await?;

    Ok(Json(ApiResponse::success(Response {
        message: "Job deleted".to_string(),
    })))
}

pub async fn get_job_applications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let applications = app_state
        .job_service
        .job_applications(auth.user.id, job_id)
        .await?;

    Ok(Json(ApiResponse::success(applications)))
}

pub async fn apply_for_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(job_id): AppPath<Uuid>,
    AppJson(body): AppJson<ApplyJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let application = app_state
        .job_service
        .apply_for_job(&auth.user, job_id, body)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(application))))
}

pub async fn update_application_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    AppPath(application_id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateApplicationStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let application = app_state
        .job_service
        .update_application_status(auth.user.id, application_id, body.status)
        .await?;

    Ok(Json(ApiResponse::success(application)))
}
