use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::Cookie;
use validator::Validate;

use crate::{
    dtos::{userdtos::*, ApiResponse},
    error::HttpError,
    extract::AppJson,
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/register/phone", post(register_phone))
        .route("/login", post(login))
        .route("/login/phone", post(login_phone))
        .route("/logout", post(logout))
}

fn with_token_cookie(
    status: StatusCode,
    token: String,
    max_age: time::Duration,
    body: impl IntoResponse,
) -> Result<AxumResponse, HttpError> {
    let cookie = Cookie::build(("token", token))
        .path("/")
        .max_age(max_age)
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error("Could not build session cookie"))?,
    );

    let mut response = (status, body).into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

fn session_response(
    app_state: &AppState,
    status: StatusCode,
    session: UserLoginResponseDto,
) -> Result<AxumResponse, HttpError> {
    let max_age = time::Duration::minutes(app_state.auth_service.jwt_maxage());
    with_token_cookie(
        status,
        session.token.clone(),
        max_age,
        Json(ApiResponse::success(session)),
    )
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    AppJson(body): AppJson<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let session = app_state.auth_service.register_with_email(body).await?;

    session_response(&app_state, StatusCode::CREATED, session)
}

pub async fn register_phone(
    Extension(app_state): Extension<Arc<AppState>>,
    AppJson(body): AppJson<RegisterPhoneDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let session = app_state.auth_service.register_with_phone(body).await?;

    session_response(&app_state, StatusCode::CREATED, session)
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    AppJson(body): AppJson<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let session = app_state.auth_service.login_with_email(body).await?;

    session_response(&app_state, StatusCode::OK, session)
}

pub async fn login_phone(
    Extension(app_state): Extension<Arc<AppState>>,
    AppJson(body): AppJson<LoginPhoneDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let session = app_state.auth_service.login_with_phone(body).await?;

    session_response(&app_state, StatusCode::OK, session)
}

pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    with_token_cookie(
        StatusCode::OK,
        String::new(),
        time::Duration::ZERO,
        Json(ApiResponse::success(Response {
            message: "Logged out successfully".to_string(),
        })),
    )
}
