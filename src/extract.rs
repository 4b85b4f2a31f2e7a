//! Request extractors whose rejections render through `HttpError`, so a
//! malformed body, query string or path segment still gets the JSON envelope.

use axum::extract::{
    multipart::MultipartRejection,
    rejection::{JsonRejection, PathRejection, QueryRejection},
    FromRequest, FromRequestParts,
};

use crate::error::HttpError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(HttpError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(HttpError))]
pub struct AppQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(HttpError))]
pub struct AppPath<T>(pub T);

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::new(rejection.body_text(), rejection.status())
    }
}

impl From<QueryRejection> for HttpError {
    fn from(rejection: QueryRejection) -> Self {
        HttpError::new(rejection.body_text(), rejection.status())
    }
}

impl From<PathRejection> for HttpError {
    fn from(rejection: PathRejection) -> Self {
        HttpError::new(rejection.body_text(), rejection.status())
    }
}

impl From<MultipartRejection> for HttpError {
    fn from(rejection: MultipartRejection) -> Self {
        HttpError::new(rejection.body_text(), rejection.status())
    }
}
