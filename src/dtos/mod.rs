pub mod chatdtos;
pub mod jobdtos;
pub mod storagedtos;
pub mod userdtos;

use serde::{Deserialize, Serialize};

/// Uniform envelope for every API response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        ApiResponse {
            success: false,
            data: None,
            error: Some(if error.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                error
            }),
        }
    }
}

impl<T, E: ToString> From<Result<T, E>> for ApiResponse<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => ApiResponse::success(data),
            Err(err) => ApiResponse::failure(err.to_string()),
        }
    }
}
