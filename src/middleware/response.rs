use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;

/// JSON response body with a status code. Bodies are sent as-is, without an envelope.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub body: T,
    pub status_code: StatusCode,
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

impl<T: Serialize> ApiResponse<T> {
    pub fn success(body: T) -> Self {
        Self::with_status(body, StatusCode::OK)
    }

    pub fn with_status(body: T, status_code: StatusCode) -> Self {
        Self { body, status_code }
    }

    pub fn created(body: T) -> Self {
        Self::with_status(body, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.body) {
            Ok(value) => (self.status_code, Json(value)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response body: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to serialize response body",
                        "code": "INTERNAL_SERVER_ERROR"
                    })),
                )
                    .into_response()
            }
        }
    }
}
