use axum::extract::rejection::JsonRejection;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::AuthError;
use crate::services::user_service::UserStoreError;

/// Every error a handler can return. The `Display` text is what the client sees.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    InvalidJson(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InternalServerError(String),
    /// 500 that also reports `details` to the caller
    #[error("{message}")]
    ProcessingFailed { message: String, details: String },
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::InternalServerError(message.into())
    }

    pub fn processing_failed(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ProcessingFailed {
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InternalServerError(_) | Self::ProcessingFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(msg)
            | Self::InvalidJson(msg)
            | Self::Unauthorized(msg)
            | Self::Conflict(msg)
            | Self::InternalServerError(msg)
            | Self::ServiceUnavailable(msg) => msg,
            Self::ProcessingFailed { message, .. } => message,
        }
    }

    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InvalidJson(_) => "INVALID_JSON",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Conflict(_) => "CONFLICT",
            Self::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            Self::ProcessingFailed { .. } => "PROCESSING_FAILED",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
            "code": self.code(),
        });
        if let Self::ProcessingFailed { details, .. } = self {
            body["details"] = json!(details);
        }
        body
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => Self::unauthorized("Token is missing"),
            AuthError::Expired => Self::unauthorized("Token has expired"),
            AuthError::Invalid(reason) => {
                tracing::debug!("Rejected token: {}", reason);
                Self::unauthorized("Invalid token")
            }
            AuthError::InvalidSecret => {
                tracing::error!("SECRET_KEY is not configured");
                Self::internal_server_error("Authentication is not configured")
            }
            AuthError::TokenGeneration(msg) => {
                tracing::error!("JWT generation error: {}", msg);
                Self::internal_server_error("Failed to issue token")
            }
            AuthError::Hash(msg) => {
                tracing::error!("Password hashing error: {}", msg);
                Self::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<UserStoreError> for ApiError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::AlreadyExists(_) => Self::conflict("Email already exists"),
            UserStoreError::Storage(e) => {
                tracing::error!("User storage error: {}", e);
                Self::service_unavailable("User storage temporarily unavailable")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidJson(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
