// handlers/public/auth/signup.rs - POST /signup handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use super::{CredentialsRequest, TokenResponse};
use crate::auth;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::UserStoreError;

/// POST /signup - create an account and return a token
///
/// Responds 201 `{ "message": "User created successfully", "token": ... }`,
/// 400 on missing fields and 409 when the email is taken.
pub async fn signup_post(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let Json(payload) = payload?;
    let (email, password) = payload.into_parts()?;

    // Checked before hashing so duplicates fail fast; create() checks again
    if state.users.exists(&email).await.unwrap_or(false) {
        tracing::warn!("Signup rejected, {} already exists", email);
        return Err(ApiError::conflict("Email already exists"));
    }

    let password_hash = auth::hash_password(password).await?;
    match state.users.create(&email, password_hash).await {
        Ok(_) => {}
        Err(UserStoreError::AlreadyExists(_)) => return Err(ApiError::conflict("Email already exists")),
        Err(e) => {
            tracing::error!("Failed to create user {}: {}", email, e);
            return Err(ApiError::internal_server_error("Failed to create user"));
        }
    }

    let token = state.tokens.issue(&email)?;
    Ok(ApiResponse::created(TokenResponse {
        message: "User created successfully",
        token,
    }))
}
