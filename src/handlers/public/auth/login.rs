// handlers/public/auth/login.rs - POST /login handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use super::{CredentialsRequest, TokenResponse};
use crate::auth;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

/// POST /login - exchange credentials for a token
///
/// Unknown emails and wrong passwords get the same 401 so callers cannot
/// probe which accounts exist.
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let Json(payload) = payload?;
    let (email, password) = payload.into_parts()?;

    let Some(user) = state.users.find(&email).await? else {
        tracing::warn!("Login failed for unknown user {}", email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if !auth::verify_password(password, user.password_hash).await? {
        tracing::warn!("Login failed for {}: wrong password", email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = state.tokens.issue(&email)?;
    tracing::info!("User {} logged in", email);
    Ok(ApiResponse::success(TokenResponse {
        message: "Login successful",
        token,
    }))
}
