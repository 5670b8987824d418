use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{self, AuthError, Claims};
use crate::error::ApiError;
use crate::server::AppState;

/// Authenticated caller, inserted as a request extension
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { email: claims.email }
    }
}

/// Bearer token middleware for protected routes
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match extract_jwt_from_headers(&headers).and_then(|token| state.tokens.validate(token)) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
            return ApiError::from(e).into_response();
        }
    };

    request.extensions_mut().insert(AuthUser::from(claims));
    next.run(request).await
}

fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::Invalid("Authorization header is not valid UTF-8".into()))?;

    auth::token_from_header(value)
}
