// handlers/public/auth/mod.rs - Token acquisition endpoints

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub mod login;
pub mod signup;
pub mod utils;

pub use login::login_post;
pub use signup::signup_post;

/// Body of POST /signup and POST /login
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsRequest {
    /// Normalized email and password. Both must be present and non-empty.
    pub fn into_parts(self) -> Result<(String, String), ApiError> {
        let email = self.email.as_deref().map(utils::normalize_email).unwrap_or_default();
        let password = self.password.unwrap_or_default();

        if email.is_empty() || password.is_empty() {
            return Err(ApiError::bad_request("Email and password required"));
        }
        utils::validate_email_format(&email).map_err(ApiError::bad_request)?;

        Ok((email, password))
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub message: &'static str,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: Option<&str>, password: Option<&str>) -> CredentialsRequest {
        CredentialsRequest {
            email: email.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn both_fields_required() {
        for req in [
            request(None, Some("pw")),
            request(Some("a@b.gov"), None),
            request(Some("  "), Some("pw")),
            request(Some("a@b.gov"), Some("")),
        ] {
            let err = req.into_parts().unwrap_err();
            assert_eq!(err.message(), "Email and password required");
        }
    }

    #[test]
    fn email_is_normalized() {
        let (email, password) = request(Some(" Analyst@Agency.GOV "), Some("secret")).into_parts().unwrap();
        assert_eq!(email, "analyst@agency.gov");
        assert_eq!(password, "secret");
    }

    #[test]
    fn malformed_email_is_rejected() {
        let err = request(Some("not-an-email"), Some("pw")).into_parts().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
