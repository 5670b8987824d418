use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(email: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            email: email.into(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is missing")]
    MissingToken,

    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("JWT secret is not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("password hashing error: {0}")]
    Hash(String),
}

/// Issues and validates HS256 bearer tokens signed with `SECRET_KEY`.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(security.secret_key.clone(), Duration::days(security.token_ttl_days))
    }

    pub fn issue(&self, email: &str) -> Result<String, AuthError> {
        self.sign(&Claims::new(email, self.ttl))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Validate a token and extract its claims
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            })
    }
}

/// Extract the token from an `Authorization` header value. The `Bearer ` prefix is optional.
pub fn token_from_header(value: &str) -> Result<&str, AuthError> {
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Hash a password with bcrypt on the blocking pool
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Verify a password against a stored bcrypt hash on the blocking pool.
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?;

    match verified {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret-key-12345", Duration::days(30))
    }

    #[test]
    fn issued_token_round_trips() {
        let svc = service();
        let token = svc.issue("analyst@agency.gov").unwrap();
        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims.email, "analyst@agency.gov");
        assert_eq!(claims.exp - claims.iat, Duration::days(30).num_seconds());
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let svc = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            email: "old@agency.gov".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = svc.sign(&claims).unwrap();
        assert!(matches!(svc.validate(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn different_secrets_reject() {
        let token = service().issue("a@b.gov").unwrap();
        let other = TokenService::new("another-secret", Duration::days(1));
        assert!(matches!(other.validate(&token), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert!(matches!(service().validate("invalid.token.here"), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let svc = TokenService::new("", Duration::days(1));
        assert!(matches!(svc.issue("a@b.gov"), Err(AuthError::InvalidSecret)));
        assert!(matches!(svc.validate("x.y.z"), Err(AuthError::InvalidSecret)));
    }

    #[test]
    fn bearer_prefix_is_optional() {
        assert_eq!(token_from_header("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(token_from_header("abc.def").unwrap(), "abc.def");
        assert!(matches!(token_from_header("Bearer "), Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hash = hash_password("TestPassword123!".into()).await.unwrap();
        assert!(verify_password("TestPassword123!".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".into(), hash).await.unwrap());
        assert!(!verify_password("x".into(), "not-a-hash".into()).await.unwrap());
    }
}
