//! Authentication
//!
//! The CRM has a single agent account configured through `CRM_ADMIN_EMAIL`
//! and an Argon2 `CRM_ADMIN_PASSWORD_HASH`. A successful login returns an
//! HS256 JWT that every `/api/v1` route except login requires.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ApiConfig;

/// Role carried by the agent's token
pub const AGENT_ROLE: &str = "agent";

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the agent's email)
    pub sub: String,
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing or malformed Authorization header")]
    MissingToken,
    #[error("Login is not configured")]
    NotConfigured,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Creates a signed token for `subject`
pub fn create_token(
    subject: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: subject.to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a token and returns its claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Pulls the token out of a `Bearer` Authorization header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Hashes a password into an Argon2 PHC string
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Checks a password against an Argon2 PHC string
pub fn verify_password(password: &str, phc: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(phc).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Verifies the agent's credentials and issues a token
pub fn authenticate(config: &ApiConfig, email: &str, password: &str) -> Result<String, AuthError> {
    if config.admin_password_hash.is_empty() {
        return Err(AuthError::NotConfigured);
    }
    let email_matches = email.trim().eq_ignore_ascii_case(config.admin_email.trim());
    let password_matches = verify_password(password, &config.admin_password_hash)?;
    if !(email_matches && password_matches) {
        return Err(AuthError::InvalidCredentials);
    }
    create_token(
        &config.admin_email,
        vec![AGENT_ROLE.to_string()],
        &config.jwt_secret,
        config.jwt_expiration_secs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let token = create_token("agent@example.com", vec![AGENT_ROLE.into()], "secret", 60).unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "agent@example.com");
        assert_eq!(claims.roles, vec!["agent".to_string()]);
        assert!(matches!(validate_token(&token, "other"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let claims = Claims {
            sub: "a".into(),
            roles: vec![],
            exp: (Utc::now() - Duration::hours(1)).timestamp(),
            iat: (Utc::now() - Duration::hours(2)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s")).unwrap();
        assert!(matches!(validate_token(&token, "s"), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(bearer_token(Some("Basic abc")).is_err());
        assert!(bearer_token(Some("Bearer ")).is_err());
        assert!(bearer_token(None).is_err());
    }

    #[test]
    fn test_authenticate() {
        let config = ApiConfig {
            admin_email: "agent@example.com".into(),
            admin_password_hash: hash_password("hunter2").unwrap(),
            ..ApiConfig::default()
        };
        assert!(authenticate(&config, "Agent@Example.com", "hunter2").is_ok());
        assert!(matches!(
            authenticate(&config, "agent@example.com", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&config, "someone@example.com", "hunter2"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_login_refused_without_hash() {
        let config = ApiConfig::default();
        assert!(matches!(
            authenticate(&config, &config.admin_email, "x"),
            Err(AuthError::NotConfigured)
        ));
    }
}
