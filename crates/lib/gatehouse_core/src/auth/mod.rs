//! Authentication core.
//!
//! Credential hashing, the signed token codec, the login-attempt ledger,
//! the refresh-token store, and the service that orchestrates them.

pub mod attempts;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod refresh;
pub mod service;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Authentication errors.
///
/// Every failure an auth operation can report. `InvalidCredentials` is
/// deliberately identical for "no such user" and "wrong password" so callers
/// cannot enumerate accounts. The token variants are distinguished for
/// logging; HTTP layers are expected to surface them all as a generic
/// authentication failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Username already taken")]
    DuplicateUsername,

    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Too many login attempts. Please try again later.")]
    RateLimited {
        /// When the oldest counted failure ages out of the window.
        retry_after: Option<DateTime<Utc>>,
    },

    #[error("User account is inactive")]
    AccountDisabled,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Malformed token")]
    TokenMalformed,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code for API layers and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::DuplicateEmail => "EMAIL_EXISTS",
            AuthError::DuplicateUsername => "USERNAME_EXISTS",
            AuthError::WeakPassword(_) => "WEAK_PASSWORD",
            AuthError::InvalidUsername(_) => "INVALID_USERNAME",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            AuthError::AccountDisabled => "USER_INACTIVE",
            AuthError::TokenInvalid => "TOKEN_INVALID",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenMalformed => "TOKEN_MALFORMED",
            AuthError::TokenRevoked => "TOKEN_REVOKED",
            AuthError::Storage(_) => "DATABASE_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
