//! Signed token codec (HS256 JWTs).
//!
//! Issues and verifies both access and refresh tokens. The two kinds share a
//! format and differ only in the `type` claim and lifetime; verification
//! always pins the expected kind so a refresh token cannot stand in for an
//! access token.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::info;
use uuid::Uuid;

use super::{AuthError, AuthResult};
use crate::models::{Claims, TokenKind};
use crate::uuid::uuidv7;

/// Issues and verifies signed tokens with a server-held symmetric secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a signed token for `subject` with claims
    /// `{sub, type, iat: now, exp: now + ttl, jti}`.
    pub fn issue(
        &self,
        subject: Uuid,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<String> {
        let claims = Claims {
            sub: subject.to_string(),
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: uuidv7().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify signature, expiry and kind, returning the claims.
    ///
    /// Expiry is compared against the caller-supplied `now` with zero leeway,
    /// so the clock collaborator governs token lifetime rather than the
    /// process wall clock.
    pub fn verify(
        &self,
        token: &str,
        expected_kind: TokenKind,
        now: DateTime<Utc>,
    ) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is checked below against the injected clock.
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::TokenInvalid,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => AuthError::TokenMalformed,
                _ => AuthError::TokenInvalid,
            }
        })?;

        let claims = data.claims;
        if claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }
        if claims.kind != expected_kind {
            return Err(AuthError::TokenInvalid);
        }
        Ok(claims)
    }
}

/// Resolve the JWT signing secret: `GATEHOUSE_JWT_SECRET` env, else a
/// persisted per-installation secret (generated on first use).
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("GATEHOUSE_JWT_SECRET") {
        if !secret.is_empty() {
            return secret;
        }
    }

    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let secret: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gatehouse")
        .join("jwt-secret")
}
