//! Refresh token store.
//!
//! Persists issued refresh tokens by SHA-256 hash so the server can revoke
//! them independently of signature validity, and so read access to the store
//! never yields a usable raw token. SHA-256 rather than bcrypt: the raw
//! token is a signed high-entropy string, so the slow hash buys nothing and
//! the lookup must stay cheap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AuthError, AuthResult};
use crate::uuid::uuidv7;

/// SHA-256 hash a raw token for storage and lookup.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Server-side registry of issued refresh tokens.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Store the hash of a newly issued token.
    async fn persist(
        &self,
        user_id: Uuid,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// True iff the token's hash is present, unrevoked, and unexpired.
    async fn is_valid(&self, raw_token: &str, now: DateTime<Utc>) -> AuthResult<bool>;

    /// Set `revoked_at` on the matching record. Idempotent: revoking an
    /// already-revoked or unknown token is not an error.
    async fn revoke(&self, raw_token: &str, now: DateTime<Utc>) -> AuthResult<()>;

    /// Revoke every active token for an identity (password change,
    /// "log out everywhere").
    async fn revoke_all_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AuthResult<()>;

    /// Rotation: revoke the presented token and persist its replacement as
    /// one atomic step, so a crash in between cannot leave the old token
    /// usable alongside the new one.
    ///
    /// Fails `TokenRevoked` (persisting nothing) if the presented token is
    /// no longer active. Two racing rotations of the same token would
    /// otherwise both commit a replacement, and a single leaked token could
    /// mint two live session chains.
    async fn rotate(
        &self,
        old_raw_token: &str,
        user_id: Uuid,
        new_raw_token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AuthResult<()>;
}

/// PostgreSQL-backed refresh token store over the `refresh_tokens` table.
#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn persist(
        &self,
        user_id: Uuid,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(uuidv7())
        .bind(user_id)
        .bind(hash_token(raw_token))
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_valid(&self, raw_token: &str, now: DateTime<Utc>) -> AuthResult<bool> {
        let valid = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(\
               SELECT 1 FROM refresh_tokens \
               WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > $2)",
        )
        .bind(hash_token(raw_token))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(valid)
    }

    async fn revoke(&self, raw_token: &str, now: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 \
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(hash_token(raw_token))
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 \
             WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn rotate(
        &self,
        old_raw_token: &str,
        user_id: Uuid,
        new_raw_token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 \
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(hash_token(old_raw_token))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // A concurrent rotation of the same token got here first; do not
        // commit a second replacement.
        if revoked.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AuthError::TokenRevoked);
        }

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(uuidv7())
        .bind(user_id)
        .bind(hash_token(new_raw_token))
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_stable_hex() {
        let h = hash_token("some-raw-token");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_token("some-raw-token"));
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_tokens_hash_differently() {
        assert_ne!(hash_token("token-a"), hash_token("token-b"));
    }
}
