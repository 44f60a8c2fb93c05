//! Identity persistence.
//!
//! The auth service only ever reads identities and writes the password hash
//! and login bookkeeping; everything else about user records belongs to the
//! surrounding application.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AuthError, AuthResult};
use crate::models::{Identity, NewIdentity, StoredIdentity};

/// Persistence collaborator for user identities.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up by email or username, excluding soft-deleted accounts.
    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<StoredIdentity>>;

    /// Look up by id, excluding soft-deleted accounts.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<StoredIdentity>>;

    async fn email_exists(&self, email: &str) -> AuthResult<bool>;

    async fn username_exists(&self, username: &str) -> AuthResult<bool>;

    /// Insert a new identity. Unique-index violations surface as
    /// `DuplicateEmail` / `DuplicateUsername`, which covers the race between
    /// the existence checks and the insert.
    async fn create(&self, new: NewIdentity, now: DateTime<Utc>) -> AuthResult<Identity>;

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Stamp `last_login_at` after a successful login.
    async fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> AuthResult<()>;

    async fn set_superuser(&self, id: Uuid, is_superuser: bool, now: DateTime<Utc>)
    -> AuthResult<()>;
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    full_name: Option<String>,
    is_active: bool,
    is_verified: bool,
    is_superuser: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdentityRow {
    fn into_stored(self) -> StoredIdentity {
        StoredIdentity {
            identity: Identity {
                id: self.id,
                email: self.email,
                username: self.username,
                full_name: self.full_name,
                is_active: self.is_active,
                is_verified: self.is_verified,
                is_superuser: self.is_superuser,
                last_login_at: self.last_login_at,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            password_hash: self.password_hash,
        }
    }
}

const IDENTITY_COLUMNS: &str = "id, email, username, password_hash, full_name, \
     is_active, is_verified, is_superuser, last_login_at, created_at, updated_at";

/// PostgreSQL-backed identity store.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<StoredIdentity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM users \
             WHERE (email = $1 OR username = $1) AND deleted_at IS NULL"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(IdentityRow::into_stored))
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<StoredIdentity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(IdentityRow::into_stored))
    }

    async fn email_exists(&self, email: &str) -> AuthResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn username_exists(&self, username: &str) -> AuthResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create(&self, new: NewIdentity, now: DateTime<Utc>) -> AuthResult<Identity> {
        let result = sqlx::query_as::<_, IdentityRow>(&format!(
            "INSERT INTO users (email, username, password_hash, full_name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {IDENTITY_COLUMNS}"
        ))
        .bind(&new.email)
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(&new.full_name)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into_stored().identity),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                match db.constraint() {
                    Some("users_email_key") => Err(AuthError::DuplicateEmail),
                    Some("users_username_key") => Err(AuthError::DuplicateUsername),
                    _ => Err(AuthError::Storage(sqlx::Error::Database(db))),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_superuser(
        &self,
        id: Uuid,
        is_superuser: bool,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query("UPDATE users SET is_superuser = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(is_superuser)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
