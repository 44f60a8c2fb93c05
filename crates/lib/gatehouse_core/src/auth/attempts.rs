//! Login attempt ledger.
//!
//! Append-only record of login attempts, queried in aggregate to decide
//! whether a `(identifier, origin)` pair is currently blocked. The window is
//! sliding: a successful login does not clear earlier failures, they simply
//! age out.
//!
//! This is an injected collaborator rather than a process-local cache so the
//! limit holds across every server process sharing the store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthResult;
use crate::uuid::uuidv7;

/// Records login attempts and computes the rate-limit state for an
/// `(identifier, origin)` pair.
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    /// Trailing window over which failures are counted.
    fn window(&self) -> Duration;

    /// Failures within the window before the pair is blocked.
    fn max_attempts(&self) -> u32;

    /// Append an attempt. Never fails except on storage unavailability.
    async fn record(
        &self,
        identifier: &str,
        origin: &str,
        user_id: Option<Uuid>,
        user_agent: Option<&str>,
        success: bool,
        now: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Failed attempts for this exact pair within the trailing window.
    async fn failed_count(
        &self,
        identifier: &str,
        origin: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<u32>;

    /// Timestamp of the oldest counted failure, for retry-after computation.
    async fn oldest_failure(
        &self,
        identifier: &str,
        origin: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<DateTime<Utc>>>;

    async fn is_blocked(&self, identifier: &str, origin: &str, now: DateTime<Utc>) -> AuthResult<bool> {
        Ok(self.failed_count(identifier, origin, now).await? >= self.max_attempts())
    }

    async fn remaining_attempts(
        &self,
        identifier: &str,
        origin: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<u32> {
        let failed = self.failed_count(identifier, origin, now).await?;
        Ok(self.max_attempts().saturating_sub(failed))
    }

    /// When the block lifts: the oldest counted failure plus the window.
    async fn retry_after(
        &self,
        identifier: &str,
        origin: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<DateTime<Utc>>> {
        let oldest = self.oldest_failure(identifier, origin, now).await?;
        Ok(oldest.map(|t| t + self.window()))
    }
}

/// PostgreSQL-backed attempt ledger over the `login_attempts` table.
#[derive(Clone)]
pub struct PgAttemptLedger {
    pool: PgPool,
    window: Duration,
    max_attempts: u32,
}

impl PgAttemptLedger {
    pub fn new(pool: PgPool, window: Duration, max_attempts: u32) -> Self {
        Self {
            pool,
            window,
            max_attempts,
        }
    }
}

#[async_trait]
impl AttemptLedger for PgAttemptLedger {
    fn window(&self) -> Duration {
        self.window
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    async fn record(
        &self,
        identifier: &str,
        origin: &str,
        user_id: Option<Uuid>,
        user_agent: Option<&str>,
        success: bool,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO login_attempts \
             (id, identifier, user_id, origin, user_agent, success, attempted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(uuidv7())
        .bind(identifier)
        .bind(user_id)
        .bind(origin)
        .bind(user_agent)
        .bind(success)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn failed_count(
        &self,
        identifier: &str,
        origin: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<u32> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM login_attempts \
             WHERE identifier = $1 AND origin = $2 \
               AND success = FALSE AND attempted_at >= $3",
        )
        .bind(identifier)
        .bind(origin)
        .bind(now - self.window)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.try_into().unwrap_or(u32::MAX))
    }

    async fn oldest_failure(
        &self,
        identifier: &str,
        origin: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<DateTime<Utc>>> {
        let oldest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MIN(attempted_at) FROM login_attempts \
             WHERE identifier = $1 AND origin = $2 \
               AND success = FALSE AND attempted_at >= $3",
        )
        .bind(identifier)
        .bind(origin)
        .bind(now - self.window)
        .fetch_one(&self.pool)
        .await?;
        Ok(oldest)
    }
}
