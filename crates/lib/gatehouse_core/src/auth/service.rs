//! Auth service — orchestrates the hasher, codec, ledger and stores into the
//! register / login / refresh / logout operations.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::attempts::{AttemptLedger, PgAttemptLedger};
use super::identity::{IdentityStore, PgIdentityStore};
use super::jwt::TokenCodec;
use super::password::{
    hash_password, validate_password_strength, validate_username, verify_password,
};
use super::refresh::{PgRefreshTokenStore, RefreshTokenStore};
use super::{AuthError, AuthResult};
use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::models::{Claims, Identity, NewIdentity, TokenKind, TokenPair};

/// The authentication service.
///
/// Stateless apart from its collaborators; correctness under concurrency is
/// delegated to the storage layer (unique indexes, transactional rotation).
pub struct AuthService {
    identities: Arc<dyn IdentityStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    attempts: Arc<dyn AttemptLedger>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl AuthService {
    /// Assemble a service from explicit collaborators.
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        attempts: Arc<dyn AttemptLedger>,
        codec: TokenCodec,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            identities,
            refresh_tokens,
            attempts,
            codec,
            clock,
            config,
        }
    }

    /// Wire up the PostgreSQL-backed collaborators over a shared pool.
    pub fn postgres(pool: PgPool, jwt_secret: &[u8], config: AuthConfig) -> Self {
        let attempts = PgAttemptLedger::new(
            pool.clone(),
            config.rate_limit_window,
            config.rate_limit_max_attempts,
        );
        Self::new(
            Arc::new(PgIdentityStore::new(pool.clone())),
            Arc::new(PgRefreshTokenStore::new(pool)),
            Arc::new(attempts),
            TokenCodec::new(jwt_secret),
            Arc::new(SystemClock),
            config,
        )
    }

    /// Create an account. Does not issue tokens; the caller logs in next.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> AuthResult<Identity> {
        validate_username(username)?;
        validate_password_strength(password, &self.config.password_policy)?;

        if self.identities.email_exists(email).await? {
            return Err(AuthError::DuplicateEmail);
        }
        if self.identities.username_exists(username).await? {
            return Err(AuthError::DuplicateUsername);
        }

        let password_hash = hash_password(password, self.config.hash_cost)?;
        let identity = self
            .identities
            .create(
                NewIdentity {
                    email: email.to_string(),
                    username: username.to_string(),
                    password_hash,
                    full_name: full_name.map(str::to_string),
                },
                self.clock.now(),
            )
            .await?;

        info!(
            user_id = %identity.id,
            email = %identity.email,
            username = %identity.username,
            "user registered"
        );
        Ok(identity)
    }

    /// Authenticate and issue an access/refresh token pair.
    ///
    /// `identifier` may be the email or the username; `origin` is the caller
    /// IP or equivalent. Rate limiting is scoped to the exact
    /// `(identifier, origin)` pair.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        origin: &str,
        user_agent: Option<&str>,
    ) -> AuthResult<(Identity, TokenPair)> {
        let now = self.clock.now();

        if self.attempts.is_blocked(identifier, origin, now).await? {
            let retry_after = self.attempts.retry_after(identifier, origin, now).await?;
            self.attempts
                .record(identifier, origin, None, user_agent, false, now)
                .await?;
            warn!(identifier, origin, "login blocked by rate limit");
            return Err(AuthError::RateLimited { retry_after });
        }

        let Some(stored) = self.identities.find_by_identifier(identifier).await? else {
            // Record the miss so unknown identifiers consume attempts the
            // same way wrong passwords do.
            self.attempts
                .record(identifier, origin, None, user_agent, false, now)
                .await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &stored.password_hash)? {
            self.attempts
                .record(
                    identifier,
                    origin,
                    Some(stored.identity.id),
                    user_agent,
                    false,
                    now,
                )
                .await?;
            return Err(AuthError::InvalidCredentials);
        }

        if !stored.identity.is_active {
            // Correct credentials for a disabled account: surfaced as its own
            // kind and not counted against the rate limit.
            return Err(AuthError::AccountDisabled);
        }

        self.attempts
            .record(
                identifier,
                origin,
                Some(stored.identity.id),
                user_agent,
                true,
                now,
            )
            .await?;
        self.identities.record_login(stored.identity.id, now).await?;

        let pair = self.issue_pair(stored.identity.id, now)?;
        self.refresh_tokens
            .persist(
                stored.identity.id,
                &pair.refresh_token,
                now + self.config.refresh_ttl,
            )
            .await?;

        let mut identity = stored.identity;
        identity.last_login_at = Some(now);

        info!(user_id = %identity.id, origin, "user login");
        Ok((identity, pair))
    }

    /// Exchange a refresh token for a new pair, rotating the old one out.
    ///
    /// The self-contained expiry check fires before any store lookup; a
    /// signature-valid token that is absent or revoked in the store fails
    /// `TokenRevoked`.
    pub async fn refresh(&self, raw_refresh_token: &str) -> AuthResult<TokenPair> {
        let now = self.clock.now();

        let claims = self.codec.verify(raw_refresh_token, TokenKind::Refresh, now)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::TokenInvalid)?;

        if !self.refresh_tokens.is_valid(raw_refresh_token, now).await? {
            // A rotated-out token presented again is the replay signal.
            warn!(user_id = %user_id, jti = %claims.jti, "refresh token not in store or revoked");
            return Err(AuthError::TokenRevoked);
        }

        let stored = self
            .identities
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::TokenRevoked)?;
        if !stored.identity.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let pair = self.issue_pair(user_id, now)?;
        self.refresh_tokens
            .rotate(
                raw_refresh_token,
                user_id,
                &pair.refresh_token,
                now + self.config.refresh_ttl,
                now,
            )
            .await?;

        info!(user_id = %user_id, "token refreshed");
        Ok(pair)
    }

    /// Revoke a refresh token. Always succeeds, whether or not the token was
    /// valid, so callers learn nothing about token state.
    pub async fn logout(&self, raw_refresh_token: &str) -> AuthResult<()> {
        self.refresh_tokens
            .revoke(raw_refresh_token, self.clock.now())
            .await
    }

    /// Revoke every active session for a user ("log out everywhere").
    pub async fn logout_all(&self, user_id: Uuid) -> AuthResult<()> {
        let now = self.clock.now();
        self.refresh_tokens.revoke_all_for_user(user_id, now).await?;
        info!(user_id = %user_id, "all sessions revoked");
        Ok(())
    }

    /// Change a password after re-verifying the current one. Revokes all
    /// outstanding refresh tokens so stolen sessions die with the old
    /// password.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let now = self.clock.now();

        let stored = self
            .identities
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(current_password, &stored.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        validate_password_strength(new_password, &self.config.password_policy)?;
        let password_hash = hash_password(new_password, self.config.hash_cost)?;

        self.identities
            .update_password(user_id, &password_hash, now)
            .await?;
        self.refresh_tokens.revoke_all_for_user(user_id, now).await?;

        info!(user_id = %user_id, "password changed, sessions revoked");
        Ok(())
    }

    /// Verify an access token for request authentication.
    pub fn verify_access_token(&self, token: &str) -> AuthResult<Claims> {
        self.codec.verify(token, TokenKind::Access, self.clock.now())
    }

    /// How many login attempts remain for a pair before it is blocked.
    pub async fn remaining_attempts(&self, identifier: &str, origin: &str) -> AuthResult<u32> {
        self.attempts
            .remaining_attempts(identifier, origin, self.clock.now())
            .await
    }

    fn issue_pair(&self, user_id: Uuid, now: chrono::DateTime<chrono::Utc>) -> AuthResult<TokenPair> {
        let access_token = self
            .codec
            .issue(user_id, TokenKind::Access, self.config.access_ttl, now)?;
        let refresh_token = self
            .codec
            .issue(user_id, TokenKind::Refresh, self.config.refresh_ttl, now)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.config.access_ttl_secs(),
        })
    }
}
