//! Authentication configuration.

use chrono::Duration;

/// Password complexity policy.
///
/// Length, uppercase, lowercase and digit requirements are always on; the
/// special-character requirement is a product choice and off by default.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
        }
    }
}

/// Tunables for the auth service, fixed at construction time.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access token lifetime.
    pub access_ttl: Duration,
    /// Refresh token lifetime.
    pub refresh_ttl: Duration,
    /// bcrypt cost factor for password hashing.
    pub hash_cost: u32,
    /// Trailing window over which failed login attempts are counted.
    pub rate_limit_window: Duration,
    /// Failed attempts per (identifier, origin) pair before login is blocked.
    pub rate_limit_max_attempts: u32,
    /// Password complexity requirements for register / change-password.
    pub password_policy: PasswordPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(30),
            hash_cost: 12,
            rate_limit_window: Duration::minutes(15),
            rate_limit_max_attempts: 5,
            password_policy: PasswordPolicy::default(),
        }
    }
}

impl AuthConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                          | Default |
    /// |-----------------------------------|---------|
    /// | `GATEHOUSE_ACCESS_TTL_SECS`       | `900`   |
    /// | `GATEHOUSE_REFRESH_TTL_SECS`      | `2592000` (30 days) |
    /// | `GATEHOUSE_HASH_COST`             | `12`    |
    /// | `GATEHOUSE_RATE_LIMIT_WINDOW_SECS`| `900`   |
    /// | `GATEHOUSE_RATE_LIMIT_MAX_ATTEMPTS`| `5`    |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            access_ttl: env_secs("GATEHOUSE_ACCESS_TTL_SECS").unwrap_or(defaults.access_ttl),
            refresh_ttl: env_secs("GATEHOUSE_REFRESH_TTL_SECS").unwrap_or(defaults.refresh_ttl),
            hash_cost: env_parse("GATEHOUSE_HASH_COST").unwrap_or(defaults.hash_cost),
            rate_limit_window: env_secs("GATEHOUSE_RATE_LIMIT_WINDOW_SECS")
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_max_attempts: env_parse("GATEHOUSE_RATE_LIMIT_MAX_ATTEMPTS")
                .unwrap_or(defaults.rate_limit_max_attempts),
            password_policy: defaults.password_policy,
        }
    }

    /// Access token lifetime in whole seconds, as surfaced to clients.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<i64>(name).map(Duration::seconds)
}
