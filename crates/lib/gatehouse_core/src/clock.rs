//! Clock abstraction.
//!
//! Every component that reasons about expiry or rate-limit windows takes the
//! current time from a [`Clock`] rather than calling `Utc::now()` directly,
//! so tests can advance time deterministically.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
