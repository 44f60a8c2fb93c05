//! # gatehouse_core
//!
//! Authentication core for Gatehouse: credential hashing, signed token
//! codec, rate-limited login, and refresh-token rotation.

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
