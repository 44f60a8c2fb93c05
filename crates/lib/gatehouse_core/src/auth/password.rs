//! Password hashing and credential policy via bcrypt.

use super::{AuthError, AuthResult};
use crate::config::PasswordPolicy;

/// Hash a password with bcrypt and a random salt.
pub fn hash_password(password: &str, cost: u32) -> AuthResult<String> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
///
/// A mismatch is `Ok(false)`; only an unparseable stored hash is an error.
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// Check a candidate password against the complexity policy.
///
/// Collects every violated rule so callers can report them all at once.
pub fn validate_password_strength(password: &str, policy: &PasswordPolicy) -> AuthResult<()> {
    let mut errors = Vec::new();

    // Length is in characters, not bytes, so multibyte passwords are not
    // over-counted.
    if password.chars().count() < policy.min_length {
        errors.push(format!(
            "must be at least {} characters long",
            policy.min_length
        ));
    }
    if policy.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("must contain at least one uppercase letter".to_string());
    }
    if policy.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("must contain at least one lowercase letter".to_string());
    }
    if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("must contain at least one number".to_string());
    }
    if policy.require_special && password.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.push("must contain at least one special character".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::WeakPassword(errors.join("; ")))
    }
}

/// Check a username: 3..=50 chars, letters/digits/underscore/hyphen only.
pub fn validate_username(username: &str) -> AuthResult<()> {
    let length = username.chars().count();
    if length < 3 {
        return Err(AuthError::InvalidUsername(
            "must be at least 3 characters long".to_string(),
        ));
    }
    if length > 50 {
        return Err(AuthError::InvalidUsername(
            "must be at most 50 characters long".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AuthError::InvalidUsername(
            "may only contain letters, numbers, underscores, and hyphens".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // bcrypt's minimum cost (4) keeps the hashing tests fast; production uses the configured cost.
    const COST: u32 = 4;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("Sup3rSecret", COST).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("Sup3rSecret", &hash).unwrap());
    }

    #[test]
    fn wrong_password_is_rejected_without_error() {
        let hash = hash_password("Sup3rSecret", COST).unwrap();
        assert!(!verify_password("NotTheSecret1", &hash).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("Sup3rSecret", COST).unwrap();
        let b = hash_password("Sup3rSecret", COST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_stored_hash_is_an_error() {
        assert!(verify_password("whatever", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn policy_collects_all_violations() {
        let policy = PasswordPolicy::default();
        let err = validate_password_strength("short", &policy).unwrap_err();
        let AuthError::WeakPassword(msg) = err else {
            panic!("expected WeakPassword");
        };
        assert!(msg.contains("at least 8 characters"));
        assert!(msg.contains("uppercase"));
        assert!(msg.contains("number"));
    }

    #[test]
    fn length_rule_counts_characters_not_bytes() {
        let policy = PasswordPolicy::default();
        // 8 characters, more than 8 bytes.
        assert!(validate_password_strength("Pässw0rd", &policy).is_ok());
        // 7 characters that encode to 8+ bytes still fail.
        assert!(validate_password_strength("Päss0rä", &policy).is_err());
    }

    #[test]
    fn policy_accepts_compliant_password() {
        let policy = PasswordPolicy::default();
        assert!(validate_password_strength("Passw0rd!", &policy).is_ok());
    }

    #[test]
    fn special_character_requirement_is_opt_in() {
        let policy = PasswordPolicy {
            require_special: true,
            ..PasswordPolicy::default()
        };
        assert!(validate_password_strength("Passw0rdd", &policy).is_err());
        assert!(validate_password_strength("Passw0rd!", &policy).is_ok());
    }

    #[test]
    fn username_format_is_enforced() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("al-ice_2").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("alice!").is_err());
    }
}
