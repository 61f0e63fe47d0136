use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::validation::{MAX_PASSWORD_BYTES, MIN_PASSWORD_BYTES, Validator, permitted_email};

/// A registered API user. The password hash is never serialized.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Vec<u8>,
    pub activated: bool,
    pub version: i32,
}

/// Salted password digests.
///
/// The stored form is `salt(16) || sha256(salt || password)`. Verification
/// recomputes the digest from the stored salt.
pub mod password {
    use rand::Rng;
    use sha2::{Digest, Sha256};
    use subtle::ConstantTimeEq;

    const SALT_LEN: usize = 16;

    pub fn hash(plaintext: &str) -> Vec<u8> {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill(&mut salt[..]);
        digest_with_salt(&salt, plaintext)
    }

    /// Constant-time comparison against the stored digest.
    pub fn matches(plaintext: &str, stored: &[u8]) -> bool {
        if stored.len() <= SALT_LEN {
            return false;
        }
        let salt = &stored[..SALT_LEN];
        digest_with_salt(salt, plaintext).ct_eq(stored).into()
    }

    fn digest_with_salt(salt: &[u8], plaintext: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(plaintext.as_bytes());
        let mut out = salt.to_vec();
        out.extend_from_slice(&hasher.finalize());
        out
    }
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "email must be provided");
    v.check(
        permitted_email(email),
        "email",
        "email must be a valid address",
    );
}

pub fn validate_password_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "password", "password must be provided");
    v.check(
        plaintext.len() >= MIN_PASSWORD_BYTES,
        "password",
        "password must be at least 8 bytes long",
    );
    v.check(
        plaintext.len() <= MAX_PASSWORD_BYTES,
        "password",
        "password must not be more than 72 bytes long",
    );
}

pub fn validate_user(v: &mut Validator, user: &User) {
    v.check(!user.name.is_empty(), "name", "name must be provided");
    v.check(
        user.name.len() <= 500,
        "name",
        "name must not be more than 500 bytes long",
    );
    validate_email(v, &user.email);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let stored = password::hash("correct horse battery");
        assert!(password::matches("correct horse battery", &stored));
        assert!(!password::matches("wrong password", &stored));
    }

    #[test]
    fn test_password_hashes_are_salted() {
        let a = password::hash("same input");
        let b = password::hash("same input");
        assert_ne!(a, b);
    }

    #[test]
    fn test_matches_rejects_truncated_hash() {
        assert!(!password::matches("anything", &[0u8; 8]));
    }

    #[test]
    fn test_matches_rejects_single_bit_difference() {
        let mut stored = password::hash("correct horse battery");
        if let Some(last) = stored.last_mut() {
            *last ^= 1;
        }
        assert!(!password::matches("correct horse battery", &stored));
    }

    #[test]
    fn test_short_password_rejected() {
        let mut v = Validator::new();
        validate_password_plaintext(&mut v, "short");
        assert!(v.errors().contains_key("password"));
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut v = Validator::new();
        validate_email(&mut v, "not-an-email");
        assert!(v.errors().contains_key("email"));
    }
}
