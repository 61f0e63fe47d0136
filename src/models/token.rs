use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::validation::Validator;

/// Plaintext token length handed to clients.
pub const TOKEN_PLAINTEXT_LEN: usize = 26;

/// Base32-style alphabet used for token plaintexts (no padding characters).
const TOKEN_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// What a token is good for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    Activation,
    Authentication,
}

impl TokenScope {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenScope::Activation => "activation",
            TokenScope::Authentication => "authentication",
        }
    }
}

/// A stateless bearer token. The plaintext is shown to the client exactly
/// once; only the SHA-256 hash is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip_serializing)]
    pub hash: Vec<u8>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub scope: TokenScope,
}

impl Token {
    /// Generate a fresh token for `user_id` valid for `ttl`.
    pub fn generate(user_id: i64, ttl: Duration, scope: TokenScope) -> Self {
        let mut rng = rand::rng();
        let plaintext: String = (0..TOKEN_PLAINTEXT_LEN)
            .map(|_| {
                let idx = rng.random_range(0..TOKEN_ALPHABET.len());
                TOKEN_ALPHABET[idx] as char
            })
            .collect();

        let hash = hash_token(&plaintext);
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1));

        Self {
            plaintext,
            hash,
            user_id,
            expiry: Utc::now() + ttl,
            scope,
        }
    }
}

/// SHA-256 digest of a token plaintext, the stored lookup key.
pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Shape check applied before any store lookup.
pub fn validate_token_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "token must be provided");
    v.check(
        plaintext.len() == TOKEN_PLAINTEXT_LEN,
        "token",
        "token must be 26 bytes long",
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let token = Token::generate(1, Duration::from_secs(24 * 60 * 60), TokenScope::Authentication);
        assert_eq!(token.plaintext.len(), TOKEN_PLAINTEXT_LEN);
        assert!(
            token
                .plaintext
                .bytes()
                .all(|b| TOKEN_ALPHABET.contains(&b))
        );
        assert_eq!(token.hash, hash_token(&token.plaintext));
        assert!(token.expiry > Utc::now());
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = Token::generate(1, Duration::from_secs(3600), TokenScope::Activation);
        let b = Token::generate(1, Duration::from_secs(3600), TokenScope::Activation);
        assert_ne!(a.plaintext, b.plaintext);
    }

    #[test]
    fn test_plaintext_length_validation() {
        let mut v = Validator::new();
        validate_token_plaintext(&mut v, "too-short");
        assert!(v.errors().contains_key("token"));

        let mut v = Validator::new();
        validate_token_plaintext(&mut v, &"A".repeat(26));
        assert!(v.is_valid());
    }
}
