//! Token generation and hashing.
//!
//! API tokens are random and high-entropy, so a single SHA-256 pass with a
//! domain prefix is enough for storage. Plaintext tokens never touch the
//! database.

use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const TOKEN_PREFIX: &str = "pd_";

/// Characters of the token kept in clear for identification in listings.
const VISIBLE_PREFIX_LEN: usize = 8;

/// Hash a secret for storage and lookup.
pub fn hash_secret(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"paydesk-v1:");
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new bearer token, e.g. `pd_3f2a...`.
pub fn generate_token() -> String {
    format!("{}{}", TOKEN_PREFIX, Uuid::new_v4().simple())
}

/// The short visible prefix stored next to the hash.
pub fn token_prefix(token: &str) -> String {
    token.chars().take(VISIBLE_PREFIX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_prefixed() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(a.starts_with(TOKEN_PREFIX));
        assert_eq!(a.len(), TOKEN_PREFIX.len() + 32);
        assert_eq!(token_prefix(&a).len(), 8);
    }

    #[test]
    fn hash_is_stable_and_domain_separated() {
        assert_eq!(hash_secret("pd_abc"), hash_secret("pd_abc"));
        assert_ne!(hash_secret("pd_abc"), hash_secret("pd_abd"));
        let mut plain = Sha256::new();
        plain.update(b"pd_abc");
        assert_ne!(hash_secret("pd_abc"), hex::encode(plain.finalize()));
    }
}
