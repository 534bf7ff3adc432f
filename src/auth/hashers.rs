//! Salted secret hashing.
//!
//! Stored hashes use the format `$2:<base64 salt>:<base64 digest>` where the
//! digest is SHA-256 over the secret concatenated with the salt. The version
//! marker leaves room to migrate the scheme without rehashing every token at
//! once.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

const HASH_VERSION: &str = "$2";

/// Hash a secret with a fresh random salt, producing a storable string.
pub fn hash_secret(secret: &str) -> String {
    let salt = Uuid::new_v4();
    encode(secret, salt.as_bytes())
}

fn encode(secret: &str, salt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(salt);
    let digest = hasher.finalize();
    format!(
        "{HASH_VERSION}:{}:{}",
        BASE64.encode(salt),
        BASE64.encode(digest)
    )
}

/// Check a presented secret against a stored hash.
///
/// The digest comparison is constant time. A malformed or unrecognized
/// stored hash simply fails the check; the caller maps that to its uniform
/// rejection.
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, ':');
    let (Some(version), Some(salt_b64), Some(digest_b64)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if version != HASH_VERSION {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (BASE64.decode(salt_b64), BASE64.decode(digest_b64)) else {
        return false;
    };

    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(&salt);
    let actual = hasher.finalize();

    // ct_eq on differing lengths is a plain false, not a panic.
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let stored = hash_secret("s3cret");
        assert!(verify_secret("s3cret", &stored));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let stored = hash_secret("s3cret");
        assert!(!verify_secret("not-the-secret", &stored));
    }

    #[test]
    fn test_hashes_are_salted() {
        // Same secret, different salt, different stored value.
        assert_ne!(hash_secret("s3cret"), hash_secret("s3cret"));
    }

    #[test]
    fn test_stored_format() {
        let stored = hash_secret("s3cret");
        assert!(stored.starts_with("$2:"));
        assert_eq!(stored.split(':').count(), 3);
    }

    #[test]
    fn test_malformed_stored_hash() {
        assert!(!verify_secret("s3cret", ""));
        assert!(!verify_secret("s3cret", "plaintext"));
        assert!(!verify_secret("s3cret", "$2:only-two"));
        assert!(!verify_secret("s3cret", "$9:AAAA:AAAA"));
        assert!(!verify_secret("s3cret", "$2:!!!:AAAA"));
    }

    #[test]
    fn test_known_vector() {
        let stored = encode("s3cret", b"0123456789abcdef");
        assert!(verify_secret("s3cret", &stored));
        assert!(!verify_secret("S3cret", &stored));
    }
}
