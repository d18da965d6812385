//! Password hashing and verification.

use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};

/// Input limit of the underlying hashing primitive.
const MAX_PASSWORD_BYTES: usize = 72;

/// Truncate to at most 72 bytes, discarding any partial trailing character.
/// Existing digests were created under this exact rule; changing it would
/// silently invalidate stored credentials.
fn truncate_secret(plaintext: &str) -> &str {
    if plaintext.len() <= MAX_PASSWORD_BYTES {
        return plaintext;
    }

    let mut end = MAX_PASSWORD_BYTES;
    while !plaintext.is_char_boundary(end) {
        end -= 1;
    }

    &plaintext[..end]
}

/// Hash a password with a per-call random salt. Two calls with the same
/// input produce different digests; both verify.
///
/// The cost factor is deliberately high, so callers should run this off the
/// async worker threads.
///
/// # Errors
///
/// Returns an error if the hashing primitive fails.
pub fn hash_password(plaintext: &str) -> Result<String, BcryptError> {
    hash(truncate_secret(plaintext), DEFAULT_COST)
}

/// Check a password against a stored digest using the salt embedded in it.
/// A malformed digest counts as "no match" rather than an error.
#[must_use]
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    verify(truncate_secret(plaintext), digest).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost keeps the truncation tests fast; the truncation path under
    // test is identical regardless of cost.
    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let digest = hash_password("Secr3tPW!").unwrap();

        assert!(verify_password("Secr3tPW!", &digest));
        assert!(!verify_password("wrong-password", &digest));
    }

    #[test]
    fn test_salting_produces_distinct_digests() {
        let first = hash(truncate_secret("Secr3tPW!"), TEST_COST).unwrap();
        let second = hash(truncate_secret("Secr3tPW!"), TEST_COST).unwrap();

        assert_ne!(first, second);
        assert!(verify_password("Secr3tPW!", &first));
        assert!(verify_password("Secr3tPW!", &second));
    }

    #[test]
    fn test_malformed_digest_is_no_match() {
        assert!(!verify_password("Secr3tPW!", "not-a-valid-digest"));
        assert!(!verify_password("Secr3tPW!", ""));
    }

    #[test]
    fn test_truncates_to_72_bytes() {
        let long = "a".repeat(100);
        let truncated = &long[..72];

        // Hash of the full input verifies against a digest of the first 72
        // bytes, and vice versa.
        let digest = hash(truncated, TEST_COST).unwrap();
        assert!(verify_password(&long, &digest));

        let digest = hash(truncate_secret(&long), TEST_COST).unwrap();
        assert!(verify_password(truncated, &digest));
    }

    #[test]
    fn test_truncation_discards_partial_trailing_character() {
        // 71 ASCII bytes followed by a two-byte character straddling the
        // 72-byte boundary; the partial character is dropped entirely.
        let mut long = "a".repeat(71);
        long.push('é');
        long.push_str("trailing");

        assert_eq!(truncate_secret(&long), "a".repeat(71));

        let digest = hash(&"a".repeat(71), TEST_COST).unwrap();
        assert!(verify_password(&long, &digest));
    }

    #[test]
    fn test_short_passwords_untouched() {
        assert_eq!(truncate_secret("Secr3tPW!"), "Secr3tPW!");
        assert_eq!(truncate_secret(""), "");
    }
}
