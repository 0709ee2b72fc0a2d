//! Body content integrity.
//!
//! The client declares the hex SHA-256 of the raw body in
//! `x-<namespace>-content-sha256`. The digest is taken over the exact bytes
//! received, before any deserialization.

use crate::algorithm::SigningAlgorithm;

/// Lower-case hex SHA-256 of a payload.
///
/// # Examples
///
/// ```
/// use sigil_auth::integrity::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    SigningAlgorithm::HmacSha256.digest_hex(payload)
}

/// Whether `claimed` is exactly the digest of `body`.
///
/// The comparison is case-sensitive; an absent claim never matches.
#[must_use]
pub fn body_hash_matches(algorithm: SigningAlgorithm, body: &[u8], claimed: Option<&str>) -> bool {
    claimed.is_some_and(|claimed| algorithm.digest_hex(body) == claimed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALG: SigningAlgorithm = SigningAlgorithm::HmacSha256;

    #[test]
    fn test_should_match_declared_hash() {
        let body = br#"{"name":"widget"}"#;
        assert!(body_hash_matches(ALG, body, Some(&hash_payload(body))));
    }

    #[test]
    fn test_should_reject_single_byte_change() {
        let body = b"hello world".to_vec();
        let claimed = hash_payload(&body);
        let mut tampered = body.clone();
        tampered[0] ^= 0x01;
        assert!(!body_hash_matches(ALG, &tampered, Some(&claimed)));
    }

    #[test]
    fn test_should_compare_case_sensitively() {
        let claimed = hash_payload(b"").to_uppercase();
        assert!(!body_hash_matches(ALG, b"", Some(&claimed)));
    }

    #[test]
    fn test_should_reject_absent_claim() {
        assert!(!body_hash_matches(ALG, b"", None));
    }
}
