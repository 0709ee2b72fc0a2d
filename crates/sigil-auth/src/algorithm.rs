//! Supported signing algorithms.
//!
//! The authorization scheme is `<NAMESPACE>-<ALGORITHM>`, e.g.
//! `SIGIL-HMAC-SHA256`. Algorithms form a closed set: supporting a new one
//! means adding a variant here, and every dispatch site below has to handle it.

use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// A signing algorithm the verifier accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC over SHA-256; content and canonical-request digests are SHA-256.
    HmacSha256,
}

impl SigningAlgorithm {
    /// Every supported algorithm.
    pub const ALL: &'static [Self] = &[Self::HmacSha256];

    /// The algorithm part of the scheme, without the namespace.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::HmacSha256 => "HMAC-SHA256",
        }
    }

    /// Resolve an authorization scheme such as `sigil-hmac-sha256`.
    ///
    /// Matching is case-insensitive. Returns `None` for schemes outside the
    /// namespace or naming an unsupported algorithm.
    ///
    /// # Examples
    ///
    /// ```
    /// use sigil_auth::algorithm::SigningAlgorithm;
    ///
    /// assert_eq!(
    ///     SigningAlgorithm::from_scheme("Sigil-HMAC-SHA256", "sigil"),
    ///     Some(SigningAlgorithm::HmacSha256)
    /// );
    /// assert_eq!(SigningAlgorithm::from_scheme("Bearer", "sigil"), None);
    /// ```
    #[must_use]
    pub fn from_scheme(scheme: &str, namespace: &str) -> Option<Self> {
        let lowered = scheme.trim().to_ascii_lowercase();
        let rest = lowered
            .strip_prefix(&namespace.to_ascii_lowercase())?
            .strip_prefix('-')?;
        Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.suffix().eq_ignore_ascii_case(rest))
    }

    /// The label that opens the string to sign, e.g. `SIGIL-HMAC-SHA256`.
    #[must_use]
    pub fn name(self, namespace: &str) -> String {
        format!("{}-{}", namespace.to_ascii_uppercase(), self.suffix())
    }

    /// Lower-case hex digest of `data`.
    #[must_use]
    pub fn digest_hex(self, data: &[u8]) -> String {
        match self {
            Self::HmacSha256 => hex::encode(Sha256::digest(data)),
        }
    }

    /// Lower-case hex keyed signature of `data`.
    #[must_use]
    pub fn sign(self, key: &[u8], data: &[u8]) -> String {
        match self {
            Self::HmacSha256 => {
                let mut mac =
                    HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
                mac.update(data);
                hex::encode(mac.finalize().into_bytes())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_resolve_scheme_case_insensitively() {
        for scheme in ["SIGIL-HMAC-SHA256", "sigil-hmac-sha256", " Sigil-Hmac-Sha256 "] {
            assert_eq!(
                SigningAlgorithm::from_scheme(scheme, "sigil"),
                Some(SigningAlgorithm::HmacSha256),
                "{scheme}"
            );
        }
    }

    #[test]
    fn test_should_reject_foreign_namespace_and_unknown_algorithm() {
        assert_eq!(SigningAlgorithm::from_scheme("AWS4-HMAC-SHA256", "sigil"), None);
        assert_eq!(SigningAlgorithm::from_scheme("SIGIL-HMAC-SHA512", "sigil"), None);
        assert_eq!(SigningAlgorithm::from_scheme("SIGILHMAC-SHA256", "sigil"), None);
        assert_eq!(SigningAlgorithm::from_scheme("", "sigil"), None);
    }

    #[test]
    fn test_should_upper_case_string_to_sign_label() {
        assert_eq!(SigningAlgorithm::HmacSha256.name("woodbox"), "WOODBOX-HMAC-SHA256");
    }

    #[test]
    fn test_should_digest_empty_payload() {
        assert_eq!(
            SigningAlgorithm::HmacSha256.digest_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_should_match_rfc4231_hmac_vector() {
        // RFC 4231 test case 2.
        let sig = SigningAlgorithm::HmacSha256.sign(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
