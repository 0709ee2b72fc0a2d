//! Request signature verification.
//!
//! [`SignatureVerifier::authenticate`] runs a fixed chain of gates and stops
//! at the first failure:
//!
//! 1. Algorithm: the scheme names a supported [`SigningAlgorithm`].
//! 2. Parameters: `Credential`, `SignedHeaders` and `Signature` are present.
//! 3. Coverage: `host`, the content-hash and timestamp headers, every
//!    namespaced header and `content-type` (when sent) are all signed.
//! 4. Presence: every signed header is on the request with a visible-ASCII
//!    value.
//! 5. Freshness: the timestamp is within the configured clock skew.
//! 6. Content hash: the declared digest matches the body.
//! 7. Credential: the id resolves through the [`CredentialProvider`].
//! 8. Signature: the HMAC of the string to sign matches, compared in
//!    constant time.
//!
//! Nothing here panics or returns an error: every outcome is a
//! [`VerificationResult`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::algorithm::SigningAlgorithm;
use crate::authorization::{AuthorizationHeader, parse_authorization};
use crate::canonical::{CanonicalRequest, string_to_sign};
use crate::compare::constant_time_eq;
use crate::config::VerifierConfig;
use crate::credentials::{Credential, CredentialProvider, Identity};
use crate::error::RejectReason;
use crate::freshness::is_fresh;
use crate::headers::HeaderView;
use crate::integrity::body_hash_matches;

/// Key used to sign on behalf of unknown credentials, so that path costs the
/// same as a real comparison.
const PLACEHOLDER_KEY: &[u8] = b"sigil-unknown-credential";

/// Outcome of authenticating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    outcome: Result<Identity, RejectReason>,
}

impl VerificationResult {
    /// Reason string reported for authenticated requests.
    pub const AUTHENTICATED: &'static str = "authenticated";

    /// A successful verification.
    #[must_use]
    pub fn authenticated(identity: Identity) -> Self {
        Self {
            outcome: Ok(identity),
        }
    }

    /// A rejected verification.
    #[must_use]
    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            outcome: Err(reason),
        }
    }

    /// Whether the request was authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The authenticated identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.outcome.as_ref().ok()
    }

    /// Why the request was rejected, if it was.
    #[must_use]
    pub fn rejection(&self) -> Option<&RejectReason> {
        self.outcome.as_ref().err()
    }

    /// Human-readable reason, `"authenticated"` on success.
    #[must_use]
    pub fn reason(&self) -> String {
        match &self.outcome {
            Ok(_) => Self::AUTHENTICATED.to_owned(),
            Err(reason) => reason.to_string(),
        }
    }

    /// Convert into a plain `Result`.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectReason`] if the request was rejected.
    pub fn into_result(self) -> Result<Identity, RejectReason> {
        self.outcome
    }
}

/// Verifies signed requests against a credential store.
///
/// Holds no mutable state; one instance can serve any number of concurrent
/// requests.
#[derive(Debug, Clone)]
pub struct SignatureVerifier<P> {
    provider: P,
    config: VerifierConfig,
}

impl<P: CredentialProvider> SignatureVerifier<P> {
    /// Create a verifier. The namespace is trimmed and lower-cased.
    pub fn new(provider: P, config: VerifierConfig) -> Self {
        Self {
            provider,
            config: config.normalized(),
        }
    }

    /// The verifier configuration.
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Authenticate a request against the current time.
    ///
    /// `body` must be the exact raw bytes received.
    #[must_use]
    pub fn authenticate(&self, parts: &http::request::Parts, body: &[u8]) -> VerificationResult {
        self.authenticate_at(parts, body, Utc::now())
    }

    /// Authenticate a request as if the current time were `now`.
    #[must_use]
    pub fn authenticate_at(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> VerificationResult {
        match self.verify(parts, body, now) {
            Ok(identity) => {
                debug!(identity = %identity, "request authenticated");
                VerificationResult::authenticated(identity)
            }
            Err(reason) => {
                debug!(%reason, "request rejected");
                VerificationResult::rejected(reason)
            }
        }
    }

    fn verify(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Identity, RejectReason> {
        let headers = HeaderView::new(&parts.headers, &parts.uri);
        let namespace = self.config.namespace.as_str();

        let authorization = headers
            .get(http::header::AUTHORIZATION.as_str())
            .ok_or(RejectReason::MissingAuthorization)?;
        let (scheme, params) = parse_authorization(authorization);

        let algorithm = SigningAlgorithm::from_scheme(&scheme, namespace)
            .ok_or_else(|| RejectReason::UnsupportedAlgorithm(scheme.clone()))?;

        let auth = AuthorizationHeader::from_params(scheme, &params)?;

        let uncovered = self.uncovered_headers(&headers, &auth.signed_headers);
        if !uncovered.is_empty() {
            return Err(RejectReason::UncoveredRequiredHeaders(uncovered));
        }

        let missing: Vec<String> = auth
            .signed_headers
            .iter()
            .filter(|name| !headers.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RejectReason::MissingSignedHeader(missing));
        }

        let unreadable: Vec<String> = auth
            .signed_headers
            .iter()
            .filter(|name| headers.is_unreadable(name))
            .cloned()
            .collect();
        if !unreadable.is_empty() {
            return Err(RejectReason::UnreadableSignedHeader(unreadable));
        }

        let timestamp = headers
            .get(&self.config.timestamp_header())
            .unwrap_or_default();
        if !is_fresh(timestamp, now, self.config.max_clock_skew()) {
            return Err(RejectReason::StaleOrFutureTimestamp);
        }

        let claimed_hash = headers.get(&self.config.content_hash_header());
        if !body_hash_matches(algorithm, body, claimed_hash) {
            return Err(RejectReason::ContentHashMismatch);
        }
        let payload_hash = claimed_hash.unwrap_or_default();

        let credential = self.resolve(&auth.credential_id);

        let pairs: Vec<(&str, &str)> = auth
            .signed_headers
            .iter()
            .filter_map(|name| headers.get(name).map(|value| (name.as_str(), value)))
            .collect();
        let canonical = CanonicalRequest::new(
            parts.method.as_str(),
            parts.uri.path(),
            parts.uri.query().unwrap_or(""),
            &pairs,
            payload_hash,
        );
        trace!(canonical_request = %canonical.to_canonical_string(), "built canonical request");
        let sts = string_to_sign(algorithm, namespace, timestamp, &canonical);

        let key = credential
            .as_ref()
            .map_or(PLACEHOLDER_KEY, |c| c.secret.as_slice());
        let expected = algorithm.sign(key, sts.as_bytes());
        let matches = constant_time_eq(expected.as_bytes(), auth.signature.as_bytes());

        match credential {
            None => Err(RejectReason::UnknownCredential),
            Some(credential) if matches => Ok(credential.identity),
            Some(_) => Err(RejectReason::SignatureMismatch),
        }
    }

    /// Required headers absent from `signed`, sorted.
    fn uncovered_headers(&self, headers: &HeaderView, signed: &[String]) -> Vec<String> {
        let prefix = self.config.header_prefix();
        let mut required = BTreeSet::from([
            http::header::HOST.as_str().to_owned(),
            self.config.content_hash_header(),
            self.config.timestamp_header(),
        ]);
        for name in headers.names() {
            if name.starts_with(&prefix) || name == http::header::CONTENT_TYPE.as_str() {
                required.insert(name.to_owned());
            }
        }

        required
            .into_iter()
            .filter(|name| !signed.contains(name))
            .collect()
    }

    /// Look a credential up, folding store failures into "unknown".
    fn resolve(&self, credential_id: &str) -> Option<Credential> {
        match self.provider.lookup(credential_id) {
            Ok(Some(credential)) => Some(credential),
            Ok(None) => {
                debug!(credential_id, "unknown credential");
                None
            }
            Err(err) => {
                warn!(credential_id, error = %err, "credential store lookup failed");
                None
            }
        }
    }
}
