//! Error types for Sigil request authentication.
//!
//! Gate failures are values, not faults: every way a request can fail to
//! authenticate is a [`RejectReason`], and its `Display` output is the reason
//! string reported to the hosting layer.

/// Why a request was not authenticated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// The request carried no `Authorization` header, or it could not be read.
    #[error("no valid authorization header")]
    MissingAuthorization,

    /// The authorization scheme does not name a supported signing algorithm.
    #[error("unknown authentication method: {0}")]
    UnsupportedAlgorithm(String),

    /// A required authorization parameter is absent or empty.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Headers that must be covered by the signature were left out of `SignedHeaders`.
    #[error("some required headers were not signed: {}", .0.join(", "))]
    UncoveredRequiredHeaders(Vec<String>),

    /// Headers listed in `SignedHeaders` are not present on the request.
    #[error("missing headers: {}", .0.join(", "))]
    MissingSignedHeader(Vec<String>),

    /// Signed headers whose values are not visible ASCII.
    #[error("unreadable header values: {}", .0.join(", "))]
    UnreadableSignedHeader(Vec<String>),

    /// The timestamp header is unparsable or outside the freshness window.
    #[error("request is too old")]
    StaleOrFutureTimestamp,

    /// The declared body hash does not match the received body.
    #[error("content hash does not match")]
    ContentHashMismatch,

    /// The credential id is unknown, or the credential store could not answer.
    #[error("invalid credential")]
    UnknownCredential,

    /// The computed signature differs from the one supplied.
    #[error("signature does not match")]
    SignatureMismatch,

    /// The signature was already accepted once inside the freshness window.
    #[error("request has already been seen")]
    Replayed,
}

/// Failure reported by a credential store backend.
///
/// Distinct from "credential not found" so operators can tell an outage from
/// a bad id; callers of the verifier never see the difference.
#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    /// The backend could not be reached or did not answer in time.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with data that could not be used.
    #[error("credential store returned an invalid record: {0}")]
    InvalidRecord(String),
}

/// Failure while signing an outgoing request.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// Neither a `host` header nor a URI authority is available.
    #[error("request has no host header or URI authority")]
    MissingHost,

    /// A header that must be signed does not hold visible ASCII text.
    #[error("header {0} cannot be signed: value is not visible ASCII")]
    UnsignableHeader(String),

    /// A computed header value could not be encoded.
    #[error("invalid header value for {0}")]
    InvalidHeaderValue(String),
}

/// Invalid verifier configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The header namespace is empty or contains characters not allowed in a header name.
    #[error("invalid header namespace: {0:?}")]
    InvalidNamespace(String),

    /// An environment variable could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnvValue {
        /// Environment variable name.
        key: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
}
