//! Client-side request signing.
//!
//! [`RequestSigner`] produces exactly what [`SignatureVerifier`] checks: it
//! shares the canonicalizer and the string-to-sign construction, so a signer
//! and a verifier configured with the same namespace cannot drift apart.
//!
//! [`SignatureVerifier`]: crate::verifier::SignatureVerifier

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use http::HeaderValue;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HOST};

use crate::algorithm::SigningAlgorithm;
use crate::canonical::{CanonicalRequest, string_to_sign};
use crate::config::VerifierConfig;
use crate::error::SignError;
use crate::freshness::format_timestamp;
use crate::headers::HeaderView;

/// Signs requests with a credential id and shared secret.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use sigil_auth::config::VerifierConfig;
/// use sigil_auth::signer::RequestSigner;
///
/// let signer = RequestSigner::new("2a241ea1e4672ee9", "s3cr3t", VerifierConfig::default());
/// let mut request = http::Request::builder()
///     .method("POST")
///     .uri("https://api.example.com/v1/items")
///     .header("content-type", "application/json")
///     .body(())
///     .unwrap();
///
/// signer.sign(&mut request, br#"{"name":"widget"}"#, Utc::now()).unwrap();
/// let authorization = request.headers()["authorization"].to_str().unwrap();
/// assert!(authorization.starts_with(
///     "SIGIL-HMAC-SHA256 Credential=2a241ea1e4672ee9,\
///      SignedHeaders=content-type;host;x-sigil-content-sha256;x-sigil-timestamp,Signature="
/// ));
/// ```
#[derive(Clone)]
pub struct RequestSigner {
    credential_id: String,
    secret: Vec<u8>,
    config: VerifierConfig,
    algorithm: SigningAlgorithm,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("credential_id", &self.credential_id)
            .field("config", &self.config)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer using HMAC-SHA256.
    pub fn new(
        credential_id: impl Into<String>,
        secret: impl Into<Vec<u8>>,
        config: VerifierConfig,
    ) -> Self {
        Self {
            credential_id: credential_id.into(),
            secret: secret.into(),
            config: config.normalized(),
            algorithm: SigningAlgorithm::HmacSha256,
        }
    }

    /// Sign `request` in place.
    ///
    /// Sets the content-hash and timestamp headers, a `host` header when only
    /// the URI authority carries it, and the `Authorization` header. Signs
    /// `host`, `content-type` when present, and every namespaced header.
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] when there is no host to sign or a header that
    /// must be signed is not visible ASCII.
    pub fn sign<B>(
        &self,
        request: &mut http::Request<B>,
        body: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<(), SignError> {
        let content_hash_header = self.config.content_hash_header();
        let timestamp_header = self.config.timestamp_header();
        let timestamp = format_timestamp(timestamp);

        let payload_hash = self.algorithm.digest_hex(body);
        insert_header(request, &content_hash_header, &payload_hash)?;
        insert_header(request, &timestamp_header, &timestamp)?;
        if !request.headers().contains_key(HOST) {
            let authority = request
                .uri()
                .authority()
                .map(|a| a.as_str().to_owned())
                .ok_or(SignError::MissingHost)?;
            insert_header(request, HOST.as_str(), &authority)?;
        }

        let names = self.signed_header_names(request.headers());
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let signature = self.signature_for(request, &name_refs, &payload_hash, &timestamp)?;

        let authorization = format!(
            "{} Credential={},SignedHeaders={},Signature={signature}",
            self.algorithm.name(&self.config.namespace),
            self.credential_id,
            name_refs.join(";"),
        );
        insert_header(request, AUTHORIZATION.as_str(), &authorization)
    }

    /// Compute the signature of `request` over an explicit set of headers.
    ///
    /// Lower-level than [`sign`](Self::sign): nothing is inserted into the
    /// request, and `signed_headers` is used as given.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::UnsignableHeader`] if a named header is absent or
    /// not visible ASCII.
    pub fn signature_for<B>(
        &self,
        request: &http::Request<B>,
        signed_headers: &[&str],
        payload_hash: &str,
        timestamp: &str,
    ) -> Result<String, SignError> {
        let view = HeaderView::new(request.headers(), request.uri());
        let pairs = signed_headers
            .iter()
            .map(|name| {
                view.get(name)
                    .map(|value| (*name, value))
                    .ok_or_else(|| SignError::UnsignableHeader((*name).to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let canonical = CanonicalRequest::new(
            request.method().as_str(),
            request.uri().path(),
            request.uri().query().unwrap_or(""),
            &pairs,
            payload_hash,
        );
        let sts = string_to_sign(self.algorithm, &self.config.namespace, timestamp, &canonical);
        Ok(self.algorithm.sign(&self.secret, sts.as_bytes()))
    }

    /// Headers [`sign`](Self::sign) commits to, sorted.
    fn signed_header_names(&self, headers: &http::HeaderMap) -> Vec<String> {
        let prefix = self.config.header_prefix();
        let mut names = BTreeSet::from([HOST.as_str().to_owned()]);
        if headers.contains_key(CONTENT_TYPE) {
            names.insert(CONTENT_TYPE.as_str().to_owned());
        }
        names.extend(
            headers
                .keys()
                .map(http::HeaderName::as_str)
                .filter(|name| name.starts_with(&prefix))
                .map(ToOwned::to_owned),
        );
        names.into_iter().collect()
    }
}

fn insert_header<B>(
    request: &mut http::Request<B>,
    name: &str,
    value: &str,
) -> Result<(), SignError> {
    let name = http::HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| SignError::InvalidHeaderValue(name.to_owned()))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| SignError::InvalidHeaderValue(name.as_str().to_owned()))?;
    request.headers_mut().insert(name, value);
    Ok(())
}
