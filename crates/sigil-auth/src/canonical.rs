//! Canonical request construction.
//!
//! The canonical request is the exact byte string both sides hash before
//! signing:
//!
//! ```text
//! METHOD\n
//! CanonicalPath\n
//! CanonicalQueryString\n
//! name1:value1\n
//! name2:value2\n
//! name1;name2\n
//! PayloadHashHex
//! ```
//!
//! Any divergence between signer and verifier here invalidates every
//! signature, so every component is normalized deterministically.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};

use crate::algorithm::SigningAlgorithm;

/// Characters left unescaped: `A-Z a-z 0-9 - _ . ~`.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The normalized components of a request, ready to be hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// Upper-case HTTP method.
    pub method: String,
    /// Percent-encoded path.
    pub path: String,
    /// Sorted, percent-encoded query string.
    pub query: String,
    /// `name:value` lines for the signed headers, joined with `\n`.
    pub headers: String,
    /// Signed header names joined with `;`.
    pub signed_headers: String,
    /// Lower-case hex digest of the body.
    pub payload_hash: String,
}

impl CanonicalRequest {
    /// Build the canonical form of a request.
    ///
    /// `signed_headers` holds the (lower-case name, value) pair of every
    /// signed header; pairs are ordered by name and values are trimmed.
    ///
    /// # Examples
    ///
    /// ```
    /// use sigil_auth::canonical::CanonicalRequest;
    ///
    /// let canonical = CanonicalRequest::new(
    ///     "get",
    ///     "/docs/a b",
    ///     "b=2&a=1",
    ///     &[("x-sigil-timestamp", "20240101T000000Z"), ("host", "api.example.com")],
    ///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
    /// );
    /// assert_eq!(canonical.method, "GET");
    /// assert_eq!(canonical.path, "/docs/a%20b");
    /// assert_eq!(canonical.query, "a=1&b=2");
    /// assert_eq!(canonical.signed_headers, "host;x-sigil-timestamp");
    /// ```
    #[must_use]
    pub fn new(
        method: &str,
        path: &str,
        query: &str,
        signed_headers: &[(&str, &str)],
        payload_hash: &str,
    ) -> Self {
        let mut pairs = signed_headers.to_vec();
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            method: method.trim().to_ascii_uppercase(),
            path: canonical_path(path),
            query: canonical_query_string(query),
            headers: canonical_headers(&pairs),
            signed_headers: pairs
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(";"),
            payload_hash: payload_hash.to_owned(),
        }
    }

    /// The newline-joined canonical request string.
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        [
            self.method.as_str(),
            self.path.as_str(),
            self.query.as_str(),
            self.headers.as_str(),
            self.signed_headers.as_str(),
            self.payload_hash.as_str(),
        ]
        .join("\n")
    }
}

/// Build the string that is actually signed.
///
/// Format:
/// ```text
/// <NS>-HMAC-SHA256\n
/// <timestamp>\n
/// <hex digest of the canonical request string>
/// ```
///
/// # Examples
///
/// ```
/// use sigil_auth::algorithm::SigningAlgorithm;
/// use sigil_auth::canonical::{CanonicalRequest, string_to_sign};
///
/// let canonical = CanonicalRequest::new("GET", "/", "", &[("host", "h")], "00");
/// let sts = string_to_sign(SigningAlgorithm::HmacSha256, "sigil", "20240101T000000Z", &canonical);
/// assert!(sts.starts_with("SIGIL-HMAC-SHA256\n20240101T000000Z\n"));
/// ```
#[must_use]
pub fn string_to_sign(
    algorithm: SigningAlgorithm,
    namespace: &str,
    timestamp: &str,
    canonical: &CanonicalRequest,
) -> String {
    let canonical_hash = algorithm.digest_hex(canonical.to_canonical_string().as_bytes());
    format!("{}\n{timestamp}\n{canonical_hash}", algorithm.name(namespace))
}

/// Percent-encode a request path.
///
/// Each segment is decoded to raw bytes first so that `/a%20b` and `/a b`
/// canonicalize the same way, while escapes that are not valid UTF-8 keep
/// their exact bytes. `/` separators are preserved and an empty path becomes
/// `/`.
///
/// # Examples
///
/// ```
/// use sigil_auth::canonical::canonical_path;
///
/// assert_eq!(canonical_path("/files/report 1.pdf"), "/files/report%201.pdf");
/// assert_eq!(canonical_path("/files/report%201.pdf"), "/files/report%201.pdf");
/// assert_eq!(canonical_path(""), "/");
/// ```
#[must_use]
pub fn canonical_path(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| uri_encode(&percent_decode_str(segment).collect::<Vec<u8>>()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string from a raw query.
///
/// Pairs are split on `&` and `=`, `+` is read as a space, and escapes are
/// decoded to raw bytes. Pairs are sorted by key bytes and then by value
/// bytes, and re-encoded with the unreserved rule. Keys are case-sensitive.
/// A missing or empty query yields an empty string.
///
/// # Examples
///
/// ```
/// use sigil_auth::canonical::canonical_query_string;
///
/// assert_eq!(canonical_query_string("b=2&a=1"), "a=1&b=2");
/// assert_eq!(canonical_query_string("q=a+b&q=%2A"), "q=%2A&q=a%20b");
/// assert_eq!(canonical_query_string(""), "");
/// ```
#[must_use]
pub fn canonical_query_string(query: &str) -> String {
    let mut params: Vec<(Vec<u8>, Vec<u8>)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_query_component(key), decode_query_component(value))
        })
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(key, value)| format!("{}={}", uri_encode(key), uri_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Render `name:value` lines, in the order given, joined with `\n`.
#[must_use]
pub fn canonical_headers(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{name}:{}", value.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_query_component(input: &str) -> Vec<u8> {
    percent_decode_str(&input.replace('+', " ")).collect()
}

fn uri_encode(input: &[u8]) -> String {
    percent_encode(input, UNRESERVED).to_string()
}
