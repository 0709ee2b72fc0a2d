//! `Authorization` header parsing.
//!
//! Format:
//! ```text
//! SIGIL-HMAC-SHA256 Credential=<id>,SignedHeaders=host;x-sigil-content-sha256;x-sigil-timestamp,Signature=<hex>
//! ```
//!
//! [`parse_authorization`] never fails: it only splits the value into a
//! scheme and a parameter map. Deciding whether the parameters are usable is
//! the job of [`AuthorizationHeader::from_params`].

use std::collections::BTreeMap;

use crate::error::RejectReason;

/// Parameter holding the credential id.
pub const PARAM_CREDENTIAL: &str = "credential";
/// Parameter holding the `;`-separated signed header names.
pub const PARAM_SIGNED_HEADERS: &str = "signedheaders";
/// Parameter holding the hex signature.
pub const PARAM_SIGNATURE: &str = "signature";

/// Split an `Authorization` header value into its scheme and parameters.
///
/// Everything before the first space is the scheme. The remainder is a
/// comma-separated `key=value` list; keys are trimmed and lower-cased, values
/// are trimmed and kept verbatim (no percent-decoding). A fragment without
/// `=` yields an entry with an empty value.
///
/// # Examples
///
/// ```
/// use sigil_auth::authorization::parse_authorization;
///
/// let (scheme, params) =
///     parse_authorization("SIGIL-HMAC-SHA256 Credential=abc, SignedHeaders=host,Signature=00");
/// assert_eq!(scheme, "SIGIL-HMAC-SHA256");
/// assert_eq!(params["credential"], "abc");
/// assert_eq!(params["signedheaders"], "host");
/// ```
#[must_use]
pub fn parse_authorization(value: &str) -> (String, BTreeMap<String, String>) {
    let (scheme, rest) = value.split_once(' ').unwrap_or((value, ""));

    let params = rest
        .split(',')
        .filter(|fragment| !fragment.trim().is_empty())
        .map(|fragment| {
            let (name, value) = fragment.split_once('=').unwrap_or((fragment, ""));
            (name.trim().to_lowercase(), value.trim().to_owned())
        })
        .collect();

    (scheme.trim().to_owned(), params)
}

/// The validated parameters of an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHeader {
    /// The scheme token as received.
    pub scheme: String,
    /// Credential id to resolve against the credential store.
    pub credential_id: String,
    /// Lower-case, sorted, deduplicated, non-empty list of signed header names.
    pub signed_headers: Vec<String>,
    /// Signature as supplied by the client.
    pub signature: String,
}

impl AuthorizationHeader {
    /// Extract the required parameters from a parsed parameter map.
    ///
    /// # Errors
    ///
    /// Returns [`RejectReason::MissingParameter`] naming the first of
    /// `credential`, `signedheaders`, `signature` that is absent or empty.
    pub fn from_params(
        scheme: impl Into<String>,
        params: &BTreeMap<String, String>,
    ) -> Result<Self, RejectReason> {
        let credential_id = required(params, PARAM_CREDENTIAL)?;
        let signed_headers = normalize_signed_headers(required(params, PARAM_SIGNED_HEADERS)?);
        if signed_headers.is_empty() {
            return Err(RejectReason::MissingParameter(PARAM_SIGNED_HEADERS));
        }
        let signature = required(params, PARAM_SIGNATURE)?;

        Ok(Self {
            scheme: scheme.into(),
            credential_id: credential_id.to_owned(),
            signed_headers,
            signature: signature.to_owned(),
        })
    }

    /// The signed header names joined with `;`.
    #[must_use]
    pub fn signed_headers_joined(&self) -> String {
        self.signed_headers.join(";")
    }
}

fn required<'a>(
    params: &'a BTreeMap<String, String>,
    name: &'static str,
) -> Result<&'a str, RejectReason> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or(RejectReason::MissingParameter(name))
}

/// Lower-case, sort and deduplicate a `;`-separated header list.
#[must_use]
pub fn normalize_signed_headers(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = raw
        .split(';')
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_split_scheme_on_first_space() {
        let (scheme, params) = parse_authorization("SIGIL-HMAC-SHA256 Credential=a b,Signature=c");
        assert_eq!(scheme, "SIGIL-HMAC-SHA256");
        assert_eq!(params["credential"], "a b");
        assert_eq!(params["signature"], "c");
    }

    #[test]
    fn test_should_lower_case_and_trim_parameter_names() {
        let (_, params) = parse_authorization("X  CREDENTIAL = id ,  signedHeaders=Host");
        assert_eq!(params["credential"], "id");
        assert_eq!(params["signedheaders"], "Host");
    }

    #[test]
    fn test_should_keep_malformed_fragment_with_empty_value() {
        let (_, params) = parse_authorization("X Credential=id,garbage,Signature=ab%20cd");
        assert_eq!(params["garbage"], "");
        assert_eq!(params["signature"], "ab%20cd");
    }

    #[test]
    fn test_should_parse_scheme_without_parameters() {
        let (scheme, params) = parse_authorization("Bearer");
        assert_eq!(scheme, "Bearer");
        assert!(params.is_empty());
    }

    #[test]
    fn test_should_keep_value_after_first_equals() {
        let (_, params) = parse_authorization("X Credential=a=b");
        assert_eq!(params["credential"], "a=b");
    }

    #[test]
    fn test_should_build_header_with_normalized_signed_headers() {
        let (scheme, params) = parse_authorization(
            "SIGIL-HMAC-SHA256 Credential=id,SignedHeaders=X-Sigil-Timestamp;HOST;host;;,Signature=ff",
        );
        let header = AuthorizationHeader::from_params(scheme, &params).unwrap();
        assert_eq!(header.credential_id, "id");
        assert_eq!(header.signed_headers, vec!["host", "x-sigil-timestamp"]);
        assert_eq!(header.signed_headers_joined(), "host;x-sigil-timestamp");
        assert_eq!(header.signature, "ff");
    }

    #[test]
    fn test_should_name_first_missing_parameter() {
        let (scheme, params) = parse_authorization("X SignedHeaders=host,Signature=ff");
        assert_eq!(
            AuthorizationHeader::from_params(scheme, &params),
            Err(RejectReason::MissingParameter("credential"))
        );

        let (scheme, params) = parse_authorization("X Credential=id,SignedHeaders=host");
        assert_eq!(
            AuthorizationHeader::from_params(scheme, &params),
            Err(RejectReason::MissingParameter("signature"))
        );
    }

    #[test]
    fn test_should_treat_empty_values_as_missing() {
        let (scheme, params) = parse_authorization("X Credential=id,SignedHeaders=;;,Signature=ff");
        assert_eq!(
            AuthorizationHeader::from_params(scheme, &params),
            Err(RejectReason::MissingParameter("signedheaders"))
        );

        let (scheme, params) = parse_authorization("X Credential,SignedHeaders=host,Signature=ff");
        assert_eq!(
            AuthorizationHeader::from_params(scheme, &params),
            Err(RejectReason::MissingParameter("credential"))
        );
    }
}
