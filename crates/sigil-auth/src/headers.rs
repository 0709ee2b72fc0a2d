//! Read-only view of request headers used by the signer and the verifier.

use std::collections::BTreeMap;

use http::HeaderMap;
use http::Uri;

/// Every request header, keyed by lower-case name.
///
/// Repeated headers are folded into one value: each occurrence is trimmed and
/// the results are joined with `,` in arrival order. A header with any value
/// that is not visible ASCII stays in the view but is marked unreadable. For
/// HTTP/2 requests, which carry the host in the `:authority` pseudo-header,
/// the URI authority stands in for a missing `host` header.
#[derive(Debug, Clone, Default)]
pub struct HeaderView {
    values: BTreeMap<String, Option<String>>,
}

impl HeaderView {
    /// Build a view over a header map and the request URI.
    #[must_use]
    pub fn new(headers: &HeaderMap, uri: &Uri) -> Self {
        let mut values = BTreeMap::new();
        for name in headers.keys() {
            let folded = headers
                .get_all(name)
                .iter()
                .map(|value| value.to_str().map(str::trim))
                .collect::<Result<Vec<_>, _>>()
                .ok()
                .map(|parts| parts.join(","));
            values.insert(name.as_str().to_ascii_lowercase(), folded);
        }
        if let Some(authority) = uri.authority() {
            values
                .entry(http::header::HOST.as_str().to_owned())
                .or_insert_with(|| Some(authority.as_str().to_owned()));
        }
        Self { values }
    }

    /// The folded value of a header, if present and readable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_ascii_lowercase())
            .and_then(Option::as_deref)
    }

    /// Whether the header is on the request, readable or not.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&name.to_ascii_lowercase())
    }

    /// Whether the header is on the request with a value that is not visible
    /// ASCII.
    #[must_use]
    pub fn is_unreadable(&self, name: &str) -> bool {
        matches!(self.values.get(&name.to_ascii_lowercase()), Some(None))
    }

    /// All header names on the request, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
