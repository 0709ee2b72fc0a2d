//! Per-request authentication context.

use sigil_auth::{Identity, VerificationResult};

/// What the middleware learned about a request, handed to the next stage
/// alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Outcome of authentication.
    pub result: VerificationResult,
    /// Id assigned to the request, echoed in `x-request-id`.
    pub request_id: String,
}

impl AuthContext {
    /// Create a context.
    pub fn new(result: VerificationResult, request_id: impl Into<String>) -> Self {
        Self {
            result,
            request_id: request_id.into(),
        }
    }

    /// The authenticated identity, or `None` for anonymous requests.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.result.identity()
    }

    /// Whether the request was authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.result.is_authenticated()
    }
}
