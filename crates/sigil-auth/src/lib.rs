//! HMAC canonical-request authentication for Sigil.
//!
//! Clients sign a canonical form of each request (method, path, sorted
//! query, selected headers and a digest of the body) with a shared secret
//! and send the result in an `Authorization` header:
//!
//! ```text
//! Authorization: SIGIL-HMAC-SHA256 Credential=<id>,SignedHeaders=<h1;h2;...>,Signature=<hex>
//! ```
//!
//! This crate verifies such requests and, for clients and tests, produces
//! them. The header namespace (`sigil` above) is configurable.
//!
//! # Usage
//!
//! ```rust
//! use chrono::Utc;
//! use sigil_auth::{
//!     Credential, Identity, RequestSigner, SignatureVerifier, StaticCredentialProvider,
//!     VerifierConfig,
//! };
//!
//! let provider = StaticCredentialProvider::new(vec![Credential::new(
//!     "2a241ea1e4672ee9",
//!     "s3cr3t",
//!     Identity::new("user-42"),
//! )]);
//! let verifier = SignatureVerifier::new(provider, VerifierConfig::default());
//!
//! let body = br#"{"name":"widget"}"#;
//! let mut request = http::Request::builder()
//!     .method("POST")
//!     .uri("https://api.example.com/v1/items")
//!     .body(())
//!     .unwrap();
//! RequestSigner::new("2a241ea1e4672ee9", "s3cr3t", VerifierConfig::default())
//!     .sign(&mut request, body, Utc::now())
//!     .unwrap();
//!
//! let (parts, ()) = request.into_parts();
//! let result = verifier.authenticate(&parts, body);
//! assert_eq!(result.identity().map(Identity::as_str), Some("user-42"));
//! ```
//!
//! # Modules
//!
//! - [`algorithm`] - Supported signing algorithms
//! - [`authorization`] - `Authorization` header parsing
//! - [`canonical`] - Canonical request and string-to-sign construction
//! - [`compare`] - Constant-time comparison
//! - [`config`] - Verifier configuration
//! - [`credentials`] - Credential provider trait and implementations
//! - [`error`] - Rejection and error types
//! - [`freshness`] - Timestamp format and clock-skew checks
//! - [`headers`] - Header lookup shared by signer and verifier
//! - [`integrity`] - Body digest checks
//! - [`signer`] - Client-side request signing
//! - [`verifier`] - Request verification

pub mod algorithm;
pub mod authorization;
pub mod canonical;
pub mod compare;
pub mod config;
pub mod credentials;
pub mod error;
pub mod freshness;
pub mod headers;
pub mod integrity;
pub mod signer;
pub mod verifier;

pub use algorithm::SigningAlgorithm;
pub use config::VerifierConfig;
pub use credentials::{
    CachingCredentialProvider, Credential, CredentialProvider, Identity, StaticCredentialProvider,
};
pub use error::{ConfigError, CredentialStoreError, RejectReason, SignError};
pub use integrity::hash_payload;
pub use signer::RequestSigner;
pub use verifier::{SignatureVerifier, VerificationResult};
