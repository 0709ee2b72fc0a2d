//! Credential resolution.
//!
//! The verifier never owns credentials: it asks a [`CredentialProvider`] for
//! the secret and identity behind a credential id, once per request, after
//! every cheaper gate has passed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::VerifierConfig;
use crate::error::CredentialStoreError;

/// Opaque reference to the principal a credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap an identity reference.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The identity as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A credential id paired with its shared secret and identity.
#[derive(Clone)]
pub struct Credential {
    /// Identifier sent by clients in the `Credential` parameter.
    pub id: String,
    /// Shared HMAC secret.
    pub secret: Vec<u8>,
    /// Principal the credential authenticates as.
    pub identity: Identity,
}

impl Credential {
    /// Create a credential.
    pub fn new(id: impl Into<String>, secret: impl Into<Vec<u8>>, identity: Identity) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            identity,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Lookup contract for the credential store.
///
/// Implementations must answer from the id alone. They own their own I/O
/// timeouts and must not retry internally; a timeout is reported as
/// [`CredentialStoreError::Unavailable`].
pub trait CredentialProvider: Send + Sync {
    /// Resolve a credential id.
    ///
    /// Returns `Ok(None)` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the store itself failed.
    fn lookup(&self, credential_id: &str) -> Result<Option<Credential>, CredentialStoreError>;
}

impl<P: CredentialProvider + ?Sized> CredentialProvider for Arc<P> {
    fn lookup(&self, credential_id: &str) -> Result<Option<Credential>, CredentialStoreError> {
        (**self).lookup(credential_id)
    }
}

/// In-memory credential store.
///
/// # Examples
///
/// ```
/// use sigil_auth::credentials::{Credential, CredentialProvider, Identity, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(vec![Credential::new(
///     "2a241ea1e4672ee9",
///     "s3cr3t",
///     Identity::new("user-42"),
/// )]);
///
/// let credential = provider.lookup("2a241ea1e4672ee9").unwrap().unwrap();
/// assert_eq!(credential.identity.as_str(), "user-42");
/// assert!(provider.lookup("unknown").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, Credential>,
}

impl StaticCredentialProvider {
    /// Build a store from credentials; later duplicates replace earlier ones.
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .map(|credential| (credential.id.clone(), credential))
                .collect(),
        }
    }

    /// Number of credentials held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn lookup(&self, credential_id: &str) -> Result<Option<Credential>, CredentialStoreError> {
        Ok(self.credentials.get(credential_id).cloned())
    }
}

/// Read-through cache in front of another provider.
///
/// Only successful lookups are cached. Entries live for at most `ttl`, which
/// callers should keep at or below the verifier's freshness window so that a
/// revoked secret stops working within the same bound.
pub struct CachingCredentialProvider<P> {
    inner: P,
    ttl: Duration,
    entries: DashMap<String, (Credential, Instant)>,
}

impl<P: CredentialProvider> CachingCredentialProvider<P> {
    /// Wrap `inner` with a cache whose entries expire after `ttl`.
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Like [`new`](Self::new), but never caches for longer than the
    /// verifier's freshness window.
    pub fn bounded(inner: P, ttl: Duration, config: &VerifierConfig) -> Self {
        Self::new(inner, ttl.min(config.max_clock_skew()))
    }

    /// Drop a cached entry, e.g. after the credential was rotated.
    pub fn invalidate(&self, credential_id: &str) {
        self.entries.remove(credential_id);
    }

    /// Number of cached entries, including expired ones not yet evicted.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.entries.len()
    }
}

impl<P> fmt::Debug for CachingCredentialProvider<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingCredentialProvider")
            .field("ttl", &self.ttl)
            .field("cached", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<P: CredentialProvider> CredentialProvider for CachingCredentialProvider<P> {
    fn lookup(&self, credential_id: &str) -> Result<Option<Credential>, CredentialStoreError> {
        if let Some(entry) = self.entries.get(credential_id) {
            let (credential, cached_at) = entry.value();
            if cached_at.elapsed() < self.ttl {
                return Ok(Some(credential.clone()));
            }
        }
        self.entries.remove(credential_id);

        let credential = self.inner.lookup(credential_id)?;
        if let Some(ref credential) = credential {
            self.entries.insert(
                credential_id.to_owned(),
                (credential.clone(), Instant::now()),
            );
        }
        Ok(credential)
    }
}
