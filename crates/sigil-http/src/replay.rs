//! Replay protection.
//!
//! A signed request stays valid for as long as its timestamp is fresh, so a
//! captured request can be sent again within that window. [`ReplayGuard`]
//! remembers every `(credential, signature)` pair it has accepted and rejects
//! a second use until the pair could no longer pass the freshness check.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sigil_auth::RejectReason;
use sigil_auth::authorization::{AuthorizationHeader, parse_authorization};

/// Checks between two sweeps of expired entries.
pub const DEFAULT_PURGE_INTERVAL: usize = 1024;

/// Remembers accepted signatures for a bounded time.
///
/// Expired entries are swept once every `purge_interval` checks; until then
/// an expired entry is simply treated as unseen.
#[derive(Debug)]
pub struct ReplayGuard {
    ttl: Duration,
    purge_interval: usize,
    checks: AtomicUsize,
    seen: DashMap<(String, String), Instant>,
}

impl ReplayGuard {
    /// Create a guard that remembers signatures for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            purge_interval: DEFAULT_PURGE_INTERVAL,
            checks: AtomicUsize::new(0),
            seen: DashMap::new(),
        }
    }

    /// Sweep expired entries once every `every` checks instead of the default.
    #[must_use]
    pub fn with_purge_interval(mut self, every: usize) -> Self {
        self.purge_interval = every.max(1);
        self
    }

    /// Create a guard sized for a verifier that tolerates `max_clock_skew`.
    ///
    /// A timestamp is accepted from `max_clock_skew` before until
    /// `max_clock_skew` after the local clock, so a signature must be
    /// remembered for twice that long.
    #[must_use]
    pub fn for_clock_skew(max_clock_skew: Duration) -> Self {
        Self::new(max_clock_skew.saturating_mul(2))
    }

    /// Record a signature, failing if it was already seen.
    ///
    /// # Errors
    ///
    /// Returns [`RejectReason::Replayed`] if the pair was recorded within the
    /// last `ttl`.
    pub fn check(&self, credential_id: &str, signature: &str) -> Result<(), RejectReason> {
        self.check_at(credential_id, signature, Instant::now())
    }

    /// Record the signature carried by an authenticated request.
    ///
    /// # Errors
    ///
    /// Returns [`RejectReason::Replayed`] on reuse, or the parse error if the
    /// request carries no usable `Authorization` header.
    pub fn check_request(&self, parts: &http::request::Parts) -> Result<(), RejectReason> {
        let value = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(RejectReason::MissingAuthorization)?;
        let (scheme, params) = parse_authorization(value);
        let auth = AuthorizationHeader::from_params(scheme, &params)?;
        self.check(&auth.credential_id, &auth.signature)
    }

    fn check_at(
        &self,
        credential_id: &str,
        signature: &str,
        now: Instant,
    ) -> Result<(), RejectReason> {
        let checks = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if checks % self.purge_interval == 0 {
            self.purge_expired(now);
        }

        match self
            .seen
            .entry((credential_id.to_owned(), signature.to_ascii_lowercase()))
        {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) < self.ttl {
                    return Err(RejectReason::Replayed);
                }
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
            }
        }
        Ok(())
    }

    /// Number of remembered signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn purge_expired(&self, now: Instant) {
        self.seen
            .retain(|_, seen_at| now.saturating_duration_since(*seen_at) < self.ttl);
    }
}
