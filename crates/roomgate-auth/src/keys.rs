//! Public key resolution and caching.
//!
//! Keys are fetched from the configured ASAP key server and kept in a bounded
//! LRU cache for the lifetime of the process. The fetch path is derived from
//! the key ID by hashing it (`{server}/{hex(sha256(kid))}.pem`), which keeps
//! arbitrary key IDs out of the URL path.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::error::{AuthError, Result};

/// Deadline for a single key fetch. Dropping the request future on expiry
/// cancels the in-flight request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// User-Agent presented to the key server.
const USER_AGENT: &str = concat!("roomgate/", env!("CARGO_PKG_VERSION"));

/// Resolves PEM key material by key ID against a remote key server.
///
/// Concurrent misses for the same key ID are coalesced: one fetch is issued
/// and every waiter shares its outcome. Only successful fetches (HTTP 200 or
/// 204) populate the cache.
pub struct PublicKeyResolver {
    base_url: String,
    client: reqwest::Client,
    fetch_timeout: Duration,
    cache: Mutex<LruCache<String, String>>,
    inflight: Mutex<HashMap<String, Arc<OnceCell<Option<String>>>>>,
}

impl PublicKeyResolver {
    /// Create a resolver for the given key server base URL with a cache
    /// bounded to `cache_size` entries.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with
    /// default TLS).
    #[must_use]
    pub fn new(base_url: impl Into<String>, cache_size: usize) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to create HTTP client");

        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);

        Self {
            base_url: base_url.into(),
            client,
            fetch_timeout: FETCH_TIMEOUT,
            cache: Mutex::new(LruCache::new(cache_size)),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Override the fetch deadline.
    #[must_use]
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Resolve the PEM key material for `kid`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyNotFound`] when the key server does not hand
    /// out a key for this ID, the fetch fails, or it exceeds the deadline.
    pub async fn resolve(&self, kid: &str) -> Result<String> {
        if let Some(pem) = self.cache.lock().get(kid) {
            tracing::debug!(%kid, "public key cache hit");
            return Ok(pem.clone());
        }

        let cell = {
            let mut inflight = self.inflight.lock();
            inflight
                .entry(kid.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let pem = cell
            .get_or_init(|| async {
                match self.fetch(kid).await {
                    Ok(pem) => {
                        self.cache.lock().put(kid.to_string(), pem.clone());
                        Some(pem)
                    }
                    Err(e) => {
                        tracing::warn!(%kid, error = %e, "public key fetch failed");
                        None
                    }
                }
            })
            .await
            .clone();

        // Drop the flight record so a later miss retries the fetch.
        self.inflight.lock().remove(kid);

        pem.ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
    }

    /// Fetch the key from the server, bounded by the fetch deadline.
    async fn fetch(&self, kid: &str) -> Result<String> {
        let digest = hex::encode(Sha256::digest(kid.as_bytes()));
        let url = format!("{}/{digest}.pem", self.base_url);
        tracing::debug!(%kid, %url, "fetching public key");

        timeout(self.fetch_timeout, async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| AuthError::KeyFetchFailed(e.to_string()))?;

            let status = response.status();
            if status == reqwest::StatusCode::OK || status == reqwest::StatusCode::NO_CONTENT {
                response
                    .text()
                    .await
                    .map_err(|e| AuthError::KeyFetchFailed(e.to_string()))
            } else {
                Err(AuthError::KeyFetchFailed(format!(
                    "unexpected status {status}"
                )))
            }
        })
        .await
        .map_err(|_| AuthError::KeyFetchTimeout)?
    }
}
