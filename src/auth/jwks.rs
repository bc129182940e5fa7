// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Lifecycle
//!
//! - The key set is fetched lazily, in full, on the first request that needs it
//! - Once populated it stays valid for the life of the process
//! - Concurrent cold requests share a single in-flight fetch
//! - A failed fetch leaves the cache empty; requests already queued behind it
//!   get the same error, and the next new request retries
//!
//! With [`RefreshPolicy::OnUnknownKid`] an unknown key id may trigger one
//! replacement fetch per `min_interval`, which lets the process pick up an
//! issuer key rotation without a restart.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::error::AuthError;

/// Default timeout for the key-set fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default minimum spacing between unknown-kid refreshes.
pub const DEFAULT_REFRESH_MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Where the signing keys come from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the complete key set published by the issuer.
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the issuer's JWKS over HTTPS.
#[derive(Clone)]
pub struct HttpKeySetSource {
    /// JWKS URL (user pool `/.well-known/jwks.json`)
    jwks_url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl HttpKeySetSource {
    /// Create a source with an explicit fetch timeout.
    pub fn new(jwks_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::KeyResolutionFailed(format!("HTTP client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            client,
        })
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeyResolutionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyResolutionFailed(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyResolutionFailed(e.to_string()))
    }
}

/// Verification keys indexed by key id.
#[derive(Clone, Default)]
pub struct SigningKeySet {
    keys: HashMap<String, DecodingKey>,
}

impl SigningKeySet {
    /// Index every usable RSA signing key in `jwks`.
    ///
    /// Entries without a `kid`, encryption keys, and non-RSA material are
    /// skipped rather than failing the whole set.
    pub fn from_jwk_set(jwks: &JwkSet) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());

        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.as_deref() else {
                tracing::warn!("Skipping JWKS entry without kid");
                continue;
            };

            match jwk_to_decoding_key(jwk) {
                Some(key) => {
                    keys.insert(kid.to_string(), key);
                }
                None => {
                    tracing::warn!(kid = %kid, "Skipping unsupported JWKS entry");
                }
            }
        }

        Self { keys }
    }

    /// Key registered under `kid`, if any.
    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    /// Whether `kid` is present.
    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// Number of usable keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no entry in the set was usable.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for SigningKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeySet")
            .field("kids", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Convert an RS256 signing JWK into a decoding key.
fn jwk_to_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return None;
    }

    match jwk.common.key_algorithm {
        None | Some(KeyAlgorithm::RS256) => {}
        Some(_) => return None,
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok(),
        _ => None,
    }
}

/// What to do when a populated key set has no entry for a token's kid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Reject with `UnknownSigningKey`; the set is fetched once per process.
    #[default]
    Never,
    /// Re-fetch the whole set, at most once per `min_interval`.
    OnUnknownKid { min_interval: Duration },
}

/// Lazily populated, process-wide signing key cache.
///
/// The current set is published as a single `Arc` swap, so readers see
/// either no set or a complete one. Fetches are serialized by `fetch_gate`.
/// Requests that queued behind a failed fetch share its error instead of
/// each starting another one.
pub struct SigningKeyCache {
    source: Arc<dyn KeySetSource>,
    keys: RwLock<Option<Arc<SigningKeySet>>>,
    fetch_gate: Mutex<FetchState>,
    refresh: RefreshPolicy,
    fetches: AtomicU64,
    completed: AtomicU64,
}

/// Outcome of the most recent fetch, guarded by `fetch_gate`.
#[derive(Default)]
struct FetchState {
    started_at: Option<Instant>,
    last_error: Option<String>,
}

impl SigningKeyCache {
    /// Create an empty cache that never re-fetches once populated.
    pub fn new(source: Arc<dyn KeySetSource>) -> Self {
        Self {
            source,
            keys: RwLock::new(None),
            fetch_gate: Mutex::new(FetchState::default()),
            refresh: RefreshPolicy::Never,
            fetches: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    /// Set how an unknown key id is handled.
    pub fn with_refresh_policy(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    /// The active unknown-kid policy.
    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh
    }

    /// Number of fetches attempted against the source.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub async fn is_populated(&self) -> bool {
        self.keys.read().await.is_some()
    }

    /// Populate the cache if it is still empty.
    pub async fn ensure_populated(&self) -> Result<(), AuthError> {
        self.current_or_populate().await.map(|_| ())
    }

    /// Resolve the verification key for `kid`.
    pub async fn resolve(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let set = self.current_or_populate().await?;

        if let Some(key) = set.get(kid) {
            return Ok(key.clone());
        }

        match self.refresh {
            RefreshPolicy::Never => {
                tracing::debug!(kid = %kid, "Key not found in JWKS cache");
                Err(AuthError::UnknownSigningKey)
            }
            RefreshPolicy::OnUnknownKid { min_interval } => {
                self.refresh_for(kid, &set, min_interval).await
            }
        }
    }

    async fn snapshot(&self) -> Option<Arc<SigningKeySet>> {
        self.keys.read().await.clone()
    }

    async fn current_or_populate(&self) -> Result<Arc<SigningKeySet>, AuthError> {
        if let Some(set) = self.snapshot().await {
            return Ok(set);
        }

        let seen = self.completed.load(Ordering::Acquire);
        let mut state = self.fetch_gate.lock().await;

        // Another request may have populated the set while we waited.
        if let Some(set) = self.snapshot().await {
            return Ok(set);
        }

        // A fetch finished while we waited and it failed: share that outcome.
        if self.completed.load(Ordering::Acquire) != seen {
            if let Some(ref err) = state.last_error {
                return Err(AuthError::KeyResolutionFailed(err.clone()));
            }
        }

        self.fetch_and_publish(&mut state).await
    }

    async fn refresh_for(
        &self,
        kid: &str,
        seen: &Arc<SigningKeySet>,
        min_interval: Duration,
    ) -> Result<DecodingKey, AuthError> {
        let mut state = self.fetch_gate.lock().await;

        if let Some(current) = self.snapshot().await {
            if !Arc::ptr_eq(&current, seen) {
                return current
                    .get(kid)
                    .cloned()
                    .ok_or(AuthError::UnknownSigningKey);
            }
        }

        if let Some(at) = state.started_at {
            if at.elapsed() < min_interval {
                tracing::debug!(kid = %kid, "Unknown kid, refresh budget exhausted");
                return Err(AuthError::UnknownSigningKey);
            }
        }

        tracing::info!(kid = %kid, "Unknown kid, refreshing JWKS");
        let set = self.fetch_and_publish(&mut state).await?;
        set.get(kid).cloned().ok_or(AuthError::UnknownSigningKey)
    }

    /// Fetch a full set and publish it. Caller must hold `fetch_gate`.
    async fn fetch_and_publish(&self, state: &mut FetchState) -> Result<Arc<SigningKeySet>, AuthError> {
        state.started_at = Some(Instant::now());
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let fetched = self.source.fetch().await;
        let result = match fetched {
            Ok(jwks) => {
                let set = Arc::new(SigningKeySet::from_jwk_set(&jwks));
                *self.keys.write().await = Some(Arc::clone(&set));
                tracing::info!(key_count = set.len(), "JWKS cache populated");
                state.last_error = None;
                Ok(set)
            }
            Err(e) => {
                tracing::warn!(error = %e, "JWKS fetch failed");
                state.last_error = Some(match &e {
                    AuthError::KeyResolutionFailed(msg) => msg.clone(),
                    other => other.to_string(),
                });
                Err(e)
            }
        };

        self.completed.fetch_add(1, Ordering::Release);
        result
    }
}
