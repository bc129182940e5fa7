// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared helpers for auth unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use super::error::AuthError;
use super::jwks::KeySetSource;

pub const TEST_ISSUER: &str = "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_TestPool";

/// RSA key pair loaded from the integration test fixtures.
pub struct TestKeypair {
    private_pem: &'static str,
    public_jwk: &'static str,
}

pub static KEY_ONE: TestKeypair = TestKeypair {
    private_pem: include_str!("../../tests/fixtures/signing_key_1.pem"),
    public_jwk: include_str!("../../tests/fixtures/signing_key_1.pub.json"),
};

pub static KEY_TWO: TestKeypair = TestKeypair {
    private_pem: include_str!("../../tests/fixtures/signing_key_2.pem"),
    public_jwk: include_str!("../../tests/fixtures/signing_key_2.pub.json"),
};

impl TestKeypair {
    /// Public JWK for this key, published under `kid`.
    pub fn jwk(&self, kid: &str) -> Value {
        let mut jwk: Value = serde_json::from_str(self.public_jwk).unwrap();
        jwk["kid"] = kid.into();
        jwk
    }

    /// Sign `claims` with RS256, naming `kid` in the header.
    pub fn sign(&self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }
}

pub fn jwk_set(entries: &[(&TestKeypair, &str)]) -> JwkSet {
    let keys: Vec<Value> = entries.iter().map(|(key, kid)| key.jwk(kid)).collect();
    serde_json::from_value(json!({ "keys": keys })).unwrap()
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Valid access-token claims for `sub`, expiring in an hour.
pub fn access_claims(sub: &str) -> Value {
    json!({
        "sub": sub,
        "token_use": "access",
        "iss": TEST_ISSUER,
        "iat": now(),
        "exp": now() + 3600,
        "client_id": "test-client",
        "username": "alice",
        "scope": "aws.cognito.signin.user.admin"
    })
}

/// In-memory key source that counts fetches.
pub struct FakeKeySource {
    jwks: Mutex<JwkSet>,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
    delay: Duration,
}

impl FakeKeySource {
    pub fn new(jwks: JwkSet) -> Self {
        Self {
            jwks: Mutex::new(jwks),
            failures_left: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn failing_first(self, n: usize) -> Self {
        self.fail_next(n);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn replace(&self, jwks: JwkSet) {
        *self.jwks.lock().unwrap() = jwks;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for FakeKeySource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AuthError::KeyResolutionFailed(
                "connection refused".to_string(),
            ));
        }

        Ok(self.jwks.lock().unwrap().clone())
    }
}
