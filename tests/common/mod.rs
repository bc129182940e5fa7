// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for integration tests: RSA test keys, token minting and a
//! router wired to a mocked JWKS endpoint.

#![allow(dead_code)]

use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use expense_tracker_server::{
    api::router,
    auth::RefreshPolicy,
    build_gate,
    config::{cognito_issuer, AuthSettings},
    state::AppState,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use url::Url;
use wiremock::MockServer;

pub const JWKS_PATH: &str = "/eu-west-1_TestPool/.well-known/jwks.json";

pub fn issuer() -> String {
    cognito_issuer("eu-west-1", "eu-west-1_TestPool")
}

pub struct TestKeypair {
    private_pem: &'static str,
    public_jwk: &'static str,
}

pub const KEY_ONE: TestKeypair = TestKeypair {
    private_pem: include_str!("../fixtures/signing_key_1.pem"),
    public_jwk: include_str!("../fixtures/signing_key_1.pub.json"),
};

pub const KEY_TWO: TestKeypair = TestKeypair {
    private_pem: include_str!("../fixtures/signing_key_2.pem"),
    public_jwk: include_str!("../fixtures/signing_key_2.pub.json"),
};

impl TestKeypair {
    pub fn jwk(&self, kid: &str) -> Value {
        let mut jwk: Value = serde_json::from_str(self.public_jwk).expect("fixture JWK");
        jwk["kid"] = kid.into();
        jwk
    }

    pub fn sign(&self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).expect("fixture PEM");
        encode(&header, claims, &key).expect("Failed to sign token")
    }
}

pub fn jwks_body(entries: &[(&TestKeypair, &str)]) -> Value {
    let keys: Vec<Value> = entries.iter().map(|(key, kid)| key.jwk(kid)).collect();
    json!({ "keys": keys })
}

pub fn access_claims(sub: &str) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "sub": sub,
        "token_use": "access",
        "iss": issuer(),
        "iat": now,
        "exp": now + 3600,
        "client_id": "test-client",
        "username": "alice",
        "scope": "aws.cognito.signin.user.admin"
    })
}

pub fn settings(server: &MockServer, refresh: RefreshPolicy) -> AuthSettings {
    AuthSettings {
        jwks_url: Url::parse(&format!("{}{}", server.uri(), JWKS_PATH)).expect("mock URL"),
        issuer: Some(issuer()),
        fetch_timeout: Duration::from_secs(2),
        leeway: Duration::from_secs(60),
        refresh,
    }
}

/// Router whose token gate fetches keys from `server`.
pub fn app(server: &MockServer) -> Router {
    app_with(server, RefreshPolicy::Never)
}

pub fn app_with(server: &MockServer, refresh: RefreshPolicy) -> Router {
    let gate = build_gate(&settings(server, refresh)).expect("token gate");
    router(AppState::new(gate))
}

pub fn me_request(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/v1/me");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("JSON body")
}
