// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Expense Tracker Server
//!
//! Backend for the expense tracker. Every `/v1` route sits behind a token
//! gate that verifies Cognito access tokens against the user pool JWKS.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token verification and the signing key cache
//! - `config` - Environment configuration
//! - `telemetry` - Tracing subscriber setup

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use auth::{AuthError, HttpKeySetSource, SigningKeyCache, TokenGate};
use config::AuthSettings;

/// Build the token gate described by `settings`.
pub fn build_gate(settings: &AuthSettings) -> Result<TokenGate, AuthError> {
    let source = HttpKeySetSource::new(settings.jwks_url.as_str(), settings.fetch_timeout)?;
    let keys = SigningKeyCache::new(Arc::new(source)).with_refresh_policy(settings.refresh);

    let gate = TokenGate::new(Arc::new(keys)).with_leeway(settings.leeway);
    Ok(match &settings.issuer {
        Some(issuer) => gate.with_issuer(issuer.clone()),
        None => gate,
    })
}
