// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! [`TokenGate::authenticate`] runs the full check for one request:
//!
//! 1. Read `Authorization: Bearer <token>`
//! 2. Decode the header and read `kid`
//! 3. Resolve the key from the [`SigningKeyCache`]
//! 4. Verify the RS256 signature, validity window and issuer
//! 5. Require `token_use == "access"`

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::claims::{AuthenticatedPrincipal, DecodedClaims};
use super::error::AuthError;
use super::jwks::SigningKeyCache;

/// Default clock skew tolerance (60 seconds).
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(60);

/// Tokens larger than this are rejected before any parsing.
pub const MAX_TOKEN_BYTES: usize = 8 * 1024;

/// Verifies access tokens from a single issuer.
pub struct TokenGate {
    keys: Arc<SigningKeyCache>,
    issuer: Option<String>,
    leeway: Duration,
}

impl TokenGate {
    pub fn new(keys: Arc<SigningKeyCache>) -> Self {
        Self {
            keys,
            issuer: None,
            leeway: DEFAULT_LEEWAY,
        }
    }

    /// Require an exact `iss` match.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn keys(&self) -> &Arc<SigningKeyCache> {
        &self.keys
    }

    /// Authenticate a request from its headers.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedPrincipal, AuthError> {
        let result = match bearer_token(headers) {
            Ok(token) => self.verify(token).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(principal) => {
                tracing::debug!(user_id = %principal.user_id, "Request authenticated");
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(error_code = e.error_code(), error = %e, "Request rejected");
            }
            Err(e) => {
                tracing::debug!(error_code = e.error_code(), "Request rejected");
            }
        }

        result
    }

    /// Verify a raw token.
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedPrincipal, AuthError> {
        if token.len() > MAX_TOKEN_BYTES {
            return Err(AuthError::MalformedCredential);
        }

        let header = decode_header(token).map_err(|_| AuthError::MalformedCredential)?;
        let kid = header.kid.ok_or(AuthError::MalformedCredential)?;

        let decoding_key = self.keys.resolve(&kid).await?;

        let token_data = decode::<DecodedClaims>(token, &decoding_key, &self.validation())
            .map_err(|e| classify(&e))?;
        let claims = token_data.claims;

        if !claims.is_access_token() {
            return Err(AuthError::WrongCredentialPurpose);
        }

        Ok(AuthenticatedPrincipal::from_claims(claims))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.leeway.as_secs();
        validation.validate_nbf = true;
        // Cognito access tokens carry `client_id` instead of `aud`.
        validation.validate_aud = false;

        if let Some(ref issuer) = self.issuer {
            validation.set_issuer(&[issuer]);
        }

        validation
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedCredential)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedCredential);
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MalformedCredential);
    }

    Ok(token)
}

/// Collapse a verification failure into a gate error.
///
/// The signature is checked before the payload is read, so a decoding error
/// here means a correctly signed token with an unusable payload.
fn classify(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            AuthError::MalformedCredential
        }
        _ => AuthError::SignatureInvalid,
    }
}
