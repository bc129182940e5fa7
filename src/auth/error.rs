// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant is kept distinct for logging, but all of them render the
//! same `401 {"message":"Unauthorized"}` response so callers cannot tell
//! which check rejected them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned to the caller for every rejection.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Token gate error type.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("authorization header is missing")]
    MissingCredential,
    /// Header is not `Bearer <token>`, or the token cannot be decoded
    #[error("bearer credential is malformed")]
    MalformedCredential,
    /// The key set could not be fetched from the issuer
    #[error("failed to fetch signing keys: {0}")]
    KeyResolutionFailed(String),
    /// Token names a key-identifier not present in the key set
    #[error("no signing key matches the token key id")]
    UnknownSigningKey,
    /// Signature, validity window, algorithm or issuer check failed
    #[error("token verification failed")]
    SignatureInvalid,
    /// Token verified but is not an access token
    #[error("token is not an access token")]
    WrongCredentialPurpose,
}

#[derive(Serialize)]
struct AuthErrorBody {
    message: &'static str,
}

impl AuthError {
    /// Stable code for logs and metrics. Never sent to the caller.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedCredential => "malformed_credential",
            AuthError::KeyResolutionFailed(_) => "key_resolution_failed",
            AuthError::UnknownSigningKey => "unknown_signing_key",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::WrongCredentialPurpose => "wrong_credential_purpose",
        }
    }

    /// Whether the same request may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::KeyResolutionFailed(_))
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(AuthErrorBody {
            message: UNAUTHORIZED_MESSAGE,
        });
        (self.status_code(), body).into_response()
    }
}
