// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the authenticated principal.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal.user_id is the caller's Cognito subject
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticatedPrincipal};
use crate::state::AppState;

/// Extractor for authenticated principals.
///
/// Uses the principal placed by [`require_auth`](super::middleware::require_auth)
/// when present, otherwise runs the token gate itself.
pub struct Auth(pub AuthenticatedPrincipal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<AuthenticatedPrincipal>().cloned() {
            return Ok(Auth(principal));
        }

        let principal = state.gate.authenticate(&parts.headers).await?;
        parts.extensions.insert(principal.clone());
        Ok(Auth(principal))
    }
}
