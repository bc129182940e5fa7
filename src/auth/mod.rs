// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Cognito access token verification for the expense API.
//!
//! ## Auth Flow
//!
//! 1. Frontend signs the user in against the Cognito user pool
//! 2. Frontend sends `Authorization: Bearer <access token>`
//! 3. Server:
//!    - Fetches the user pool JWKS once and caches it for the process lifetime
//!    - Verifies the RS256 signature, expiry, not-before and issuer
//!    - Requires `token_use == "access"`
//!    - Extracts `sub` → `user_id`, the partition key for the caller's records
//!
//! ## Security
//!
//! - Every rejection is a uniform `401 {"message":"Unauthorized"}`
//! - The failing check is only visible in server logs
//! - Clock skew tolerance defaults to 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod jwks;
pub mod middleware;

#[cfg(test)]
pub(crate) mod testutil;

pub use claims::{AuthenticatedPrincipal, DecodedClaims, TokenUse};
pub use error::AuthError;
pub use extractor::Auth;
pub use gate::TokenGate;
pub use jwks::{HttpKeySetSource, KeySetSource, RefreshPolicy, SigningKeyCache, SigningKeySet};
pub use middleware::require_auth;
