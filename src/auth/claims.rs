// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated principal representation.

use serde::Deserialize;

/// Purpose tag carried in the `token_use` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    /// API access token, the only kind the gate accepts
    Access,
    /// OIDC identity token
    Id,
    /// Refresh token
    Refresh,
    /// Unrecognised or absent tag
    #[default]
    #[serde(other)]
    Other,
}

/// Claims extracted from a verified Cognito token.
///
/// See: https://docs.aws.amazon.com/cognito/latest/developerguide/amazon-cognito-user-pools-using-the-access-token.html
#[derive(Debug, Clone, Deserialize)]
pub struct DecodedClaims {
    /// Subject, the Cognito user identifier
    pub sub: String,

    /// Purpose tag (`access`, `id`, ...)
    #[serde(default)]
    pub token_use: TokenUse,

    /// Issuer (the user pool URL)
    #[serde(default)]
    pub iss: Option<String>,

    /// Expiration timestamp
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Not before timestamp
    #[serde(default)]
    pub nbf: Option<i64>,

    /// App client the token was issued to
    #[serde(default)]
    pub client_id: Option<String>,

    /// Cognito username
    #[serde(default)]
    pub username: Option<String>,

    /// Space-separated OAuth scopes
    #[serde(default)]
    pub scope: Option<String>,

    /// User pool groups
    #[serde(default, rename = "cognito:groups")]
    pub groups: Vec<String>,
}

impl DecodedClaims {
    pub fn is_access_token(&self) -> bool {
        self.token_use == TokenUse::Access
    }

    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Authenticated caller attached to the request by the token gate.
///
/// `user_id` is the partition key downstream handlers use for the caller's
/// records.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    /// Canonical user ID (Cognito `sub` claim)
    pub user_id: String,

    /// Full verified claims
    pub claims: DecodedClaims,
}

impl AuthenticatedPrincipal {
    pub fn from_claims(claims: DecodedClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            claims,
        }
    }
}
