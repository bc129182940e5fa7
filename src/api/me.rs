// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthenticatedPrincipal};

/// The caller as seen by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    /// Cognito subject, used as the owner key for the caller's expenses.
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<AuthenticatedPrincipal> for MeResponse {
    fn from(principal: AuthenticatedPrincipal) -> Self {
        let claims = principal.claims;
        Self {
            user_id: principal.user_id,
            scopes: claims.scopes(),
            expires_at: DateTime::from_timestamp(claims.exp, 0),
            username: claims.username,
            client_id: claims.client_id,
            groups: claims.groups,
            issuer: claims.iss,
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, body = MeResponse),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn me(Auth(principal): Auth) -> Json<MeResponse> {
    Json(principal.into())
}
