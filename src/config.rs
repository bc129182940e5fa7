// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `COGNITO_REGION` | User pool region | Required unless `AUTH_JWKS_URL` is set |
//! | `COGNITO_USER_POOL_ID` | User pool id | Required unless `AUTH_JWKS_URL` is set |
//! | `AUTH_JWKS_URL` | JWKS endpoint override | Derived from the user pool |
//! | `AUTH_ISSUER` | Expected `iss` claim | Derived from the user pool |
//! | `JWKS_FETCH_TIMEOUT_SECS` | Key-set fetch timeout | `5` |
//! | `AUTH_LEEWAY_SECS` | Clock skew tolerance | `60` |
//! | `JWKS_REFRESH_ON_UNKNOWN_KID` | Re-fetch keys on an unknown kid | `false` |
//! | `JWKS_REFRESH_MIN_INTERVAL_SECS` | Minimum spacing between re-fetches | `60` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::auth::jwks::{DEFAULT_FETCH_TIMEOUT, DEFAULT_REFRESH_MIN_INTERVAL};
use crate::auth::gate::DEFAULT_LEEWAY;
use crate::auth::RefreshPolicy;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const COGNITO_REGION_ENV: &str = "COGNITO_REGION";
pub const COGNITO_USER_POOL_ID_ENV: &str = "COGNITO_USER_POOL_ID";
pub const AUTH_JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";
pub const JWKS_FETCH_TIMEOUT_ENV: &str = "JWKS_FETCH_TIMEOUT_SECS";
pub const AUTH_LEEWAY_ENV: &str = "AUTH_LEEWAY_SECS";
pub const JWKS_REFRESH_ON_UNKNOWN_KID_ENV: &str = "JWKS_REFRESH_ON_UNKNOWN_KID";
pub const JWKS_REFRESH_MIN_INTERVAL_ENV: &str = "JWKS_REFRESH_MIN_INTERVAL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Token gate settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub jwks_url: Url,
    /// `None` disables the issuer check.
    pub issuer: Option<String>,
    pub fetch_timeout: Duration,
    pub leeway: Duration,
    pub refresh: RefreshPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub auth: AuthSettings,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(var(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;

        let pool_issuer = match (var(COGNITO_REGION_ENV), var(COGNITO_USER_POOL_ID_ENV)) {
            (Some(region), Some(pool_id)) => Some(cognito_issuer(&region, &pool_id)),
            _ => None,
        };

        let jwks_url = match (var(AUTH_JWKS_URL_ENV), &pool_issuer) {
            (Some(url), _) => url,
            (None, Some(issuer)) => format!("{issuer}/.well-known/jwks.json"),
            (None, None) => {
                let missing = if var(COGNITO_REGION_ENV).is_none() {
                    COGNITO_REGION_ENV
                } else {
                    COGNITO_USER_POOL_ID_ENV
                };
                return Err(ConfigError::Missing(missing));
            }
        };
        let jwks_url = Url::parse(&jwks_url).map_err(|e| ConfigError::Invalid {
            name: AUTH_JWKS_URL_ENV,
            reason: e.to_string(),
        })?;

        let issuer = var(AUTH_ISSUER_ENV).or(pool_issuer);

        let fetch_timeout = parse_or(
            var(JWKS_FETCH_TIMEOUT_ENV),
            JWKS_FETCH_TIMEOUT_ENV,
            DEFAULT_FETCH_TIMEOUT.as_secs(),
        )?;
        if fetch_timeout == 0 {
            return Err(ConfigError::Invalid {
                name: JWKS_FETCH_TIMEOUT_ENV,
                reason: "must be at least 1 second".to_string(),
            });
        }
        let leeway = parse_or(var(AUTH_LEEWAY_ENV), AUTH_LEEWAY_ENV, DEFAULT_LEEWAY.as_secs())?;

        let refresh = if parse_bool(var(JWKS_REFRESH_ON_UNKNOWN_KID_ENV), JWKS_REFRESH_ON_UNKNOWN_KID_ENV)? {
            let min_interval = parse_or(
                var(JWKS_REFRESH_MIN_INTERVAL_ENV),
                JWKS_REFRESH_MIN_INTERVAL_ENV,
                DEFAULT_REFRESH_MIN_INTERVAL.as_secs(),
            )?;
            RefreshPolicy::OnUnknownKid {
                min_interval: Duration::from_secs(min_interval),
            }
        } else {
            RefreshPolicy::Never
        };

        let log_format = match var(LOG_FORMAT_ENV).as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected 'json' or 'pretty', got '{other}'"),
                })
            }
        };

        Ok(Self {
            host,
            port,
            auth: AuthSettings {
                jwks_url,
                issuer,
                fetch_timeout: Duration::from_secs(fetch_timeout),
                leeway: Duration::from_secs(leeway),
                refresh,
            },
            log_format,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Issuer URL of a Cognito user pool.
pub fn cognito_issuer(region: &str, user_pool_id: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/{user_pool_id}")
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, name: &'static str) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("false" | "0" | "no") => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
