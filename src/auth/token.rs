// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OAuth2 token value.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// An OAuth2 access/refresh token pair.
///
/// Tokens are immutable: a refresh produces a new `Token` that replaces the
/// old one wholesale.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// Seconds before expiry in which a token already counts as expired.
    pub const EXPIRY_BUFFER_SECS: i64 = 10;

    /// Creates a token with an explicit expiry time.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    /// Creates a token from a server-reported time to live, measured from `now`.
    #[must_use]
    pub fn from_ttl(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            access_token,
            refresh_token,
            now + TimeDelta::seconds(expires_in_secs),
        )
    }

    /// Creates a token that holds only a refresh token.
    ///
    /// Its access token is empty and already expired, so the first use
    /// triggers a refresh.
    #[must_use]
    pub fn refresh_only(refresh_token: impl Into<String>) -> Self {
        Self::new(String::new(), refresh_token, DateTime::<Utc>::default())
    }

    /// Returns the access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Returns the expiry time of the access token.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns `true` if the token expires within [`Self::EXPIRY_BUFFER_SECS`] of `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_empty()
            || self.expires_at - TimeDelta::seconds(Self::EXPIRY_BUFFER_SECS) <= now
    }

    /// Returns `true` if the token is expired right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Returns a copy whose access token is marked as expired.
    #[must_use]
    pub(crate) fn invalidated(&self) -> Self {
        Self {
            expires_at: DateTime::<Utc>::default(),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

impl TokenResponse {
    /// Converts the response into a token, deriving expiry from `now`.
    ///
    /// `previous_refresh` is kept when the server did not rotate the refresh token.
    pub fn into_token(self, previous_refresh: &str, now: DateTime<Utc>) -> Token {
        let refresh = self
            .refresh_token
            .unwrap_or_else(|| previous_refresh.to_string());
        Token::from_ttl(self.access_token, refresh, self.expires_in, now)
    }
}

/// Shortens a secret for log output.
pub(crate) fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if prefix.is_empty() {
        "<empty>".to_string()
    } else {
        format!("{prefix}…")
    }
}
