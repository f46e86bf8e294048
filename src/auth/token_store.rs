// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Holder of the current OAuth2 token.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;

use crate::error::{
    AuthorizationError, CommunicationError, ConfigurationError, Error, ParseError, Result,
};
use crate::protocol::ApiConfig;

use super::persistence::{NoPersistence, TokenPersistence};
use super::token::{Token, TokenResponse, redact};

/// Holds the current token and refreshes it before it expires.
///
/// All reads go through one async mutex that stays locked for the whole
/// "check expiry, refresh if needed, read" sequence. Concurrent callers that
/// find an expired token therefore wait for a single refresh instead of each
/// spending a refresh token.
///
/// # Examples
///
/// ```no_run
/// use homeconnect_lib::auth::{Token, TokenStore};
/// use homeconnect_lib::protocol::ApiConfig;
///
/// # async fn example() -> homeconnect_lib::Result<()> {
/// let config = ApiConfig::simulator("client-id", "client-secret");
/// let store = TokenStore::new(&config, Some(Token::refresh_only("stored-refresh-token")))?;
///
/// // Refreshes on first use because only a refresh token is known.
/// let header = store.bearer_token().await?;
/// assert!(header.starts_with("Bearer "));
/// # Ok(())
/// # }
/// ```
pub struct TokenStore {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    current: Mutex<Option<Token>>,
    persistence: Arc<dyn TokenPersistence>,
    refresh_count: AtomicU64,
}

impl TokenStore {
    /// Creates a token store for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: &ApiConfig, token: Option<Token>) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(CommunicationError::Http)?;

        Ok(Self {
            http,
            token_url: config.token_url(),
            client_id: config.client_id().to_string(),
            client_secret: config.client_secret().to_string(),
            current: Mutex::new(token),
            persistence: Arc::new(NoPersistence),
            refresh_count: AtomicU64::new(0),
        })
    }

    /// Sets where refreshed tokens are stored.
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn TokenPersistence>) -> Self {
        self.persistence = persistence;
        self
    }

    /// Returns `Bearer <access token>`, refreshing first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingRefreshToken`] if no token is held,
    /// [`AuthorizationError`] if the refresh token is rejected, or
    /// [`CommunicationError`] on transport failure.
    pub async fn bearer_token(&self) -> Result<String> {
        Ok(self.valid_token().await?.bearer())
    }

    /// Returns a token that is not expired, refreshing first if needed.
    ///
    /// # Errors
    ///
    /// Same as [`bearer_token`](Self::bearer_token).
    pub async fn valid_token(&self) -> Result<Token> {
        let mut current = self.current.lock().await;

        let token = current
            .clone()
            .ok_or(ConfigurationError::MissingRefreshToken)?;

        if !token.is_expired() {
            return Ok(token);
        }

        tracing::debug!(expires_at = %token.expires_at(), "Access token expired, refreshing");
        self.refresh_locked(&mut current, &token).await
    }

    /// Refreshes the access token now, regardless of its expiry.
    ///
    /// # Errors
    ///
    /// Same as [`bearer_token`](Self::bearer_token).
    pub async fn refresh(&self) -> Result<Token> {
        let mut current = self.current.lock().await;
        let token = current
            .clone()
            .ok_or(ConfigurationError::MissingRefreshToken)?;
        self.refresh_locked(&mut current, &token).await
    }

    /// Exchanges an authorization code for the first token pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError`] if the code is rejected or
    /// [`CommunicationError`] on transport failure.
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<Token> {
        let mut current = self.current.lock().await;

        let form = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_secret", self.client_secret.as_str()),
        ];
        let token = self.request_token(&form, "").await?;

        tracing::info!("Obtained token from authorization code");
        self.store(&mut current, token.clone()).await;
        Ok(token)
    }

    /// Marks `access_token` as expired so the next read refreshes it.
    ///
    /// Does nothing if the held token has already been replaced, so a burst of
    /// 401 responses for the same stale token causes only one refresh.
    pub async fn invalidate(&self, access_token: &str) {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref()
            && token.access_token() == access_token
        {
            tracing::debug!(access_token = %redact(access_token), "Invalidating access token");
            *current = Some(token.invalidated());
        }
    }

    /// Returns a copy of the held token.
    pub async fn token(&self) -> Option<Token> {
        self.current.lock().await.clone()
    }

    /// Replaces the held token.
    pub async fn set_token(&self, token: Token) {
        let mut current = self.current.lock().await;
        self.store(&mut current, token).await;
    }

    /// Returns how many refresh requests were sent to the token endpoint.
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    async fn refresh_locked(&self, current: &mut Option<Token>, token: &Token) -> Result<Token> {
        if token.refresh_token().is_empty() {
            return Err(ConfigurationError::MissingRefreshToken.into());
        }

        let form = [
            ("refresh_token", token.refresh_token()),
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        match self.request_token(&form, token.refresh_token()).await {
            Ok(fresh) => {
                tracing::debug!(expires_at = %fresh.expires_at(), "Access token refreshed");
                self.store(current, fresh.clone()).await;
                Ok(fresh)
            }
            Err(err @ Error::Authorization(_)) => {
                tracing::error!(error = %err, "Refresh token rejected, re-authorization required");
                *current = None;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Saves `token` on the blocking pool, then makes it current.
    async fn store(&self, current: &mut Option<Token>, token: Token) {
        let persistence = Arc::clone(&self.persistence);
        let saved = token.clone();
        match tokio::task::spawn_blocking(move || persistence.save(&saved)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to persist token"),
            Err(e) => tracing::warn!(error = %e, "Token persistence task failed"),
        }
        *current = Some(token);
    }

    async fn request_token(&self, form: &[(&str, &str)], previous_refresh: &str) -> Result<Token> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(CommunicationError::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(CommunicationError::Http)?;

        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Token request failed");
            return Err(classify_token_failure(status, body));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(ParseError::Json)?;
        Ok(parsed.into_token(previous_refresh, Utc::now()))
    }
}

fn classify_token_failure(status: StatusCode, body: String) -> Error {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AuthorizationError::TokenRequestRejected {
                code: status.as_u16(),
                body,
            }
            .into()
        }
        _ => CommunicationError::Status {
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        }
        .into(),
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("refresh_count", &self.refresh_count())
            .finish_non_exhaustive()
    }
}
