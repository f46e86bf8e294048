// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! API client builder.

use std::sync::Arc;

use crate::auth::{Token, TokenPersistence, TokenStore};
use crate::client::ApplianceApiClient;
use crate::error::Result;
use crate::protocol::{ApiConfig, ApiRequest, DEFAULT_HISTORY_CAPACITY, RequestHistory};

/// Builder for [`ApplianceApiClient`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use homeconnect_lib::ApplianceApiClient;
/// use homeconnect_lib::auth::JsonFileTokenPersistence;
/// use homeconnect_lib::protocol::ApiConfig;
///
/// # fn example() -> homeconnect_lib::Result<()> {
/// // The stored token is loaded and every refresh is written back
/// let client = ApplianceApiClient::builder(ApiConfig::production("id", "secret"))
///     .with_persistence(Arc::new(JsonFileTokenPersistence::new("token.json")))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ApplianceApiClientBuilder {
    config: ApiConfig,
    token: Option<Token>,
    persistence: Option<Arc<dyn TokenPersistence>>,
    token_store: Option<Arc<TokenStore>>,
    history: Vec<ApiRequest>,
    history_capacity: usize,
}

impl ApplianceApiClientBuilder {
    pub(crate) fn new(config: ApiConfig) -> Self {
        Self {
            config,
            token: None,
            persistence: None,
            token_store: None,
            history: Vec::new(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Sets the initial token.
    #[must_use]
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets where tokens are stored.
    ///
    /// Without an explicit [`with_token`](Self::with_token), the stored token
    /// is loaded when building.
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn TokenPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Shares an existing token store, for example between clients of the
    /// same account. Token and persistence settings are then ignored.
    #[must_use]
    pub fn with_token_store(mut self, store: Arc<TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Seeds the request history with earlier entries, oldest first.
    #[must_use]
    pub fn with_request_history(mut self, entries: Vec<ApiRequest>) -> Self {
        self.history = entries;
        self
    }

    /// Sets how many requests the history keeps.
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the stored token
    /// cannot be loaded, or an HTTP client cannot be created.
    pub fn build(self) -> Result<ApplianceApiClient> {
        self.config.validate()?;

        let tokens = match self.token_store {
            Some(store) => store,
            None => {
                let token = match (self.token, &self.persistence) {
                    (Some(token), _) => Some(token),
                    (None, Some(persistence)) => persistence.load()?,
                    (None, None) => None,
                };
                let mut store = TokenStore::new(&self.config, token)?;
                if let Some(persistence) = self.persistence {
                    store = store.with_persistence(persistence);
                }
                Arc::new(store)
            }
        };

        let history = Arc::new(RequestHistory::with_entries(
            self.history_capacity,
            self.history,
        ));

        tracing::debug!(base_url = %self.config.base_url(), "Building API client");
        ApplianceApiClient::from_parts(self.config, tokens, history)
    }
}

impl std::fmt::Debug for ApplianceApiClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplianceApiClientBuilder")
            .field("base_url", &self.config.base_url())
            .field("has_token", &self.token.is_some())
            .field("has_persistence", &self.persistence.is_some())
            .field("shared_token_store", &self.token_store.is_some())
            .field("history_entries", &self.history.len())
            .finish_non_exhaustive()
    }
}
