// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level client for the Home Connect appliance API.
//!
//! This module combines the token store, the REST transport and the event
//! stream behind one API used by appliance handlers.

mod builder;
mod helpers;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::auth::{Token, TokenStore};
use crate::error::{AuthorizationError, Error, Result};
use crate::event::Event;
use crate::protocol::rest::{RequestError, RestClient};
use crate::protocol::{APPLIANCES_PATH, ApiConfig, ApiRequest, RequestHistory, appliance_path};
use crate::response::{
    AvailableOptions, AvailableProgram, AvailableProgramOption, AvailablePrograms, Data,
    HomeAppliance, HomeAppliances, Program,
};
use crate::subscription::{EventListener, EventStream, SubscriptionId};
use crate::types::ValueType;

pub use builder::ApplianceApiClientBuilder;

/// Client for one Home Connect account.
///
/// Every REST operation fetches a valid access token first. If the server
/// still answers 401, the token is invalidated, refreshed and the request
/// is sent exactly once more; a second 401 fails with
/// [`AuthorizationError::TokenRejected`].
///
/// # Examples
///
/// ```no_run
/// use homeconnect_lib::ApplianceApiClient;
/// use homeconnect_lib::auth::Token;
/// use homeconnect_lib::protocol::ApiConfig;
///
/// # async fn example() -> homeconnect_lib::Result<()> {
/// let config = ApiConfig::simulator("client-id", "client-secret");
/// let client = ApplianceApiClient::new(config, Token::refresh_only("refresh-token"))?;
///
/// for appliance in client.list_appliances().await? {
///     println!("{} ({}) connected={}", appliance.name, appliance.appliance_type, appliance.connected);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ApplianceApiClient {
    config: ApiConfig,
    tokens: Arc<TokenStore>,
    rest: RestClient,
    events: EventStream,
    history: Arc<RequestHistory>,
    options_cache: RwLock<HashMap<String, Vec<AvailableProgramOption>>>,
}

impl ApplianceApiClient {
    /// Creates a client holding `token`.
    ///
    /// A token from [`Token::refresh_only`] is enough; the access token is
    /// fetched on first use.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or an HTTP client
    /// cannot be created.
    pub fn new(config: ApiConfig, token: Token) -> Result<Self> {
        Self::builder(config).with_token(token).build()
    }

    /// Returns a builder for more control over token storage and history.
    #[must_use]
    pub fn builder(config: ApiConfig) -> ApplianceApiClientBuilder {
        ApplianceApiClientBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: ApiConfig,
        tokens: Arc<TokenStore>,
        history: Arc<RequestHistory>,
    ) -> Result<Self> {
        let rest = RestClient::new(&config, Arc::clone(&tokens), Arc::clone(&history))?;
        let events = EventStream::new(&config, Arc::clone(&tokens))?;

        Ok(Self {
            config,
            tokens,
            rest,
            events,
            history,
            options_cache: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Returns the token store.
    #[must_use]
    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Returns the event stream manager.
    #[must_use]
    pub fn event_stream(&self) -> &EventStream {
        &self.events
    }

    // ========================================================================
    // Appliances
    // ========================================================================

    /// Lists all appliances paired with the account.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    pub async fn list_appliances(&self) -> Result<Vec<HomeAppliance>> {
        let list: HomeAppliances = self
            .with_retry(|| self.rest.get("-", APPLIANCES_PATH))
            .await?;
        Ok(list.homeappliances)
    }

    /// Returns one appliance.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    pub async fn get_appliance(&self, ha_id: &str) -> Result<HomeAppliance> {
        let path = appliance_path(ha_id);
        self.with_retry(|| self.rest.get(ha_id, &path)).await
    }

    // ========================================================================
    // Settings and status
    // ========================================================================

    /// Reads a setting.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    pub async fn get_setting(&self, ha_id: &str, key: &str) -> Result<Data> {
        let path = setting_path(ha_id, key);
        self.with_retry(|| self.rest.get(ha_id, &path)).await
    }

    /// Writes a setting, encoding `value` as `value_type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if `value` does not fit `value_type`,
    /// [`Error::Offline`] if the appliance is offline, or another error if
    /// the request fails.
    pub async fn put_setting(
        &self,
        ha_id: &str,
        key: &str,
        value: &str,
        unit: Option<&str>,
        value_type: ValueType,
    ) -> Result<()> {
        let path = setting_path(ha_id, key);
        self.with_retry(|| {
            self.rest
                .put(ha_id, &path, key, Some(value), unit, value_type)
        })
        .await
    }

    /// Reads a status value.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    pub async fn get_status(&self, ha_id: &str, key: &str) -> Result<Data> {
        let path = format!("{}/status/{}", appliance_path(ha_id), urlencoding::encode(key));
        self.with_retry(|| self.rest.get(ha_id, &path)).await
    }

    // ========================================================================
    // Programs
    // ========================================================================

    /// Returns the running program, or `None` if nothing runs.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    pub async fn get_active_program(&self, ha_id: &str) -> Result<Option<Program>> {
        let path = program_path(ha_id, "active");
        self.with_retry(|| self.rest.get_optional(ha_id, &path))
            .await
    }

    /// Returns the selected program, or `None` if nothing is selected.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    pub async fn get_selected_program(&self, ha_id: &str) -> Result<Option<Program>> {
        let path = program_path(ha_id, "selected");
        self.with_retry(|| self.rest.get_optional(ha_id, &path))
            .await
    }

    /// Selects a program without starting it.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn set_selected_program(&self, ha_id: &str, program_key: &str) -> Result<()> {
        let path = program_path(ha_id, "selected");
        self.with_retry(|| {
            self.rest
                .put(ha_id, &path, program_key, None, None, ValueType::String)
        })
        .await
    }

    /// Starts a program with its default options.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn start_program(&self, ha_id: &str, program_key: &str) -> Result<()> {
        let path = program_path(ha_id, "active");
        self.with_retry(|| {
            self.rest
                .put(ha_id, &path, program_key, None, None, ValueType::String)
        })
        .await
    }

    /// Starts the selected program with the options currently selected.
    ///
    /// Does nothing if no program is selected.
    ///
    /// # Errors
    ///
    /// Returns error if a request fails.
    pub async fn start_selected_program(&self, ha_id: &str) -> Result<()> {
        let Some(selected) = self.get_raw(ha_id, &program_path(ha_id, "selected")).await? else {
            tracing::debug!(ha_id = %ha_id, "No program selected, nothing to start");
            return Ok(());
        };
        self.put_raw(ha_id, &program_path(ha_id, "active"), &selected)
            .await?;
        Ok(())
    }

    /// Starts a program described by a caller-built JSON document.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn start_custom_program(&self, ha_id: &str, json: &str) -> Result<()> {
        self.put_raw(ha_id, &program_path(ha_id, "active"), json)
            .await?;
        Ok(())
    }

    /// Stops the running program.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn stop_program(&self, ha_id: &str) -> Result<()> {
        let path = program_path(ha_id, "active");
        self.with_retry(|| self.rest.delete(ha_id, &path)).await
    }

    /// Changes one option of the active (`active = true`) or selected program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if `value` does not fit `value_type`, or
    /// another error if the request fails.
    pub async fn set_program_option(
        &self,
        ha_id: &str,
        key: &str,
        value: &str,
        unit: Option<&str>,
        value_type: ValueType,
        active: bool,
    ) -> Result<()> {
        let state = if active { "active" } else { "selected" };
        let path = format!("{}/options", program_path(ha_id, state));
        self.with_retry(|| {
            self.rest
                .put_option(ha_id, &path, key, Some(value), unit, value_type)
        })
        .await
    }

    /// Lists every program of the appliance.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    pub async fn get_programs(&self, ha_id: &str) -> Result<Vec<AvailableProgram>> {
        let path = format!("{}/programs", appliance_path(ha_id));
        let programs: AvailablePrograms = self.with_retry(|| self.rest.get(ha_id, &path)).await?;
        Ok(programs.into_programs())
    }

    /// Lists the programs the appliance offers in its current state.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    pub async fn get_available_programs(&self, ha_id: &str) -> Result<Vec<AvailableProgram>> {
        let path = program_path(ha_id, "available");
        let programs: AvailablePrograms = self.with_retry(|| self.rest.get(ha_id, &path)).await?;
        Ok(programs.into_programs())
    }

    /// Returns the options of a program with their allowed values.
    ///
    /// Option schemas do not change, so the result is cached per program
    /// key for the lifetime of the client, independent of `ha_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    pub async fn get_program_options(
        &self,
        ha_id: &str,
        program_key: &str,
    ) -> Result<Vec<AvailableProgramOption>> {
        let cached = self.options_cache.read().get(program_key).cloned();
        if let Some(cached) = cached {
            tracing::debug!(program = %program_key, "Returning cached program options");
            return Ok(cached);
        }

        let path = format!(
            "{}/{}",
            program_path(ha_id, "available"),
            urlencoding::encode(program_key)
        );
        let options: AvailableOptions = self.with_retry(|| self.rest.get(ha_id, &path)).await?;
        let options = options.into_options();

        self.options_cache
            .write()
            .insert(program_key.to_string(), options.clone());
        Ok(options)
    }

    // ========================================================================
    // Raw access
    // ========================================================================

    /// Sends `GET path` and returns the body, or `None` on 404.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_raw(&self, ha_id: &str, path: &str) -> Result<Option<String>> {
        self.with_retry(|| self.rest.get_raw(ha_id, path)).await
    }

    /// Sends `PUT path` with `body` and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn put_raw(&self, ha_id: &str, path: &str, body: &str) -> Result<String> {
        self.with_retry(|| self.rest.put_raw(ha_id, path, body))
            .await
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Registers `listener` for the events of `ha_id`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn register_event_listener(&self, ha_id: &str, listener: EventListener) -> SubscriptionId {
        self.events.register_listener(ha_id, listener)
    }

    /// Registers `listener` again after the configured re-registration delay.
    ///
    /// Intended for listeners whose connection closed.
    pub async fn reregister_event_listener(
        &self,
        ha_id: &str,
        listener: EventListener,
    ) -> SubscriptionId {
        let delay = self.config.stream_settings().reregister_delay();
        tracing::debug!(ha_id = %ha_id, delay_s = delay.as_secs(), "Re-registering event listener");
        tokio::time::sleep(delay).await;
        self.events.register_listener(ha_id, listener)
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unregister_event_listener(&self, ha_id: &str, id: SubscriptionId) -> bool {
        self.events.unregister_listener(ha_id, id)
    }

    /// Returns the most recently received events, oldest first.
    #[must_use]
    pub fn latest_events(&self) -> Vec<Event> {
        self.events.latest_events()
    }

    // ========================================================================
    // Diagnostics and lifecycle
    // ========================================================================

    /// Returns the most recent API requests, oldest first.
    #[must_use]
    pub fn latest_api_requests(&self) -> Vec<ApiRequest> {
        self.history.snapshot()
    }

    /// Exchanges an authorization code for the first token pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError`] if the code is rejected.
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<Token> {
        self.tokens.exchange_authorization_code(code).await
    }

    /// Closes every event stream and drops every listener registration.
    pub fn dispose(&self) {
        tracing::debug!("Disposing API client");
        self.events.dispose();
    }

    /// Runs `request`; on 401 invalidates the token and runs it exactly once more.
    async fn with_retry<T, F, Fut>(&self, request: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let rejected = match request().await {
            Ok(value) => return Ok(value),
            Err(RequestError::Failed(err)) => return Err(err),
            Err(RequestError::InvalidToken { access_token }) => access_token,
        };

        tracing::debug!("Access token rejected, refreshing and retrying once");
        self.tokens.invalidate(&rejected).await;

        match request().await {
            Ok(value) => Ok(value),
            Err(RequestError::Failed(err)) => Err(err),
            Err(RequestError::InvalidToken { .. }) => {
                tracing::warn!("Access token rejected again after refresh");
                Err(Error::Authorization(AuthorizationError::TokenRejected))
            }
        }
    }
}

impl std::fmt::Debug for ApplianceApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplianceApiClient")
            .field("base_url", &self.config.base_url())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

fn setting_path(ha_id: &str, key: &str) -> String {
    format!("{}/settings/{}", appliance_path(ha_id), urlencoding::encode(key))
}

fn program_path(ha_id: &str, state: &str) -> String {
    format!("{}/programs/{state}", appliance_path(ha_id))
}
