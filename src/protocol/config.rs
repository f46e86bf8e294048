// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration for the Home Connect API client.

use std::time::Duration;

use crate::error::ConfigurationError;

/// OAuth2 authorization endpoint path.
pub const OAUTH_AUTHORIZE_PATH: &str = "/security/oauth/authorize";

/// OAuth2 token endpoint path.
pub const OAUTH_TOKEN_PATH: &str = "/security/oauth/token";

/// Scopes requested during authorization.
pub const DEFAULT_OAUTH_SCOPE: &str = "IdentifyAppliance Monitor Settings Control";

/// Configuration for the API client.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::protocol::ApiConfig;
/// use std::time::Duration;
///
/// let config = ApiConfig::simulator("my-client-id", "my-secret")
///     .with_request_timeout(Duration::from_secs(10));
/// assert_eq!(config.base_url(), "https://simulator.home-connect.com");
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    request_timeout: Duration,
    stream: StreamSettings,
}

impl ApiConfig {
    /// Production API base URL.
    pub const PRODUCTION_URL: &'static str = "https://api.home-connect.com";
    /// Simulator API base URL.
    pub const SIMULATOR_URL: &'static str = "https://simulator.home-connect.com";
    /// Default REST read timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a configuration for a custom base URL.
    ///
    /// A trailing slash on `base_url` is removed.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: DEFAULT_OAUTH_SCOPE.to_string(),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            stream: StreamSettings::default(),
        }
    }

    /// Creates a configuration for the production API.
    #[must_use]
    pub fn production(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::new(Self::PRODUCTION_URL, client_id, client_secret)
    }

    /// Creates a configuration for the appliance simulator.
    #[must_use]
    pub fn simulator(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::new(Self::SIMULATOR_URL, client_id, client_secret)
    }

    /// Sets the OAuth2 scope requested during authorization.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the REST read timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the event stream tuning values.
    #[must_use]
    pub fn with_stream_settings(mut self, settings: StreamSettings) -> Self {
        self.stream = settings;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the OAuth client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the OAuth scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the REST read timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the event stream settings.
    #[must_use]
    pub fn stream_settings(&self) -> &StreamSettings {
        &self.stream
    }

    /// Returns `true` if this configuration targets the simulator.
    #[must_use]
    pub fn is_simulator(&self) -> bool {
        self.base_url == Self::SIMULATOR_URL
    }

    /// Returns the full URL of the token endpoint.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}{OAUTH_TOKEN_PATH}", self.base_url)
    }

    /// Builds the browser URL that starts the authorization code flow.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}{OAUTH_AUTHORIZE_PATH}?client_id={}&response_type=code&scope={}&state={}",
            self.base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.scope),
            urlencoding::encode(state)
        )
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns error if the client id is empty or the base URL is not HTTP(S).
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigurationError::MissingClientId);
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigurationError::InvalidBaseUrl(self.base_url.clone()));
        }
        Ok(())
    }
}

/// Tuning values for the event stream.
///
/// All values are empirical defaults and can be overridden.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use homeconnect_lib::protocol::StreamSettings;
///
/// let settings = StreamSettings::new()
///     .with_dead_connection_threshold(Duration::from_secs(120))
///     .with_watchdog_interval(Duration::from_secs(60));
/// assert_eq!(settings.read_timeout(), Duration::from_secs(90));
/// ```
#[derive(Debug, Clone)]
pub struct StreamSettings {
    read_timeout: Duration,
    dead_connection_threshold: Duration,
    watchdog_initial_delay: Duration,
    watchdog_interval: Duration,
    retry_delay: Duration,
    max_retries: u32,
    reregister_delay: Duration,
    event_buffer_size: usize,
}

impl StreamSettings {
    /// Silence after which the transport reports a failure.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(90);
    /// Silence after which the watchdog presumes the connection dead.
    pub const DEFAULT_DEAD_CONNECTION_THRESHOLD: Duration = Duration::from_secs(3 * 60);
    /// Delay before the first watchdog check.
    pub const DEFAULT_WATCHDOG_INITIAL_DELAY: Duration = Duration::from_secs(60);
    /// Delay between watchdog checks.
    pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(5 * 60);
    /// Delay between transport-level connection attempts.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);
    /// Connection attempts before a stream is given up.
    pub const DEFAULT_MAX_RETRIES: u32 = 5;
    /// Delay before a closed listener registers again.
    pub const DEFAULT_REREGISTER_DELAY: Duration = Duration::from_secs(10);
    /// Number of recent events kept for diagnostics.
    pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

    /// Creates settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stream read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the dead-connection threshold used by the watchdog.
    #[must_use]
    pub fn with_dead_connection_threshold(mut self, threshold: Duration) -> Self {
        self.dead_connection_threshold = threshold;
        self
    }

    /// Sets the delay before the first watchdog check.
    #[must_use]
    pub fn with_watchdog_initial_delay(mut self, delay: Duration) -> Self {
        self.watchdog_initial_delay = delay;
        self
    }

    /// Sets the delay between watchdog checks.
    #[must_use]
    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Sets the delay between transport-level connection attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the number of connection attempts before giving up.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay used by delayed re-registration.
    #[must_use]
    pub fn with_reregister_delay(mut self, delay: Duration) -> Self {
        self.reregister_delay = delay;
        self
    }

    /// Sets the number of recent events kept for diagnostics.
    #[must_use]
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Returns the stream read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the dead-connection threshold.
    #[must_use]
    pub fn dead_connection_threshold(&self) -> Duration {
        self.dead_connection_threshold
    }

    /// Returns the delay before the first watchdog check.
    #[must_use]
    pub fn watchdog_initial_delay(&self) -> Duration {
        self.watchdog_initial_delay
    }

    /// Returns the delay between watchdog checks.
    #[must_use]
    pub fn watchdog_interval(&self) -> Duration {
        self.watchdog_interval
    }

    /// Returns the delay between connection attempts.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Returns the number of connection attempts before giving up.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the re-registration delay.
    #[must_use]
    pub fn reregister_delay(&self) -> Duration {
        self.reregister_delay
    }

    /// Returns the recent-event buffer size.
    #[must_use]
    pub fn event_buffer_size(&self) -> usize {
        self.event_buffer_size
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            dead_connection_threshold: Self::DEFAULT_DEAD_CONNECTION_THRESHOLD,
            watchdog_initial_delay: Self::DEFAULT_WATCHDOG_INITIAL_DELAY,
            watchdog_interval: Self::DEFAULT_WATCHDOG_INTERVAL,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            reregister_delay: Self::DEFAULT_REREGISTER_DELAY,
            event_buffer_size: Self::DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}
