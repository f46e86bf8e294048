// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `homeconnect_lib` library.
//!
//! This module provides the error hierarchy for failures across the library:
//! transport and status-code problems, OAuth2 authorization failures, missing
//! configuration, response parsing, and value encoding.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure or unexpected response from the API.
    ///
    /// Retryable at the caller's discretion.
    #[error("communication error: {0}")]
    Communication(#[from] CommunicationError),

    /// Authorization is no longer valid and requires user re-authorization.
    #[error("authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    /// Required setup is missing.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The appliance is offline (HTTP 409 with an offline error body).
    #[error("appliance is offline (HTTP {code}): {body}")]
    Offline {
        /// HTTP status code.
        code: u16,
        /// Response body returned by the API.
        body: String,
    },

    /// Error occurred while parsing a response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A value could not be encoded in the type the API expects.
    #[error("value error: {0}")]
    Value(#[from] ValueError),
}

/// Transport and status-code failures.
#[derive(Debug, Error)]
pub enum CommunicationError {
    /// HTTP request failed at the transport level.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a status code the call did not expect.
    #[error("unexpected HTTP {code} {message}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Canonical reason phrase.
        message: String,
        /// Response body, possibly empty.
        body: String,
    },

    /// No data arrived on an event stream within the read timeout.
    #[error("no data received for {0:?}")]
    ReadTimeout(std::time::Duration),

    /// Reading or writing a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures that require the user to authorize the client again.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// The token endpoint rejected the refresh token or authorization code.
    #[error("token request rejected (HTTP {code}): {body}")]
    TokenRequestRejected {
        /// HTTP status code from the token endpoint.
        code: u16,
        /// Response body from the token endpoint.
        body: String,
    },

    /// A freshly refreshed access token was rejected as well.
    #[error("access token rejected after refresh")]
    TokenRejected,

    /// The client is not allowed to access this appliance (HTTP 403).
    #[error("access forbidden: {0}")]
    Forbidden(String),

    /// No access token is held.
    #[error("no access token available")]
    NoAccessToken,
}

/// Missing or invalid setup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No refresh token has been configured yet.
    #[error("no refresh token configured; authorize the client first")]
    MissingRefreshToken,

    /// The OAuth client id is empty.
    #[error("OAuth client id is required")]
    MissingClientId,

    /// The API base URL is not usable.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Errors related to parsing API responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// Errors related to encoding values for the API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The value is not a valid integer.
    #[error("'{0}' is not a valid integer")]
    NotAnInteger(String),

    /// The value is not a valid boolean.
    #[error("'{0}' is not a valid boolean")]
    NotABoolean(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if the user has to authorize the client again.
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_) | Self::Configuration(_))
    }

    /// Returns the HTTP status code carried by this error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Communication(CommunicationError::Status { code, .. })
            | Self::Authorization(AuthorizationError::TokenRequestRejected { code, .. })
            | Self::Offline { code, .. } => Some(*code),
            Self::Authorization(AuthorizationError::Forbidden(_)) => Some(403),
            _ => None,
        }
    }
}
