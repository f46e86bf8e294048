// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Authenticated REST calls against the appliance API.

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::auth::TokenStore;
use crate::error::{AuthorizationError, CommunicationError, Error, ParseError, Result};
use crate::response::envelope::{data_body, options_body, parse_data};
use crate::types::ValueType;

use super::config::ApiConfig;
use super::history::{RequestHistory, RequestRecord, ResponseRecord, format_json_body, header_map};
use super::MEDIA_TYPE;

// ============================================================================
// RequestError - Outcome of a single attempt
// ============================================================================

/// Failure of a single REST attempt.
///
/// `InvalidToken` never leaves the crate: the client invalidates the token
/// and retries once, turning a second rejection into
/// [`AuthorizationError::TokenRejected`].
#[derive(Debug)]
pub(crate) enum RequestError {
    /// The server answered 401 for this access token.
    InvalidToken {
        /// The access token that was rejected.
        access_token: String,
    },
    /// Any other failure.
    Failed(Error),
}

impl From<Error> for RequestError {
    fn from(err: Error) -> Self {
        Self::Failed(err)
    }
}

macro_rules! request_error_from {
    ($($kind:ty),* $(,)?) => {
        $(
            impl From<$kind> for RequestError {
                fn from(err: $kind) -> Self {
                    Self::Failed(err.into())
                }
            }
        )*
    };
}

request_error_from!(
    crate::error::AuthorizationError,
    crate::error::CommunicationError,
    crate::error::ParseError,
    crate::error::ValueError,
);

// ============================================================================
// ApiCall - Description of one request
// ============================================================================

/// A REST request: method, path, optional body and accepted status codes.
#[derive(Debug, Clone)]
pub(crate) struct ApiCall {
    method: Method,
    path: String,
    body: Option<String>,
    accepted: Vec<StatusCode>,
    ha_id: Option<String>,
}

impl ApiCall {
    /// `GET path`, accepting 200.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path, None, StatusCode::OK)
    }

    /// `PUT path` with a JSON body, accepting 204.
    pub fn put(path: impl Into<String>, body: String) -> Self {
        Self::new(Method::PUT, path, Some(body), StatusCode::NO_CONTENT)
    }

    /// `DELETE path`, accepting 204.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path, None, StatusCode::NO_CONTENT)
    }

    fn new(method: Method, path: impl Into<String>, body: Option<String>, ok: StatusCode) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            accepted: vec![ok],
            ha_id: None,
        }
    }

    /// Also accepts `status` as a successful outcome.
    #[must_use]
    pub fn accepting(mut self, status: StatusCode) -> Self {
        self.accepted.push(status);
        self
    }

    /// Tags the call with an appliance id for logging.
    #[must_use]
    pub fn for_appliance(mut self, ha_id: &str) -> Self {
        self.ha_id = Some(ha_id.to_string());
        self
    }
}

/// Status and body of an accepted response.
#[derive(Debug, Clone)]
pub(crate) struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    /// Parses the `data` member of the body.
    pub fn data<T: DeserializeOwned>(&self) -> std::result::Result<T, ParseError> {
        parse_data(&self.body)
    }
}

// ============================================================================
// RestClient
// ============================================================================

/// Signs, sends and classifies REST requests.
///
/// Every call fetches a bearer token from the [`TokenStore`], attaches the
/// vendor media type and records the exchange in the request history.
pub(crate) struct RestClient {
    http: Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    history: Arc<RequestHistory>,
}

impl RestClient {
    /// Creates a REST client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        config: &ApiConfig,
        tokens: Arc<TokenStore>,
        history: Arc<RequestHistory>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(CommunicationError::Http)?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            tokens,
            history,
        })
    }

    /// Sends `call` once and classifies the response.
    pub async fn send(&self, call: &ApiCall) -> std::result::Result<ApiResponse, RequestError> {
        let token = self.tokens.valid_token().await?;
        let url = format!("{}{}", self.base_url, call.path);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&token.bearer())
                .map_err(|_| AuthorizationError::NoAccessToken)?,
        );
        if call.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
        }

        let record = RequestRecord {
            url: url.clone(),
            method: call.method.to_string(),
            headers: header_map(&headers),
            body: call.body.as_deref().map(format_json_body),
        };

        let mut request = self
            .http
            .request(call.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &call.body {
            request = request.body(body.clone());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    ha_id = call.ha_id.as_deref().unwrap_or("-"),
                    method = %call.method,
                    url = %url,
                    error = %e,
                    "API request failed"
                );
                self.history.record(record, None);
                return Err(CommunicationError::Http(e).into());
            }
        };

        let status = response.status();
        let response_headers = header_map(response.headers());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.history.record(record, None);
                return Err(CommunicationError::Http(e).into());
            }
        };

        tracing::debug!(
            ha_id = call.ha_id.as_deref().unwrap_or("-"),
            method = %call.method,
            status = status.as_u16(),
            url = %url,
            "API request"
        );
        self.history.record(
            record,
            Some(ResponseRecord {
                code: status.as_u16(),
                headers: response_headers,
                body: (!body.is_empty()).then(|| format_json_body(&body)),
            }),
        );

        classify(call, status, body, token.access_token())
    }

    /// `GET path` and parse the `data` member.
    pub async fn get<T: DeserializeOwned>(
        &self,
        ha_id: &str,
        path: &str,
    ) -> std::result::Result<T, RequestError> {
        let response = self.send(&ApiCall::get(path).for_appliance(ha_id)).await?;
        Ok(response.data()?)
    }

    /// `GET path` where 404 means "nothing there".
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        ha_id: &str,
        path: &str,
    ) -> std::result::Result<Option<T>, RequestError> {
        let call = ApiCall::get(path)
            .accepting(StatusCode::NOT_FOUND)
            .for_appliance(ha_id);
        let response = self.send(&call).await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.data()?))
    }

    /// `GET path` returning the body verbatim, or `None` on 404.
    pub async fn get_raw(
        &self,
        ha_id: &str,
        path: &str,
    ) -> std::result::Result<Option<String>, RequestError> {
        let call = ApiCall::get(path)
            .accepting(StatusCode::NOT_FOUND)
            .for_appliance(ha_id);
        let response = self.send(&call).await?;
        Ok((response.status == StatusCode::OK).then_some(response.body))
    }

    /// `PUT path` with `{"data": {"key", "value", "unit"}}`.
    pub async fn put(
        &self,
        ha_id: &str,
        path: &str,
        key: &str,
        value: Option<&str>,
        unit: Option<&str>,
        value_type: ValueType,
    ) -> std::result::Result<(), RequestError> {
        let body = data_body(key, value, unit, value_type)?;
        self.send(&ApiCall::put(path, body).for_appliance(ha_id))
            .await?;
        Ok(())
    }

    /// `PUT path` with `{"data": {"options": [{"key", "value", "unit"}]}}`.
    pub async fn put_option(
        &self,
        ha_id: &str,
        path: &str,
        key: &str,
        value: Option<&str>,
        unit: Option<&str>,
        value_type: ValueType,
    ) -> std::result::Result<(), RequestError> {
        let body = options_body(key, value, unit, value_type)?;
        self.send(&ApiCall::put(path, body).for_appliance(ha_id))
            .await?;
        Ok(())
    }

    /// `PUT path` with a caller-supplied body, returning the response body.
    pub async fn put_raw(
        &self,
        ha_id: &str,
        path: &str,
        body: &str,
    ) -> std::result::Result<String, RequestError> {
        let response = self
            .send(&ApiCall::put(path, body.to_string()).for_appliance(ha_id))
            .await?;
        Ok(response.body)
    }

    /// `DELETE path`.
    pub async fn delete(&self, ha_id: &str, path: &str) -> std::result::Result<(), RequestError> {
        self.send(&ApiCall::delete(path).for_appliance(ha_id))
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Maps a status code to the outcome of `call`.
fn classify(
    call: &ApiCall,
    status: StatusCode,
    body: String,
    access_token: &str,
) -> std::result::Result<ApiResponse, RequestError> {
    if status == StatusCode::UNAUTHORIZED && !call.accepted.contains(&status) {
        tracing::debug!(path = %call.path, "Access token rejected");
        return Err(RequestError::InvalidToken {
            access_token: access_token.to_string(),
        });
    }

    if call.accepted.contains(&status) {
        return Ok(ApiResponse { status, body });
    }

    tracing::debug!(
        status = status.as_u16(),
        accepted = ?call.accepted,
        path = %call.path,
        "Unexpected HTTP status"
    );

    let err: Error = match status {
        StatusCode::FORBIDDEN => AuthorizationError::Forbidden(body).into(),
        StatusCode::CONFLICT if is_offline_body(&body) => Error::Offline {
            code: status.as_u16(),
            body,
        },
        _ => CommunicationError::Status {
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        }
        .into(),
    };
    Err(RequestError::Failed(err))
}

fn is_offline_body(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("error") && lower.contains("offline")
}
