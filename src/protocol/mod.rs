// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire protocol for the Home Connect cloud API.
//!
//! This module holds the client configuration, the authenticated REST
//! transport, the request history and the Server-Sent-Events parser used by
//! the event stream.
//!
//! # Endpoints
//!
//! - REST: `{base}/api/homeappliances/...` with the vendor JSON media type
//! - Events: `{base}/api/homeappliances/{haId}/events` as `text/event-stream`
//! - OAuth2: `{base}/security/oauth/authorize` and `{base}/security/oauth/token`

mod config;
mod history;
pub(crate) mod rest;
mod sse;

pub use config::{
    ApiConfig, DEFAULT_OAUTH_SCOPE, OAUTH_AUTHORIZE_PATH, OAUTH_TOKEN_PATH, StreamSettings,
};
pub use history::{
    ApiRequest, DEFAULT_HISTORY_CAPACITY, RequestHistory, RequestRecord, ResponseRecord,
};
pub use sse::{SseFrame, SseParser};

/// Media type of every REST request and response body.
pub const MEDIA_TYPE: &str = "application/vnd.bsh.sdk.v1+json";

/// Media type of the event stream.
pub const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";

/// Path of the appliance collection.
pub(crate) const APPLIANCES_PATH: &str = "/api/homeappliances";

/// Returns the path of one appliance.
pub(crate) fn appliance_path(ha_id: &str) -> String {
    format!("{APPLIANCES_PATH}/{}", urlencoding::encode(ha_id))
}
