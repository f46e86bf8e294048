// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded history of API requests for diagnostics.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of requests kept in the history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// One recorded request and, if the server answered, its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Unique id of this record.
    pub id: Uuid,
    /// When the request was recorded.
    pub time: DateTime<Utc>,
    /// The request as sent.
    pub request: RequestRecord,
    /// The response, absent on transport failure.
    pub response: Option<ResponseRecord>,
}

/// Recorded request details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Full request URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Request headers, with the bearer token redacted.
    pub headers: BTreeMap<String, String>,
    /// Request body, pretty-printed when it is JSON.
    pub body: Option<String>,
}

/// Recorded response details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// HTTP status code.
    pub code: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Response body, pretty-printed when it is JSON.
    pub body: Option<String>,
}

/// Ring buffer of the most recent API requests.
///
/// Once full, recording a new request drops the oldest one.
#[derive(Debug)]
pub struct RequestHistory {
    entries: Mutex<VecDeque<ApiRequest>>,
    capacity: usize,
}

impl RequestHistory {
    /// Creates an empty history with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Creates a history seeded with previously recorded requests.
    ///
    /// Only the newest `capacity` entries are kept.
    #[must_use]
    pub fn with_entries(capacity: usize, entries: impl IntoIterator<Item = ApiRequest>) -> Self {
        let history = Self::new(capacity);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    /// Records a request.
    pub fn record(&self, request: RequestRecord, response: Option<ResponseRecord>) {
        self.push(ApiRequest {
            id: Uuid::new_v4(),
            time: Utc::now(),
            request,
            response,
        });
    }

    fn push(&self, entry: ApiRequest) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns a snapshot, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ApiRequest> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Returns the number of recorded requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Pretty-prints a JSON body, returning other bodies unchanged.
pub(crate) fn format_json_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| body.to_string())
}

/// Converts headers into a map, redacting credentials.
pub(crate) fn header_map(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name == reqwest::header::AUTHORIZATION {
                "Bearer ***".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}
