// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appliance events and their construction from stream frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::response::envelope::deserialize_scalar;

use super::{EventHandling, EventKind, EventLevel};

/// Payload sent for item-less frames by some firmware.
const EMPTY_DATA: &str = "\"\"";

/// One event received from an appliance's event stream.
///
/// Item-carrying frames (`STATUS`, `EVENT`, `NOTIFY`) yield one event per
/// item. Sentinel frames such as `CONNECTED` yield a single event whose key
/// is the kind name and which has no value.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::event::{Event, EventKind};
///
/// let event = Event::sentinel("SIEMENS-HB676G5S6-68A40E251CAD", EventKind::Disconnected);
/// assert_eq!(event.key.as_deref(), Some("DISCONNECTED"));
/// assert!(event.value.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Appliance the event belongs to.
    pub ha_id: String,
    /// Event type.
    pub kind: EventKind,
    /// Item key, e.g. `BSH.Common.Status.DoorState`.
    pub key: Option<String>,
    /// Item value in string form.
    pub value: Option<String>,
    /// Unit of the value.
    pub unit: Option<String>,
    /// Human-readable item name.
    pub name: Option<String>,
    /// API path of the item.
    pub uri: Option<String>,
    /// Severity.
    pub level: Option<EventLevel>,
    /// Expected user action.
    pub handling: Option<EventHandling>,
    /// When the appliance created the item.
    pub timestamp: Option<DateTime<Utc>>,
    /// When the frame was received.
    pub received_at: DateTime<Utc>,
}

impl Event {
    /// Creates an event carrying only its kind.
    #[must_use]
    pub fn new(ha_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            ha_id: ha_id.into(),
            kind,
            key: None,
            value: None,
            unit: None,
            name: None,
            uri: None,
            level: None,
            handling: None,
            timestamp: None,
            received_at: Utc::now(),
        }
    }

    /// Creates a sentinel event whose key is the kind name.
    #[must_use]
    pub fn sentinel(ha_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            key: Some(kind.as_str().to_string()),
            ..Self::new(ha_id, kind)
        }
    }

    /// Returns `true` if the value is `"true"` in any letter case.
    #[must_use]
    pub fn value_as_bool(&self) -> bool {
        self.value
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Deserialize)]
struct ItemsPayload {
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    value: Option<String>,
    unit: Option<String>,
    name: Option<String>,
    uri: Option<String>,
    level: Option<String>,
    handling: Option<String>,
    timestamp: Option<i64>,
}

impl RawItem {
    fn into_event(self, ha_id: &str, kind: EventKind) -> Event {
        Event {
            key: self.key,
            value: self.value,
            unit: self.unit,
            name: self.name,
            uri: self.uri,
            level: self.level.and_then(|l| l.parse().ok()),
            handling: self.handling.and_then(|h| h.parse().ok()),
            timestamp: self
                .timestamp
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            ..Event::new(ha_id, kind)
        }
    }
}

/// Converts one frame into the events it carries, in item order.
///
/// `KEEP-ALIVE` frames carry none.
///
/// # Errors
///
/// Returns [`ParseError`] if an item-carrying frame has a malformed payload.
pub(crate) fn events_from_frame(
    ha_id: &str,
    kind: EventKind,
    data: &str,
) -> Result<Vec<Event>, ParseError> {
    if kind == EventKind::KeepAlive {
        return Ok(Vec::new());
    }
    if !kind.carries_items() {
        return Ok(vec![Event::sentinel(ha_id, kind)]);
    }

    let data = data.trim();
    if data.is_empty() || data == EMPTY_DATA {
        return Ok(vec![Event::new(ha_id, kind)]);
    }

    let payload: ItemsPayload = serde_json::from_str(data)?;
    Ok(payload
        .items
        .into_iter()
        .map(|item| item.into_event(ha_id, kind))
        .collect())
}
