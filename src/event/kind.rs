// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event classification enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Type of a server-sent event, taken from the SSE `event:` field.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::event::EventKind;
///
/// let kind: EventKind = "keep-alive".parse().unwrap();
/// assert_eq!(kind, EventKind::KeepAlive);
/// assert_eq!(kind.as_str(), "KEEP-ALIVE");
/// assert!("HEARTBEAT".parse::<EventKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum EventKind {
    /// Heartbeat, carries no data.
    KeepAlive,
    /// Status value changes.
    Status,
    /// Appliance events such as "program finished".
    Event,
    /// Setting, option or program changes.
    Notify,
    /// The appliance went offline.
    Disconnected,
    /// The appliance came online.
    Connected,
    /// The appliance was paired with the account.
    Paired,
    /// The appliance was removed from the account.
    Depaired,
}

impl EventKind {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KeepAlive => "KEEP-ALIVE",
            Self::Status => "STATUS",
            Self::Event => "EVENT",
            Self::Notify => "NOTIFY",
            Self::Disconnected => "DISCONNECTED",
            Self::Connected => "CONNECTED",
            Self::Paired => "PAIRED",
            Self::Depaired => "DEPAIRED",
        }
    }

    /// Returns `true` for kinds whose payload is a list of items.
    #[must_use]
    pub const fn carries_items(&self) -> bool {
        matches!(self, Self::Status | Self::Event | Self::Notify)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KEEP-ALIVE" => Ok(Self::KeepAlive),
            "STATUS" => Ok(Self::Status),
            "EVENT" => Ok(Self::Event),
            "NOTIFY" => Ok(Self::Notify),
            "DISCONNECTED" => Ok(Self::Disconnected),
            "CONNECTED" => Ok(Self::Connected),
            "PAIRED" => Ok(Self::Paired),
            "DEPAIRED" => Ok(Self::Depaired),
            _ => Err(ParseError::UnexpectedFormat(format!("unknown event type '{s}'"))),
        }
    }
}

/// Severity of an appliance event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    /// Critical.
    Critical,
    /// Alert.
    Alert,
    /// Warning.
    Warning,
    /// Hint.
    Hint,
    /// Informational.
    Info,
}

impl FromStr for EventLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "alert" => Ok(Self::Alert),
            "warning" => Ok(Self::Warning),
            "hint" => Ok(Self::Hint),
            "info" => Ok(Self::Info),
            _ => Err(ParseError::UnexpectedFormat(format!("unknown event level '{s}'"))),
        }
    }
}

/// What the user is expected to do about an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventHandling {
    /// Nothing.
    None,
    /// Acknowledge it.
    Acknowledge,
    /// Make a decision.
    Decision,
}

impl FromStr for EventHandling {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "acknowledge" => Ok(Self::Acknowledge),
            "decision" => Ok(Self::Decision),
            _ => Err(ParseError::UnexpectedFormat(format!("unknown event handling '{s}'"))),
        }
    }
}
