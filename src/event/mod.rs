// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events received from appliance event streams.
//!
//! Each server-sent frame is turned into zero or more [`Event`]s: data
//! frames produce one event per item, sentinel frames (`CONNECTED`,
//! `DISCONNECTED`, `PAIRED`, `DEPAIRED`) one keyed event, and keep-alives
//! none.
//!
//! # Examples
//!
//! ```
//! use homeconnect_lib::event::{Event, EventKind};
//!
//! let event = Event::sentinel("SIEMENS-HB676G5S6-68A40E251CAD", EventKind::Connected);
//! assert_eq!(event.kind, EventKind::Connected);
//! ```

mod appliance_event;
mod kind;

pub use appliance_event::Event;
pub use kind::{EventHandling, EventKind, EventLevel};

pub(crate) use appliance_event::events_from_frame;
