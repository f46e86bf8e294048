// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscriptions to appliance event streams.
//!
//! The subscription system consists of:
//!
//! - [`EventListener`] - Closures receiving events and the closed notification
//! - [`SubscriptionId`] - A unique identifier for a registration, used to unregister
//! - [`EventStream`] - Owner of one connection per appliance, fanning events out
//!
//! # Usage
//!
//! Listeners are usually registered through the API client:
//!
//! ```no_run
//! use homeconnect_lib::{ApplianceApiClient, auth::Token, protocol::ApiConfig};
//! use homeconnect_lib::subscription::EventListener;
//!
//! # async fn example() -> homeconnect_lib::Result<()> {
//! let config = ApiConfig::simulator("client-id", "client-secret");
//! let client = ApplianceApiClient::new(config, Token::refresh_only("refresh"))?;
//!
//! let id = client.register_event_listener(
//!     "SIEMENS-HB676G5S6-68A40E251CAD",
//!     EventListener::new(|event| println!("{:?} = {:?}", event.key, event.value))
//!         .on_closed(|| println!("connection lost")),
//! );
//!
//! // Later
//! client.unregister_event_listener("SIEMENS-HB676G5S6-68A40E251CAD", id);
//! # Ok(())
//! # }
//! ```

mod event_stream;
mod listener;

pub use event_stream::EventStream;
pub use listener::{EventListener, SubscriptionId};
