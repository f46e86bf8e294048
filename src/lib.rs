// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `HomeConnect` Lib - A Rust client for the Home Connect appliance cloud API.
//!
//! This library provides async APIs to read and control household appliances
//! through the Home Connect REST API and to follow their live server-sent
//! event streams.
//!
//! # Supported Features
//!
//! - **OAuth2 tokens**: Refresh on demand, single-flight under concurrency, persistence hook
//! - **REST calls**: Settings, status values, programs and their options
//! - **Event streams**: One connection per appliance shared by all listeners
//! - **Connection watchdog**: Silent connections are torn down and reported
//! - **Diagnostics**: Bounded history of the latest requests and events
//!
//! # Quick Start
//!
//! ## Reading and Writing Settings
//!
//! ```no_run
//! use homeconnect_lib::{ApplianceApiClient, ValueType};
//! use homeconnect_lib::auth::Token;
//! use homeconnect_lib::protocol::ApiConfig;
//!
//! #[tokio::main]
//! async fn main() -> homeconnect_lib::Result<()> {
//!     let config = ApiConfig::production("client-id", "client-secret");
//!     let client = ApplianceApiClient::new(config, Token::refresh_only("refresh-token"))?;
//!
//!     let ha_id = "SIEMENS-HB676G5S6-68A40E251CAD";
//!     let door = client.get_door_state(ha_id).await?;
//!     println!("Door: {:?}", door.value);
//!
//!     client
//!         .put_setting(ha_id, "BSH.Common.Setting.PowerState",
//!             "BSH.Common.EnumType.PowerState.On", None, ValueType::String)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Following Appliance Events
//!
//! ```no_run
//! use homeconnect_lib::ApplianceApiClient;
//! use homeconnect_lib::auth::Token;
//! use homeconnect_lib::protocol::ApiConfig;
//! use homeconnect_lib::subscription::EventListener;
//!
//! #[tokio::main]
//! async fn main() -> homeconnect_lib::Result<()> {
//!     let config = ApiConfig::simulator("client-id", "client-secret");
//!     let client = ApplianceApiClient::new(config, Token::refresh_only("refresh-token"))?;
//!
//!     client.register_event_listener(
//!         "SIEMENS-HB676G5S6-68A40E251CAD",
//!         EventListener::new(|event| println!("{} {:?}", event.kind, event.key))
//!             .on_closed(|| println!("Stream closed")),
//!     );
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(600)).await;
//!     client.dispose();
//!     Ok(())
//! }
//! ```

pub mod auth;
mod client;
pub mod error;
pub mod event;
pub mod protocol;
pub mod response;
pub mod subscription;
pub mod types;

pub use client::{ApplianceApiClient, ApplianceApiClientBuilder};
pub use error::{
    AuthorizationError, CommunicationError, ConfigurationError, Error, ParseError, Result,
    ValueError,
};
pub use event::{Event, EventKind};
pub use protocol::{ApiConfig, StreamSettings};
pub use response::{Data, HomeAppliance, Program};
pub use subscription::{EventListener, SubscriptionId};
pub use types::{ApplianceType, ValueType};
