// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OAuth2 tokens and their lifecycle.
//!
//! - [`Token`] - An access/refresh token pair with its expiry
//! - [`TokenStore`] - Holds the current token and refreshes it on demand
//! - [`TokenPersistence`] - Where refreshed tokens are stored between runs

mod persistence;
mod token;
mod token_store;

pub use persistence::{JsonFileTokenPersistence, NoPersistence, TokenPersistence};
pub use token::Token;
pub use token_store::TokenStore;
