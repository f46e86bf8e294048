// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for appliance control.
//!
//! # Types
//!
//! - [`ApplianceType`] - Kind of appliance (oven, dishwasher, ...)
//! - [`ValueType`] - Wire encoding of a written value (string, int, boolean)
//! - [`keys`] - Well-known setting and status keys

mod appliance_type;
pub mod keys;
mod value_type;

pub use appliance_type::ApplianceType;
pub use value_type::ValueType;
