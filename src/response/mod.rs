// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response models for the appliance REST API.
//!
//! Every payload is wrapped in a `{"data": ...}` envelope; the structures
//! here describe what is inside it.

mod appliance;
mod data;
pub(crate) mod envelope;
mod program;

pub use appliance::HomeAppliance;
pub use data::Data;
pub use program::{AvailableProgram, AvailableProgramOption, Program, ProgramOption};

pub(crate) use appliance::HomeAppliances;
pub(crate) use program::{AvailableOptions, AvailablePrograms};
