// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appliance descriptions.

use serde::{Deserialize, Serialize};

use crate::types::ApplianceType;

/// Snapshot of one paired appliance.
///
/// Returned by listing calls and never cached by the client.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::response::HomeAppliance;
/// use homeconnect_lib::types::ApplianceType;
///
/// let json = r#"{
///     "haId": "SIEMENS-HB676G5S6-68A40E251CAD",
///     "name": "Oven",
///     "brand": "SIEMENS",
///     "vib": "HB676G5S6",
///     "connected": true,
///     "type": "Oven",
///     "enumber": "HB676G5S6/01"
/// }"#;
/// let appliance: HomeAppliance = serde_json::from_str(json).unwrap();
/// assert_eq!(appliance.appliance_type, ApplianceType::Oven);
/// assert!(appliance.connected);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeAppliance {
    /// Stable appliance identifier.
    #[serde(rename = "haId")]
    pub ha_id: String,
    /// User-visible name.
    #[serde(default)]
    pub name: String,
    /// Brand.
    #[serde(default)]
    pub brand: String,
    /// Model number.
    #[serde(default)]
    pub vib: String,
    /// Whether the appliance is currently online.
    #[serde(default)]
    pub connected: bool,
    /// Kind of appliance.
    #[serde(rename = "type")]
    pub appliance_type: ApplianceType,
    /// E-number.
    #[serde(default)]
    pub enumber: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HomeAppliances {
    #[serde(default)]
    pub homeappliances: Vec<HomeAppliance>,
}
