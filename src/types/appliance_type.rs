// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appliance types reported by the API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of home appliance.
///
/// Types this crate does not know are kept verbatim in [`ApplianceType::Other`].
///
/// # Examples
///
/// ```
/// use homeconnect_lib::types::ApplianceType;
///
/// let oven: ApplianceType = "Oven".parse().unwrap();
/// assert_eq!(oven, ApplianceType::Oven);
///
/// let robot: ApplianceType = "Robot".parse().unwrap();
/// assert_eq!(robot, ApplianceType::Other("Robot".to_string()));
/// assert_eq!(robot.to_string(), "Robot");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplianceType {
    /// Oven.
    Oven,
    /// Washing machine.
    Washer,
    /// Tumble dryer.
    Dryer,
    /// Combined washer and dryer.
    WasherDryer,
    /// Dishwasher.
    Dishwasher,
    /// Cooker hood.
    Hood,
    /// Hob.
    Hob,
    /// Coffee machine.
    CoffeeMaker,
    /// Combined fridge and freezer.
    FridgeFreezer,
    /// Refrigerator.
    Refrigerator,
    /// Freezer.
    Freezer,
    /// Wine cooler.
    WineCooler,
    /// Cook processor.
    CookProcessor,
    /// Any other type, as reported.
    Other(String),
}

impl ApplianceType {
    /// Returns the type name used by the API.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Oven => "Oven",
            Self::Washer => "Washer",
            Self::Dryer => "Dryer",
            Self::WasherDryer => "WasherDryer",
            Self::Dishwasher => "Dishwasher",
            Self::Hood => "Hood",
            Self::Hob => "Hob",
            Self::CoffeeMaker => "CoffeeMaker",
            Self::FridgeFreezer => "FridgeFreezer",
            Self::Refrigerator => "Refrigerator",
            Self::Freezer => "Freezer",
            Self::WineCooler => "WineCooler",
            Self::CookProcessor => "CookProcessor",
            Self::Other(name) => name,
        }
    }

    /// Returns `true` for cooling appliances.
    #[must_use]
    pub fn is_cooling(&self) -> bool {
        matches!(
            self,
            Self::FridgeFreezer | Self::Refrigerator | Self::Freezer | Self::WineCooler
        )
    }
}

impl fmt::Display for ApplianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplianceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Oven" => Self::Oven,
            "Washer" => Self::Washer,
            "Dryer" => Self::Dryer,
            "WasherDryer" => Self::WasherDryer,
            "Dishwasher" => Self::Dishwasher,
            "Hood" => Self::Hood,
            "Hob" => Self::Hob,
            "CoffeeMaker" => Self::CoffeeMaker,
            "FridgeFreezer" => Self::FridgeFreezer,
            "Refrigerator" => Self::Refrigerator,
            "Freezer" => Self::Freezer,
            "WineCooler" => Self::WineCooler,
            "CookProcessor" => Self::CookProcessor,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for ApplianceType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(Self::Other(_)) => Self::Other(value),
            Ok(known) => known,
            Err(never) => match never {},
        }
    }
}

impl From<ApplianceType> for String {
    fn from(value: ApplianceType) -> Self {
        match value {
            ApplianceType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}
