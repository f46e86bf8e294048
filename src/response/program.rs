// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Programs and their options.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

use super::envelope::deserialize_scalar;

/// An active or selected program.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::response::Program;
///
/// let json = r#"{
///     "key": "Cooking.Oven.Program.HeatingMode.HotAir",
///     "options": [
///         {"key": "Cooking.Oven.Option.SetpointTemperature", "value": 230, "unit": "°C"},
///         {"key": "BSH.Common.Option.Duration", "value": 1200, "unit": "seconds"}
///     ]
/// }"#;
/// let program: Program = serde_json::from_str(json).unwrap();
/// assert_eq!(program.options.len(), 2);
/// assert_eq!(program.option("BSH.Common.Option.Duration").unwrap().value.as_deref(), Some("1200"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Program key.
    pub key: String,
    /// Program options, in the order reported.
    #[serde(default)]
    pub options: Vec<ProgramOption>,
}

impl Program {
    /// Returns the option with the given key.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&ProgramOption> {
        self.options.iter().find(|option| option.key == key)
    }
}

/// One option of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramOption {
    /// Option key.
    #[serde(default)]
    pub key: String,
    /// Option value, absent when the API reports `null`.
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub value: Option<String>,
    /// Unit of the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ProgramOption {
    /// Returns `true` if the value is `"true"` in any letter case.
    #[must_use]
    pub fn value_as_bool(&self) -> bool {
        self.value
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Returns the value as an integer; a missing value reads as 0.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::NotAnInteger`] if the value is not an integer.
    pub fn value_as_int(&self) -> Result<i64, ValueError> {
        match self.value.as_deref() {
            None => Ok(0),
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| ValueError::NotAnInteger(v.to_string())),
        }
    }
}

/// A program the appliance offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableProgram {
    /// Program key.
    pub key: String,
    /// Whether the program can be selected right now.
    pub available: bool,
    /// Execution constraint, e.g. `selectandstart` or `selectonly`.
    pub execution: String,
}

/// An option of an available program with its allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableProgramOption {
    /// Option key.
    pub key: String,
    /// Values the option accepts; empty for free-form options.
    pub allowed_values: Vec<String>,
}

// Wire shapes. Entries missing a key (or, for programs, an execution
// constraint) are dropped while converting.

#[derive(Debug, Deserialize)]
pub(crate) struct AvailablePrograms {
    #[serde(default)]
    programs: Vec<RawAvailableProgram>,
}

#[derive(Debug, Deserialize)]
struct RawAvailableProgram {
    key: Option<String>,
    #[serde(default)]
    constraints: RawProgramConstraints,
}

#[derive(Debug, Default, Deserialize)]
struct RawProgramConstraints {
    #[serde(default)]
    available: bool,
    execution: Option<String>,
}

impl AvailablePrograms {
    pub(crate) fn into_programs(self) -> Vec<AvailableProgram> {
        self.programs
            .into_iter()
            .filter_map(|raw| {
                Some(AvailableProgram {
                    key: raw.key?,
                    available: raw.constraints.available,
                    execution: raw.constraints.execution?,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AvailableOptions {
    #[serde(default)]
    options: Vec<RawAvailableOption>,
}

#[derive(Debug, Deserialize)]
struct RawAvailableOption {
    key: Option<String>,
    #[serde(default)]
    constraints: RawOptionConstraints,
}

#[derive(Debug, Default, Deserialize)]
struct RawOptionConstraints {
    #[serde(default)]
    allowedvalues: Vec<serde_json::Value>,
}

impl AvailableOptions {
    pub(crate) fn into_options(self) -> Vec<AvailableProgramOption> {
        self.options
            .into_iter()
            .filter_map(|raw| {
                Some(AvailableProgramOption {
                    key: raw.key?,
                    allowed_values: raw
                        .constraints
                        .allowedvalues
                        .iter()
                        .filter_map(super::envelope::scalar_to_string)
                        .collect(),
                })
            })
            .collect()
    }
}
