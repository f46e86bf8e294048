// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Setting and status values.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

use super::envelope::deserialize_scalar;

/// A single setting or status value.
///
/// Numbers and booleans are carried in their string form.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::response::Data;
///
/// let json = r#"{"key":"Cooking.Oven.Status.CurrentCavityTemperature","value":180,"unit":"°C"}"#;
/// let data: Data = serde_json::from_str(json).unwrap();
/// assert_eq!(data.value.as_deref(), Some("180"));
/// assert_eq!(data.value_as_int().unwrap(), 180);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    /// Setting or status key.
    pub key: String,
    /// Current value, absent when the API reports `null`.
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub value: Option<String>,
    /// Unit of the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Data {
    /// Creates a value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: Option<String>, unit: Option<String>) -> Self {
        Self {
            key: key.into(),
            value,
            unit,
        }
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_value_is_none() {
        let data: Data = serde_json::from_str(r#"{"key":"k","value":null}"#).unwrap();
        assert_eq!(data.value, None);
        assert!(!data.value_as_bool());
        assert_eq!(data.value_as_int().unwrap(), 0);
    }

    #[test]
    fn boolean_value() {
        let data: Data =
            serde_json::from_str(r#"{"key":"BSH.Common.Status.RemoteControlActive","value":true}"#)
                .unwrap();
        assert_eq!(data.value.as_deref(), Some("true"));
        assert!(data.value_as_bool());
    }

    #[test]
    fn non_integer_value_is_error() {
        let data = Data::new("k", Some("Closed".to_string()), None);
        assert!(data.value_as_int().is_err());
    }
}
