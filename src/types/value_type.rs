// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire encoding of setting and option values.

use std::fmt;

use serde_json::Value;

use crate::error::ValueError;

/// How a value is encoded in a request body.
///
/// The API does not describe its expected types, so each call site picks the
/// type the attribute is known to accept.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::types::ValueType;
/// use serde_json::json;
///
/// assert_eq!(ValueType::String.encode("On").unwrap(), json!("On"));
/// assert_eq!(ValueType::Int.encode("-18").unwrap(), json!(-18));
/// assert_eq!(ValueType::Boolean.encode("TRUE").unwrap(), json!(true));
/// assert!(ValueType::Int.encode("cold").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// JSON string.
    #[default]
    String,
    /// JSON integer.
    Int,
    /// JSON boolean.
    Boolean,
}

impl ValueType {
    /// Encodes `value` as JSON of this type.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError`] if `value` cannot be represented as this type.
    pub fn encode(self, value: &str) -> Result<Value, ValueError> {
        match self {
            Self::String => Ok(Value::String(value.to_string())),
            Self::Int => value
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| ValueError::NotAnInteger(value.to_string())),
            Self::Boolean => parse_bool(value)
                .map(Value::Bool)
                .ok_or_else(|| ValueError::NotABoolean(value.to_string())),
        }
    }

    /// Returns the type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
