// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `{"data": ...}` envelope wrapping every REST payload.

use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::{Map, Value, json};

use crate::error::{ParseError, ValueError};
use crate::types::ValueType;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Parses a response body and returns what is inside `data`.
///
/// # Errors
///
/// Returns [`ParseError::Json`] if the body is not JSON of the expected shape.
pub(crate) fn parse_data<T: DeserializeOwned>(body: &str) -> Result<T, ParseError> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    Ok(envelope.data)
}

/// Builds `{"data": {"key", "value"?, "unit"?}}` with `value` encoded as `value_type`.
pub(crate) fn data_body(
    key: &str,
    value: Option<&str>,
    unit: Option<&str>,
    value_type: ValueType,
) -> Result<String, ValueError> {
    let item = item(key, value, unit, value_type)?;
    Ok(json!({ "data": item }).to_string())
}

/// Builds `{"data": {"options": [{"key", "value"?, "unit"?}]}}`.
pub(crate) fn options_body(
    key: &str,
    value: Option<&str>,
    unit: Option<&str>,
    value_type: ValueType,
) -> Result<String, ValueError> {
    let item = item(key, value, unit, value_type)?;
    Ok(json!({ "data": { "options": [item] } }).to_string())
}

fn item(
    key: &str,
    value: Option<&str>,
    unit: Option<&str>,
    value_type: ValueType,
) -> Result<Value, ValueError> {
    let mut item = Map::new();
    item.insert("key".to_string(), Value::String(key.to_string()));
    if let Some(value) = value {
        item.insert("value".to_string(), value_type.encode(value)?);
    }
    if let Some(unit) = unit {
        item.insert("unit".to_string(), Value::String(unit.to_string()));
    }
    Ok(Value::Object(item))
}

/// Returns a JSON scalar as a string; `null` yields `None`.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Serde adapter for fields holding a string, number, boolean or null.
pub(crate) fn deserialize_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_body_with_int_value_and_unit() {
        let body = data_body(
            "Refrigeration.FridgeFreezer.Setting.SetpointTemperatureFreezer",
            Some("-18"),
            Some("°C"),
            ValueType::Int,
        )
        .unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            parsed,
            json!({"data": {
                "key": "Refrigeration.FridgeFreezer.Setting.SetpointTemperatureFreezer",
                "value": -18,
                "unit": "°C"
            }})
        );
    }

    #[test]
    fn data_body_without_value() {
        let body = data_body("Dishcare.Dishwasher.Program.Eco50", None, None, ValueType::String)
            .unwrap();
        assert_eq!(body, r#"{"data":{"key":"Dishcare.Dishwasher.Program.Eco50"}}"#);
    }

    #[test]
    fn data_body_rejects_bad_int() {
        let err = data_body("k", Some("warm"), None, ValueType::Int).unwrap_err();
        assert_eq!(err, ValueError::NotAnInteger("warm".to_string()));
    }

    #[test]
    fn options_body_wraps_single_option() {
        let body = options_body(
            "BSH.Common.Option.Duration",
            Some("600"),
            Some("seconds"),
            ValueType::Int,
        )
        .unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            parsed,
            json!({"data": {"options": [
                {"key": "BSH.Common.Option.Duration", "value": 600, "unit": "seconds"}
            ]}})
        );
    }

    #[test]
    fn scalars_become_strings() {
        assert_eq!(scalar_to_string(&json!("a")), Some("a".to_string()));
        assert_eq!(scalar_to_string(&json!(21.5)), Some("21.5".to_string()));
        assert_eq!(scalar_to_string(&json!(true)), Some("true".to_string()));
        assert_eq!(scalar_to_string(&Value::Null), None);
    }

    #[test]
    fn parse_data_requires_envelope() {
        let ok: Value = parse_data(r#"{"data":{"x":1}}"#).unwrap();
        assert_eq!(ok, json!({"x": 1}));
        assert!(parse_data::<Value>(r#"{"x":1}"#).is_err());
    }
}
