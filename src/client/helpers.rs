// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed shortcuts for frequently used settings and status values.
//!
//! Each helper pins the wire type of its key so callers cannot send a
//! setpoint as a string or a super mode as an integer.

use crate::client::ApplianceApiClient;
use crate::error::Result;
use crate::response::Data;
use crate::types::{ValueType, keys};

impl ApplianceApiClient {
    // ========================================================================
    // Settings
    // ========================================================================

    /// Reads the power state, e.g. `BSH.Common.EnumType.PowerState.On`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_power_state(&self, ha_id: &str) -> Result<Data> {
        self.get_setting(ha_id, keys::POWER_STATE).await
    }

    /// Writes the power state.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn set_power_state(&self, ha_id: &str, state: &str) -> Result<()> {
        self.put_setting(ha_id, keys::POWER_STATE, state, None, ValueType::String)
            .await
    }

    /// Reads the freezer setpoint temperature.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_freezer_setpoint_temperature(&self, ha_id: &str) -> Result<Data> {
        self.get_setting(ha_id, keys::SETPOINT_TEMPERATURE_FREEZER)
            .await
    }

    /// Writes the freezer setpoint temperature.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::NotAnInteger`](crate::error::ValueError::NotAnInteger)
    /// if `value` is not an integer, or another error if the request fails.
    pub async fn set_freezer_setpoint_temperature(
        &self,
        ha_id: &str,
        value: &str,
        unit: &str,
    ) -> Result<()> {
        self.put_setting(
            ha_id,
            keys::SETPOINT_TEMPERATURE_FREEZER,
            value,
            Some(unit),
            ValueType::Int,
        )
        .await
    }

    /// Reads the refrigerator setpoint temperature.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_refrigerator_setpoint_temperature(&self, ha_id: &str) -> Result<Data> {
        self.get_setting(ha_id, keys::SETPOINT_TEMPERATURE_REFRIGERATOR)
            .await
    }

    /// Writes the refrigerator setpoint temperature.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::NotAnInteger`](crate::error::ValueError::NotAnInteger)
    /// if `value` is not an integer, or another error if the request fails.
    pub async fn set_refrigerator_setpoint_temperature(
        &self,
        ha_id: &str,
        value: &str,
        unit: &str,
    ) -> Result<()> {
        self.put_setting(
            ha_id,
            keys::SETPOINT_TEMPERATURE_REFRIGERATOR,
            value,
            Some(unit),
            ValueType::Int,
        )
        .await
    }

    /// Reads the refrigerator super mode.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_fridge_super_mode(&self, ha_id: &str) -> Result<Data> {
        self.get_setting(ha_id, keys::SUPER_MODE_REFRIGERATOR).await
    }

    /// Switches the refrigerator super mode.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn set_fridge_super_mode(&self, ha_id: &str, enabled: bool) -> Result<()> {
        self.put_setting(
            ha_id,
            keys::SUPER_MODE_REFRIGERATOR,
            bool_str(enabled),
            None,
            ValueType::Boolean,
        )
        .await
    }

    /// Reads the freezer super mode.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_freezer_super_mode(&self, ha_id: &str) -> Result<Data> {
        self.get_setting(ha_id, keys::SUPER_MODE_FREEZER).await
    }

    /// Switches the freezer super mode.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn set_freezer_super_mode(&self, ha_id: &str, enabled: bool) -> Result<()> {
        self.put_setting(
            ha_id,
            keys::SUPER_MODE_FREEZER,
            bool_str(enabled),
            None,
            ValueType::Boolean,
        )
        .await
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Reads the door state, e.g. `BSH.Common.EnumType.DoorState.Closed`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_door_state(&self, ha_id: &str) -> Result<Data> {
        self.get_status(ha_id, keys::DOOR_STATE).await
    }

    /// Reads the operation state.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_operation_state(&self, ha_id: &str) -> Result<Data> {
        self.get_status(ha_id, keys::OPERATION_STATE).await
    }

    /// Reads the current oven cavity temperature.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_current_cavity_temperature(&self, ha_id: &str) -> Result<Data> {
        self.get_status(ha_id, keys::CURRENT_CAVITY_TEMPERATURE)
            .await
    }

    /// Returns `true` if programs may be started remotely.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn is_remote_control_start_allowed(&self, ha_id: &str) -> Result<bool> {
        self.status_flag(ha_id, keys::REMOTE_CONTROL_START_ALLOWED)
            .await
    }

    /// Returns `true` if remote control is enabled on the appliance.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn is_remote_control_active(&self, ha_id: &str) -> Result<bool> {
        self.status_flag(ha_id, keys::REMOTE_CONTROL_ACTIVE).await
    }

    /// Returns `true` if someone is operating the appliance locally.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn is_local_control_active(&self, ha_id: &str) -> Result<bool> {
        self.status_flag(ha_id, keys::LOCAL_CONTROL_ACTIVE).await
    }

    async fn status_flag(&self, ha_id: &str, key: &str) -> Result<bool> {
        Ok(self.get_status(ha_id, key).await?.value_as_bool())
    }
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
