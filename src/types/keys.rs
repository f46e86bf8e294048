// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Setting and status keys used by the typed client helpers.

/// Appliance power state setting.
pub const POWER_STATE: &str = "BSH.Common.Setting.PowerState";

/// Freezer compartment target temperature.
pub const SETPOINT_TEMPERATURE_FREEZER: &str =
    "Refrigeration.FridgeFreezer.Setting.SetpointTemperatureFreezer";

/// Refrigerator compartment target temperature.
pub const SETPOINT_TEMPERATURE_REFRIGERATOR: &str =
    "Refrigeration.FridgeFreezer.Setting.SetpointTemperatureRefrigerator";

/// Refrigerator super cooling mode.
pub const SUPER_MODE_REFRIGERATOR: &str =
    "Refrigeration.FridgeFreezer.Setting.SuperModeRefrigerator";

/// Freezer super freezing mode.
pub const SUPER_MODE_FREEZER: &str = "Refrigeration.FridgeFreezer.Setting.SuperModeFreezer";

/// Door state status.
pub const DOOR_STATE: &str = "BSH.Common.Status.DoorState";

/// Operation state status.
pub const OPERATION_STATE: &str = "BSH.Common.Status.OperationState";

/// Oven cavity temperature status.
pub const CURRENT_CAVITY_TEMPERATURE: &str = "Cooking.Oven.Status.CurrentCavityTemperature";

/// Whether a program may be started remotely.
pub const REMOTE_CONTROL_START_ALLOWED: &str = "BSH.Common.Status.RemoteControlStartAllowed";

/// Whether remote control is enabled on the appliance.
pub const REMOTE_CONTROL_ACTIVE: &str = "BSH.Common.Status.RemoteControlActive";

/// Whether the user is operating the appliance locally.
pub const LOCAL_CONTROL_ACTIVE: &str = "BSH.Common.Status.LocalControlActive";
