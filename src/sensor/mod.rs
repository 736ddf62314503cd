// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Presentation sensors.
//!
//! Sensors turn routed messages into formatted states that a
//! home-automation front end can display. Each sensor publishes its
//! [`SensorState`] through a `tokio::sync::watch` channel.
//!
//! | Device type | Sensors |
//! |-------------|---------|
//! | `sensor` | Power, Battery Level (Volts), Total energy |
//! | `plug` | Power, Mains Voltage, Total energy |
//! | household | power and energy for home use, from grid, to grid, solar |

mod description;
mod device_sensor;
mod format;
mod household_sensor;
mod platform;
mod state;

pub use description::{
    DeviceClass, HOUSEHOLD_DESCRIPTIONS, PLUG_DESCRIPTIONS, SENSOR_DESCRIPTIONS,
    SensorDescription, StateClass, Unit, descriptions_for,
};
pub use device_sensor::DeviceSensor;
pub use format::{Formatter, SensorValue};
pub use household_sensor::HouseholdSensor;
pub use platform::SensorPlatform;
pub use state::{DeviceInfo, HOUSEHOLD_IDENTIFIER, SensorState};
