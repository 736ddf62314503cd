// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor descriptions per device type.

use serde::Serialize;

use crate::message::{EventKind, SUMMATION_JOULES_KEY, VOLTS_KEY, WATTS_KEY};

use super::format::Formatter;

/// What a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Instantaneous power.
    Power,
    /// Electric potential.
    Voltage,
    /// Accumulated energy.
    Energy,
}

/// How a sensor's state evolves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    /// A running total that may be reset.
    Total,
}

/// Unit of measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    /// Watts.
    #[serde(rename = "W")]
    Watt,
    /// Volts.
    #[serde(rename = "V")]
    Volt,
    /// Kilowatt-hours.
    #[serde(rename = "kWh")]
    KilowattHour,
}

impl Unit {
    /// Returns the unit symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Watt => "W",
            Self::Volt => "V",
            Self::KilowattHour => "kWh",
        }
    }
}

/// Static description of one sensor: which message field it shows and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorDescription {
    /// Display name.
    pub name: &'static str,
    /// Measured quantity.
    pub device_class: DeviceClass,
    /// State class, for totals.
    pub state_class: Option<StateClass>,
    /// Unit of measurement.
    pub unit: Unit,
    /// Event type the value arrives in.
    pub event: &'static str,
    /// Payload key holding the value.
    pub key: &'static str,
    /// Formatting applied to the raw value.
    pub formatter: Formatter,
    /// Suggested display precision.
    pub precision: u8,
}

impl SensorDescription {
    /// Returns the event type as an [`EventKind`].
    #[must_use]
    pub fn event_kind(&self) -> EventKind {
        EventKind::from(self.event)
    }
}

const fn power(name: &'static str, event: &'static str, formatter: Formatter) -> SensorDescription {
    SensorDescription {
        name,
        device_class: DeviceClass::Power,
        state_class: None,
        unit: Unit::Watt,
        event,
        key: WATTS_KEY,
        formatter,
        precision: 0,
    }
}

const fn voltage(name: &'static str, event: &'static str) -> SensorDescription {
    SensorDescription {
        name,
        device_class: DeviceClass::Voltage,
        state_class: None,
        unit: Unit::Volt,
        event,
        key: VOLTS_KEY,
        formatter: Formatter::ThreeDecimals,
        precision: 3,
    }
}

const fn energy(name: &'static str, event: &'static str, precision: u8) -> SensorDescription {
    SensorDescription {
        name,
        device_class: DeviceClass::Energy,
        state_class: Some(StateClass::Total),
        unit: Unit::KilowattHour,
        event,
        key: SUMMATION_JOULES_KEY,
        formatter: Formatter::JoulesToKwh,
        precision,
    }
}

/// Sensors created for a `sensor` device (CT clamp or meter reader).
pub const SENSOR_DESCRIPTIONS: &[SensorDescription] = &[
    power("Power", "average_power", Formatter::Int),
    voltage("Battery Level (Volts)", "battery_level"),
    energy("Total energy", "summation_energy", 1),
];

/// Sensors created for a `plug` device.
pub const PLUG_DESCRIPTIONS: &[SensorDescription] = &[
    power("Power", "average_power", Formatter::NonNegativeInt),
    voltage("Mains Voltage", "average_power_components"),
    energy("Total energy", "summation_energy", 3),
];

/// Sensors of the virtual household view.
pub const HOUSEHOLD_DESCRIPTIONS: &[SensorDescription] = &[
    power("Power - Home use", "home_usage", Formatter::Int),
    power("Power - From grid", "from_grid", Formatter::Int),
    power("Power - To grid", "to_grid", Formatter::Int),
    power("Power - Solar generation", "solar_generation", Formatter::Int),
    energy("Energy - Home usage", "home_usage_summation", 3),
    energy("Energy - From grid", "from_grid_summation", 3),
    energy("Energy - To grid", "to_grid_summation", 3),
    energy("Energy - Solar generation", "solar_generation_summation", 3),
];

/// Returns the sensors for a physical device type, if supported.
#[must_use]
pub fn descriptions_for(device_type: &str) -> Option<&'static [SensorDescription]> {
    match device_type {
        "sensor" => Some(SENSOR_DESCRIPTIONS),
        "plug" => Some(PLUG_DESCRIPTIONS),
        _ => None,
    }
}
