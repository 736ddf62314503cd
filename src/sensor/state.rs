// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor state and device metadata.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::message::DeviceId;

use super::format::SensorValue;

const MANUFACTURER: &str = "Powersensor";

/// Identifier of the virtual household device.
pub const HOUSEHOLD_IDENTIFIER: &str = "vhh";

/// Current state of a sensor, published through a watch channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorState {
    /// Latest formatted value, `None` until the first reading.
    pub value: Option<SensorValue>,
    /// Whether the underlying device is reachable.
    pub available: bool,
    /// When the running total last restarted, for energy sensors.
    pub last_reset: Option<DateTime<Utc>>,
}

impl SensorState {
    pub(crate) fn new() -> Self {
        Self {
            value: None,
            available: true,
            last_reset: None,
        }
    }

    /// Stores a new reading, keeping the previous reset time if none is given.
    pub(crate) fn record(&mut self, value: SensorValue, last_reset: Option<DateTime<Utc>>) {
        self.value = Some(value);
        if last_reset.is_some() {
            self.last_reset = last_reset;
        }
    }
}

/// Device a sensor is grouped under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Stable device identifier.
    pub identifier: String,
    /// Manufacturer name.
    pub manufacturer: &'static str,
    /// Model name.
    pub model: String,
    /// Display name.
    pub name: String,
}

impl DeviceInfo {
    /// Metadata for a physical device.
    ///
    /// # Examples
    ///
    /// ```
    /// use powersensor_router::message::DeviceId;
    /// use powersensor_router::sensor::DeviceInfo;
    ///
    /// let info = DeviceInfo::for_device(&DeviceId::new("aabbccddeeff"), "plug");
    /// assert_eq!(info.model, "Powersensor Plug");
    /// assert_eq!(info.name, "Powersensor Plug (aabbccddeeff)");
    /// ```
    #[must_use]
    pub fn for_device(mac: &DeviceId, device_type: &str) -> Self {
        let model = if device_type == "plug" {
            format!("{MANUFACTURER} Plug")
        } else {
            MANUFACTURER.to_string()
        };
        Self {
            identifier: mac.as_str().to_string(),
            manufacturer: MANUFACTURER,
            name: format!("{model} ({mac})"),
            model,
        }
    }

    /// Metadata for the virtual household device.
    #[must_use]
    pub fn household() -> Self {
        Self {
            identifier: HOUSEHOLD_IDENTIFIER.to_string(),
            manufacturer: MANUFACTURER,
            model: "Virtual".to_string(),
            name: "Powersensor Household View".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_device_model() {
        let info = DeviceInfo::for_device(&DeviceId::new("AA:BB"), "sensor");
        assert_eq!(info.model, "Powersensor");
        assert_eq!(info.name, "Powersensor (AA:BB)");
        assert_eq!(info.identifier, "AA:BB");
    }

    #[test]
    fn record_keeps_reset_time() {
        let mut state = SensorState::new();
        let reset = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        state.record(SensorValue::Int(1), Some(reset));
        state.record(SensorValue::Int(2), None);

        assert_eq!(state.value, Some(SensorValue::Int(2)));
        assert_eq!(state.last_reset, Some(reset));
        assert!(state.available);
    }
}
