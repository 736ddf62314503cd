// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event type tags carried by scanner messages.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// The `event` tag of a scanner message.
///
/// Known tags get their own variant. Anything else lands in
/// [`Other`](Self::Other) and is still treated as device telemetry, so
/// subscribers can listen for event types this crate does not know about.
///
/// # Examples
///
/// ```
/// use powersensor_router::message::EventKind;
///
/// let kind: EventKind = "average_power".parse().unwrap();
/// assert_eq!(kind, EventKind::AveragePower);
/// assert!(kind.is_household_input());
///
/// let unknown = EventKind::from("radio_signal_quality");
/// assert_eq!(unknown.as_str(), "radio_signal_quality");
/// assert!(unknown.is_telemetry());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A device came online.
    DeviceFound,
    /// A device went offline.
    DeviceLost,
    /// The scanner finished a discovery sweep. Carries no device.
    ScanComplete,
    /// Averaged power reading (`watts`).
    AveragePower,
    /// Voltage/current breakdown of the power reading (`volts`, ...).
    AveragePowerComponents,
    /// Cumulative energy counter (`summation_joules`).
    SummationEnergy,
    /// Sensor battery voltage (`volts`).
    BatteryLevel,
    /// Any tag not listed above.
    Other(String),
}

impl EventKind {
    /// Returns the wire tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::DeviceFound => "device_found",
            Self::DeviceLost => "device_lost",
            Self::ScanComplete => "scan_complete",
            Self::AveragePower => "average_power",
            Self::AveragePowerComponents => "average_power_components",
            Self::SummationEnergy => "summation_energy",
            Self::BatteryLevel => "battery_level",
            Self::Other(tag) => tag,
        }
    }

    /// Returns `true` for `device_found` and `device_lost`.
    #[must_use]
    pub fn is_discovery(&self) -> bool {
        matches!(self, Self::DeviceFound | Self::DeviceLost)
    }

    /// Returns `true` for events that fan out to device subscribers.
    #[must_use]
    pub fn is_telemetry(&self) -> bool {
        !self.is_discovery() && *self != Self::ScanComplete
    }

    /// Returns `true` for events the household aggregator consumes.
    #[must_use]
    pub fn is_household_input(&self) -> bool {
        matches!(self, Self::AveragePower | Self::SummationEnergy)
    }
}

impl From<&str> for EventKind {
    fn from(tag: &str) -> Self {
        match tag {
            "device_found" => Self::DeviceFound,
            "device_lost" => Self::DeviceLost,
            "scan_complete" => Self::ScanComplete,
            "average_power" => Self::AveragePower,
            "average_power_components" => Self::AveragePowerComponents,
            "summation_energy" => Self::SummationEnergy,
            "battery_level" => Self::BatteryLevel,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for EventKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_parse_to_variants() {
        assert_eq!(EventKind::from("device_found"), EventKind::DeviceFound);
        assert_eq!(EventKind::from("device_lost"), EventKind::DeviceLost);
        assert_eq!(EventKind::from("battery_level"), EventKind::BatteryLevel);
        assert_eq!(
            EventKind::from("summation_energy"),
            EventKind::SummationEnergy
        );
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let kind = EventKind::from("uplink_rssi");
        assert_eq!(kind, EventKind::Other("uplink_rssi".to_string()));
        assert_eq!(kind.to_string(), "uplink_rssi");
    }

    #[test]
    fn classification() {
        assert!(EventKind::DeviceFound.is_discovery());
        assert!(!EventKind::DeviceFound.is_telemetry());
        assert!(!EventKind::ScanComplete.is_telemetry());
        assert!(EventKind::BatteryLevel.is_telemetry());
        assert!(!EventKind::BatteryLevel.is_household_input());
        assert!(EventKind::SummationEnergy.is_household_input());
    }
}
