// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Installation role of a sensor.

use std::fmt;

/// Where a sensor is installed, as reported in the message `role` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// On the mains feed; readings are signed net grid power.
    HouseNet,
    /// On the solar inverter feed; generation reads negative.
    Solar,
    /// On a water heater circuit.
    Water,
    /// On an individual appliance circuit.
    Appliance,
    /// Any other role tag.
    Other(String),
}

impl Role {
    /// Returns the wire tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::HouseNet => "house-net",
            Self::Solar => "solar",
            Self::Water => "water",
            Self::Appliance => "appliance",
            Self::Other(tag) => tag,
        }
    }

    /// Returns `true` for solar installations.
    #[must_use]
    pub fn is_solar(&self) -> bool {
        matches!(self, Self::Solar)
    }
}

impl From<&str> for Role {
    fn from(tag: &str) -> Self {
        match tag {
            "house-net" => Self::HouseNet,
            "solar" => Self::Solar,
            "water" => Self::Water,
            "appliance" => Self::Appliance,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
