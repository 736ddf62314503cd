// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Household metric names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::{SUMMATION_JOULES_KEY, WATTS_KEY};

/// A derived household-level metric.
///
/// Each metric is also the event type of the messages the household view
/// publishes for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseholdMetric {
    /// Power consumed by the home.
    HomeUsage,
    /// Power imported from the grid.
    FromGrid,
    /// Power exported to the grid.
    ToGrid,
    /// Power generated by solar.
    SolarGeneration,
    /// Energy consumed by the home.
    HomeUsageSummation,
    /// Energy imported from the grid.
    FromGridSummation,
    /// Energy exported to the grid.
    ToGridSummation,
    /// Energy generated by solar.
    SolarGenerationSummation,
}

impl HouseholdMetric {
    /// Every metric, power first.
    pub const ALL: [Self; 8] = [
        Self::HomeUsage,
        Self::FromGrid,
        Self::ToGrid,
        Self::SolarGeneration,
        Self::HomeUsageSummation,
        Self::FromGridSummation,
        Self::ToGridSummation,
        Self::SolarGenerationSummation,
    ];

    /// Returns the event type name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HomeUsage => "home_usage",
            Self::FromGrid => "from_grid",
            Self::ToGrid => "to_grid",
            Self::SolarGeneration => "solar_generation",
            Self::HomeUsageSummation => "home_usage_summation",
            Self::FromGridSummation => "from_grid_summation",
            Self::ToGridSummation => "to_grid_summation",
            Self::SolarGenerationSummation => "solar_generation_summation",
        }
    }

    /// Parses an event type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|metric| metric.as_str() == name)
    }

    /// Returns `true` for cumulative energy metrics.
    #[must_use]
    pub fn is_energy(self) -> bool {
        matches!(
            self,
            Self::HomeUsageSummation
                | Self::FromGridSummation
                | Self::ToGridSummation
                | Self::SolarGenerationSummation
        )
    }

    /// Returns `true` for solar metrics.
    #[must_use]
    pub fn is_solar(self) -> bool {
        matches!(self, Self::SolarGeneration | Self::SolarGenerationSummation)
    }

    /// Returns the payload key the value is published under.
    #[must_use]
    pub fn payload_key(self) -> &'static str {
        if self.is_energy() {
            SUMMATION_JOULES_KEY
        } else {
            WATTS_KEY
        }
    }
}

impl fmt::Display for HouseholdMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for metric in HouseholdMetric::ALL {
            assert_eq!(HouseholdMetric::from_name(metric.as_str()), Some(metric));
        }
        assert_eq!(HouseholdMetric::from_name("battery_level"), None);
    }

    #[test]
    fn payload_keys() {
        assert_eq!(HouseholdMetric::ToGrid.payload_key(), "watts");
        assert_eq!(
            HouseholdMetric::ToGridSummation.payload_key(),
            "summation_joules"
        );
    }

    #[test]
    fn serde_uses_event_names() {
        let json = serde_json::to_string(&HouseholdMetric::SolarGenerationSummation).unwrap();
        assert_eq!(json, "\"solar_generation_summation\"");
    }
}
