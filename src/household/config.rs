// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Household view configuration.

use serde::{Deserialize, Serialize};

/// Whether the household view derives solar metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarMode {
    /// The home has solar. Home usage waits for a solar reading.
    Enabled,
    /// No solar. Solar-role readings are ignored.
    Disabled,
    /// Solar metrics appear once a solar-role device reports.
    #[default]
    Detect,
}

/// Configuration for the household aggregator.
///
/// # Examples
///
/// ```
/// use powersensor_router::household::{HouseholdConfig, SolarMode};
///
/// let config = HouseholdConfig::new().with_solar(SolarMode::Enabled);
/// assert_eq!(config.solar, SolarMode::Enabled);
///
/// let config: HouseholdConfig = serde_json::from_str(r#"{"solar":"disabled"}"#).unwrap();
/// assert_eq!(config.solar, SolarMode::Disabled);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdConfig {
    /// Solar handling.
    pub solar: SolarMode,
}

impl HouseholdConfig {
    /// Creates a configuration with solar detection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the solar mode.
    #[must_use]
    pub fn with_solar(mut self, solar: SolarMode) -> Self {
        self.solar = solar;
        self
    }
}
