// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Router configuration.

use serde::{Deserialize, Serialize};

use crate::household::{HouseholdConfig, SolarMode};

/// Configuration for an [`EventRouter`](super::EventRouter).
///
/// # Examples
///
/// ```
/// use powersensor_router::household::SolarMode;
/// use powersensor_router::router::RouterConfig;
///
/// let config = RouterConfig::builder()
///     .solar(SolarMode::Enabled)
///     .build();
/// assert_eq!(config.household.solar, SolarMode::Enabled);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Household view settings.
    pub household: HouseholdConfig,
}

impl RouterConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RouterConfigBuilder {
        RouterConfigBuilder::default()
    }
}

/// Builder for [`RouterConfig`].
#[derive(Debug, Clone, Default)]
pub struct RouterConfigBuilder {
    household: HouseholdConfig,
}

impl RouterConfigBuilder {
    /// Sets the whole household configuration.
    #[must_use]
    pub fn household(mut self, household: HouseholdConfig) -> Self {
        self.household = household;
        self
    }

    /// Sets the household solar mode.
    #[must_use]
    pub fn solar(mut self, solar: SolarMode) -> Self {
        self.household.solar = solar;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RouterConfig {
        RouterConfig {
            household: self.household,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_nested_household() {
        let config: RouterConfig =
            serde_json::from_str(r#"{"household":{"solar":"disabled"}}"#).unwrap();
        assert_eq!(config.household.solar, SolarMode::Disabled);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: RouterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.household.solar, SolarMode::Detect);
    }

    #[test]
    fn builder_overrides_solar() {
        let config = RouterConfig::builder()
            .household(HouseholdConfig::new())
            .solar(SolarMode::Disabled)
            .build();
        assert_eq!(config.household.solar, SolarMode::Disabled);
    }
}
