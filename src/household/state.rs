// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Running household totals.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::message::{DeviceId, Role};

use super::{HouseholdMetric, SolarMode};

/// Which side of the household power flow a device measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    /// Signed net grid power, import positive.
    Mains,
    /// Solar inverter output, generation negative.
    Solar,
}

impl Source {
    /// Classifies a device by its role. Unroled devices are not part of
    /// the household balance.
    pub(crate) fn from_role(role: Option<&Role>) -> Option<Self> {
        match role? {
            Role::HouseNet => Some(Self::Mains),
            Role::Solar => Some(Self::Solar),
            _ => None,
        }
    }
}

/// Generation seen from a solar reading. Generation reads negative; positive
/// readings are inverter standby draw and count as zero.
pub(crate) fn clamp_solar(watts: f64) -> f64 {
    if watts <= 0.0 { -watts } else { 0.0 }
}

/// Last counter reading of one device.
#[derive(Debug, Clone, Copy)]
struct Counter {
    joules: f64,
    reset_epoch: Option<i64>,
}

impl Counter {
    /// Returns the energy since the previous reading and stores the new one.
    fn advance(&mut self, joules: f64, reset_epoch: Option<i64>) -> f64 {
        let rebased = reset_epoch.is_some() && reset_epoch != self.reset_epoch;
        let delta = if rebased { joules } else { joules - self.joules };
        self.joules = joules;
        if reset_epoch.is_some() {
            self.reset_epoch = reset_epoch;
        }
        delta
    }
}

/// Point-in-time copy of the household view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HouseholdSnapshot {
    /// Home consumption in watts, once derivable.
    pub home_usage: Option<f64>,
    /// Grid import in watts.
    pub from_grid: Option<f64>,
    /// Grid export in watts.
    pub to_grid: Option<f64>,
    /// Solar generation in watts.
    pub solar_generation: Option<f64>,
    /// Home consumption in joules since `reset_time`.
    pub home_usage_joules: f64,
    /// Grid import in joules since `reset_time`.
    pub from_grid_joules: f64,
    /// Grid export in joules since `reset_time`.
    pub to_grid_joules: f64,
    /// Solar generation in joules since `reset_time`.
    pub solar_generation_joules: f64,
    /// When energy counting started.
    pub reset_time: Option<DateTime<Utc>>,
    /// Whether solar metrics are being derived.
    pub solar_active: bool,
}

/// Accumulated household state. Owned exclusively by the aggregator.
#[derive(Debug)]
pub(crate) struct HouseholdState {
    solar_mode: SolarMode,
    solar_seen: bool,
    mains_watts: HashMap<DeviceId, f64>,
    solar_watts: HashMap<DeviceId, f64>,
    mains_counters: HashMap<DeviceId, Counter>,
    solar_counters: HashMap<DeviceId, Counter>,
    from_grid_joules: f64,
    to_grid_joules: f64,
    solar_joules: f64,
    home_joules: f64,
    reset_epoch: Option<i64>,
}

impl HouseholdState {
    pub(crate) fn new(solar_mode: SolarMode) -> Self {
        Self {
            solar_mode,
            solar_seen: false,
            mains_watts: HashMap::new(),
            solar_watts: HashMap::new(),
            mains_counters: HashMap::new(),
            solar_counters: HashMap::new(),
            from_grid_joules: 0.0,
            to_grid_joules: 0.0,
            solar_joules: 0.0,
            home_joules: 0.0,
            reset_epoch: None,
        }
    }

    fn solar_active(&self) -> bool {
        match self.solar_mode {
            SolarMode::Enabled => true,
            SolarMode::Disabled => false,
            SolarMode::Detect => self.solar_seen,
        }
    }

    /// Returns `false` if the reading is outside the household balance.
    fn accepts(&mut self, source: Source) -> bool {
        match source {
            Source::Mains => true,
            Source::Solar if self.solar_mode == SolarMode::Disabled => false,
            Source::Solar => {
                self.solar_seen = true;
                true
            }
        }
    }

    fn net_watts(&self) -> Option<f64> {
        (!self.mains_watts.is_empty()).then(|| self.mains_watts.values().sum())
    }

    fn solar_generation(&self) -> Option<f64> {
        (!self.solar_watts.is_empty()).then(|| self.solar_watts.values().sum())
    }

    fn home_usage(&self) -> Option<f64> {
        let net = self.net_watts()?;
        let solar = if self.solar_active() {
            match (self.solar_mode, self.solar_generation()) {
                (_, Some(solar)) => solar,
                (SolarMode::Enabled, None) => return None,
                (_, None) => 0.0,
            }
        } else {
            0.0
        };
        Some((net + solar).max(0.0))
    }

    /// Records an averaged power reading and returns the updated flows.
    pub(crate) fn apply_power(
        &mut self,
        device: DeviceId,
        source: Source,
        watts: f64,
    ) -> Vec<(HouseholdMetric, f64)> {
        if !self.accepts(source) {
            return Vec::new();
        }
        match source {
            Source::Mains => self.mains_watts.insert(device, watts),
            Source::Solar => self.solar_watts.insert(device, clamp_solar(watts)),
        };

        let mut updates = Vec::with_capacity(4);
        if let Some(home) = self.home_usage() {
            updates.push((HouseholdMetric::HomeUsage, home));
        }
        if let Some(net) = self.net_watts() {
            updates.push((HouseholdMetric::FromGrid, net.max(0.0)));
            updates.push((HouseholdMetric::ToGrid, (-net).max(0.0)));
        }
        if self.solar_active()
            && let Some(solar) = self.solar_generation()
        {
            updates.push((HouseholdMetric::SolarGeneration, solar));
        }
        updates
    }

    /// Records a cumulative energy reading and returns the updated totals.
    pub(crate) fn apply_energy(
        &mut self,
        device: DeviceId,
        source: Source,
        joules: f64,
        reset_epoch: Option<i64>,
    ) -> Vec<(HouseholdMetric, f64)> {
        if !self.accepts(source) {
            return Vec::new();
        }
        if self.reset_epoch.is_none() {
            self.reset_epoch = Some(reset_epoch.unwrap_or_else(|| Utc::now().timestamp()));
        }

        let counters = match source {
            Source::Mains => &mut self.mains_counters,
            Source::Solar => &mut self.solar_counters,
        };
        let delta = match counters.get_mut(&device) {
            Some(counter) => counter.advance(joules, reset_epoch),
            None => {
                counters.insert(
                    device,
                    Counter {
                        joules,
                        reset_epoch,
                    },
                );
                0.0
            }
        };

        match source {
            Source::Mains if delta > 0.0 => self.from_grid_joules += delta,
            Source::Mains => self.to_grid_joules -= delta,
            Source::Solar if delta < 0.0 => self.solar_joules -= delta,
            Source::Solar => {}
        }

        let solar = if self.solar_active() {
            self.solar_joules
        } else {
            0.0
        };
        self.home_joules = (self.from_grid_joules + solar - self.to_grid_joules).max(0.0);

        let mut updates = vec![
            (HouseholdMetric::HomeUsageSummation, self.home_joules),
            (HouseholdMetric::FromGridSummation, self.from_grid_joules),
            (HouseholdMetric::ToGridSummation, self.to_grid_joules),
        ];
        if self.solar_active() {
            updates.push((HouseholdMetric::SolarGenerationSummation, self.solar_joules));
        }
        updates
    }

    pub(crate) fn reset_epoch(&self) -> Option<i64> {
        self.reset_epoch
    }

    pub(crate) fn snapshot(&self) -> HouseholdSnapshot {
        let solar_active = self.solar_active();
        HouseholdSnapshot {
            home_usage: self.home_usage(),
            from_grid: self.net_watts().map(|net| net.max(0.0)),
            to_grid: self.net_watts().map(|net| (-net).max(0.0)),
            solar_generation: if solar_active {
                self.solar_generation()
            } else {
                None
            },
            home_usage_joules: self.home_joules,
            from_grid_joules: self.from_grid_joules,
            to_grid_joules: self.to_grid_joules,
            solar_generation_joules: if solar_active { self.solar_joules } else { 0.0 },
            reset_time: self
                .reset_epoch
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            solar_active,
        }
    }
}
