// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Virtual household view.
//!
//! Combines readings from the mains sensor (role `house-net`) and the solar
//! sensor (role `solar`) into whole-home figures:
//!
//! | Metric | Power | Energy |
//! |--------|-------|--------|
//! | Home usage | `net + solar`, at least 0 | `import + generation - export` |
//! | From grid | `max(net, 0)` | sum of positive mains counter deltas |
//! | To grid | `max(-net, 0)` | sum of negative mains counter deltas |
//! | Solar generation | `-watts` when `watts <= 0` | sum of negative solar counter deltas |
//!
//! Solar handling is chosen with [`SolarMode`].

mod aggregator;
mod config;
mod metric;
mod state;

pub use aggregator::HouseholdAggregator;
pub use config::{HouseholdConfig, SolarMode};
pub use metric::HouseholdMetric;
pub use state::HouseholdSnapshot;
pub(crate) use state::clamp_solar;
