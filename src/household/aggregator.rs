// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Virtual household aggregator.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::error::HouseholdError;
use crate::message::{EventKind, Message, RESET_TIME_KEY, SUMMATION_JOULES_KEY, WATTS_KEY};
use crate::subscription::{
    CallbackSet, HouseholdCallback, HouseholdCallbackFn, IdGenerator, SubscriptionId, isolate,
};

use super::state::{HouseholdSnapshot, HouseholdState, Source};
use super::{HouseholdConfig, HouseholdMetric};

/// Derives whole-home power and energy metrics from individual devices.
///
/// The aggregator consumes `average_power` and `summation_energy` telemetry
/// from every device, whether or not an entity is loaded for it, and
/// publishes one message per updated [`HouseholdMetric`] to its own
/// subscribers. Published messages use the metric name as `event` and carry
/// the value under `watts` or `summation_joules`.
///
/// # Examples
///
/// ```
/// use powersensor_router::household::{HouseholdAggregator, HouseholdConfig, HouseholdMetric};
/// use powersensor_router::message::{EventKind, Message, Role};
/// use powersensor_router::subscription::household_callback;
///
/// # async fn example() -> Result<(), powersensor_router::error::HouseholdError> {
/// let household = HouseholdAggregator::new(HouseholdConfig::default());
/// household.subscribe(
///     HouseholdMetric::SolarGeneration,
///     household_callback(|metric, msg| async move {
///         println!("{metric}: {:?}", msg.number("watts"));
///     }),
/// );
///
/// let reading = Message::new(EventKind::AveragePower)
///     .with_mac("CC:DD")
///     .with_role(&Role::Solar)
///     .with_field("watts", -150);
/// household.process_average_power(&reading).await?;
///
/// assert_eq!(household.snapshot().solar_generation, Some(150.0));
/// # Ok(())
/// # }
/// ```
pub struct HouseholdAggregator {
    state: Mutex<HouseholdState>,
    subscribers: RwLock<HashMap<HouseholdMetric, CallbackSet<HouseholdCallbackFn>>>,
    ids: IdGenerator,
}

impl HouseholdAggregator {
    /// Creates an aggregator with empty totals.
    #[must_use]
    pub fn new(config: HouseholdConfig) -> Self {
        Self {
            state: Mutex::new(HouseholdState::new(config.solar)),
            subscribers: RwLock::new(HashMap::new()),
            ids: IdGenerator::new(),
        }
    }

    /// Registers a callback for one metric.
    ///
    /// Registering the same `Arc` twice for a metric returns the original ID.
    pub fn subscribe(&self, metric: HouseholdMetric, callback: HouseholdCallback) -> SubscriptionId {
        let (id, inserted) = self
            .subscribers
            .write()
            .entry(metric)
            .or_default()
            .insert(self.ids.next_id(), callback);
        if inserted {
            tracing::debug!(%metric, %id, "Household subscriber added");
        }
        id
    }

    /// Unregisters a callback. Unknown IDs are ignored.
    ///
    /// Returns `true` if the callback was found and removed.
    pub fn unsubscribe(&self, metric: HouseholdMetric, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let Some(set) = subscribers.get_mut(&metric) else {
            return false;
        };
        let removed = set.remove(id);
        if set.is_empty() {
            subscribers.remove(&metric);
        }
        removed
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().values().map(CallbackSet::len).sum()
    }

    /// Processes any household input, dispatching on the event type.
    ///
    /// # Errors
    ///
    /// Returns [`HouseholdError::UnsupportedEvent`] for event types other
    /// than `average_power` and `summation_energy`, and the errors of the
    /// specific handlers otherwise.
    pub async fn process(&self, msg: &Message) -> Result<(), HouseholdError> {
        match msg.event() {
            EventKind::AveragePower => self.process_average_power(msg).await,
            EventKind::SummationEnergy => self.process_summation_energy(msg).await,
            other => Err(HouseholdError::UnsupportedEvent(other.to_string())),
        }
    }

    /// Updates the instantaneous flows from an `average_power` reading.
    ///
    /// Readings from devices that are neither mains nor solar, and readings
    /// without a `watts` field, leave the household unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the message has no device identifier or `watts`
    /// is not a number.
    pub async fn process_average_power(&self, msg: &Message) -> Result<(), HouseholdError> {
        let device = msg.mac().ok_or_else(|| HouseholdError::MissingDevice {
            event: msg.event().to_string(),
        })?;
        let Some(watts) = read_number(msg, WATTS_KEY)? else {
            return Ok(());
        };
        let Some(source) = Source::from_role(msg.role().as_ref()) else {
            tracing::trace!(mac = %device, "Reading outside household balance");
            return Ok(());
        };

        let updates = self.state.lock().apply_power(device, source, watts);
        self.publish(updates, None).await;
        Ok(())
    }

    /// Updates the cumulative energy counters from a `summation_energy`
    /// reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the message has no device identifier, or if
    /// `summation_joules` or `summation_resettime_utc` is not a number.
    pub async fn process_summation_energy(&self, msg: &Message) -> Result<(), HouseholdError> {
        let device = msg.mac().ok_or_else(|| HouseholdError::MissingDevice {
            event: msg.event().to_string(),
        })?;
        let Some(joules) = read_number(msg, SUMMATION_JOULES_KEY)? else {
            return Ok(());
        };
        let reset_epoch = match msg.get(RESET_TIME_KEY) {
            None => None,
            Some(raw) => Some(msg.reset_epoch().ok_or_else(|| HouseholdError::InvalidField {
                field: RESET_TIME_KEY.to_string(),
                found: raw.to_string(),
            })?),
        };
        let Some(source) = Source::from_role(msg.role().as_ref()) else {
            tracing::trace!(mac = %device, "Counter outside household balance");
            return Ok(());
        };

        let (updates, household_reset) = {
            let mut state = self.state.lock();
            let updates = state.apply_energy(device, source, joules, reset_epoch);
            (updates, state.reset_epoch())
        };
        self.publish(updates, household_reset).await;
        Ok(())
    }

    /// Returns a copy of the current household view.
    #[must_use]
    pub fn snapshot(&self) -> HouseholdSnapshot {
        self.state.lock().snapshot()
    }

    /// Sends one synthesized message per updated metric to its subscribers.
    async fn publish(&self, updates: Vec<(HouseholdMetric, f64)>, reset_epoch: Option<i64>) {
        for (metric, value) in updates {
            let callbacks = match self.subscribers.read().get(&metric) {
                Some(set) => set.snapshot(),
                None => continue,
            };

            let mut msg = Message::new(EventKind::from(metric.as_str()))
                .with_field(metric.payload_key(), value);
            if metric.is_energy()
                && let Some(epoch) = reset_epoch
            {
                msg = msg.with_field(RESET_TIME_KEY, epoch);
            }
            let msg = Arc::new(msg);

            for callback in callbacks {
                if !isolate(|| callback(metric, Arc::clone(&msg))).await {
                    tracing::warn!(%metric, "Household callback panicked");
                }
            }
        }
    }
}

impl Default for HouseholdAggregator {
    fn default() -> Self {
        Self::new(HouseholdConfig::default())
    }
}

impl std::fmt::Debug for HouseholdAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HouseholdAggregator")
            .field("subscriber_count", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// Reads an optional numeric field. A present non-numeric value is an error.
fn read_number(msg: &Message, key: &str) -> Result<Option<f64>, HouseholdError> {
    match msg.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| HouseholdError::InvalidField {
                field: key.to_string(),
                found: value.to_string(),
            }),
    }
}
