// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor bound to one household metric.

use std::future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::household::HouseholdMetric;
use crate::message::Message;
use crate::router::EventRouter;
use crate::subscription::{SubscriptionId, household_callback};
use crate::transport::Transport;

use super::description::SensorDescription;
use super::state::{DeviceInfo, SensorState};

/// Shows one metric of the virtual household view. Always available.
pub struct HouseholdSensor<T: Transport> {
    router: Arc<EventRouter<T>>,
    metric: HouseholdMetric,
    description: &'static SensorDescription,
    unique_id: String,
    state: watch::Sender<SensorState>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl<T: Transport> HouseholdSensor<T> {
    /// Creates a detached sensor.
    ///
    /// Returns `None` if the description does not name a household metric.
    #[must_use]
    pub fn new(
        router: Arc<EventRouter<T>>,
        description: &'static SensorDescription,
    ) -> Option<Arc<Self>> {
        let metric = HouseholdMetric::from_name(description.event)?;
        let (state, _) = watch::channel(SensorState::new());
        Some(Arc::new(Self {
            router,
            metric,
            description,
            unique_id: format!("PsVHH{}/{}", description.event, description.key),
            state,
            subscription: Mutex::new(None),
        }))
    }

    /// Subscribes to the household metric. Attaching twice does nothing.
    pub fn attach(self: &Arc<Self>) {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return;
        }

        let sensor = Arc::downgrade(self);
        let callback = household_callback(move |_metric, msg| {
            if let Some(sensor) = sensor.upgrade() {
                sensor.on_message(&msg);
            }
            future::ready(())
        });
        *subscription = Some(self.router.household().subscribe(self.metric, callback));
    }

    /// Unsubscribes from the household metric.
    pub fn detach(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.router.household().unsubscribe(self.metric, id);
        }
    }

    /// Returns `true` while attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Returns a receiver for state updates.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SensorState> {
        self.state.subscribe()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SensorState {
        self.state.borrow().clone()
    }

    /// Returns the metric shown.
    #[must_use]
    pub fn metric(&self) -> HouseholdMetric {
        self.metric
    }

    /// Returns the stable unique identifier.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Returns the virtual household device metadata.
    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::household()
    }

    /// Returns the static description.
    #[must_use]
    pub fn description(&self) -> &'static SensorDescription {
        self.description
    }

    fn on_message(&self, msg: &Message) {
        let Some(value) = msg.number(self.description.key) else {
            return;
        };
        let formatted = self.description.formatter.apply(value);
        let last_reset = msg.reset_time();
        self.state.send_modify(|state| state.record(formatted, last_reset));
    }
}

impl<T: Transport> std::fmt::Debug for HouseholdSensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HouseholdSensor")
            .field("unique_id", &self.unique_id)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}
