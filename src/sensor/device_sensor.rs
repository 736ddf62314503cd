// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor bound to one physical device.

use std::future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::household::clamp_solar;
use crate::message::{DeviceId, Message, VOLTS_KEY};
use crate::router::{Entity, EventRouter};
use crate::subscription::{SubscriptionId, device_callback};
use crate::transport::Transport;

use super::description::SensorDescription;
use super::state::{DeviceInfo, SensorState};

/// Shows one payload field of one device's telemetry.
///
/// While attached the sensor is subscribed to its event type and loaded
/// in the router, so it follows the device's availability.
pub struct DeviceSensor<T: Transport> {
    router: Arc<EventRouter<T>>,
    mac: DeviceId,
    description: &'static SensorDescription,
    info: DeviceInfo,
    unique_id: String,
    state: watch::Sender<SensorState>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl<T: Transport> DeviceSensor<T> {
    /// Creates a detached sensor.
    #[must_use]
    pub fn new(
        router: Arc<EventRouter<T>>,
        mac: DeviceId,
        device_type: &str,
        description: &'static SensorDescription,
    ) -> Arc<Self> {
        let unique_id = format!("{}_{}_{}", mac.formatted(), description.event, description.key);
        let (state, _) = watch::channel(SensorState::new());
        Arc::new(Self {
            info: DeviceInfo::for_device(&mac, device_type),
            router,
            mac,
            description,
            unique_id,
            state,
            subscription: Mutex::new(None),
        })
    }

    /// Subscribes to the device's telemetry and registers as loaded.
    ///
    /// Attaching an attached sensor does nothing.
    pub fn attach(self: &Arc<Self>) {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return;
        }

        let sensor = Arc::downgrade(self);
        let callback = device_callback(move |msg| {
            if let Some(sensor) = sensor.upgrade() {
                sensor.on_message(&msg);
            }
            future::ready(())
        });
        *subscription = Some(self.router.subscribe(
            self.mac.clone(),
            self.description.event_kind(),
            callback,
        ));

        let entity = Arc::clone(self) as Arc<dyn Entity>;
        self.router.mark_loaded(self.mac.clone(), entity);
    }

    /// Unsubscribes and registers as unloaded.
    pub fn detach(self: &Arc<Self>) {
        let Some(id) = self.subscription.lock().take() else {
            return;
        };
        self.router
            .unsubscribe(&self.mac, &self.description.event_kind(), id);

        let entity = Arc::clone(self) as Arc<dyn Entity>;
        self.router.mark_unloaded(&self.mac, &entity);
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

    /// Returns the stable unique identifier.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Returns the device this sensor belongs to.
    #[must_use]
    pub fn mac(&self) -> &DeviceId {
        &self.mac
    }

    /// Returns the device metadata.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Returns the static description.
    #[must_use]
    pub fn description(&self) -> &'static SensorDescription {
        self.description
    }

    fn on_message(&self, msg: &Message) {
        let key = self.description.key;
        let Some(raw) = msg.get(key) else {
            return;
        };
        let Some(mut value) = raw.as_f64() else {
            tracing::debug!(mac = %self.mac, key, %raw, "Ignoring non-numeric reading");
            return;
        };

        // Solar sensors count generation as negative flow
        if key != VOLTS_KEY && msg.role().is_some_and(|role| role.is_solar()) {
            value = clamp_solar(value);
        }

        let formatted = self.description.formatter.apply(value);
        let last_reset = msg.reset_time();
        self.state.send_modify(|state| state.record(formatted, last_reset));
    }
}

impl<T: Transport> Entity for DeviceSensor<T> {
    fn set_available(&self, available: bool) {
        tracing::debug!(unique_id = %self.unique_id, available, "Availability changed");
        self.state.send_modify(|state| state.available = available);
    }
}

impl<T: Transport> std::fmt::Debug for DeviceSensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSensor")
            .field("unique_id", &self.unique_id)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}
