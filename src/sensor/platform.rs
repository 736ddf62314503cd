// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor platform: creates sensors as devices are discovered.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::message::{DeviceId, Message};
use crate::router::EventRouter;
use crate::subscription::found_callback;
use crate::transport::Transport;

use super::description::{HOUSEHOLD_DESCRIPTIONS, descriptions_for};
use super::device_sensor::DeviceSensor;
use super::household_sensor::HouseholdSensor;

/// Owns the sensors created for one router.
///
/// On setup the platform registers itself as the router's discovery
/// handler, so every supported device that is online and not yet loaded
/// gets one [`DeviceSensor`] per description of its type. The household
/// sensors are created once.
///
/// # Examples
///
/// ```no_run
/// # use powersensor_router::transport::{MessageSink, Transport};
/// # use powersensor_router::error::TransportError;
/// # use powersensor_router::message::DeviceId;
/// # struct Scanner;
/// # impl Transport for Scanner {
/// #     async fn start(&self, _: MessageSink) -> Result<usize, TransportError> { Ok(0) }
/// #     async fn stop(&self) -> Result<(), TransportError> { Ok(()) }
/// #     fn subscribe(&self, _: &DeviceId) {}
/// #     fn unsubscribe(&self, _: &DeviceId) {}
/// # }
/// use std::sync::Arc;
/// use powersensor_router::router::EventRouter;
/// use powersensor_router::sensor::SensorPlatform;
///
/// # async fn example() -> powersensor_router::Result<()> {
/// let router = Arc::new(EventRouter::new(Scanner));
/// router.start().await?;
/// let platform = SensorPlatform::setup(Arc::clone(&router)).await;
///
/// for sensor in platform.household_sensors() {
///     println!("{}: {:?}", sensor.unique_id(), sensor.state().value);
/// }
///
/// platform.unload().await;
/// router.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct SensorPlatform<T: Transport> {
    router: Arc<EventRouter<T>>,
    devices: Mutex<Vec<Arc<DeviceSensor<T>>>>,
    household: Mutex<Vec<Arc<HouseholdSensor<T>>>>,
}

impl<T: Transport> SensorPlatform<T> {
    /// Creates the platform, replays discovered devices and adds the
    /// household sensors.
    pub async fn setup(router: Arc<EventRouter<T>>) -> Arc<Self> {
        let platform = Arc::new(Self {
            router: Arc::clone(&router),
            devices: Mutex::new(Vec::new()),
            household: Mutex::new(Vec::new()),
        });

        let weak: Weak<Self> = Arc::downgrade(&platform);
        router
            .set_found_callback(Some(found_callback(move |mac, msg| {
                let platform = weak.upgrade();
                async move {
                    if let Some(platform) = platform {
                        platform.add_found(&mac, &msg);
                    }
                }
            })))
            .await;

        platform.add_household();
        platform
    }

    /// Stops discovery and detaches every sensor.
    pub async fn unload(&self) {
        self.router.set_found_callback(None).await;

        let devices = std::mem::take(&mut *self.devices.lock());
        for sensor in &devices {
            sensor.detach();
        }
        let household = std::mem::take(&mut *self.household.lock());
        for sensor in &household {
            sensor.detach();
        }
        tracing::debug!(
            devices = devices.len(),
            household = household.len(),
            "Sensor platform unloaded"
        );
    }

    /// Returns the sensors created for physical devices.
    #[must_use]
    pub fn device_sensors(&self) -> Vec<Arc<DeviceSensor<T>>> {
        self.devices.lock().clone()
    }

    /// Returns the household sensors.
    #[must_use]
    pub fn household_sensors(&self) -> Vec<Arc<HouseholdSensor<T>>> {
        self.household.lock().clone()
    }

    fn add_found(&self, mac: &DeviceId, msg: &Message) {
        let Some(device_type) = msg.device_type() else {
            tracing::warn!(mac = %mac, "Discovered device has no type");
            return;
        };
        let Some(descriptions) = descriptions_for(device_type) else {
            tracing::debug!(mac = %mac, device_type, "Unsupported device type");
            return;
        };

        let sensors: Vec<_> = descriptions
            .iter()
            .map(|desc| DeviceSensor::new(Arc::clone(&self.router), mac.clone(), device_type, desc))
            .collect();
        for sensor in &sensors {
            sensor.attach();
        }

        tracing::info!(mac = %mac, device_type, count = sensors.len(), "Added device sensors");
        self.devices.lock().extend(sensors);
    }

    fn add_household(&self) {
        let sensors: Vec<_> = HOUSEHOLD_DESCRIPTIONS
            .iter()
            .filter_map(|desc| HouseholdSensor::new(Arc::clone(&self.router), desc))
            .collect();
        for sensor in &sensors {
            sensor.attach();
        }
        self.household.lock().extend(sensors);
    }
}

impl<T: Transport> std::fmt::Debug for SensorPlatform<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorPlatform")
            .field("devices", &self.devices.lock().len())
            .field("household", &self.household.lock().len())
            .finish_non_exhaustive()
    }
}
