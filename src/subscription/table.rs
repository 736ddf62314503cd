// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device, per-event subscription table.

use std::collections::HashMap;

use crate::message::{DeviceId, EventKind};

use super::callback::{CallbackSet, DeviceCallback, DeviceCallbackFn, SubscriptionId};

/// Result of adding a callback to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inserted {
    /// The ID the callback is registered under.
    pub id: SubscriptionId,
    /// `true` if the device had no callbacks before this insertion.
    pub first_for_device: bool,
}

/// Result of removing a callback from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removed {
    /// `true` if the callback was present.
    pub found: bool,
    /// `true` if the device has no callbacks left.
    pub last_for_device: bool,
}

/// Maps device → event type → callbacks.
///
/// A device key exists only while at least one of its event types has a
/// callback, and an event key exists only while it has a callback. The
/// insert/remove results report the device-level transitions so the
/// caller can drive the scanner's per-device stream.
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    devices: HashMap<DeviceId, HashMap<EventKind, CallbackSet<DeviceCallbackFn>>>,
}

impl SubscriptionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback for `(device, event)`.
    pub fn insert(
        &mut self,
        device: DeviceId,
        event: EventKind,
        id: SubscriptionId,
        callback: DeviceCallback,
    ) -> Inserted {
        let first_for_device = !self.devices.contains_key(&device);
        let (id, _) = self
            .devices
            .entry(device)
            .or_default()
            .entry(event)
            .or_default()
            .insert(id, callback);

        Inserted {
            id,
            first_for_device,
        }
    }

    /// Removes a callback for `(device, event)`, pruning empty entries.
    pub fn remove(&mut self, device: &DeviceId, event: &EventKind, id: SubscriptionId) -> Removed {
        let Some(events) = self.devices.get_mut(device) else {
            return Removed {
                found: false,
                last_for_device: false,
            };
        };

        let found = match events.get_mut(event) {
            Some(set) => {
                let found = set.remove(id);
                if set.is_empty() {
                    events.remove(event);
                }
                found
            }
            None => false,
        };

        let last_for_device = found && events.is_empty();
        if last_for_device {
            self.devices.remove(device);
        }

        Removed {
            found,
            last_for_device,
        }
    }

    /// Returns the callbacks for `(device, event)` in registration order.
    #[must_use]
    pub fn callbacks(&self, device: &DeviceId, event: &EventKind) -> Vec<DeviceCallback> {
        self.devices
            .get(device)
            .and_then(|events| events.get(event))
            .map(CallbackSet::snapshot)
            .unwrap_or_default()
    }

    /// Returns `true` if the device has at least one callback.
    #[must_use]
    pub fn contains_device(&self, device: &DeviceId) -> bool {
        self.devices.contains_key(device)
    }

    /// Returns the devices that currently have callbacks.
    #[must_use]
    pub fn devices(&self) -> Vec<DeviceId> {
        self.devices.keys().cloned().collect()
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.devices
            .values()
            .flat_map(HashMap::values)
            .map(CallbackSet::len)
            .sum()
    }

    /// Returns `true` if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
