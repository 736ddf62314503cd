// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Found and loaded device bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::message::{DeviceId, Message};

/// A presentation-layer object bound to a device.
///
/// The router toggles availability when the device comes and goes.
pub trait Entity: Send + Sync {
    /// Marks the entity available or unavailable.
    fn set_available(&self, available: bool);
}

/// Tracks which devices are online and which have entities.
///
/// The two axes are independent: a device can be found without entities,
/// loaded while offline, both, or neither. Found devices keep their
/// discovery order.
#[derive(Default)]
pub struct DeviceDirectory {
    found: IndexMap<DeviceId, Arc<Message>>,
    loaded: HashMap<DeviceId, Vec<Arc<dyn Entity>>>,
}

impl DeviceDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest discovery message for a device.
    ///
    /// A device that is found again keeps its original position.
    pub fn record_found(&mut self, device: DeviceId, msg: Arc<Message>) {
        self.found.insert(device, msg);
    }

    /// Forgets a device's discovery record. Returns `true` if it was found.
    pub fn record_lost(&mut self, device: &DeviceId) -> bool {
        self.found.shift_remove(device).is_some()
    }

    /// Appends an entity to the device's loaded collection.
    ///
    /// Entities are not deduplicated.
    pub fn mark_loaded(&mut self, device: DeviceId, entity: Arc<dyn Entity>) {
        self.loaded.entry(device).or_default().push(entity);
    }

    /// Removes an entity by identity, dropping the collection once empty.
    ///
    /// Returns `true` if the entity was loaded for this device.
    pub fn mark_unloaded(&mut self, device: &DeviceId, entity: &Arc<dyn Entity>) -> bool {
        let Some(entities) = self.loaded.get_mut(device) else {
            return false;
        };
        let Some(pos) = entities.iter().position(|e| Arc::ptr_eq(e, entity)) else {
            return false;
        };

        entities.remove(pos);
        if entities.is_empty() {
            self.loaded.remove(device);
        }
        true
    }

    /// Returns clones of the entities loaded for a device.
    #[must_use]
    pub fn entities(&self, device: &DeviceId) -> Vec<Arc<dyn Entity>> {
        self.loaded.get(device).cloned().unwrap_or_default()
    }

    /// Returns found devices that have no entities, in discovery order.
    #[must_use]
    pub fn unloaded_found(&self) -> Vec<(DeviceId, Arc<Message>)> {
        self.found
            .iter()
            .filter(|(device, _)| !self.loaded.contains_key(*device))
            .map(|(device, msg)| (device.clone(), Arc::clone(msg)))
            .collect()
    }

    /// Returns `true` if the device is currently online.
    #[must_use]
    pub fn is_found(&self, device: &DeviceId) -> bool {
        self.found.contains_key(device)
    }

    /// Returns `true` if the device has at least one entity.
    #[must_use]
    pub fn is_loaded(&self, device: &DeviceId) -> bool {
        self.loaded.contains_key(device)
    }

    /// Returns the online devices in discovery order.
    #[must_use]
    pub fn found_devices(&self) -> Vec<DeviceId> {
        self.found.keys().cloned().collect()
    }

    /// Returns the number of entities loaded for a device.
    #[must_use]
    pub fn entity_count(&self, device: &DeviceId) -> usize {
        self.loaded.get(device).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for DeviceDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceDirectory")
            .field("found", &self.found.keys().collect::<Vec<_>>())
            .field("loaded", &self.loaded.keys().collect::<Vec<_>>())
            .finish()
    }
}
