// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Messages delivered by the device scanner.
//!
//! The scanner emits flat key-value records. Discovery messages
//! (`device_found`, `device_lost`) mark a device online or offline; every
//! other tag carrying a `mac` is per-device telemetry.
//!
//! # Examples
//!
//! ```
//! use powersensor_router::message::{DeviceId, EventKind, Message};
//!
//! let msg = Message::new(EventKind::DeviceFound)
//!     .with_mac("AA:BB")
//!     .with_device_type("plug");
//!
//! assert!(msg.event().is_discovery());
//! assert_eq!(msg.mac(), Some(DeviceId::new("AA:BB")));
//! ```

mod device_id;
mod event_kind;
#[allow(clippy::module_inception)]
mod message;
mod role;

pub use device_id::DeviceId;
pub use event_kind::EventKind;
pub use message::{
    DEVICE_TYPE_KEY, EVENT_KEY, MAC_KEY, Message, RESET_TIME_KEY, ROLE_KEY, SUMMATION_JOULES_KEY,
    VOLTS_KEY, WATTS_KEY,
};
pub use role::Role;
