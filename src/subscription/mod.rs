// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription bookkeeping shared by the router and the household view.
//!
//! # Overview
//!
//! - [`SubscriptionId`] - Token returned by every subscribe call
//! - [`CallbackSet`] - Callbacks for one key, deduplicated by `Arc` identity
//! - [`SubscriptionTable`] - Device → event type → [`CallbackSet`]
//!
//! Callbacks are async: each returns a boxed future that the router awaits
//! before invoking the next one, so callbacks for one message run in
//! registration order and never overlap.
//!
//! # Usage
//!
//! ```
//! use powersensor_router::subscription::device_callback;
//!
//! let callback = device_callback(|msg| async move {
//!     println!("{:?} from {:?}", msg.event(), msg.mac());
//! });
//! # let _ = callback;
//! ```

mod callback;
mod table;

pub(crate) use callback::{IdGenerator, isolate};
pub use callback::{
    CallbackSet, DeviceCallback, DeviceCallbackFn, FoundCallback, FoundCallbackFn,
    HouseholdCallback, HouseholdCallbackFn, SubscriptionId, device_callback, found_callback,
    household_callback,
};
pub use table::{Inserted, Removed, SubscriptionTable};
