// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message routing.
//!
//! - [`EventRouter`] - Consumes the scanner stream and dispatches messages
//! - [`DeviceDirectory`] - Found and loaded device bookkeeping
//! - [`DiscoveryNotifier`] - Handler for newly discovered devices
//! - [`Entity`] - Availability hook implemented by presentation objects

mod config;
mod directory;
mod discovery;
mod event_router;

pub use config::{RouterConfig, RouterConfigBuilder};
pub use directory::{DeviceDirectory, Entity};
pub use discovery::DiscoveryNotifier;
pub use event_router::EventRouter;
