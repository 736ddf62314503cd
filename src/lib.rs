// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Powersensor Router - event routing for local Powersensor devices.
//!
//! This library sits between a local device scanner and a home-automation
//! front end. It routes the scanner's messages to per-device sensors and
//! folds power and energy readings into a virtual household view.
//!
//! # Supported Features
//!
//! - **Discovery**: Devices found before a consumer is ready are replayed to it
//! - **Availability**: Loaded entities follow `device_found` / `device_lost`
//! - **Lazy streams**: A device's telemetry stream is open only while someone listens
//! - **Household view**: Home usage, grid import/export and solar generation
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use powersensor_router::error::TransportError;
//! use powersensor_router::household::HouseholdMetric;
//! use powersensor_router::message::DeviceId;
//! use powersensor_router::subscription::household_callback;
//! use powersensor_router::transport::{MessageSink, Transport};
//! use powersensor_router::{EventRouter, SensorPlatform};
//!
//! struct Scanner;
//!
//! impl Transport for Scanner {
//!     async fn start(&self, _sink: MessageSink) -> Result<usize, TransportError> {
//!         // Hand the sink to the UDP listener here
//!         Ok(0)
//!     }
//!     async fn stop(&self) -> Result<(), TransportError> {
//!         Ok(())
//!     }
//!     fn subscribe(&self, _device: &DeviceId) {}
//!     fn unsubscribe(&self, _device: &DeviceId) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> powersensor_router::Result<()> {
//!     let router = Arc::new(EventRouter::new(Scanner));
//!     router.start().await?;
//!
//!     // Sensors for every discovered device, plus the household view
//!     let platform = SensorPlatform::setup(Arc::clone(&router)).await;
//!
//!     router.household().subscribe(
//!         HouseholdMetric::HomeUsage,
//!         household_callback(|_metric, msg| async move {
//!             println!("home usage: {:?} W", msg.number("watts"));
//!         }),
//!     );
//!
//!     // ... run until shutdown
//!     platform.unload().await;
//!     router.stop().await
//! }
//! ```

pub mod error;
pub mod household;
pub mod message;
pub mod router;
pub mod sensor;
pub mod subscription;
pub mod transport;

pub use error::{Error, HouseholdError, MessageError, Result, TransportError};
pub use household::{HouseholdAggregator, HouseholdConfig, HouseholdMetric, SolarMode};
pub use message::{DeviceId, EventKind, Message, Role};
pub use router::{Entity, EventRouter, RouterConfig};
pub use sensor::SensorPlatform;
pub use subscription::SubscriptionId;
pub use transport::{Transport, has_devices};
