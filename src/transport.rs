// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device scanner transport.
//!
//! The scanner itself (UDP discovery, per-device streams, protocol
//! decoding) lives outside this crate. It is plugged in through the
//! [`Transport`] trait and delivers parsed [`Message`]s into a channel.

use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::message::{DeviceId, Message};

/// Channel the transport pushes parsed messages into.
pub type MessageSink = mpsc::UnboundedSender<Message>;

/// A local device scanner.
///
/// Implementations must not call back into the router from
/// [`subscribe`](Self::subscribe) or [`unsubscribe`](Self::unsubscribe);
/// the router invokes them while holding its subscription table.
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync + 'static {
    /// Starts scanning and delivering messages into `sink`.
    ///
    /// Returns the number of devices already known to the scanner.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the scanner cannot start.
    async fn start(&self, sink: MessageSink) -> Result<usize, TransportError>;

    /// Stops scanning. Messages already queued may still be delivered.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the scanner cannot be shut down.
    async fn stop(&self) -> Result<(), TransportError>;

    /// Opens the per-device telemetry stream.
    fn subscribe(&self, device: &DeviceId);

    /// Closes the per-device telemetry stream.
    fn unsubscribe(&self, device: &DeviceId);
}

/// Checks whether any device can be discovered.
///
/// Starts the scanner with a sink that is dropped straight away, stops it
/// again, and reports whether the scanner knew of at least one device.
///
/// # Errors
///
/// Returns `TransportError` if the scanner fails to start or stop.
pub async fn has_devices<T: Transport>(transport: &T) -> Result<bool, TransportError> {
    let (sink, discard) = mpsc::unbounded_channel();
    drop(discard);

    let count = transport.start(sink).await?;
    transport.stop().await?;

    tracing::debug!(count, "Discovery probe finished");
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedScanner {
        devices: usize,
        stops: AtomicUsize,
    }

    impl Transport for FixedScanner {
        async fn start(&self, _sink: MessageSink) -> Result<usize, TransportError> {
            Ok(self.devices)
        }

        async fn stop(&self) -> Result<(), TransportError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn subscribe(&self, _device: &DeviceId) {}

        fn unsubscribe(&self, _device: &DeviceId) {}
    }

    struct BrokenScanner;

    impl Transport for BrokenScanner {
        async fn start(&self, _sink: MessageSink) -> Result<usize, TransportError> {
            Err(TransportError::StartFailed("port 49476 in use".to_string()))
        }

        async fn stop(&self) -> Result<(), TransportError> {
            Ok(())
        }

        fn subscribe(&self, _device: &DeviceId) {}

        fn unsubscribe(&self, _device: &DeviceId) {}
    }

    #[tokio::test]
    async fn probe_reports_devices() {
        let scanner = FixedScanner {
            devices: 3,
            stops: AtomicUsize::new(0),
        };
        assert!(has_devices(&scanner).await.unwrap());
        assert_eq!(scanner.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn probe_reports_empty_network() {
        let scanner = FixedScanner {
            devices: 0,
            stops: AtomicUsize::new(0),
        };
        assert!(!has_devices(&scanner).await.unwrap());
    }

    #[tokio::test]
    async fn probe_propagates_start_failure() {
        let err = has_devices(&BrokenScanner).await.unwrap_err();
        assert!(matches!(err, TransportError::StartFailed(_)));
    }
}
