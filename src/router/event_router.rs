// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The router: single entry point for scanner messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::household::HouseholdAggregator;
use crate::message::{DeviceId, EventKind, Message};
use crate::subscription::{
    DeviceCallback, FoundCallback, IdGenerator, SubscriptionId, SubscriptionTable, isolate,
};
use crate::transport::Transport;

use super::config::RouterConfig;
use super::directory::{DeviceDirectory, Entity};
use super::discovery::DiscoveryNotifier;

/// Routes scanner messages to device entities and the household view.
///
/// The router owns the subscription table, the found/loaded device
/// directory, the discovery handler and the household aggregator. Messages
/// from the transport are handled one at a time, in arrival order, on a
/// single task: every callback for one message finishes before the next
/// message is looked at. A callback that panics is logged and skipped; it
/// does not stop delivery to other callbacks or later messages.
///
/// Telemetry for a device is only streamed by the scanner while at least
/// one callback is subscribed for that device. The router opens the stream
/// on the first subscription and closes it when the last one goes away.
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
/// use powersensor_router::message::EventKind;
/// use powersensor_router::router::EventRouter;
/// use powersensor_router::subscription::device_callback;
///
/// # async fn example() -> powersensor_router::Result<()> {
/// let router = EventRouter::new(Scanner);
/// let known = router.start().await?;
/// println!("{known} devices on the network");
///
/// router.subscribe(
///     "AA:BB:CC:DD:EE:FF",
///     EventKind::AveragePower,
///     device_callback(|msg| async move {
///         println!("power: {:?}", msg.number("watts"));
///     }),
/// );
///
/// router.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct EventRouter<T: Transport> {
    transport: T,
    core: Arc<RouterCore>,
    ids: IdGenerator,
    running: AtomicBool,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

/// State shared between the router handle and the message pump.
struct RouterCore {
    subscriptions: Mutex<SubscriptionTable>,
    directory: Mutex<DeviceDirectory>,
    discovery: Mutex<DiscoveryNotifier>,
    household: HouseholdAggregator,
}

impl<T: Transport> EventRouter<T> {
    /// Creates a router with default configuration.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, RouterConfig::default())
    }

    /// Creates a router with the given configuration.
    #[must_use]
    pub fn with_config(transport: T, config: RouterConfig) -> Self {
        Self {
            transport,
            core: Arc::new(RouterCore {
                subscriptions: Mutex::new(SubscriptionTable::new()),
                directory: Mutex::new(DeviceDirectory::new()),
                discovery: Mutex::new(DiscoveryNotifier::new()),
                household: HouseholdAggregator::new(config.household),
            }),
            ids: IdGenerator::new(),
            running: AtomicBool::new(false),
            shutdown: Mutex::new(None),
            pump: Mutex::new(None),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts the transport and begins consuming its messages.
    ///
    /// Returns the number of devices the scanner already knows about. A
    /// router may be restarted after [`stop`](Self::stop); the restart
    /// waits until messages queued before the stop have been handled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if the router was already started,
    /// or [`Error::Transport`] if the scanner fails to start.
    pub async fn start(&self) -> Result<usize> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }

        let previous = self.pump.lock().take();
        if let Some(previous) = previous
            && let Err(e) = previous.await
        {
            tracing::error!(error = %e, "Previous message pump failed");
        }

        let (sink, messages) = mpsc::unbounded_channel();
        let count = match self.transport.start(sink).await {
            Ok(count) => count,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                tracing::error!(error = %e, "Scanner failed to start");
                return Err(e.into());
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown.lock() = Some(shutdown_tx);
        let task = tokio::spawn(pump(Arc::clone(&self.core), messages, shutdown_rx));
        *self.pump.lock() = Some(task);

        tracing::info!(devices = count, "Router started");
        Ok(count)
    }

    /// Stops the transport. Calling this when not running does nothing.
    ///
    /// Messages already queued are still handled; messages the scanner
    /// sends afterwards are dropped. Handling in progress is not cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the scanner fails to stop.
    pub async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let shutdown = self.shutdown.lock().take();
        if let Some(shutdown) = shutdown {
            // The pump may already have exited if the scanner dropped its sink
            let _ = shutdown.send(());
        }

        self.transport.stop().await?;
        tracing::info!("Router stopped");
        Ok(())
    }

    /// Returns `true` between a successful [`start`](Self::start) and
    /// [`stop`](Self::stop).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Handles one inbound message.
    ///
    /// This is what the message pump calls for every message the scanner
    /// delivers. It is public so embedders with their own delivery loop can
    /// drive the router directly.
    pub async fn handle(&self, msg: Message) {
        self.core.handle(msg).await;
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Registers a telemetry callback for `(device, event)`.
    ///
    /// The scanner stream for the device is opened when this is the
    /// device's first callback. Registering the same `Arc` twice for the
    /// same key is a no-op that returns the original ID.
    pub fn subscribe(
        &self,
        device: impl Into<DeviceId>,
        event: EventKind,
        callback: DeviceCallback,
    ) -> SubscriptionId {
        let device = device.into();
        let mut table = self.core.subscriptions.lock();
        let inserted = table.insert(device.clone(), event.clone(), self.ids.next_id(), callback);

        if inserted.first_for_device {
            self.transport.subscribe(&device);
            tracing::debug!(mac = %device, "Opened device stream");
        }
        tracing::trace!(mac = %device, %event, id = %inserted.id, "Callback subscribed");
        inserted.id
    }

    /// Removes a telemetry callback. Unknown keys and IDs are ignored.
    ///
    /// The scanner stream for the device is closed when its last callback
    /// goes away. Returns `true` if the callback was registered.
    pub fn unsubscribe(&self, device: &DeviceId, event: &EventKind, id: SubscriptionId) -> bool {
        let mut table = self.core.subscriptions.lock();
        let removed = table.remove(device, event, id);

        if removed.last_for_device {
            self.transport.unsubscribe(device);
            tracing::debug!(mac = %device, "Closed device stream");
        }
        removed.found
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Records an entity for a device so it follows the device's liveness.
    pub fn mark_loaded(&self, device: impl Into<DeviceId>, entity: Arc<dyn Entity>) {
        let device = device.into();
        tracing::debug!(mac = %device, "Entity loaded");
        self.core.directory.lock().mark_loaded(device, entity);
    }

    /// Forgets an entity. Returns `true` if it was loaded for the device.
    pub fn mark_unloaded(&self, device: &DeviceId, entity: &Arc<dyn Entity>) -> bool {
        let removed = self.core.directory.lock().mark_unloaded(device, entity);
        if removed {
            tracing::debug!(mac = %device, "Entity unloaded");
        }
        removed
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Replaces the handler invoked for newly discovered devices.
    ///
    /// A new handler is immediately called, in discovery order, for every
    /// device that is online but has no entities yet. Passing `None`
    /// disables delivery without replay.
    pub async fn set_found_callback(&self, handler: Option<FoundCallback>) {
        self.core.discovery.lock().replace(handler.clone());
        let Some(handler) = handler else {
            tracing::debug!("Discovery handler cleared");
            return;
        };

        let backlog = self.core.directory.lock().unloaded_found();
        tracing::debug!(count = backlog.len(), "Replaying discovered devices");

        for (device, msg) in backlog {
            // An earlier replay may have loaded this device
            let loaded = self.core.directory.lock().is_loaded(&device);
            if !loaded && !isolate(|| handler(device.clone(), msg)).await {
                tracing::warn!(mac = %device, "Discovery handler panicked");
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the household aggregator fed by this router.
    #[must_use]
    pub fn household(&self) -> &HouseholdAggregator {
        &self.core.household
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns `true` if the device is currently online.
    #[must_use]
    pub fn is_found(&self, device: &DeviceId) -> bool {
        self.core.directory.lock().is_found(device)
    }

    /// Returns `true` if the device has at least one entity.
    #[must_use]
    pub fn is_loaded(&self, device: &DeviceId) -> bool {
        self.core.directory.lock().is_loaded(device)
    }

    /// Returns the online devices in discovery order.
    #[must_use]
    pub fn found_devices(&self) -> Vec<DeviceId> {
        self.core.directory.lock().found_devices()
    }

    /// Returns the devices whose scanner stream is open.
    #[must_use]
    pub fn subscribed_devices(&self) -> Vec<DeviceId> {
        self.core.subscriptions.lock().devices()
    }

    /// Returns the total number of telemetry callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.core.subscriptions.lock().callback_count()
    }
}

impl<T: Transport> std::fmt::Debug for EventRouter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("running", &self.is_running())
            .field("directory", &*self.core.directory.lock())
            .field("callback_count", &self.callback_count())
            .finish_non_exhaustive()
    }
}

impl RouterCore {
    async fn handle(&self, msg: Message) {
        let Some(device) = msg.mac() else {
            tracing::trace!(event = %msg.event(), "Ignoring message without device");
            return;
        };
        let msg = Arc::new(msg);

        match msg.event() {
            EventKind::DeviceFound => self.on_found(device, msg).await,
            EventKind::DeviceLost => self.on_lost(&device),
            _ => self.on_telemetry(&device, msg).await,
        }
    }

    async fn on_found(&self, device: DeviceId, msg: Arc<Message>) {
        let entities = {
            let mut directory = self.directory.lock();
            directory.record_found(device.clone(), Arc::clone(&msg));
            directory.entities(&device)
        };

        if !entities.is_empty() {
            tracing::debug!(mac = %device, entities = entities.len(), "Device back online");
            for entity in entities {
                entity.set_available(true);
            }
            return;
        }

        let handler = self.discovery.lock().handler();
        match handler {
            Some(handler) => {
                tracing::info!(mac = %device, device_type = ?msg.device_type(), "New device found");
                if !isolate(|| handler(device.clone(), msg)).await {
                    tracing::warn!(mac = %device, "Discovery handler panicked");
                }
            }
            None => tracing::debug!(mac = %device, "Device found before discovery handler"),
        }
    }

    fn on_lost(&self, device: &DeviceId) {
        let entities = {
            let mut directory = self.directory.lock();
            directory.record_lost(device);
            directory.entities(device)
        };

        tracing::debug!(mac = %device, entities = entities.len(), "Device lost");
        for entity in entities {
            entity.set_available(false);
        }
    }

    async fn on_telemetry(&self, device: &DeviceId, msg: Arc<Message>) {
        let event = msg.event();
        let callbacks = self.subscriptions.lock().callbacks(device, event);

        for callback in callbacks {
            if !isolate(|| callback(Arc::clone(&msg))).await {
                tracing::warn!(mac = %device, %event, "Device callback panicked");
            }
        }

        if event.is_household_input()
            && let Err(e) = self.household.process(&msg).await
        {
            tracing::warn!(mac = %device, %event, error = %e, "Household update failed");
        }
    }
}

/// Feeds scanner messages into the router until shut down.
///
/// On shutdown the channel is closed so the scanner can send no more, and
/// whatever is already queued is handled before the pump exits.
async fn pump(
    core: Arc<RouterCore>,
    mut messages: mpsc::UnboundedReceiver<Message>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut closing = false;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown, if !closing => {
                messages.close();
                closing = true;
            }
            msg = messages.recv() => match msg {
                Some(msg) => {
                    if !isolate(|| core.handle(msg)).await {
                        tracing::error!("Message handling panicked");
                    }
                }
                None => break,
            },
        }
    }
    tracing::debug!("Message pump finished");
}
