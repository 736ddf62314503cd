// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback handles and the deduplicating set that stores them.
//!
//! - [`SubscriptionId`] - Token returned on subscribe, used to unsubscribe
//! - [`CallbackSet`] - Ordered set of callbacks deduplicated by identity

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::household::HouseholdMetric;
use crate::message::{DeviceId, Message};

/// Unique identifier for a subscription.
///
/// This ID is returned when registering a callback and is the handle used
/// to unregister it. IDs are unique within one router's lifetime.
///
/// # Examples
///
/// ```ignore
/// let sub_id = router.subscribe("AA:BB".into(), EventKind::AveragePower, callback);
///
/// // Later, unsubscribe
/// router.unsubscribe(&"AA:BB".into(), &EventKind::AveragePower, sub_id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Source of [`SubscriptionId`]s.
#[derive(Debug)]
pub(crate) struct IdGenerator(AtomicU64);

impl IdGenerator {
    pub(crate) fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub(crate) fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// Signature of a device telemetry callback.
pub type DeviceCallbackFn = dyn Fn(Arc<Message>) -> BoxFuture<'static, ()> + Send + Sync;

/// Signature of a household metric callback.
pub type HouseholdCallbackFn =
    dyn Fn(HouseholdMetric, Arc<Message>) -> BoxFuture<'static, ()> + Send + Sync;

/// Signature of a discovery callback.
pub type FoundCallbackFn = dyn Fn(DeviceId, Arc<Message>) -> BoxFuture<'static, ()> + Send + Sync;

/// Callback invoked with device telemetry.
pub type DeviceCallback = Arc<DeviceCallbackFn>;

/// Callback invoked with a synthesized household message and its metric.
pub type HouseholdCallback = Arc<HouseholdCallbackFn>;

/// Callback invoked once per newly discovered, not yet loaded device.
pub type FoundCallback = Arc<FoundCallbackFn>;

/// Wraps an async closure as a [`DeviceCallback`].
pub fn device_callback<F, Fut>(callback: F) -> DeviceCallback
where
    F: Fn(Arc<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |msg| callback(msg).boxed())
}

/// Wraps an async closure as a [`HouseholdCallback`].
pub fn household_callback<F, Fut>(callback: F) -> HouseholdCallback
where
    F: Fn(HouseholdMetric, Arc<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |metric, msg| callback(metric, msg).boxed())
}

/// Wraps an async closure as a [`FoundCallback`].
pub fn found_callback<F, Fut>(callback: F) -> FoundCallback
where
    F: Fn(DeviceId, Arc<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |mac, msg| callback(mac, msg).boxed())
}

/// Runs one callback invocation, containing any panic it raises.
///
/// The call itself happens inside the guarded future, so a callback that
/// panics before returning its future is caught as well. Returns `false`
/// if the callback panicked.
pub(crate) async fn isolate<C, Fut>(call: C) -> bool
where
    C: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    AssertUnwindSafe(async move { call().await })
        .catch_unwind()
        .await
        .is_ok()
}

/// Ordered set of callbacks, deduplicated by `Arc` identity.
///
/// Registering the same `Arc` twice keeps one entry and hands back the
/// original [`SubscriptionId`].
pub struct CallbackSet<F: ?Sized> {
    entries: Vec<(SubscriptionId, Arc<F>)>,
}

impl<F: ?Sized> CallbackSet<F> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a callback unless the same `Arc` is already present.
    ///
    /// Returns the ID the callback is registered under and whether it was
    /// newly inserted.
    pub fn insert(&mut self, id: SubscriptionId, callback: Arc<F>) -> (SubscriptionId, bool) {
        if let Some((existing, _)) = self
            .entries
            .iter()
            .find(|(_, cb)| Arc::ptr_eq(cb, &callback))
        {
            return (*existing, false);
        }
        self.entries.push((id, callback));
        (id, true)
    }

    /// Removes a callback by ID. Returns `true` if it was present.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Returns clones of the callbacks in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }

    /// Returns `true` if the ID is registered here.
    #[must_use]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    /// Returns the number of callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F: ?Sized> Default for CallbackSet<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for CallbackSet<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSet")
            .field("ids", &self.entries.iter().map(|(id, _)| *id).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    type Plain = dyn Fn() + Send + Sync;

    #[tokio::test]
    async fn isolate_contains_panics() {
        let callback = device_callback(|msg| async move {
            assert!(msg.mac().is_some(), "no device");
        });
        let msg = Arc::new(Message::new(crate::message::EventKind::AveragePower));

        assert!(!isolate(|| callback(Arc::clone(&msg))).await);
        assert!(isolate(|| callback(Arc::new(msg.as_ref().clone().with_mac("AA")))).await);
    }

    #[tokio::test]
    async fn isolate_catches_panic_before_future() {
        let callback: DeviceCallback =
            Arc::new(|_msg: Arc<Message>| -> BoxFuture<'static, ()> { panic!("eager") });
        let msg = Arc::new(Message::new(crate::message::EventKind::AveragePower));
        assert!(!isolate(|| callback(msg)).await);
    }

    #[test]
    fn subscription_id_display() {
        let id = SubscriptionId::new(42);
        assert_eq!(id.to_string(), "Sub(42)");
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn generator_yields_unique_ids() {
        let ids = IdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn insert_deduplicates_by_identity() {
        let ids = IdGenerator::new();
        let mut set: CallbackSet<Plain> = CallbackSet::new();
        let cb: Arc<Plain> = Arc::new(|| {});

        let (first, inserted) = set.insert(ids.next_id(), Arc::clone(&cb));
        assert!(inserted);
        let (second, inserted) = set.insert(ids.next_id(), Arc::clone(&cb));
        assert!(!inserted);
        assert_eq!(first, second);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn distinct_closures_are_kept_apart() {
        let ids = IdGenerator::new();
        let mut set: CallbackSet<Plain> = CallbackSet::new();
        set.insert(ids.next_id(), Arc::new(|| {}));
        set.insert(ids.next_id(), Arc::new(|| {}));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_unknown_id_is_noop() {
        let ids = IdGenerator::new();
        let mut set: CallbackSet<Plain> = CallbackSet::new();
        set.insert(ids.next_id(), Arc::new(|| {}));

        assert!(!set.remove(SubscriptionId::new(999)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let ids = IdGenerator::new();
        let mut set: CallbackSet<Plain> = CallbackSet::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for n in 0..3 {
            let order = Arc::clone(&order);
            set.insert(ids.next_id(), Arc::new(move || order.lock().push(n)));
        }
        for cb in set.snapshot() {
            cb();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn device_callback_wraps_async_closure() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        let cb = device_callback(move |_msg| {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        cb(Arc::new(Message::new(crate::message::EventKind::AveragePower))).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
