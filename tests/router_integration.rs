// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the event router using a recording scanner.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use powersensor_router::error::{Error, TransportError};
use powersensor_router::household::{HouseholdMetric, SolarMode};
use powersensor_router::message::{
    DeviceId, EventKind, Message, RESET_TIME_KEY, Role, SUMMATION_JOULES_KEY, WATTS_KEY,
};
use powersensor_router::router::{Entity, EventRouter, RouterConfig};
use powersensor_router::sensor::{SensorPlatform, SensorValue};
use powersensor_router::subscription::{DeviceCallback, device_callback, found_callback};
use powersensor_router::transport::{MessageSink, Transport};

/// Scanner double that records stream control calls.
#[derive(Default)]
struct RecordingScanner {
    calls: Mutex<Vec<String>>,
    sink: Mutex<Option<MessageSink>>,
    fail_start: bool,
}

impl RecordingScanner {
    fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn emit(&self, msg: Message) {
        let sink = self.sink.lock().clone().expect("scanner not started");
        sink.send(msg).expect("router stopped");
    }
}

impl Transport for RecordingScanner {
    async fn start(&self, sink: MessageSink) -> Result<usize, TransportError> {
        if self.fail_start {
            return Err(TransportError::StartFailed("address in use".to_string()));
        }
        *self.sink.lock() = Some(sink);
        Ok(1)
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.sink.lock().take();
        Ok(())
    }

    fn subscribe(&self, device: &DeviceId) {
        self.calls.lock().push(format!("subscribe {device}"));
    }

    fn unsubscribe(&self, device: &DeviceId) {
        self.calls.lock().push(format!("unsubscribe {device}"));
    }
}

/// Entity double that records availability changes.
#[derive(Default)]
struct Probe {
    availability: Mutex<Vec<bool>>,
}

impl Entity for Probe {
    fn set_available(&self, available: bool) {
        self.availability.lock().push(available);
    }
}

type Log = Arc<Mutex<Vec<String>>>;

fn recorder(log: &Log, label: &str) -> DeviceCallback {
    let log = Arc::clone(log);
    let label = label.to_string();
    device_callback(move |msg| {
        let log = Arc::clone(&log);
        let label = label.clone();
        async move {
            log.lock().push(format!("{label} {}", msg.event()));
        }
    })
}

fn found(mac: &str, device_type: &str) -> Message {
    Message::new(EventKind::DeviceFound)
        .with_mac(mac)
        .with_device_type(device_type)
}

fn lost(mac: &str) -> Message {
    Message::new(EventKind::DeviceLost).with_mac(mac)
}

fn power(mac: &str, role: &Role, watts: f64) -> Message {
    Message::new(EventKind::AveragePower)
        .with_mac(mac)
        .with_device_type("sensor")
        .with_role(role)
        .with_field(WATTS_KEY, watts)
}

/// Lets spawned tasks run until they go idle.
async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Subscription transitions
// ============================================================================

mod subscriptions {
    use super::*;

    #[test]
    fn transport_sees_one_call_per_transition() {
        let router = EventRouter::new(RecordingScanner::default());
        let log: Log = Arc::default();
        let dev = DeviceId::new("EE:FF");

        let a = router.subscribe(dev.clone(), EventKind::AveragePower, recorder(&log, "a"));
        let b = router.subscribe(dev.clone(), EventKind::AveragePower, recorder(&log, "b"));
        let c = router.subscribe(dev.clone(), EventKind::SummationEnergy, recorder(&log, "c"));
        assert_eq!(router.transport().calls(), vec!["subscribe EE:FF"]);

        router.unsubscribe(&dev, &EventKind::AveragePower, a);
        router.unsubscribe(&dev, &EventKind::SummationEnergy, c);
        assert_eq!(router.transport().calls().len(), 1);

        router.unsubscribe(&dev, &EventKind::AveragePower, b);
        assert_eq!(
            router.transport().calls(),
            vec!["subscribe EE:FF", "unsubscribe EE:FF"]
        );

        router.subscribe(dev, EventKind::BatteryLevel, recorder(&log, "d"));
        assert_eq!(router.transport().calls().len(), 3);
    }

    #[test]
    fn duplicate_subscribe_is_deduplicated() {
        let router = EventRouter::new(RecordingScanner::default());
        let log: Log = Arc::default();
        let callback = recorder(&log, "a");

        let first = router.subscribe("AA:BB", EventKind::AveragePower, Arc::clone(&callback));
        let second = router.subscribe("AA:BB", EventKind::AveragePower, callback);

        assert_eq!(first, second);
        assert_eq!(router.callback_count(), 1);
        assert_eq!(router.transport().calls().len(), 1);
    }

    #[test]
    fn unknown_unsubscribe_changes_nothing() {
        let router = EventRouter::new(RecordingScanner::default());
        let log: Log = Arc::default();
        let dev = DeviceId::new("AA:BB");
        let id = router.subscribe(dev.clone(), EventKind::AveragePower, recorder(&log, "a"));

        assert!(!router.unsubscribe(&dev, &EventKind::SummationEnergy, id));
        assert!(router.unsubscribe(&dev, &EventKind::AveragePower, id));
        assert!(!router.unsubscribe(&dev, &EventKind::AveragePower, id));

        assert_eq!(
            router.transport().calls(),
            vec!["subscribe AA:BB", "unsubscribe AA:BB"]
        );
    }

    #[tokio::test]
    async fn unrelated_event_reaches_no_callback() {
        let router = EventRouter::new(RecordingScanner::default());
        let log: Log = Arc::default();
        router.subscribe("EE:FF", EventKind::AveragePower, recorder(&log, "a"));
        router.subscribe("EE:FF", EventKind::AveragePower, recorder(&log, "b"));

        let battery = Message::new(EventKind::BatteryLevel)
            .with_mac("EE:FF")
            .with_field("volts", 3.1);
        router.handle(battery).await;
        assert!(log.lock().is_empty());

        router.handle(power("EE:FF", &Role::Appliance, 40.0)).await;
        assert_eq!(*log.lock(), vec!["a average_power", "b average_power"]);
    }

    #[tokio::test]
    async fn unknown_event_tags_still_fan_out() {
        let router = EventRouter::new(RecordingScanner::default());
        let log: Log = Arc::default();
        router.subscribe("AA:BB", EventKind::from("uptime"), recorder(&log, "a"));

        let msg = Message::new(EventKind::from("uptime")).with_mac("AA:BB");
        router.handle(msg).await;
        assert_eq!(*log.lock(), vec!["a uptime"]);
    }
}

// ============================================================================
// Availability and discovery
// ============================================================================

mod discovery {
    use super::*;

    #[tokio::test]
    async fn loaded_entity_follows_liveness() {
        let router = EventRouter::new(RecordingScanner::default());
        let probe = Arc::new(Probe::default());
        let entity: Arc<dyn Entity> = Arc::clone(&probe) as Arc<dyn Entity>;
        router.mark_loaded("AA:BB", entity);

        router.handle(found("AA:BB", "plug")).await;
        router.handle(lost("AA:BB")).await;

        assert_eq!(*probe.availability.lock(), vec![true, false]);
        assert!(!router.is_found(&DeviceId::new("AA:BB")));
    }

    #[tokio::test]
    async fn loaded_device_does_not_reach_handler() {
        let router = EventRouter::new(RecordingScanner::default());
        let seen: Log = Arc::default();
        let seen_clone = Arc::clone(&seen);
        router
            .set_found_callback(Some(found_callback(move |mac, _msg| {
                let seen = Arc::clone(&seen_clone);
                async move { seen.lock().push(mac.to_string()) }
            })))
            .await;
        router.mark_loaded("AA:BB", Arc::new(Probe::default()));

        router.handle(found("AA:BB", "plug")).await;
        router.handle(found("CC:DD", "sensor")).await;

        assert_eq!(*seen.lock(), vec!["CC:DD"]);
    }

    #[tokio::test]
    async fn late_handler_replays_backlog() {
        let router = EventRouter::new(RecordingScanner::default());
        for mac in ["01", "02", "03", "04"] {
            router.handle(found(mac, "sensor")).await;
        }
        router.mark_loaded("02", Arc::new(Probe::default()));

        let seen: Log = Arc::default();
        let seen_clone = Arc::clone(&seen);
        router
            .set_found_callback(Some(found_callback(move |mac, _msg| {
                let seen = Arc::clone(&seen_clone);
                async move { seen.lock().push(mac.to_string()) }
            })))
            .await;

        assert_eq!(*seen.lock(), vec!["01", "03", "04"]);
    }

    #[tokio::test]
    async fn plug_found_before_handler_is_replayed_once() {
        let router = EventRouter::new(RecordingScanner::default());
        router.handle(found("AA:BB", "plug")).await;
        assert!(router.is_found(&DeviceId::new("AA:BB")));
        assert!(!router.is_loaded(&DeviceId::new("AA:BB")));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        router
            .set_found_callback(Some(found_callback(move |mac, msg| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    seen.lock()
                        .push((mac, msg.device_type().map(str::to_string)));
                }
            })))
            .await;

        assert_eq!(
            *seen.lock(),
            vec![(DeviceId::new("AA:BB"), Some("plug".to_string()))]
        );
    }

    #[tokio::test]
    async fn relost_and_refound_device_is_replayed() {
        let router = EventRouter::new(RecordingScanner::default());
        let dev = DeviceId::new("AA:BB");
        let entity: Arc<dyn Entity> = Arc::new(Probe::default());

        router.handle(found("AA:BB", "sensor")).await;
        router.mark_loaded(dev.clone(), Arc::clone(&entity));
        router.handle(lost("AA:BB")).await;
        assert!(router.mark_unloaded(&dev, &entity));
        router.handle(found("AA:BB", "sensor")).await;

        let count = Arc::new(Mutex::new(0));
        let count_clone = Arc::clone(&count);
        router
            .set_found_callback(Some(found_callback(move |_mac, _msg| {
                let count = Arc::clone(&count_clone);
                async move { *count.lock() += 1 }
            })))
            .await;

        assert_eq!(*count.lock(), 1);
    }

    #[tokio::test]
    async fn cleared_handler_is_not_called() {
        let router = EventRouter::new(RecordingScanner::default());
        let count = Arc::new(Mutex::new(0));
        let count_clone = Arc::clone(&count);
        router
            .set_found_callback(Some(found_callback(move |_mac, _msg| {
                let count = Arc::clone(&count_clone);
                async move { *count.lock() += 1 }
            })))
            .await;
        router.set_found_callback(None).await;

        router.handle(found("AA:BB", "sensor")).await;
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn unloading_a_stranger_changes_nothing() {
        let router = EventRouter::new(RecordingScanner::default());
        let dev = DeviceId::new("AA:BB");
        router.mark_loaded(dev.clone(), Arc::new(Probe::default()));

        let stranger: Arc<dyn Entity> = Arc::new(Probe::default());
        assert!(!router.mark_unloaded(&dev, &stranger));
        assert!(router.is_loaded(&dev));
    }
}

// ============================================================================
// Household forwarding
// ============================================================================

mod household {
    use super::*;

    #[tokio::test]
    async fn unsubscribed_telemetry_still_feeds_household() {
        let router = EventRouter::new(RecordingScanner::default());

        router.handle(power("11:11", &Role::HouseNet, 420.0)).await;

        assert_eq!(router.callback_count(), 0);
        assert_eq!(router.household().snapshot().from_grid, Some(420.0));
    }

    #[tokio::test]
    async fn solar_reading_adds_generation_only() {
        let router = EventRouter::new(RecordingScanner::default());

        router.handle(power("CC:DD", &Role::Solar, -150.0)).await;

        let snapshot = router.household().snapshot();
        assert_eq!(snapshot.solar_generation, Some(150.0));
        assert_eq!(snapshot.home_usage, None);

        router.handle(power("11:11", &Role::HouseNet, 200.0)).await;
        assert_eq!(router.household().snapshot().home_usage, Some(350.0));
    }

    #[tokio::test]
    async fn household_error_does_not_stop_delivery() {
        let router = EventRouter::new(RecordingScanner::default());
        let log: Log = Arc::default();
        router.subscribe("11:11", EventKind::AveragePower, recorder(&log, "a"));
        router.subscribe("11:11", EventKind::AveragePower, recorder(&log, "b"));

        let garbage = Message::new(EventKind::AveragePower)
            .with_mac("11:11")
            .with_role(&Role::HouseNet)
            .with_field(WATTS_KEY, "n/a");
        router.handle(garbage).await;
        router.handle(power("11:11", &Role::HouseNet, 100.0)).await;

        assert_eq!(log.lock().len(), 4);
        assert_eq!(router.household().snapshot().from_grid, Some(100.0));
    }

    #[tokio::test]
    async fn disabled_solar_ignores_solar_devices() {
        let config = RouterConfig::builder().solar(SolarMode::Disabled).build();
        let router = EventRouter::with_config(RecordingScanner::default(), config);

        router.handle(power("CC:DD", &Role::Solar, -800.0)).await;
        router.handle(power("11:11", &Role::HouseNet, 250.0)).await;

        let snapshot = router.household().snapshot();
        assert_eq!(snapshot.solar_generation, None);
        assert_eq!(snapshot.home_usage, Some(250.0));
    }

    #[tokio::test]
    async fn energy_counters_are_forwarded() {
        let router = EventRouter::new(RecordingScanner::default());
        for joules in [10_000.0, 13_600.0] {
            let msg = Message::new(EventKind::SummationEnergy)
                .with_mac("11:11")
                .with_role(&Role::HouseNet)
                .with_field(SUMMATION_JOULES_KEY, joules)
                .with_field(RESET_TIME_KEY, 1_700_000_000);
            router.handle(msg).await;
        }

        assert_eq!(router.household().snapshot().from_grid_joules, 3_600.0);
    }
}

// ============================================================================
// Lifecycle and sensors
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn start_failure_is_propagated() {
        let router = EventRouter::new(RecordingScanner::failing());

        let err = router.start().await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::StartFailed(_))));
        assert!(!router.is_running());
        router.stop().await.unwrap();
    }

    #[tokio::test]
    async fn panicking_callback_does_not_stop_delivery() {
        let router = EventRouter::new(RecordingScanner::default());
        let log: Log = Arc::default();
        router.subscribe(
            "AA",
            EventKind::BatteryLevel,
            device_callback(|_msg| async {
                panic!("callback failed");
            }),
        );
        router.subscribe("AA", EventKind::BatteryLevel, recorder(&log, "aa"));
        router.subscribe("BB", EventKind::AveragePower, recorder(&log, "bb"));
        router.start().await.unwrap();

        router.transport().emit(
            Message::new(EventKind::BatteryLevel)
                .with_mac("AA")
                .with_field("volts", 3.0),
        );
        settle().await;
        router.transport().emit(power("BB", &Role::Appliance, 25.0));
        settle().await;

        assert_eq!(*log.lock(), vec!["aa battery_level", "bb average_power"]);
        assert!(router.is_running());
        router.stop().await.unwrap();
    }

    #[tokio::test]
    async fn panicking_discovery_handler_is_contained() {
        let router = EventRouter::new(RecordingScanner::default());
        router.handle(found("01", "sensor")).await;
        router.handle(found("02", "sensor")).await;

        let seen: Log = Arc::default();
        let seen_clone = Arc::clone(&seen);
        router
            .set_found_callback(Some(found_callback(move |mac, _msg| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    assert_ne!(mac.as_str(), "01", "handler failed");
                    seen.lock().push(mac.to_string());
                }
            })))
            .await;
        assert_eq!(*seen.lock(), vec!["02"]);

        router.handle(found("03", "plug")).await;
        assert_eq!(*seen.lock(), vec!["02", "03"]);
    }

    #[tokio::test]
    async fn pump_routes_to_platform_sensors() {
        let router = Arc::new(EventRouter::new(RecordingScanner::default()));
        assert_eq!(router.start().await.unwrap(), 1);
        let platform = SensorPlatform::setup(Arc::clone(&router)).await;
        assert_eq!(platform.household_sensors().len(), 8);

        router.transport().emit(found("aabbccddeeff", "plug"));
        settle().await;

        let sensors = platform.device_sensors();
        assert_eq!(sensors.len(), 3);
        assert!(router.is_loaded(&DeviceId::new("aabbccddeeff")));
        assert_eq!(router.transport().calls(), vec!["subscribe aabbccddeeff"]);

        let watts = sensors
            .iter()
            .find(|s| s.unique_id() == "aa:bb:cc:dd:ee:ff_average_power_watts")
            .expect("power sensor");
        let mut updates = watts.watch();

        router.transport().emit(
            Message::new(EventKind::AveragePower)
                .with_mac("aabbccddeeff")
                .with_field(WATTS_KEY, -12.0),
        );
        tokio::time::timeout(Duration::from_secs(1), updates.changed())
            .await
            .expect("no update")
            .unwrap();
        assert_eq!(watts.state().value, Some(SensorValue::Int(0)));

        router.transport().emit(lost("aabbccddeeff"));
        settle().await;
        assert!(!watts.state().available);

        platform.unload().await;
        assert!(router.subscribed_devices().is_empty());
        assert_eq!(router.household().subscriber_count(), 0);
        router.stop().await.unwrap();
    }

    #[tokio::test]
    async fn household_sensors_show_home_usage() {
        let router = Arc::new(EventRouter::new(RecordingScanner::default()));
        let platform = SensorPlatform::setup(Arc::clone(&router)).await;

        router.handle(power("CC:DD", &Role::Solar, -1_500.0)).await;
        router.handle(power("11:11", &Role::HouseNet, -400.0)).await;

        let state_of = |metric: HouseholdMetric| {
            platform
                .household_sensors()
                .into_iter()
                .find(|s| s.metric() == metric)
                .map(|s| s.state().value)
        };
        assert_eq!(state_of(HouseholdMetric::HomeUsage), Some(Some(SensorValue::Int(1_100))));
        assert_eq!(state_of(HouseholdMetric::ToGrid), Some(Some(SensorValue::Int(400))));
        assert_eq!(state_of(HouseholdMetric::FromGrid), Some(Some(SensorValue::Int(0))));
        assert_eq!(
            state_of(HouseholdMetric::SolarGeneration),
            Some(Some(SensorValue::Int(1_500)))
        );
    }

    #[tokio::test]
    async fn unsupported_device_gets_no_sensors() {
        let router = Arc::new(EventRouter::new(RecordingScanner::default()));
        router.handle(found("99:99", "gateway")).await;

        let platform = SensorPlatform::setup(Arc::clone(&router)).await;
        assert!(platform.device_sensors().is_empty());
        assert!(!router.is_loaded(&DeviceId::new("99:99")));
    }
}
