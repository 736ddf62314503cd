// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scanner message record.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::MessageError;

use super::{DeviceId, EventKind, Role};

/// Key of the device identifier field.
pub const MAC_KEY: &str = "mac";
/// Key of the event tag field.
pub const EVENT_KEY: &str = "event";
/// Key of the device type field.
pub const DEVICE_TYPE_KEY: &str = "device_type";
/// Key of the installation role field.
pub const ROLE_KEY: &str = "role";
/// Key of the averaged power payload.
pub const WATTS_KEY: &str = "watts";
/// Key of the voltage payload.
pub const VOLTS_KEY: &str = "volts";
/// Key of the cumulative energy payload.
pub const SUMMATION_JOULES_KEY: &str = "summation_joules";
/// Key of the energy counter reset time, in epoch seconds.
pub const RESET_TIME_KEY: &str = "summation_resettime_utc";

/// An immutable key-value message as delivered by the scanner.
///
/// Every message has an `event` tag. Telemetry additionally names the
/// device (`mac`), its `device_type`, an optional `role` and numeric
/// payload fields keyed by metric name.
///
/// # Examples
///
/// ```
/// use powersensor_router::message::{EventKind, Message, Role};
///
/// let msg = Message::from_json(
///     r#"{"event":"average_power","mac":"CC:DD","role":"solar","watts":-150}"#,
/// ).unwrap();
///
/// assert_eq!(*msg.event(), EventKind::AveragePower);
/// assert_eq!(msg.role(), Some(Role::Solar));
/// assert_eq!(msg.number("watts"), Some(-150.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    kind: EventKind,
    fields: Map<String, Value>,
}

impl Message {
    /// Creates a message with only an event tag.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        let mut fields = Map::new();
        fields.insert(EVENT_KEY.to_string(), Value::String(kind.as_str().to_string()));
        Self { kind, fields }
    }

    /// Parses a message from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError`] if the text is not a JSON object with a
    /// string `event` field.
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(text)?;
        Self::try_from(value)
    }

    /// Sets the device identifier.
    #[must_use]
    pub fn with_mac(self, mac: impl Into<DeviceId>) -> Self {
        let mac: DeviceId = mac.into();
        self.with_field(MAC_KEY, mac.as_str())
    }

    /// Sets the device type.
    #[must_use]
    pub fn with_device_type(self, device_type: &str) -> Self {
        self.with_field(DEVICE_TYPE_KEY, device_type)
    }

    /// Sets the installation role.
    #[must_use]
    pub fn with_role(self, role: &Role) -> Self {
        self.with_field(ROLE_KEY, role.as_str())
    }

    /// Sets an arbitrary field. Setting `event` also changes the kind.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if key == EVENT_KEY
            && let Some(tag) = value.as_str()
        {
            self.kind = EventKind::from(tag);
        }
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Returns the event type.
    #[must_use]
    pub fn event(&self) -> &EventKind {
        &self.kind
    }

    /// Returns the device identifier, if the message names one.
    #[must_use]
    pub fn mac(&self) -> Option<DeviceId> {
        self.fields
            .get(MAC_KEY)
            .and_then(Value::as_str)
            .map(DeviceId::from)
    }

    /// Returns the device type tag (e.g. `plug`, `sensor`).
    #[must_use]
    pub fn device_type(&self) -> Option<&str> {
        self.fields.get(DEVICE_TYPE_KEY).and_then(Value::as_str)
    }

    /// Returns the installation role.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.fields
            .get(ROLE_KEY)
            .and_then(Value::as_str)
            .map(Role::from)
    }

    /// Returns a numeric payload field.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    /// Returns the energy counter reset time in epoch seconds.
    #[must_use]
    pub fn reset_epoch(&self) -> Option<i64> {
        let value = self.fields.get(RESET_TIME_KEY)?;
        #[allow(clippy::cast_possible_truncation)]
        let secs = value
            .as_i64()
            .or_else(|| value.as_f64().map(|secs| secs.trunc() as i64));
        secs
    }

    /// Returns the energy counter reset time.
    #[must_use]
    pub fn reset_time(&self) -> Option<DateTime<Utc>> {
        self.reset_epoch()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Returns `true` if the message carries the given key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns a raw field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the message as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl TryFrom<Value> for Message {
    type Error = MessageError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(fields) = value else {
            return Err(MessageError::NotAnObject);
        };

        let kind = fields
            .get(EVENT_KEY)
            .and_then(Value::as_str)
            .map(EventKind::from)
            .ok_or_else(|| MessageError::MissingField(EVENT_KEY.to_string()))?;

        Ok(Self { kind, fields })
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Message {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}
