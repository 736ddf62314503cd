// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the router.
//!
//! Transport failures are fatal to router startup and are always propagated.
//! Household failures are recovered where the router forwards telemetry to
//! the aggregator, so [`HouseholdError`] only surfaces through direct
//! aggregator calls and [`MessageError`] only through message parsing.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The device scanner failed to start or stop.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// `start` was called on a router that is already consuming messages.
    #[error("router is already running")]
    AlreadyRunning,
}

/// Errors reported by a device scanner transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The scanner could not bind or open its socket.
    #[error("failed to start scanner: {0}")]
    StartFailed(String),

    /// The scanner could not be shut down cleanly.
    #[error("failed to stop scanner: {0}")]
    StopFailed(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while deriving household metrics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HouseholdError {
    /// The message has no device identifier to attribute the reading to.
    #[error("{event} message carries no device identifier")]
    MissingDevice {
        /// The event type of the offending message.
        event: String,
    },

    /// A payload field is present but not a number.
    #[error("{field} is not a number: {found}")]
    InvalidField {
        /// The payload key.
        field: String,
        /// The rejected JSON value.
        found: String,
    },

    /// The message type is not one the aggregator consumes.
    #[error("unsupported household event: {0}")]
    UnsupportedEvent(String),
}

/// Errors related to parsing scanner messages.
#[derive(Debug, Error)]
pub enum MessageError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but is not a JSON object.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// The mandatory `event` tag is absent.
    #[error("missing field in message: {0}")]
    MissingField(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
