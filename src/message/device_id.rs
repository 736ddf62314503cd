// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a physical Powersensor device.
///
/// The scanner reports devices by hardware address. The value is kept
/// exactly as received so lookups match the scanner's own bookkeeping;
/// use [`formatted`](Self::formatted) when a normalized form is needed.
///
/// # Examples
///
/// ```
/// use powersensor_router::message::DeviceId;
///
/// let id = DeviceId::new("A4CF12F0BEEF");
/// assert_eq!(id.as_str(), "A4CF12F0BEEF");
/// assert_eq!(id.formatted(), "a4:cf:12:f0:be:ef");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a device identifier from a hardware address.
    #[must_use]
    pub fn new(mac: impl Into<String>) -> Self {
        Self(mac.into())
    }

    /// Returns the identifier as received from the scanner.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the address lower-cased with colon separators.
    ///
    /// Addresses that are not 12 hex digits (after stripping `:`, `-` and
    /// `.`) are only lower-cased.
    #[must_use]
    pub fn formatted(&self) -> String {
        let digits: String = self
            .0
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return self.0.to_lowercase();
        }

        digits
            .as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).into_owned())
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(mac: &str) -> Self {
        Self::new(mac)
    }
}

impl From<String> for DeviceId {
    fn from(mac: String) -> Self {
        Self(mac)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_inserts_colons() {
        let id = DeviceId::new("A4CF12F0BEEF");
        assert_eq!(id.formatted(), "a4:cf:12:f0:be:ef");
    }

    #[test]
    fn formatted_normalizes_dashes() {
        let id = DeviceId::new("A4-CF-12-F0-BE-EF");
        assert_eq!(id.formatted(), "a4:cf:12:f0:be:ef");
    }

    #[test]
    fn formatted_keeps_short_ids() {
        let id = DeviceId::new("AA:BB");
        assert_eq!(id.formatted(), "aa:bb");
    }

    #[test]
    fn display_is_raw_value() {
        let id = DeviceId::new("AA:BB");
        assert_eq!(id.to_string(), "AA:BB");
        assert_eq!(format!("{id:?}"), "DeviceId(AA:BB)");
    }

    #[test]
    fn equality_is_exact() {
        assert_eq!(DeviceId::from("AA:BB"), DeviceId::new("AA:BB".to_string()));
        assert_ne!(DeviceId::from("AA:BB"), DeviceId::from("aa:bb"));
    }
}
