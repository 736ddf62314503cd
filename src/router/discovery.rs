// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery handler slot.

use crate::subscription::FoundCallback;

/// Holds the optional handler told about newly discovered devices.
///
/// Replay of the backlog is driven by the router, which owns the
/// [`DeviceDirectory`](super::DeviceDirectory) the backlog comes from.
#[derive(Default)]
pub struct DiscoveryNotifier {
    handler: Option<FoundCallback>,
}

impl DiscoveryNotifier {
    /// Creates a notifier with no handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the handler. Returns the previous one.
    pub fn replace(&mut self, handler: Option<FoundCallback>) -> Option<FoundCallback> {
        std::mem::replace(&mut self.handler, handler)
    }

    /// Returns a clone of the current handler.
    #[must_use]
    pub fn handler(&self) -> Option<FoundCallback> {
        self.handler.clone()
    }

    /// Returns `true` if a handler is registered.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.handler.is_some()
    }
}

impl std::fmt::Debug for DiscoveryNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryNotifier")
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::subscription::found_callback;

    #[test]
    fn replace_returns_previous() {
        let mut notifier = DiscoveryNotifier::new();
        let first = found_callback(|_mac, _msg| async {});

        assert!(notifier.replace(Some(Arc::clone(&first))).is_none());
        assert!(notifier.is_registered());

        let previous = notifier.replace(None).unwrap();
        assert!(Arc::ptr_eq(&previous, &first));
        assert!(!notifier.is_registered());
    }
}
