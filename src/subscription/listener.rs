// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener callbacks and subscription identifiers.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::event::Event;

/// Unique identifier for a listener registration.
///
/// Returned when registering a listener and used to unregister it. IDs are
/// unique within one event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
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

type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;
type ClosedCallback = Arc<dyn Fn() + Send + Sync>;

/// Receiver of one appliance's events.
///
/// Built from closures. `on_closed` runs once when the underlying
/// connection is torn down by a failure or the dead-connection watchdog; it
/// does not run on explicit unregistration.
///
/// Callbacks run on the stream's reader task and should return quickly.
/// A panicking callback is logged and does not affect other listeners.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::subscription::EventListener;
///
/// let listener = EventListener::new(|event| {
///     println!("{} {:?} = {:?}", event.ha_id, event.key, event.value);
/// })
/// .on_closed(|| println!("stream closed"));
/// ```
#[derive(Clone)]
pub struct EventListener {
    on_event: EventCallback,
    on_closed: Option<ClosedCallback>,
}

impl EventListener {
    /// Creates a listener that calls `on_event` for every event.
    pub fn new<F>(on_event: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            on_event: Arc::new(on_event),
            on_closed: None,
        }
    }

    /// Sets the callback run when the connection closes.
    #[must_use]
    pub fn on_closed<F>(mut self, on_closed: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_closed = Some(Arc::new(on_closed));
        self
    }

    /// Delivers `event`, catching and logging a panic.
    pub(crate) fn deliver(&self, event: &Event) {
        if catch_unwind(AssertUnwindSafe(|| (self.on_event)(event))).is_err() {
            tracing::error!(
                ha_id = %event.ha_id,
                kind = %event.kind,
                "Event listener panicked"
            );
        }
    }

    /// Runs the closed callback, catching and logging a panic.
    pub(crate) fn closed(&self, ha_id: &str) {
        let Some(on_closed) = &self.on_closed else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| on_closed())).is_err() {
            tracing::error!(ha_id = %ha_id, "Event listener panicked in on_closed");
        }
    }
}

impl std::fmt::Debug for EventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListener")
            .field("has_on_closed", &self.on_closed.is_some())
            .finish_non_exhaustive()
    }
}
