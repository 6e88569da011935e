// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed change-notification signals.
//!
//! Every observable entity in the engine owns one [`Signal`] per event kind.
//! A presentation layer subscribes to these instead of polling; the engine
//! emits synchronously at its mutation points.

use std::fmt;

/// Handle returned by [`Signal::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A single-event publish/subscribe channel.
///
/// Handlers are invoked synchronously, in subscription order, each time
/// [`Signal::emit`] is called. Because emission takes the signal's exclusive
/// borrow, a handler can never subscribe to or unsubscribe from the signal
/// it is currently being delivered from; that is the documented policy for
/// mutation during emission.
///
/// Subscriptions are owned by the signal, so a subscriber never keeps its
/// publisher alive. Drop a subscription with [`Signal::unsubscribe`].
pub struct Signal<T> {
    subscribers: Vec<(SubscriptionId, Box<dyn FnMut(&T)>)>,
    next_id: u64,
}

impl<T> Signal<T> {
    /// Create a signal with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a handler; returns the id needed to unsubscribe it.
    pub fn subscribe(&mut self, handler: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Invoke every subscriber with `payload`, in subscription order.
    pub fn emit(&mut self, payload: &T) {
        for (_, handler) in &mut self.subscribers {
            handler(payload);
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
