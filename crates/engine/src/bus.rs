// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process pub/sub event bus.
//!
//! Emit never blocks: every subscription owns a bounded queue, and when a
//! slow subscriber's queue fills, the oldest pending events are dropped and
//! replaced with a single `EVENTS_DROPPED` marker. Delivery preserves emit
//! order per subscriber, and a subscriber receives at most one copy of an
//! event no matter how many of its patterns match.
//!
//! A bounded ring of recent events is kept for late subscribers.

use std::collections::VecDeque;
use std::sync::Arc;

use hub_core::{event::pattern_matches, kinds, Clock, HubEvent, SubscriptionId, SystemClock};
use parking_lot::{Mutex, RwLock};
use serde_json::Map;
use tokio::sync::Notify;

/// Default bounded ring size for late subscribers.
pub const DEFAULT_RING_CAPACITY: usize = 1000;

/// Default per-subscriber queue size.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

struct QueueState {
    items: VecDeque<HubEvent>,
    capacity: usize,
    marker_queued: bool,
    closed: bool,
}

/// One subscription's bounded delivery queue.
struct SubscriberQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl SubscriberQueue {
    fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                capacity,
                marker_queued: false,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Push an event, applying the overflow policy. Never blocks.
    fn push(&self, event: HubEvent, now: u64) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            if state.items.len() >= state.capacity {
                // Make room for the marker plus the new event.
                while state.items.len() > state.capacity.saturating_sub(2) {
                    if let Some(dropped) = state.items.pop_front() {
                        if dropped.kind == kinds::EVENTS_DROPPED {
                            state.marker_queued = false;
                        }
                    } else {
                        break;
                    }
                }
                if !state.marker_queued {
                    let mut marker = HubEvent::new(kinds::EVENTS_DROPPED, Map::new());
                    marker.timestamp = now;
                    state.items.push_front(marker);
                    state.marker_queued = true;
                }
            }
            state.items.push_back(event);
        }
        self.notify.notify_one();
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_one();
    }
}

struct Subscription {
    id: SubscriptionId,
    patterns: Vec<String>,
    queue: Arc<SubscriberQueue>,
}

struct BusInner {
    subscriptions: RwLock<Vec<Subscription>>,
    ring: Mutex<VecDeque<HubEvent>>,
    ring_capacity: usize,
    queue_capacity: usize,
    clock: SystemClock,
}

/// The hub event bus. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

/// Handle for one subscription. Dropping it does not unsubscribe; the
/// owner (the connection server) calls [`EventBus::unsubscribe`] on close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
}

/// Receiving side of a subscription.
pub struct EventReceiver {
    queue: Arc<SubscriberQueue>,
}

impl EventReceiver {
    /// Wait for the next event. Returns `None` once the subscription is
    /// removed and its queue drained.
    pub async fn recv(&mut self) -> Option<HubEvent> {
        loop {
            let notified = self.queue.notify.notified();
            {
                let mut state = self.queue.state.lock();
                if let Some(event) = state.items.pop_front() {
                    if event.kind == kinds::EVENTS_DROPPED {
                        state.marker_queued = false;
                    }
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Drain whatever is queued right now without waiting.
    pub fn drain(&mut self) -> Vec<HubEvent> {
        let mut state = self.queue.state.lock();
        state.marker_queued = false;
        state.items.drain(..).collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY, DEFAULT_QUEUE_CAPACITY)
    }
}

impl EventBus {
    pub fn new(ring_capacity: usize, queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscriptions: RwLock::new(Vec::new()),
                ring: Mutex::new(VecDeque::with_capacity(ring_capacity.min(1024))),
                ring_capacity,
                queue_capacity,
                clock: SystemClock,
            }),
        }
    }

    /// Emit an event: stamp it, keep it in the ring, fan out to matching
    /// subscribers. Non-blocking.
    pub fn emit(&self, mut event: HubEvent) -> HubEvent {
        event.timestamp = self.inner.clock.epoch_ms();

        {
            let mut ring = self.inner.ring.lock();
            if ring.len() >= self.inner.ring_capacity {
                ring.pop_front();
            }
            ring.push_back(event.clone());
        }

        let now = event.timestamp;
        let subscriptions = self.inner.subscriptions.read();
        for sub in subscriptions.iter() {
            // At most one copy per subscriber, regardless of pattern overlap.
            if sub.patterns.iter().any(|p| pattern_matches(p, &event.kind)) {
                sub.queue.push(event.clone(), now);
            }
        }
        event
    }

    /// Convenience: build and emit in one call.
    pub fn emit_kind<T: serde::Serialize>(&self, kind: &str, payload: &T) -> HubEvent {
        self.emit(HubEvent::from_payload(kind, payload))
    }

    /// Add a subscription with an initial pattern set.
    pub fn subscribe(&self, patterns: Vec<String>) -> (SubscriptionHandle, EventReceiver) {
        let queue = Arc::new(SubscriberQueue::new(self.inner.queue_capacity));
        let id = SubscriptionId::new();
        self.inner.subscriptions.write().push(Subscription {
            id: id.clone(),
            patterns,
            queue: Arc::clone(&queue),
        });
        (SubscriptionHandle { id }, EventReceiver { queue })
    }

    /// Add patterns to an existing subscription.
    pub fn add_patterns(&self, handle: &SubscriptionHandle, patterns: &[String]) {
        let mut subscriptions = self.inner.subscriptions.write();
        if let Some(sub) = subscriptions.iter_mut().find(|s| s.id == handle.id) {
            for pattern in patterns {
                if !sub.patterns.contains(pattern) {
                    sub.patterns.push(pattern.clone());
                }
            }
        }
    }

    /// Remove patterns from an existing subscription.
    pub fn remove_patterns(&self, handle: &SubscriptionHandle, patterns: &[String]) {
        let mut subscriptions = self.inner.subscriptions.write();
        if let Some(sub) = subscriptions.iter_mut().find(|s| s.id == handle.id) {
            sub.patterns.retain(|p| !patterns.contains(p));
        }
    }

    /// Remove a subscription entirely, waking its receiver.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let mut subscriptions = self.inner.subscriptions.write();
        if let Some(pos) = subscriptions.iter().position(|s| s.id == handle.id) {
            let sub = subscriptions.swap_remove(pos);
            sub.queue.close();
        }
    }

    /// The most recent `n` events from the ring, oldest first.
    pub fn recent(&self, n: usize) -> Vec<HubEvent> {
        let ring = self.inner.ring.lock();
        let skip = ring.len().saturating_sub(n);
        ring.iter().skip(skip).cloned().collect()
    }

    /// Current subscription count.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
