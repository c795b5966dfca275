// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Event bus (C1) — in-memory pub/sub over the closed [`KernelEvent`]
//! vocabulary using a tokio broadcast channel. Every component that wants
//! to observe kernel activity subscribes; nothing reaches into another
//! component's state directly.
//!
//! For MVP: in-memory only, events are lost on restart. A durable event
//! store is a natural next backend but is out of scope here (§1).

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::events::KernelEvent;

/// Default channel capacity; lagging subscribers drop the oldest events
/// rather than block publishers.
const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<KernelEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Publish an event to all current subscribers. Never blocks; if there
    /// are no subscribers the event is simply dropped.
    ///
    /// `send` only enqueues onto each subscriber's channel — it never calls
    /// a handler in-line, so a subscriber that reacts to an event by
    /// publishing another one cannot recurse through this call stack.
    /// There is no depth counter because there is no call depth to bound;
    /// the only failure mode the broadcast channel has is a slow
    /// subscriber lagging behind and missing events (`EventBusError::Lagged`,
    /// counted via `aegis_event_bus_lagged_total`).
    pub fn publish(&self, event: KernelEvent) {
        let _receiver_count = self.sender.send(event).unwrap_or(0);
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<KernelEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<KernelEvent, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                metrics::counter!("aegis_event_bus_lagged_total").increment(n);
                warn!(lagged = n, "event receiver lagged, events were dropped");
                EventBusError::Lagged(n)
            }
        })
    }

    pub fn try_recv(&mut self) -> Result<KernelEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                metrics::counter!("aegis_event_bus_lagged_total").increment(n);
                warn!(lagged = n, "event receiver lagged, events were dropped");
                EventBusError::Lagged(n)
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("event bus is closed")]
    Closed,

    #[error("no events available")]
    Empty,

    #[error("receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{CellId, Reality};

    #[tokio::test]
    async fn publish_subscribe_round_trip() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();

        bus.publish(KernelEvent::PerceptionReceived {
            cell_id: CellId::new(),
            reality: Reality::Code,
            source: Some("git_watcher".to_string()),
            data: None,
        });

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.kind(), "perception_received");
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::new(10);
        let mut r1 = bus.subscribe();
        let mut r2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(KernelEvent::BudgetExhausted {
            cell_id: CellId::new(),
        });

        r1.recv().await.unwrap();
        r2.recv().await.unwrap();
    }

    #[tokio::test]
    async fn slow_subscriber_gets_lagged_instead_of_blocking_the_publisher() {
        let bus = EventBus::new(2);
        let mut receiver = bus.subscribe();

        for _ in 0..5 {
            bus.publish(KernelEvent::BudgetExhausted { cell_id: CellId::new() });
        }

        let result = receiver.recv().await;
        assert!(matches!(result, Err(EventBusError::Lagged(_))));
    }
}
