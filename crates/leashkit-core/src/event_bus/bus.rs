//! Event Bus implementation.
//!
//! Provides the LeashEventBus owned by each engine.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{EventCategory, LeashEvent};

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Filter to receive only specific event types
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    /// Check if an event matches this filter
    pub fn matches(&self, event: &LeashEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

type EventHandler = Box<dyn Fn(LeashEvent) + Send + Sync>;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Buffer of the async broadcast channel; slow receivers lag past it.
    pub channel_capacity: usize,
    /// Most recent events kept for [`LeashEventBus::history`]; 0 keeps none.
    pub history_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            history_capacity: 0,
        }
    }
}

impl EventBusConfig {
    /// Keeps the last `capacity` events.
    pub fn with_history(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}

/// Publish/subscribe hub for [`LeashEvent`]s.
///
/// Synchronous handlers run on the publishing task, in the order the engine
/// acted; async tasks can poll a broadcast [`receiver`](Self::receiver).
pub struct LeashEventBus {
    sender: broadcast::Sender<LeashEvent>,
    handlers: RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>,
    history: RwLock<VecDeque<LeashEvent>>,
    history_capacity: usize,
}

impl LeashEventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::with_capacity(config.history_capacity.min(1024))),
            history_capacity: config.history_capacity,
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of handlers and receivers reached. Publishing with
    /// nobody listening is not an error.
    pub fn publish(&self, event: LeashEvent) -> usize {
        tracing::trace!("[{:?}] {}", event.category(), event.description());

        if self.history_capacity > 0 {
            let mut history = self.history.write();
            if history.len() == self.history_capacity {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        let mut reached = 0;
        for (filter, handler) in self.handlers.read().values() {
            if filter.matches(&event) {
                handler(event.clone());
                reached += 1;
            }
        }

        // Err only means there are no async receivers
        reached + self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events with a synchronous handler
    ///
    /// The handler must return quickly and must not subscribe or unsubscribe
    /// from inside the callback.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(LeashEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        self.handlers.write().insert(id, (filter, Box::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Get a receiver for polling events from an async task
    pub fn receiver(&self) -> broadcast::Receiver<LeashEvent> {
        self.sender.subscribe()
    }

    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Retained events, oldest first.
    pub fn history(&self) -> Vec<LeashEvent> {
        self.history.read().iter().cloned().collect()
    }

    /// Retained events, oldest first, leaving the history empty.
    pub fn take_history(&self) -> Vec<LeashEvent> {
        self.history.write().drain(..).collect()
    }
}

impl Default for LeashEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LeashEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeashEventBus")
            .field("subscribers", &self.subscriber_count())
            .field("history_capacity", &self.history_capacity)
            .finish()
    }
}
