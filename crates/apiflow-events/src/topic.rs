use apiflow_core::Id;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use utoipa::ToSchema;

/// Default per-topic buffer before slow subscribers start lagging
pub const DEFAULT_TOPIC_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A row written by the import itself
    Insert,
    /// An existing row changed in place
    Update,
    /// A row created as a side effect of the import
    Create,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Insert => "insert",
            EventKind::Update => "update",
            EventKind::Create => "create",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<T> {
    pub kind: EventKind,
    pub entity: T,
}

impl<T> Event<T> {
    pub fn new(kind: EventKind, entity: T) -> Self {
        Self { kind, entity }
    }
}

/// An event together with the key its topic is partitioned by
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub key: Id,
    pub event: Event<T>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("Topic closed")]
    Closed,

    #[error("Subscriber lagged by {0} events")]
    Lagged(u64),
}

/// One broadcast stream of events for a single entity kind
///
/// Publishing never waits on subscribers: a slow subscriber loses the
/// oldest events and sees [`EventError::Lagged`] on its next receive.
pub struct Topic<T> {
    name: &'static str,
    sender: broadcast::Sender<Envelope<T>>,
}

impl<T: Clone + Send + 'static> Topic<T> {
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, DEFAULT_TOPIC_CAPACITY)
    }

    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { name, sender }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Publish `event` under `key`; returns how many subscribers got it
    pub fn publish(&self, key: Id, event: Event<T>) -> usize {
        let kind = event.kind;
        match self.sender.send(Envelope { key, event }) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(topic = self.name, %key, %kind, "No subscribers for event");
                0
            }
        }
    }

    /// Every event on this topic
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            topic: self.name,
            key: None,
            receiver: self.sender.subscribe(),
        }
    }

    /// Only events published under `key`
    pub fn subscribe_key(&self, key: Id) -> Subscription<T> {
        Subscription {
            topic: self.name,
            key: Some(key),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct Subscription<T> {
    topic: &'static str,
    key: Option<Id>,
    receiver: broadcast::Receiver<Envelope<T>>,
}

impl<T: Clone> Subscription<T> {
    pub async fn recv(&mut self) -> Result<Envelope<T>, EventError> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if self.accepts(&envelope) => return Ok(envelope),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => return Err(EventError::Closed),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = self.topic, skipped = n, "Event subscriber lagged");
                    return Err(EventError::Lagged(n));
                }
            }
        }
    }

    /// Next buffered event, or `None` when nothing is waiting
    pub fn try_recv(&mut self) -> Result<Option<Envelope<T>>, EventError> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) if self.accepts(&envelope) => return Ok(Some(envelope)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(EventError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Err(EventError::Lagged(n))
                }
            }
        }
    }

    /// Drain everything currently buffered
    pub fn drain(&mut self) -> Vec<Envelope<T>> {
        let mut events = Vec::new();
        while let Ok(Some(envelope)) = self.try_recv() {
            events.push(envelope);
        }
        events
    }

    fn accepts(&self, envelope: &Envelope<T>) -> bool {
        self.key.map(|key| key == envelope.key).unwrap_or(true)
    }
}
