//! Typed sync-event streams for Apiflow
//!
//! Every entity kind written by an import has its own [`Topic`]. Storage
//! buffers events in a [`ChangeSet`] while its transaction is open and
//! publishes them once the commit succeeded.

pub mod publisher;
pub mod topic;

pub use publisher::{ChangeSet, EventPublisher};
pub use topic::{
    Envelope, Event, EventError, EventKind, Subscription, Topic, DEFAULT_TOPIC_CAPACITY,
};
